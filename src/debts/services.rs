use std::time::Duration;

use time::format_description::well_known::Rfc3339;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::debts::dto::{CreateDebtRequest, UpdateDebtRequest};
use crate::debts::repo_types::{Debt, DebtAggregates};
use crate::error::Error;
use crate::state::AppState;

pub(crate) fn owner_prefix(owner: Uuid) -> String {
    format!("user:{owner}:")
}

pub(crate) fn list_key(owner: Uuid, is_paid: Option<bool>) -> String {
    let filter = match is_paid {
        Some(true) => "true",
        Some(false) => "false",
        None => "all",
    };
    format!("user:{owner}:debts:{filter}")
}

pub(crate) fn aggregations_key(owner: Uuid) -> String {
    format!("user:{owner}:aggregations")
}

/// Read-through: serve the cached list when present, otherwise query the
/// store and populate the cache. A cache entry that fails to decode is
/// treated as a miss.
pub async fn list_debts(
    state: &AppState,
    owner: Uuid,
    is_paid: Option<bool>,
) -> Result<Vec<Debt>, Error> {
    let key = list_key(owner, is_paid);
    if let Some(raw) = state.cache.get(&key).await {
        match serde_json::from_str::<Vec<Debt>>(&raw) {
            Ok(debts) => {
                debug!(%owner, key = %key, "debt list served from cache");
                return Ok(debts);
            }
            Err(e) => warn!(error = %e, key = %key, "discarding undecodable cache entry"),
        }
    }

    let debts = Debt::list_by_owner(&state.db, owner, is_paid).await?;
    if let Ok(raw) = serde_json::to_string(&debts) {
        let ttl = Duration::from_secs(state.config.cache.list_ttl_secs);
        state.cache.set(&key, raw, ttl).await;
    }
    Ok(debts)
}

pub async fn get_debt(state: &AppState, owner: Uuid, debt_id: Uuid) -> Result<Debt, Error> {
    Debt::get_by_id(&state.db, debt_id, owner)
        .await?
        .ok_or_else(|| Error::not_found("Debt not found"))
}

pub async fn create_debt(
    state: &AppState,
    owner: Uuid,
    payload: CreateDebtRequest,
) -> Result<Debt, Error> {
    let description = payload.description.trim().to_string();
    if description.is_empty() {
        return Err(Error::validation("Description is required"));
    }

    let debt = Debt::create(&state.db, owner, &description, payload.amount, payload.due_date).await?;
    state.cache.invalidate_prefix(&owner_prefix(owner)).await;
    Ok(debt)
}

pub async fn update_debt(
    state: &AppState,
    owner: Uuid,
    debt_id: Uuid,
    changes: UpdateDebtRequest,
) -> Result<Debt, Error> {
    let debt = Debt::update(&state.db, debt_id, owner, &changes).await?;
    state.cache.invalidate_prefix(&owner_prefix(owner)).await;
    Ok(debt)
}

pub async fn mark_debt_paid(state: &AppState, owner: Uuid, debt_id: Uuid) -> Result<Debt, Error> {
    let debt = Debt::mark_paid(&state.db, debt_id, owner)
        .await?
        .ok_or_else(|| Error::not_found("Debt not found"))?;
    state.cache.invalidate_prefix(&owner_prefix(owner)).await;
    Ok(debt)
}

pub async fn delete_debt(state: &AppState, owner: Uuid, debt_id: Uuid) -> Result<Debt, Error> {
    let debt = Debt::delete(&state.db, debt_id, owner).await?;
    state.cache.invalidate_prefix(&owner_prefix(owner)).await;
    Ok(debt)
}

pub async fn aggregations(state: &AppState, owner: Uuid) -> Result<DebtAggregates, Error> {
    let key = aggregations_key(owner);
    if let Some(raw) = state.cache.get(&key).await {
        match serde_json::from_str::<DebtAggregates>(&raw) {
            Ok(aggregates) => {
                debug!(%owner, "aggregations served from cache");
                return Ok(aggregates);
            }
            Err(e) => warn!(error = %e, key = %key, "discarding undecodable cache entry"),
        }
    }

    let aggregates = Debt::aggregate(&state.db, owner).await?;
    if let Ok(raw) = serde_json::to_string(&aggregates) {
        let ttl = Duration::from_secs(state.config.cache.aggregation_ttl_secs);
        state.cache.set(&key, raw, ttl).await;
    }
    Ok(aggregates)
}

/// Exports read the store directly; the attachment should always reflect
/// the committed state.
pub async fn export_rows(state: &AppState, owner: Uuid) -> Result<Vec<Debt>, Error> {
    Debt::list_by_owner(&state.db, owner, None).await
}

pub fn debts_to_csv(debts: &[Debt]) -> Result<String, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "ID",
            "Description",
            "Amount",
            "Paid Amount",
            "Paid",
            "Due Date",
            "Created At",
        ])
        .map_err(anyhow::Error::from)?;

    for debt in debts {
        writer
            .write_record([
                debt.id.to_string(),
                debt.description.clone(),
                debt.amount.to_string(),
                debt.paid_amount.to_string(),
                if debt.is_paid { "Yes" } else { "No" }.to_string(),
                debt.due_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "N/A".into()),
                debt.created_at.format(&Rfc3339).map_err(anyhow::Error::from)?,
            ])
            .map_err(anyhow::Error::from)?;
    }

    let bytes = writer.into_inner().map_err(anyhow::Error::from)?;
    Ok(String::from_utf8(bytes).map_err(anyhow::Error::from)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::time::Duration;
    use time::macros::date;
    use time::OffsetDateTime;

    fn sample_debt(owner: Uuid, is_paid: bool) -> Debt {
        let now = OffsetDateTime::now_utc();
        Debt {
            id: Uuid::new_v4(),
            user_id: owner,
            description: "Loan".into(),
            amount: Decimal::new(5000, 2),
            paid_amount: if is_paid { Decimal::new(5000, 2) } else { Decimal::ZERO },
            is_paid,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn cache_keys_are_deterministic_and_owner_scoped() {
        let owner = Uuid::new_v4();
        assert_eq!(list_key(owner, None), format!("user:{owner}:debts:all"));
        assert_eq!(list_key(owner, Some(true)), format!("user:{owner}:debts:true"));
        assert_eq!(list_key(owner, Some(false)), format!("user:{owner}:debts:false"));
        assert_eq!(aggregations_key(owner), format!("user:{owner}:aggregations"));

        // Every derived key must fall under the owner's namespace so the
        // post-mutation sweep catches it.
        let prefix = owner_prefix(owner);
        assert!(list_key(owner, None).starts_with(&prefix));
        assert!(list_key(owner, Some(true)).starts_with(&prefix));
        assert!(aggregations_key(owner).starts_with(&prefix));
    }

    #[tokio::test]
    async fn list_is_served_from_cache_without_touching_the_store() {
        let state = AppState::fake();
        let owner = Uuid::new_v4();
        let seeded = vec![sample_debt(owner, false)];

        state
            .cache
            .set(
                &list_key(owner, None),
                serde_json::to_string(&seeded).unwrap(),
                Duration::from_secs(60),
            )
            .await;

        // The fake state's pool connects lazily; a store query would fail.
        let debts = list_debts(&state, owner, None).await.unwrap();
        assert_eq!(debts.len(), 1);
        assert_eq!(debts[0].id, seeded[0].id);
        assert_eq!(debts[0].amount, Decimal::new(5000, 2));
    }

    #[tokio::test]
    async fn undecodable_cache_entry_falls_through_to_the_store() {
        let state = AppState::fake();
        let owner = Uuid::new_v4();

        state
            .cache
            .set(&list_key(owner, None), "{not json".into(), Duration::from_secs(60))
            .await;

        // Fallthrough reaches the (unreachable) store rather than erroring
        // on the bad entry itself.
        assert!(list_debts(&state, owner, None).await.is_err());
    }

    #[tokio::test]
    async fn failed_mutation_does_not_invalidate_the_cache() {
        let state = AppState::fake();
        let owner = Uuid::new_v4();
        let key = list_key(owner, None);
        state
            .cache
            .set(&key, "[]".into(), Duration::from_secs(60))
            .await;

        // The store is unreachable, so the update fails before the sweep.
        let result = update_debt(&state, owner, Uuid::new_v4(), UpdateDebtRequest::default()).await;
        assert!(result.is_err());
        assert_eq!(state.cache.get(&key).await, Some("[]".into()));
    }

    #[tokio::test]
    async fn aggregations_cache_hit_round_trips_exact_totals() {
        let state = AppState::fake();
        let owner = Uuid::new_v4();
        let aggregates = DebtAggregates {
            total_debts: 3,
            pending_count: 2,
            paid_count: 1,
            pending_total: Decimal::new(7550, 2),
            paid_total: Decimal::new(5000, 2),
            total_amount: Decimal::new(12550, 2),
        };

        state
            .cache
            .set(
                &aggregations_key(owner),
                serde_json::to_string(&aggregates).unwrap(),
                Duration::from_secs(60),
            )
            .await;

        let cached = aggregations(&state, owner).await.unwrap();
        assert_eq!(cached.total_debts, 3);
        assert_eq!(cached.pending_total + cached.paid_total, cached.total_amount);
        assert_eq!(cached.total_amount.to_string(), "125.50");
    }

    #[test]
    fn csv_export_includes_headers_and_formats_fields() {
        let owner = Uuid::new_v4();
        let mut paid = sample_debt(owner, true);
        paid.due_date = Some(date!(2026 - 09 - 01));
        let pending = sample_debt(owner, false);

        let csv = debts_to_csv(&[paid.clone(), pending.clone()]).unwrap();
        let mut lines = csv.lines();

        assert_eq!(
            lines.next().unwrap(),
            "ID,Description,Amount,Paid Amount,Paid,Due Date,Created At"
        );
        let paid_line = lines.next().unwrap();
        assert!(paid_line.contains(&paid.id.to_string()));
        assert!(paid_line.contains("Yes"));
        assert!(paid_line.contains("2026-09-01"));

        let pending_line = lines.next().unwrap();
        assert!(pending_line.contains("No"));
        assert!(pending_line.contains("N/A"));
        assert!(lines.next().is_none());
    }
}
