use rust_decimal::Decimal;
use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use crate::debts::dto::UpdateDebtRequest;
use crate::debts::repo_types::{Debt, DebtAggregates};
use crate::error::Error;

fn ensure_positive(amount: Decimal) -> Result<(), Error> {
    if amount <= Decimal::ZERO {
        return Err(Error::validation("Amount must be greater than 0"));
    }
    Ok(())
}

/// Applies an allow-listed change set on top of the stored record. A paid
/// debt rejects every edit before any field is looked at; the merged values
/// are then written back in a single statement.
fn merge_changes(
    debt: &Debt,
    changes: &UpdateDebtRequest,
) -> Result<(String, Decimal, Option<Date>), Error> {
    if debt.is_paid {
        return Err(Error::InvalidState("Cannot edit a paid debt".into()));
    }

    let description = match &changes.description {
        Some(description) => {
            let description = description.trim();
            if description.is_empty() {
                return Err(Error::validation("Description is required"));
            }
            description.to_string()
        }
        None => debt.description.clone(),
    };

    let amount = match changes.amount {
        Some(amount) => {
            ensure_positive(amount)?;
            amount
        }
        None => debt.amount,
    };

    let due_date = changes.due_date.or(debt.due_date);

    Ok((description, amount, due_date))
}

impl Debt {
    pub async fn create(
        db: &PgPool,
        owner: Uuid,
        description: &str,
        amount: Decimal,
        due_date: Option<Date>,
    ) -> Result<Debt, Error> {
        ensure_positive(amount)?;
        let debt = sqlx::query_as::<_, Debt>(
            r#"
            INSERT INTO debts (user_id, description, amount, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, description, amount, paid_amount, is_paid,
                      due_date, created_at, updated_at
            "#,
        )
        .bind(owner)
        .bind(description)
        .bind(amount)
        .bind(due_date)
        .fetch_one(db)
        .await?;
        Ok(debt)
    }

    /// Ownership is part of the lookup predicate: a debt that exists but
    /// belongs to someone else is indistinguishable from one that does not
    /// exist.
    pub async fn get_by_id(db: &PgPool, debt_id: Uuid, owner: Uuid) -> Result<Option<Debt>, Error> {
        let debt = sqlx::query_as::<_, Debt>(
            r#"
            SELECT id, user_id, description, amount, paid_amount, is_paid,
                   due_date, created_at, updated_at
            FROM debts
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(debt_id)
        .bind(owner)
        .fetch_optional(db)
        .await?;
        Ok(debt)
    }

    pub async fn list_by_owner(
        db: &PgPool,
        owner: Uuid,
        is_paid: Option<bool>,
    ) -> Result<Vec<Debt>, Error> {
        let rows = match is_paid {
            Some(filter) => {
                sqlx::query_as::<_, Debt>(
                    r#"
                    SELECT id, user_id, description, amount, paid_amount, is_paid,
                           due_date, created_at, updated_at
                    FROM debts
                    WHERE user_id = $1 AND is_paid = $2
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(owner)
                .bind(filter)
                .fetch_all(db)
                .await?
            }
            None => {
                sqlx::query_as::<_, Debt>(
                    r#"
                    SELECT id, user_id, description, amount, paid_amount, is_paid,
                           due_date, created_at, updated_at
                    FROM debts
                    WHERE user_id = $1
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(owner)
                .fetch_all(db)
                .await?
            }
        };
        Ok(rows)
    }

    pub async fn update(
        db: &PgPool,
        debt_id: Uuid,
        owner: Uuid,
        changes: &UpdateDebtRequest,
    ) -> Result<Debt, Error> {
        let existing = Self::get_by_id(db, debt_id, owner)
            .await?
            .ok_or_else(|| Error::not_found("Debt not found"))?;

        let (description, amount, due_date) = merge_changes(&existing, changes)?;

        let debt = sqlx::query_as::<_, Debt>(
            r#"
            UPDATE debts
            SET description = $3, amount = $4, due_date = $5, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, description, amount, paid_amount, is_paid,
                      due_date, created_at, updated_at
            "#,
        )
        .bind(debt_id)
        .bind(owner)
        .bind(description)
        .bind(amount)
        .bind(due_date)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::not_found("Debt not found"))?;
        Ok(debt)
    }

    /// One-way transition. Repeating the call re-sets `paid_amount = amount`
    /// with no visible drift.
    pub async fn mark_paid(db: &PgPool, debt_id: Uuid, owner: Uuid) -> Result<Option<Debt>, Error> {
        let debt = sqlx::query_as::<_, Debt>(
            r#"
            UPDATE debts
            SET is_paid = TRUE, paid_amount = amount, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, description, amount, paid_amount, is_paid,
                      due_date, created_at, updated_at
            "#,
        )
        .bind(debt_id)
        .bind(owner)
        .fetch_optional(db)
        .await?;
        Ok(debt)
    }

    /// Deleting is allowed even for paid debts; returns the record's prior
    /// state.
    pub async fn delete(db: &PgPool, debt_id: Uuid, owner: Uuid) -> Result<Debt, Error> {
        let debt = sqlx::query_as::<_, Debt>(
            r#"
            DELETE FROM debts
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, description, amount, paid_amount, is_paid,
                      due_date, created_at, updated_at
            "#,
        )
        .bind(debt_id)
        .bind(owner)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::not_found("Debt not found"))?;
        Ok(debt)
    }

    /// Sums run in NUMERIC on the database side, so monetary totals stay
    /// exact; an owner with no debts gets all zeros.
    pub async fn aggregate(db: &PgPool, owner: Uuid) -> Result<DebtAggregates, Error> {
        let aggregates = sqlx::query_as::<_, DebtAggregates>(
            r#"
            SELECT
                COUNT(*) AS total_debts,
                COUNT(CASE WHEN is_paid = FALSE THEN 1 END) AS pending_count,
                COUNT(CASE WHEN is_paid = TRUE THEN 1 END) AS paid_count,
                COALESCE(SUM(CASE WHEN is_paid = FALSE THEN amount ELSE 0 END), 0) AS pending_total,
                COALESCE(SUM(CASE WHEN is_paid = TRUE THEN amount ELSE 0 END), 0) AS paid_total,
                COALESCE(SUM(amount), 0) AS total_amount
            FROM debts
            WHERE user_id = $1
            "#,
        )
        .bind(owner)
        .fetch_one(db)
        .await?;
        Ok(aggregates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;
    use time::OffsetDateTime;

    fn sample_debt(is_paid: bool) -> Debt {
        let now = OffsetDateTime::now_utc();
        Debt {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            description: "Loan".into(),
            amount: Decimal::new(5000, 2),
            paid_amount: Decimal::ZERO,
            is_paid,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn ensure_positive_rejects_zero_and_negative() {
        assert!(matches!(
            ensure_positive(Decimal::ZERO),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            ensure_positive(Decimal::new(-100, 2)),
            Err(Error::Validation(_))
        ));
        assert!(ensure_positive(Decimal::new(1, 2)).is_ok());
    }

    #[test]
    fn paid_debts_reject_every_edit() {
        let debt = sample_debt(true);

        let changes = UpdateDebtRequest {
            description: Some("New description".into()),
            ..Default::default()
        };
        assert!(matches!(
            merge_changes(&debt, &changes),
            Err(Error::InvalidState(_))
        ));

        // Even an empty change set is rejected; the paid check comes first.
        assert!(matches!(
            merge_changes(&debt, &UpdateDebtRequest::default()),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let mut debt = sample_debt(false);
        debt.due_date = Some(date!(2026 - 09 - 01));

        let changes = UpdateDebtRequest {
            amount: Some(Decimal::new(7500, 2)),
            ..Default::default()
        };
        let (description, amount, due_date) = merge_changes(&debt, &changes).unwrap();
        assert_eq!(description, "Loan");
        assert_eq!(amount, Decimal::new(7500, 2));
        assert_eq!(due_date, Some(date!(2026 - 09 - 01)));
    }

    #[test]
    fn merge_applies_all_given_fields() {
        let debt = sample_debt(false);
        let changes = UpdateDebtRequest {
            description: Some("  Rent  ".into()),
            amount: Some(Decimal::new(120000, 2)),
            due_date: Some(date!(2026 - 10 - 15)),
        };
        let (description, amount, due_date) = merge_changes(&debt, &changes).unwrap();
        assert_eq!(description, "Rent");
        assert_eq!(amount, Decimal::new(120000, 2));
        assert_eq!(due_date, Some(date!(2026 - 10 - 15)));
    }

    #[test]
    fn merge_revalidates_amount() {
        let debt = sample_debt(false);
        let changes = UpdateDebtRequest {
            amount: Some(Decimal::ZERO),
            ..Default::default()
        };
        assert!(matches!(
            merge_changes(&debt, &changes),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn merge_rejects_blank_description() {
        let debt = sample_debt(false);
        let changes = UpdateDebtRequest {
            description: Some("   ".into()),
            ..Default::default()
        };
        assert!(matches!(
            merge_changes(&debt, &changes),
            Err(Error::Validation(_))
        ));
    }
}
