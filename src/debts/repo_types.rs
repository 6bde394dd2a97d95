use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Debt record in the database. Amounts are exact decimals end to end;
/// `Deserialize` is needed to read entries back out of the cache.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Debt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub paid_amount: Decimal,
    pub is_paid: bool,
    pub due_date: Option<Date>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Summary computed by a single scan over one owner's debts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DebtAggregates {
    pub total_debts: i64,
    pub pending_count: i64,
    pub paid_count: i64,
    pub pending_total: Decimal,
    pub paid_total: Decimal,
    pub total_amount: Decimal,
}
