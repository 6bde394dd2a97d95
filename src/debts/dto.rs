use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::debts::repo_types::{Debt, DebtAggregates};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDebtRequest {
    pub description: String,
    pub amount: Decimal,
    #[serde(default)]
    pub due_date: Option<Date>,
}

/// Allow-listed updatable fields. A field left absent keeps its stored
/// value; nothing outside this set can be changed through an update.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDebtRequest {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<Date>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "isPaid")]
    pub is_paid: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DebtBody {
    pub debt: Debt,
}

#[derive(Debug, Serialize)]
pub struct DebtListBody {
    pub debts: Vec<Debt>,
}

#[derive(Debug, Serialize)]
pub struct AggregationsBody {
    pub aggregations: DebtAggregates,
}
