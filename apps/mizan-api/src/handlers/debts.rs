use axum::extract::State;
use axum::Json;
use serde::Serialize;

use mizan_core::{Party, Resource};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

/// Who owes the store, and whom the store owes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtsOverview {
    pub customers: Vec<Party>,
    pub suppliers: Vec<Party>,
    pub total_customer_debt_cents: i64,
    pub total_supplier_debt_cents: i64,
    /// Credit invoices with something still owed.
    pub pending_invoices: i64,
}

pub async fn debts_overview(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<DebtsOverview>> {
    user.require(Resource::Debts)?;

    let customers = state.db.customers().debtors().await?;
    let suppliers = state.db.suppliers().debtors().await?;
    let pending_invoices = state.db.invoices().count_pending().await?;

    Ok(Json(DebtsOverview {
        total_customer_debt_cents: customers.iter().map(|p| p.balance_cents).sum(),
        total_supplier_debt_cents: suppliers.iter().map(|p| p.balance_cents).sum(),
        customers,
        suppliers,
        pending_invoices,
    }))
}
