//! Customer and supplier endpoints, including debt payments.
//!
//! Both kinds share one implementation. The public handlers only pin the
//! [`PartyKind`].

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use mizan_core::{Money, Party, PartyKind, PartyPayment, PaymentReceipt, Resource};
use mizan_db::{BalanceAudit, NewParty};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

fn resource_for(kind: PartyKind) -> Resource {
    match kind {
        PartyKind::Customer => Resource::Customers,
        PartyKind::Supplier => Resource::Suppliers,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount_cents: i64,
    pub notes: Option<String>,
}

// =============================================================================
// Shared implementation
// =============================================================================

async fn list(state: &AppState, user: &AuthUser, kind: PartyKind) -> ApiResult<Json<Vec<Party>>> {
    user.require(resource_for(kind))?;
    Ok(Json(state.db.parties(kind).list().await?))
}

async fn get(
    state: &AppState,
    user: &AuthUser,
    kind: PartyKind,
    id: &str,
) -> ApiResult<Json<Party>> {
    user.require(resource_for(kind))?;

    state
        .db
        .parties(kind)
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(kind.label(), id))
}

async fn create(
    state: &AppState,
    user: &AuthUser,
    kind: PartyKind,
    input: NewParty,
) -> ApiResult<(StatusCode, Json<Party>)> {
    user.require(resource_for(kind))?;
    input.validate()?;

    let party = state.db.parties(kind).create(&input).await?;
    Ok((StatusCode::CREATED, Json(party)))
}

async fn pay(
    state: &AppState,
    user: &AuthUser,
    kind: PartyKind,
    id: &str,
    request: PaymentRequest,
) -> ApiResult<(StatusCode, Json<PaymentReceipt>)> {
    user.require(Resource::Debts)?;

    let receipt = state
        .db
        .balances()
        .apply_payment(
            kind,
            id,
            Money::from_cents(request.amount_cents),
            request.notes,
            Some(user.user_id.clone()),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn payments(
    state: &AppState,
    user: &AuthUser,
    kind: PartyKind,
    id: &str,
) -> ApiResult<Json<Vec<PartyPayment>>> {
    user.require(Resource::Debts)?;

    let repo = state.db.parties(kind);
    if repo.get_by_id(id).await?.is_none() {
        return Err(ApiError::not_found(kind.label(), id));
    }
    Ok(Json(repo.payments(id).await?))
}

async fn audit(
    state: &AppState,
    user: &AuthUser,
    kind: PartyKind,
    id: &str,
) -> ApiResult<Json<BalanceAudit>> {
    user.require(Resource::Debts)?;
    Ok(Json(state.db.balances().audit(kind, id).await?))
}

// =============================================================================
// Customers
// =============================================================================

pub async fn list_customers(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Party>>> {
    list(&state, &user, PartyKind::Customer).await
}

pub async fn get_customer(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Party>> {
    get(&state, &user, PartyKind::Customer, &id).await
}

pub async fn create_customer(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<NewParty>,
) -> ApiResult<(StatusCode, Json<Party>)> {
    create(&state, &user, PartyKind::Customer, input).await
}

/// A customer pays down their debt.
pub async fn customer_payment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(request): ApiJson<PaymentRequest>,
) -> ApiResult<(StatusCode, Json<PaymentReceipt>)> {
    pay(&state, &user, PartyKind::Customer, &id, request).await
}

pub async fn customer_payments(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Vec<PartyPayment>>> {
    payments(&state, &user, PartyKind::Customer, &id).await
}

pub async fn customer_balance_audit(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<BalanceAudit>> {
    audit(&state, &user, PartyKind::Customer, &id).await
}

// =============================================================================
// Suppliers
// =============================================================================

pub async fn list_suppliers(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Party>>> {
    list(&state, &user, PartyKind::Supplier).await
}

pub async fn get_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Party>> {
    get(&state, &user, PartyKind::Supplier, &id).await
}

pub async fn create_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<NewParty>,
) -> ApiResult<(StatusCode, Json<Party>)> {
    create(&state, &user, PartyKind::Supplier, input).await
}

/// The store pays down what it owes a supplier.
pub async fn supplier_payment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(request): ApiJson<PaymentRequest>,
) -> ApiResult<(StatusCode, Json<PaymentReceipt>)> {
    pay(&state, &user, PartyKind::Supplier, &id, request).await
}

pub async fn supplier_payments(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Vec<PartyPayment>>> {
    payments(&state, &user, PartyKind::Supplier, &id).await
}

pub async fn supplier_balance_audit(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<BalanceAudit>> {
    audit(&state, &user, PartyKind::Supplier, &id).await
}
