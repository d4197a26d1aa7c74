//! Invoice endpoints.
//!
//! `POST /invoices` hands the draft to the transactional
//! [`InvoiceProcessor`](mizan_db::InvoiceProcessor). Client-side totals are
//! not part of the draft and are never read.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use mizan_core::invoice::InvoiceDraft;
use mizan_core::{can_access, Invoice, InvoiceStatus, InvoiceType, Resource};
use mizan_db::{DbError, InvoiceFilter, InvoiceReceipt, ProcessedInvoice};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

/// Purchases belong to the purchasing area, sales and returns to sales.
pub fn resource_for(invoice_type: InvoiceType) -> Resource {
    match invoice_type {
        InvoiceType::Purchase => Resource::Purchases,
        InvoiceType::Sale | InvoiceType::Return => Resource::Sales,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceQuery {
    #[serde(rename = "type")]
    pub invoice_type: Option<InvoiceType>,
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<String>,
    pub supplier_id: Option<String>,
    pub limit: Option<u32>,
}

pub async fn create_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(draft): ApiJson<InvoiceDraft>,
) -> ApiResult<(StatusCode, Json<ProcessedInvoice>)> {
    user.require(resource_for(draft.invoice_type))?;

    let processed = state
        .db
        .processor()
        .process(&draft, Some(&user.user_id))
        .await?;

    Ok((StatusCode::CREATED, Json(processed)))
}

/// Newest first. Listing purchases needs the purchases resource.
pub async fn list_invoices(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<InvoiceQuery>,
) -> ApiResult<Json<Vec<Invoice>>> {
    user.require(resource_for(query.invoice_type.unwrap_or(InvoiceType::Sale)))?;

    let filter = InvoiceFilter {
        invoice_type: query.invoice_type,
        status: query.status,
        customer_id: query.customer_id,
        supplier_id: query.supplier_id,
        limit: query.limit,
    };

    Ok(Json(state.db.invoices().list(&filter).await?))
}

/// Receipt data: header, lines, parties and the store block.
///
/// A role that sees only one kind of invoice gets the same `FORBIDDEN` for
/// an invoice of the other kind as for an id that does not exist, so the
/// response does not reveal which ids are taken. Roles that see both kinds
/// get `NOT_FOUND` for unknown ids.
pub async fn get_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<InvoiceReceipt>> {
    // First kind of invoice this role may not read, if any
    let hidden = [Resource::Sales, Resource::Purchases]
        .into_iter()
        .find(|resource| !can_access(user.role, *resource));

    let receipt = match state.db.invoices().receipt(&id).await {
        Ok(receipt) => receipt,
        Err(DbError::NotFound { .. }) => {
            return Err(match hidden {
                Some(resource) => user.deny(resource),
                None => ApiError::not_found("Invoice", &id),
            });
        }
        Err(e) => return Err(e.into()),
    };
    user.require(resource_for(receipt.invoice.invoice_type))?;

    Ok(Json(receipt))
}
