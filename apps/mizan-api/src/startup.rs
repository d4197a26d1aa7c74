//! Router assembly.

use axum::http::Request;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{category, debts, health, invoice, party, product, report, settings};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        // Invoices
        .route(
            "/invoices",
            get(invoice::list_invoices).post(invoice::create_invoice),
        )
        .route("/invoices/:id", get(invoice::get_invoice))
        // Catalog
        .route(
            "/products",
            get(product::list_products).post(product::create_product),
        )
        .route("/products/low-stock", get(product::low_stock))
        .route(
            "/products/:id",
            get(product::get_product).put(product::update_product),
        )
        .route(
            "/categories",
            get(category::list_categories).post(category::create_category),
        )
        // Parties and debts
        .route(
            "/customers",
            get(party::list_customers).post(party::create_customer),
        )
        .route("/customers/:id", get(party::get_customer))
        .route(
            "/customers/:id/payments",
            get(party::customer_payments).post(party::customer_payment),
        )
        .route(
            "/customers/:id/balance-audit",
            get(party::customer_balance_audit),
        )
        .route(
            "/suppliers",
            get(party::list_suppliers).post(party::create_supplier),
        )
        .route("/suppliers/:id", get(party::get_supplier))
        .route(
            "/suppliers/:id/payments",
            get(party::supplier_payments).post(party::supplier_payment),
        )
        .route(
            "/suppliers/:id/balance-audit",
            get(party::supplier_balance_audit),
        )
        .route("/debts", get(debts::debts_overview))
        // Reporting and store
        .route("/reports", get(report::get_report))
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
