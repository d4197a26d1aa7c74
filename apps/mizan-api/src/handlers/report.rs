//! Dashboard and report figures.
//!
//! The database hands over one consistent snapshot, bounded to the report's
//! window; all aggregation runs in [`mizan_core::report::build_report`]
//! against the store's local calendar.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use mizan_core::report::{build_report, window_start, Report, ReportOptions, ReportRange};
use mizan_core::Resource;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::state::AppState;

const MAX_TOP_N: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub range: ReportRange,
    pub top: Option<usize>,
}

pub async fn get_report(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Json<Report>> {
    user.require(Resource::Reports)?;

    let now = Utc::now();
    let offset = state.config.utc_offset();
    let snapshot = state
        .db
        .reports()
        .snapshot(window_start(now, offset, query.range))
        .await?;
    let options = ReportOptions {
        now,
        offset,
        range: query.range,
        top_n: query
            .top
            .unwrap_or(state.config.report_top_n)
            .clamp(1, MAX_TOP_N),
    };

    let report = build_report(&snapshot.input(), &options);

    tracing::debug!(
        range = %query.range,
        invoices = snapshot.invoices.len(),
        total_sales_cents = report.total_sales_cents,
        "Report built"
    );

    Ok(Json(report))
}
