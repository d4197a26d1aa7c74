use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use mizan_core::{Product, Resource};
use mizan_db::{NewProduct, ProductUpdate};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

pub async fn list_products(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    user.require(Resource::Products)?;
    Ok(Json(state.db.products().list(query.include_inactive).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Product>> {
    user.require(Resource::Products)?;

    state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product", &id))
}

pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    user.require(Resource::Products)?;
    input.validate()?;

    let product = state.db.products().create(&input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Catalog fields only. Quantity moves through invoices.
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(changes): ApiJson<ProductUpdate>,
) -> ApiResult<Json<Product>> {
    user.require(Resource::Products)?;
    changes.validate()?;

    Ok(Json(state.db.products().update(&id, &changes).await?))
}

/// Products at or under their reorder threshold.
pub async fn low_stock(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Product>>> {
    user.require(Resource::Products)?;
    Ok(Json(state.db.products().low_stock().await?))
}
