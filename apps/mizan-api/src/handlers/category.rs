use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use mizan_core::{Category, Resource};
use mizan_db::NewCategory;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

pub async fn list_categories(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Category>>> {
    user.require(Resource::Categories)?;
    Ok(Json(state.db.categories().list().await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<NewCategory>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    user.require(Resource::Categories)?;
    input.validate()?;

    let category = state.db.categories().create(&input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}
