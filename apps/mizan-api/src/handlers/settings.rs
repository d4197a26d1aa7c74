use axum::extract::State;
use axum::Json;

use mizan_core::{Resource, StoreSettings};
use mizan_db::SettingsUpdate;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

pub async fn get_settings(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<StoreSettings>> {
    user.require(Resource::Settings)?;
    Ok(Json(state.db.settings().get().await?))
}

/// Partial update; omitted fields keep their value.
pub async fn update_settings(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(changes): ApiJson<SettingsUpdate>,
) -> ApiResult<Json<StoreSettings>> {
    user.require(Resource::Settings)?;
    changes.validate()?;

    Ok(Json(state.db.settings().update(&changes).await?))
}
