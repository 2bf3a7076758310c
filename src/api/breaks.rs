use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use log::error;

use crate::breaks::{BreakState, BreakSummary, PresetInfo, PRESETS};
use crate::timer::BreakSettingsUpdate;

use super::{auth::AuthUser, ApiResponse, ApiResult, AppState};

pub async fn start_break(AuthUser(user): AuthUser, State(state): State<AppState>) -> ApiResult<BreakState> {
    let controller = state.timers.controller(&user).await;
    Ok(ApiResponse::ok(controller.start_break().await?))
}

pub async fn stop_break(AuthUser(user): AuthUser, State(state): State<AppState>) -> ApiResult<BreakSummary> {
    let controller = state.timers.controller(&user).await;
    Ok(ApiResponse::ok(controller.stop_break().await?))
}

/// Applies the settings to the live scheduler and saves them for next time.
/// The live change stands even if saving fails; the failure is only logged.
pub async fn update_settings(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<BreakSettingsUpdate>, JsonRejection>,
) -> ApiResult<BreakState> {
    let Json(update) = payload?;
    let controller = state.timers.controller(&user).await;
    let breaks = controller.update_break_settings(update).await?;
    if let Err(err) = state.timers.preferences().update(&user, breaks.preferences()) {
        error!("Failed to save break preferences for user {user}: {err:#}");
    }
    Ok(ApiResponse::ok(breaks))
}

pub async fn list_presets(_user: AuthUser) -> ApiResult<&'static [PresetInfo]> {
    let presets: &'static [PresetInfo] = &PRESETS;
    Ok(ApiResponse::ok(presets))
}
