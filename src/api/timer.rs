use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use log::warn;
use serde_json::{json, Value};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::{Stream, StreamExt};

use crate::db::SessionCreate;
use crate::timer::{StopReport, TimerEvent, TimerFieldsUpdate, TimerSnapshot, TimerView};

use super::{auth::AuthUser, ApiResponse, ApiResult, AppState};

pub async fn get_timer(AuthUser(user): AuthUser, State(state): State<AppState>) -> ApiResult<TimerSnapshot> {
    let controller = state.timers.controller(&user).await;
    Ok(ApiResponse::ok(controller.get_snapshot().await))
}

pub async fn start_timer(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<SessionCreate>, JsonRejection>,
) -> ApiResult<TimerView> {
    let Json(body) = payload?;
    let controller = state.timers.controller(&user).await;
    Ok(ApiResponse::ok(controller.start(body).await?.into()))
}

pub async fn pause_timer(AuthUser(user): AuthUser, State(state): State<AppState>) -> ApiResult<TimerView> {
    let controller = state.timers.controller(&user).await;
    Ok(ApiResponse::ok(controller.pause().await?.into()))
}

pub async fn resume_timer(AuthUser(user): AuthUser, State(state): State<AppState>) -> ApiResult<TimerView> {
    let controller = state.timers.controller(&user).await;
    Ok(ApiResponse::ok(controller.resume().await?.into()))
}

pub async fn update_timer(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<TimerFieldsUpdate>, JsonRejection>,
) -> ApiResult<TimerView> {
    let Json(update) = payload?;
    let controller = state.timers.controller(&user).await;
    Ok(ApiResponse::ok(controller.update_fields(update).await?.into()))
}

pub async fn stop_timer(AuthUser(user): AuthUser, State(state): State<AppState>) -> ApiResult<StopReport> {
    let controller = state.timers.controller(&user).await;
    Ok(ApiResponse::ok(controller.stop().await?))
}

pub async fn discard_timer(AuthUser(user): AuthUser, State(state): State<AppState>) -> ApiResult<TimerView> {
    let controller = state.timers.controller(&user).await;
    Ok(ApiResponse::ok(controller.discard().await?.into()))
}

pub async fn flush_timer(AuthUser(user): AuthUser, State(state): State<AppState>) -> ApiResult<Value> {
    let controller = state.timers.controller(&user).await;
    let pending = controller.flush_pending().await;
    Ok(ApiResponse::ok(json!({ "pendingCommits": pending })))
}

/// Streams the caller's timer events, starting with the current state. The
/// stream ends when the server begins shutting down.
pub async fn timer_events(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let controller = state.timers.controller(&user).await;
    let receiver = controller.subscribe();
    let current = TimerEvent::StateChanged {
        timer: controller.get_state().await.into(),
    };

    let stream = tokio_stream::once(Ok(current))
        .chain(BroadcastStream::new(receiver))
        .filter_map(move |item| match item {
            Ok(event) => match Event::default().event(event.name()).json_data(&event) {
                Ok(sse) => Some(Ok(sse)),
                Err(err) => {
                    warn!("Dropping unserializable timer event: {err}");
                    None
                }
            },
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!("Event stream for user {user} lagged, {skipped} event(s) skipped");
                None
            }
        });

    let stream = futures::StreamExt::take_until(stream, state.shutdown.clone().cancelled_owned());

    Sse::new(stream).keep_alive(KeepAlive::default())
}
