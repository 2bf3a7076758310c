//! HTTP surface.
//!
//! Every route except `/health` requires the identity header configured in
//! [`Config::user_header`](crate::config::Config).

mod auth;
mod breaks;
pub mod error;
mod health;
mod sessions;
mod timer;
mod trace;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{middleware, Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::sessions::SessionService;
use crate::timer::TimerRegistry;

pub use auth::AuthUser;
pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub service: SessionService,
    pub timers: Arc<TimerRegistry>,
    pub user_header: Arc<str>,
    /// Cancelled when the server starts draining; ends open event streams.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service: SessionService, timers: Arc<TimerRegistry>, user_header: &str) -> Self {
        Self {
            service,
            timers,
            user_header: Arc::from(user_header.to_ascii_lowercase()),
            shutdown: CancellationToken::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::get_health))
        .route(
            "/sessions",
            post(sessions::create_session).get(sessions::list_sessions),
        )
        .route("/sessions/active", get(sessions::active_session))
        .route("/sessions/today", get(sessions::today_sessions))
        .route(
            "/sessions/{id}",
            get(sessions::get_session)
                .patch(sessions::update_session)
                .delete(sessions::delete_session),
        )
        .route("/sessions/{id}/end", post(sessions::end_session))
        .route("/timer", get(timer::get_timer).patch(timer::update_timer))
        .route("/timer/start", post(timer::start_timer))
        .route("/timer/pause", post(timer::pause_timer))
        .route("/timer/resume", post(timer::resume_timer))
        .route("/timer/stop", post(timer::stop_timer))
        .route("/timer/discard", post(timer::discard_timer))
        .route("/timer/flush", post(timer::flush_timer))
        .route("/timer/events", get(timer::timer_events))
        .route("/breaks/start", post(breaks::start_break))
        .route("/breaks/stop", post(breaks::stop_break))
        .route("/breaks/settings", put(breaks::update_settings))
        .route("/breaks/presets", get(breaks::list_presets))
        .layer(middleware::from_fn(trace::log_requests))
        .with_state(state)
}
