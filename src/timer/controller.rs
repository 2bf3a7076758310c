use std::{collections::VecDeque, sync::Arc, time::Duration};

use chrono::Utc;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::breaks::{BreakReminder, BreakState, BreakSummary, PomodoroPreset};
use crate::db::{
    models::validation::ValidationError, ActivityType, Language, Session, SessionCommit,
    SessionCreate,
};
use crate::sessions::{ServiceError, SessionService};

use super::{TimerError, TimerEvent, TimerState, TransitionError};

// Set to true to log every ticker start and exit
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total store attempts per commit, including the first.
    pub attempts: u32,
    /// Delay before the second attempt; doubles for each further attempt.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    /// Period of the internal ticker. `None` leaves ticking to the caller.
    pub tick_interval: Option<Duration>,
    pub retry: RetryPolicy,
    pub event_capacity: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            tick_interval: Some(Duration::from_secs(1)),
            retry: RetryPolicy::default(),
            event_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    #[serde(flatten)]
    pub state: TimerState,
    pub is_active: bool,
    pub is_paused: bool,
}

impl From<TimerState> for TimerView {
    fn from(state: TimerState) -> Self {
        Self {
            is_active: state.is_active(),
            is_paused: state.is_paused(),
            state,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub timer: TimerView,
    pub breaks: BreakState,
    pub pending_commits: usize,
}

/// Field edits for the live session; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerFieldsUpdate {
    pub project_name: Option<String>,
    pub language: Option<Language>,
    pub activity_type: Option<ActivityType>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakSettingsUpdate {
    pub interval: Option<u32>,
    pub preset: Option<PomodoroPreset>,
    pub reminders_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CommitOutcome {
    Saved { session: Session },
    /// Every attempt failed; the commit waits in the pending queue.
    Queued { error: String, pending: usize },
    /// The store refused the commit as invalid; retrying cannot help.
    Rejected { error: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopReport {
    pub elapsed_seconds: u64,
    pub duration_minutes: u64,
    pub outcome: CommitOutcome,
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Owns one user's session timer and break scheduler.
///
/// Lock order is `state` before `breaks`, then `pending`; the ticker slot is
/// never locked while `state` or `breaks` is held by the same task.
#[derive(Clone)]
pub struct TimerController {
    user_id: Arc<str>,
    state: Arc<Mutex<TimerState>>,
    breaks: Arc<Mutex<BreakState>>,
    pending: Arc<Mutex<VecDeque<SessionCommit>>>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    service: SessionService,
    options: ControllerOptions,
    events: broadcast::Sender<TimerEvent>,
}

impl TimerController {
    pub fn new(
        user_id: &str,
        service: SessionService,
        breaks: BreakState,
        options: ControllerOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        Self {
            user_id: Arc::from(user_id),
            state: Arc::new(Mutex::new(TimerState::new())),
            breaks: Arc::new(Mutex::new(breaks)),
            pending: Arc::new(Mutex::new(VecDeque::new())),
            ticker: Arc::new(Mutex::new(None)),
            service,
            options,
            events,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub async fn get_state(&self) -> TimerState {
        self.state.lock().await.clone()
    }

    pub async fn get_breaks(&self) -> BreakState {
        self.breaks.lock().await.clone()
    }

    pub async fn pending_commits(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        let timer = self.get_state().await;
        let breaks = self.get_breaks().await;
        TimerSnapshot {
            timer: timer.into(),
            breaks,
            pending_commits: self.pending_commits().await,
        }
    }

    pub async fn start(&self, request: SessionCreate) -> Result<TimerState, TimerError> {
        let draft = request.validate()?;
        let state = {
            let mut state = self.state.lock().await;
            state.start(draft, Utc::now())?;
            state.clone()
        };
        self.breaks.lock().await.reset_schedule();

        info!(
            "Timer started for user {} on project {}",
            self.user_id, state.project_name
        );
        self.ensure_ticker().await;
        self.emit(TimerEvent::StateChanged {
            timer: state.clone().into(),
        });
        Ok(state)
    }

    pub async fn pause(&self) -> Result<TimerState, TransitionError> {
        self.transition(TimerState::pause).await
    }

    pub async fn resume(&self) -> Result<TimerState, TransitionError> {
        self.transition(TimerState::resume).await
    }

    pub async fn discard(&self) -> Result<TimerState, TransitionError> {
        self.transition(TimerState::discard).await
    }

    async fn transition(
        &self,
        command: fn(&mut TimerState) -> Result<(), TransitionError>,
    ) -> Result<TimerState, TransitionError> {
        let state = {
            let mut state = self.state.lock().await;
            command(&mut state)?;
            state.clone()
        };
        self.emit(TimerEvent::StateChanged {
            timer: state.clone().into(),
        });
        Ok(state)
    }

    /// Applies every field edit or none of them.
    pub async fn update_fields(&self, update: TimerFieldsUpdate) -> Result<TimerState, ValidationError> {
        let state = {
            let mut guard = self.state.lock().await;
            let mut next = guard.clone();
            if let Some(name) = update.project_name {
                next.set_project_name(name)?;
            }
            if let Some(language) = update.language {
                next.set_language(language);
            }
            if let Some(activity_type) = update.activity_type {
                next.set_activity_type(activity_type);
            }
            if let Some(notes) = update.notes {
                next.set_notes(notes)?;
            }
            *guard = next;
            guard.clone()
        };
        self.emit(TimerEvent::StateChanged {
            timer: state.clone().into(),
        });
        Ok(state)
    }

    /// One second of wall time: advances the session timer and the break
    /// timer, then checks the reminder schedule against the new elapsed time.
    pub async fn tick(&self) -> Option<BreakReminder> {
        self.tick_once().await.0
    }

    /// Returns the reminder that fired, if any, and whether either machine is
    /// still active.
    async fn tick_once(&self) -> (Option<BreakReminder>, bool) {
        let mut state = self.state.lock().await;
        let mut breaks = self.breaks.lock().await;

        let counted = state.tick();
        breaks.tick_break();
        let reminder = if counted {
            breaks.poll_reminder(state.elapsed_seconds)
        } else {
            None
        };
        let active = state.is_active() || breaks.is_break_active;
        drop(breaks);
        drop(state);

        if let Some(reminder) = &reminder {
            info!(
                "Break reminder for user {} at {}s ({:?} break suggested)",
                self.user_id, reminder.elapsed_seconds, reminder.suggested
            );
            self.emit(TimerEvent::Reminder(reminder.clone()));
        }
        (reminder, active)
    }

    /// Ends the session. The timer is back to idle before this returns,
    /// whatever happens to the commit; the report says whether the session
    /// was stored or queued for a later retry.
    pub async fn stop(&self) -> Result<StopReport, TransitionError> {
        let commit = {
            let mut state = self.state.lock().await;
            let commit = state.stop(Utc::now())?;
            self.emit(TimerEvent::StateChanged {
                timer: state.clone().into(),
            });
            commit
        };

        info!(
            "Timer stopped for user {} after {}s",
            self.user_id, commit.elapsed_seconds
        );

        let remaining = self.flush_pending().await;
        if remaining > 0 {
            warn!(
                "{} earlier session(s) for user {} still waiting to be stored",
                remaining, self.user_id
            );
        }

        let elapsed_seconds = commit.elapsed_seconds;
        let duration_minutes = commit.duration_minutes;
        let outcome = match self.commit_with_retry(&commit).await {
            Ok(session) => {
                self.emit(TimerEvent::Committed {
                    session: session.clone(),
                });
                CommitOutcome::Saved { session }
            }
            Err(ServiceError::Validation(err)) => {
                error!("Dropping invalid session commit for user {}: {err}", self.user_id);
                CommitOutcome::Rejected {
                    error: err.to_string(),
                }
            }
            Err(err) => {
                let error = err.to_string();
                let pending = {
                    let mut queue = self.pending.lock().await;
                    queue.push_back(commit);
                    queue.len()
                };
                error!(
                    "Failed to store session for user {}; queued ({pending} pending): {error}",
                    self.user_id
                );
                self.emit(TimerEvent::CommitFailed {
                    error: error.clone(),
                    pending,
                });
                CommitOutcome::Queued { error, pending }
            }
        };

        Ok(StopReport {
            elapsed_seconds,
            duration_minutes,
            outcome,
        })
    }

    /// Retries queued commits in order, stopping at the first failure.
    /// Returns how many are still queued.
    pub async fn flush_pending(&self) -> usize {
        let mut queue = self.pending.lock().await;
        while let Some(commit) = queue.front().cloned() {
            match self.service.record_session(&self.user_id, commit).await {
                Ok(session) => {
                    queue.pop_front();
                    info!("Stored queued session {} for user {}", session.id, self.user_id);
                    self.emit(TimerEvent::Committed { session });
                }
                Err(ServiceError::Validation(err)) => {
                    queue.pop_front();
                    error!("Dropping invalid queued commit for user {}: {err}", self.user_id);
                }
                Err(err) => {
                    warn!("Queued session for user {} still not stored: {err}", self.user_id);
                    break;
                }
            }
        }
        queue.len()
    }

    async fn commit_with_retry(&self, commit: &SessionCommit) -> Result<Session, ServiceError> {
        let retry = self.options.retry;
        let mut attempt: u32 = 1;
        loop {
            match self.service.record_session(&self.user_id, commit.clone()).await {
                Ok(session) => return Ok(session),
                Err(err @ ServiceError::Validation(_)) => return Err(err),
                Err(err) if attempt >= retry.attempts.max(1) => return Err(err),
                Err(err) => {
                    let delay = retry.backoff.saturating_mul(1 << (attempt - 1).min(16));
                    warn!(
                        "Storing session for user {} failed (attempt {attempt}), retrying in {:?}: {err}",
                        self.user_id, delay
                    );
                    time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn start_break(&self) -> Result<BreakState, TransitionError> {
        let breaks = {
            let mut breaks = self.breaks.lock().await;
            breaks.start_break(Utc::now())?;
            breaks.clone()
        };
        self.ensure_ticker().await;
        self.emit(TimerEvent::BreakChanged {
            breaks: breaks.clone(),
            finished: None,
        });
        Ok(breaks)
    }

    pub async fn stop_break(&self) -> Result<BreakSummary, TransitionError> {
        let (breaks, summary) = {
            let mut breaks = self.breaks.lock().await;
            let summary = breaks.stop_break(Utc::now())?;
            (breaks.clone(), summary)
        };
        self.emit(TimerEvent::BreakChanged {
            breaks,
            finished: Some(summary.clone()),
        });
        Ok(summary)
    }

    /// Applies every setting or none of them.
    pub async fn update_break_settings(
        &self,
        update: BreakSettingsUpdate,
    ) -> Result<BreakState, ValidationError> {
        let breaks = {
            let mut guard = self.breaks.lock().await;
            let mut next = guard.clone();
            if let Some(preset) = update.preset {
                next.set_preset(preset);
            }
            if let Some(minutes) = update.interval {
                next.set_interval(minutes)?;
            }
            if let Some(enabled) = update.reminders_enabled {
                next.set_reminders_enabled(enabled);
            }
            *guard = next;
            guard.clone()
        };
        self.emit(TimerEvent::BreakChanged {
            breaks: breaks.clone(),
            finished: None,
        });
        Ok(breaks)
    }

    /// Stops the internal ticker, if one is running.
    pub async fn shutdown(&self) {
        let ticker = self.ticker.lock().await.take();
        if let Some(ticker) = ticker {
            ticker.cancel.cancel();
            if let Err(err) = ticker.handle.await {
                log_error!("ticker task for user {} failed to join: {err}", self.user_id);
            }
        }
    }

    async fn ensure_ticker(&self) {
        let Some(period) = self.options.tick_interval else {
            return;
        };

        let mut slot = self.ticker.lock().await;
        if slot.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(ticker_loop(self.clone(), period, cancel.clone()));
        *slot = Some(Ticker { handle, cancel });
    }

    /// Called by the ticker when a tick found nothing active. Clears the
    /// ticker slot unless a command re-activated a machine in the meantime.
    async fn release_ticker_if_idle(&self) -> bool {
        let mut slot = self.ticker.lock().await;
        let active = {
            let state = self.state.lock().await;
            let breaks = self.breaks.lock().await;
            state.is_active() || breaks.is_break_active
        };
        if active {
            return false;
        }
        slot.take();
        true
    }

    fn emit(&self, event: TimerEvent) {
        // No subscribers is the common case, not an error.
        let _ = self.events.send(event);
    }
}

async fn ticker_loop(controller: TimerController, period: Duration, cancel: CancellationToken) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
    // The first tick completes immediately.
    interval.tick().await;

    log_info!("ticker started for user {}", controller.user_id);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let (_, active) = controller.tick_once().await;
                if !active && controller.release_ticker_if_idle().await {
                    log_info!("ticker idle, exiting for user {}", controller.user_id);
                    break;
                }
            }
            _ = cancel.cancelled() => {
                log_warn!("ticker cancelled for user {}", controller.user_id);
                break;
            }
        }
    }
}
