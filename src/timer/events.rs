use serde::Serialize;

use crate::breaks::{BreakReminder, BreakState, BreakSummary};
use crate::db::Session;

use super::TimerView;

/// Notifications published by a [`TimerController`](super::TimerController).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimerEvent {
    #[serde(rename_all = "camelCase")]
    StateChanged { timer: TimerView },
    Reminder(BreakReminder),
    #[serde(rename_all = "camelCase")]
    BreakChanged {
        breaks: BreakState,
        finished: Option<BreakSummary>,
    },
    Committed { session: Session },
    #[serde(rename_all = "camelCase")]
    CommitFailed { error: String, pending: usize },
}

impl TimerEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            TimerEvent::StateChanged { .. } => "state",
            TimerEvent::Reminder(_) => "reminder",
            TimerEvent::BreakChanged { .. } => "break",
            TimerEvent::Committed { .. } => "committed",
            TimerEvent::CommitFailed { .. } => "commitFailed",
        }
    }
}
