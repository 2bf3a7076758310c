use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::{
    rounded_minutes,
    validation::{validate_notes, validate_project_name, ValidationError},
    ActivityType, Language, SessionCommit, SessionDraft,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
}

impl TimerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
        }
    }
}

/// A command that is not valid in the machine's current state. The state is
/// left untouched when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {command} while {state}")]
pub struct TransitionError {
    pub command: &'static str,
    pub state: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// The live session before it is committed as a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub status: TimerStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub elapsed_seconds: u64,
    pub project_name: String,
    pub language: Language,
    pub activity_type: ActivityType,
    pub notes: String,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            status: TimerStatus::Idle,
            start_time: None,
            elapsed_seconds: 0,
            project_name: String::new(),
            language: Language::Typescript,
            activity_type: ActivityType::Coding,
            notes: String::new(),
        }
    }
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.status != TimerStatus::Idle
    }

    pub fn is_paused(&self) -> bool {
        self.status == TimerStatus::Paused
    }

    fn reject(&self, command: &'static str) -> TransitionError {
        TransitionError {
            command,
            state: self.status.as_str(),
        }
    }

    pub fn start(&mut self, draft: SessionDraft, now: DateTime<Utc>) -> Result<(), TimerError> {
        if self.status != TimerStatus::Idle {
            return Err(self.reject("start").into());
        }
        draft.validate()?;

        *self = Self {
            status: TimerStatus::Running,
            start_time: Some(now),
            elapsed_seconds: 0,
            project_name: draft.project_name,
            language: draft.language,
            activity_type: draft.activity_type,
            notes: draft.notes.unwrap_or_default(),
        };
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), TransitionError> {
        if self.status != TimerStatus::Running {
            return Err(self.reject("pause"));
        }
        self.status = TimerStatus::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), TransitionError> {
        if self.status != TimerStatus::Paused {
            return Err(self.reject("resume"));
        }
        self.status = TimerStatus::Running;
        Ok(())
    }

    /// Advances elapsed time by one second while running. Returns whether the
    /// tick counted.
    pub fn tick(&mut self) -> bool {
        if self.status == TimerStatus::Running {
            self.elapsed_seconds += 1;
            true
        } else {
            false
        }
    }

    /// Ends the session and resets to idle, handing back what must be stored.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<SessionCommit, TransitionError> {
        if self.status == TimerStatus::Idle {
            return Err(self.reject("stop"));
        }

        let finished = std::mem::take(self);
        let elapsed_seconds = finished.elapsed_seconds;
        Ok(SessionCommit {
            start_time: finished.start_time.unwrap_or(now),
            end_time: now,
            elapsed_seconds,
            duration_minutes: rounded_minutes(elapsed_seconds),
            draft: finished.into_draft(),
        })
    }

    /// Drops the in-progress session without producing a commit.
    pub fn discard(&mut self) -> Result<(), TransitionError> {
        if self.status == TimerStatus::Idle {
            return Err(self.reject("discard"));
        }
        *self = Self::default();
        Ok(())
    }

    pub fn set_project_name(&mut self, name: String) -> Result<(), ValidationError> {
        validate_project_name(&name)?;
        self.project_name = name;
        Ok(())
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn set_activity_type(&mut self, activity_type: ActivityType) {
        self.activity_type = activity_type;
    }

    pub fn set_notes(&mut self, notes: String) -> Result<(), ValidationError> {
        validate_notes(&notes)?;
        self.notes = notes;
        Ok(())
    }

    fn into_draft(self) -> SessionDraft {
        SessionDraft {
            project_name: self.project_name,
            language: self.language,
            activity_type: self.activity_type,
            notes: Some(self.notes).filter(|notes| !notes.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> SessionDraft {
        SessionDraft {
            project_name: "Demo".into(),
            language: Language::Python,
            activity_type: ActivityType::Coding,
            notes: None,
        }
    }

    fn running() -> TimerState {
        let mut state = TimerState::new();
        state.start(demo(), Utc::now()).unwrap();
        state
    }

    #[test]
    fn ticks_count_only_while_running() {
        let mut state = TimerState::new();
        assert!(!state.tick());
        assert_eq!(state.elapsed_seconds, 0);

        state.start(demo(), Utc::now()).unwrap();
        for _ in 0..5 {
            assert!(state.tick());
        }
        assert_eq!(state.elapsed_seconds, 5);

        state.pause().unwrap();
        for _ in 0..10 {
            assert!(!state.tick());
        }
        assert_eq!(state.elapsed_seconds, 5);

        state.resume().unwrap();
        state.tick();
        assert_eq!(state.elapsed_seconds, 6);
    }

    #[test]
    fn sixty_ticks_commit_one_minute() {
        let mut state = running();
        for _ in 0..60 {
            state.tick();
        }
        assert_eq!(state.elapsed_seconds, 60);

        let commit = state.stop(Utc::now()).unwrap();
        assert_eq!(commit.duration_minutes, 1);
        assert_eq!(commit.elapsed_seconds, 60);
        assert_eq!(commit.draft, demo());
        assert_eq!(state, TimerState::default());
    }

    #[test]
    fn stop_rounds_half_minutes_up() {
        let mut state = running();
        state.elapsed_seconds = 90;
        assert_eq!(state.stop(Utc::now()).unwrap().duration_minutes, 2);

        let mut state = running();
        state.elapsed_seconds = 89;
        assert_eq!(state.stop(Utc::now()).unwrap().duration_minutes, 1);
    }

    #[test]
    fn stop_from_paused_resets_everything() {
        let mut state = running();
        state.tick();
        state.pause().unwrap();

        state.stop(Utc::now()).unwrap();
        assert_eq!(state.status, TimerStatus::Idle);
        assert_eq!(state.elapsed_seconds, 0);
        assert_eq!(state.project_name, "");
    }

    #[test]
    fn start_while_active_is_rejected_and_keeps_progress() {
        let mut state = running();
        state.tick();
        state.tick();

        let err = state.start(demo(), Utc::now()).unwrap_err();
        assert_eq!(
            err,
            TimerError::Transition(TransitionError {
                command: "start",
                state: "running",
            })
        );
        assert_eq!(state.elapsed_seconds, 2);

        state.pause().unwrap();
        assert!(state.start(demo(), Utc::now()).is_err());
    }

    #[test]
    fn invalid_transitions_are_reported() {
        let mut state = TimerState::new();
        assert_eq!(state.pause().unwrap_err().state, "idle");
        assert_eq!(state.resume().unwrap_err().command, "resume");
        assert!(state.stop(Utc::now()).is_err());
        assert!(state.discard().is_err());

        let mut state = running();
        assert!(state.resume().is_err());
        state.pause().unwrap();
        assert_eq!(state.pause().unwrap_err().state, "paused");
    }

    #[test]
    fn start_validates_draft() {
        let mut state = TimerState::new();
        let mut draft = demo();
        draft.project_name = String::new();
        assert_eq!(
            state.start(draft, Utc::now()),
            Err(TimerError::Validation(ValidationError::EmptyProjectName))
        );
        assert_eq!(state.status, TimerStatus::Idle);
    }

    #[test]
    fn setters_edit_the_live_snapshot() {
        let mut state = running();
        state.set_project_name("Renamed".into()).unwrap();
        state.set_language(Language::Go);
        state.set_activity_type(ActivityType::Review);
        state.set_notes("tidy up".into()).unwrap();
        assert!(state.set_notes("x".repeat(501)).is_err());
        assert!(state.set_project_name(" ".into()).is_err());
        assert!(state.set_project_name("p".repeat(201)).is_err());

        let commit = state.stop(Utc::now()).unwrap();
        assert_eq!(commit.draft.project_name, "Renamed");
        assert_eq!(commit.draft.language, Language::Go);
        assert_eq!(commit.draft.activity_type, ActivityType::Review);
        assert_eq!(commit.draft.notes.as_deref(), Some("tidy up"));
    }

    #[test]
    fn discard_drops_without_commit() {
        let mut state = running();
        state.tick();
        state.discard().unwrap();
        assert_eq!(state, TimerState::default());
    }
}
