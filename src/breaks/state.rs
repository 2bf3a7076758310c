use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::validation::ValidationError;
use crate::timer::TransitionError;

use super::presets::{BreakKind, PomodoroPreset};

pub const MIN_INTERVAL_MINUTES: u32 = 1;
pub const MAX_INTERVAL_MINUTES: u32 = 480;

/// The persisted part of a user's break configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakPreferences {
    pub pomodoro_interval: u32,
    pub pomodoro_preset: PomodoroPreset,
    pub reminders_enabled: bool,
}

impl Default for BreakPreferences {
    fn default() -> Self {
        Self {
            pomodoro_interval: PomodoroPreset::Classic.minutes(),
            pomodoro_preset: PomodoroPreset::Classic,
            reminders_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakReminder {
    pub elapsed_seconds: u64,
    pub interval_minutes: u32,
    pub completed_pomodoros: u32,
    pub suggested: BreakKind,
    pub suggested_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakSummary {
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub kind: BreakKind,
}

/// Break timer plus the Pomodoro reminder schedule. Independent of the
/// session timer: it never pauses or resumes a session on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakState {
    pub is_break_active: bool,
    pub break_start_time: Option<DateTime<Utc>>,
    pub break_elapsed_seconds: u64,
    pub pomodoro_interval: u32,
    pub pomodoro_preset: PomodoroPreset,
    pub reminders_enabled: bool,
    pub last_break_time: Option<DateTime<Utc>>,
    /// Session elapsed second at which the next reminder fires. Derived
    /// lazily from the interval in force, so it is cleared on every change.
    pub next_reminder_at: Option<u64>,
    pub completed_pomodoros: u32,
}

impl Default for BreakState {
    fn default() -> Self {
        Self::from_preferences(BreakPreferences::default())
    }
}

impl BreakState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_preferences(prefs: BreakPreferences) -> Self {
        Self {
            is_break_active: false,
            break_start_time: None,
            break_elapsed_seconds: 0,
            pomodoro_interval: prefs.pomodoro_interval,
            pomodoro_preset: prefs.pomodoro_preset,
            reminders_enabled: prefs.reminders_enabled,
            last_break_time: None,
            next_reminder_at: None,
            completed_pomodoros: 0,
        }
    }

    pub fn preferences(&self) -> BreakPreferences {
        BreakPreferences {
            pomodoro_interval: self.pomodoro_interval,
            pomodoro_preset: self.pomodoro_preset,
            reminders_enabled: self.reminders_enabled,
        }
    }

    fn state_name(&self) -> &'static str {
        if self.is_break_active {
            "on break"
        } else {
            "idle"
        }
    }

    pub fn start_break(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.is_break_active {
            return Err(TransitionError {
                command: "start break",
                state: self.state_name(),
            });
        }
        self.is_break_active = true;
        self.break_start_time = Some(now);
        self.break_elapsed_seconds = 0;
        Ok(())
    }

    pub fn tick_break(&mut self) -> bool {
        if self.is_break_active {
            self.break_elapsed_seconds += 1;
            true
        } else {
            false
        }
    }

    pub fn stop_break(&mut self, now: DateTime<Utc>) -> Result<BreakSummary, TransitionError> {
        if !self.is_break_active {
            return Err(TransitionError {
                command: "stop break",
                state: self.state_name(),
            });
        }
        let summary = BreakSummary {
            started_at: self.break_start_time,
            ended_at: now,
            duration_seconds: self.break_elapsed_seconds,
            kind: BreakKind::from_seconds(self.break_elapsed_seconds),
        };
        self.is_break_active = false;
        self.break_start_time = None;
        self.break_elapsed_seconds = 0;
        self.last_break_time = Some(now);
        Ok(summary)
    }

    pub fn set_interval(&mut self, minutes: u32) -> Result<(), ValidationError> {
        if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&minutes) {
            return Err(ValidationError::OutOfRange {
                field: "interval",
                min: MIN_INTERVAL_MINUTES as u64,
                max: MAX_INTERVAL_MINUTES as u64,
            });
        }
        self.pomodoro_interval = minutes;
        self.next_reminder_at = None;
        Ok(())
    }

    pub fn set_preset(&mut self, preset: PomodoroPreset) {
        self.pomodoro_preset = preset;
        self.pomodoro_interval = preset.minutes();
        self.next_reminder_at = None;
    }

    pub fn set_reminders_enabled(&mut self, enabled: bool) {
        self.reminders_enabled = enabled;
        self.next_reminder_at = None;
    }

    /// Forgets the reminder schedule, for a fresh work session.
    pub fn reset_schedule(&mut self) {
        self.next_reminder_at = None;
        self.completed_pomodoros = 0;
    }

    fn interval_seconds(&self) -> u64 {
        u64::from(self.pomodoro_interval.max(MIN_INTERVAL_MINUTES)) * 60
    }

    /// Exact interval-boundary check: true only on the second that is a
    /// positive multiple of the interval.
    pub fn is_reminder_due(&self, session_elapsed_seconds: u64) -> bool {
        self.reminders_enabled
            && session_elapsed_seconds > 0
            && session_elapsed_seconds % self.interval_seconds() == 0
    }

    /// Deadline-based reminder check. Fires once when elapsed time reaches or
    /// passes the next interval boundary, then moves the deadline past the
    /// current time, so skipped or repeated seconds neither lose nor
    /// duplicate a reminder.
    pub fn poll_reminder(&mut self, session_elapsed_seconds: u64) -> Option<BreakReminder> {
        if !self.reminders_enabled {
            return None;
        }

        let interval = self.interval_seconds();
        let deadline = *self.next_reminder_at.get_or_insert_with(|| {
            let boundary = session_elapsed_seconds.div_ceil(interval) * interval;
            boundary.max(interval)
        });
        if session_elapsed_seconds < deadline {
            return None;
        }

        self.next_reminder_at = Some((session_elapsed_seconds / interval + 1) * interval);
        self.completed_pomodoros += 1;

        let info = self.pomodoro_preset.info();
        let long_due = self.completed_pomodoros % info.sessions_before_long_break == 0;
        let (suggested, suggested_minutes) = if long_due {
            (BreakKind::Long, info.long_break_minutes)
        } else {
            (BreakKind::Short, info.break_minutes)
        };

        Some(BreakReminder {
            elapsed_seconds: session_elapsed_seconds,
            interval_minutes: self.pomodoro_interval,
            completed_pomodoros: self.completed_pomodoros,
            suggested,
            suggested_minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulo_check_fires_on_interval_multiples() {
        let state = BreakState::new();
        assert!(!state.is_reminder_due(0));
        assert!(!state.is_reminder_due(1499));
        assert!(state.is_reminder_due(1500));
        assert!(!state.is_reminder_due(1501));
        assert!(state.is_reminder_due(3000));
    }

    #[test]
    fn disabled_reminders_never_fire() {
        let mut state = BreakState::new();
        state.set_reminders_enabled(false);
        assert!(!state.is_reminder_due(1500));
        assert!(state.poll_reminder(1500).is_none());
        assert!(state.poll_reminder(3000).is_none());
    }

    #[test]
    fn poll_fires_once_per_boundary() {
        let mut state = BreakState::new();
        let fired: Vec<u64> = (1..=3001)
            .filter(|t| state.poll_reminder(*t).is_some())
            .collect();
        assert_eq!(fired, vec![1500, 3000]);
    }

    #[test]
    fn poll_survives_skipped_seconds() {
        let mut state = BreakState::new();
        assert!(state.poll_reminder(1499).is_none());
        assert!(state.poll_reminder(1502).is_some());
        assert!(state.poll_reminder(1503).is_none());
        assert!(state.poll_reminder(1502).is_none());
        assert!(state.poll_reminder(3000).is_some());
    }

    #[test]
    fn preset_change_mid_session_uses_current_interval() {
        let mut state = BreakState::new();
        for t in 1..=1000 {
            assert!(state.poll_reminder(t).is_none());
        }
        state.set_preset(PomodoroPreset::Extended);
        assert_eq!(state.pomodoro_interval, 50);

        assert!(!state.is_reminder_due(1500));
        assert!(state.is_reminder_due(3000));

        let fired: Vec<u64> = (1001..=3000)
            .filter(|t| state.poll_reminder(*t).is_some())
            .collect();
        assert_eq!(fired, vec![3000]);
    }

    #[test]
    fn long_break_is_suggested_every_nth_pomodoro() {
        let mut state = BreakState::new();
        state.set_interval(1).unwrap();
        let kinds: Vec<BreakKind> = (1..=4)
            .map(|n| state.poll_reminder(n * 60).unwrap().suggested)
            .collect();
        assert_eq!(
            kinds,
            vec![
                BreakKind::Short,
                BreakKind::Short,
                BreakKind::Short,
                BreakKind::Long
            ]
        );

        state.reset_schedule();
        assert_eq!(state.completed_pomodoros, 0);
    }

    #[test]
    fn interval_bounds_are_enforced() {
        let mut state = BreakState::new();
        assert!(state.set_interval(0).is_err());
        assert!(state.set_interval(481).is_err());
        state.set_interval(45).unwrap();
        assert_eq!(state.pomodoro_interval, 45);
        assert_eq!(state.pomodoro_preset, PomodoroPreset::Classic);
    }

    #[test]
    fn break_lifecycle() {
        let mut state = BreakState::new();
        assert!(!state.tick_break());
        assert!(state.stop_break(Utc::now()).is_err());

        state.start_break(Utc::now()).unwrap();
        assert!(state.start_break(Utc::now()).is_err());
        for _ in 0..300 {
            state.tick_break();
        }
        assert_eq!(state.break_elapsed_seconds, 300);

        let now = Utc::now();
        let summary = state.stop_break(now).unwrap();
        assert_eq!(summary.duration_seconds, 300);
        assert_eq!(summary.kind, BreakKind::Short);
        assert!(!state.is_break_active);
        assert_eq!(state.break_elapsed_seconds, 0);
        assert_eq!(state.last_break_time, Some(now));
    }
}
