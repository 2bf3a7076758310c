use serde::{Deserialize, Serialize};

use crate::db::models::validation::ValidationError;

/// Work interval presets, carried on the wire as their length in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "u32", into = "u32")]
pub enum PomodoroPreset {
    #[default]
    Classic,
    Extended,
    DeepWork,
}

impl PomodoroPreset {
    pub fn minutes(self) -> u32 {
        self.info().work_minutes
    }

    pub fn info(self) -> &'static PresetInfo {
        match self {
            PomodoroPreset::Classic => &PRESETS[0],
            PomodoroPreset::Extended => &PRESETS[1],
            PomodoroPreset::DeepWork => &PRESETS[2],
        }
    }
}

impl TryFrom<u32> for PomodoroPreset {
    type Error = ValidationError;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        match minutes {
            25 => Ok(PomodoroPreset::Classic),
            50 => Ok(PomodoroPreset::Extended),
            90 => Ok(PomodoroPreset::DeepWork),
            other => Err(ValidationError::UnknownValue {
                field: "preset",
                value: other.to_string(),
            }),
        }
    }
}

impl From<PomodoroPreset> for u32 {
    fn from(preset: PomodoroPreset) -> Self {
        preset.minutes()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetInfo {
    pub name: &'static str,
    pub work_minutes: u32,
    pub break_minutes: u32,
    pub long_break_minutes: u32,
    pub sessions_before_long_break: u32,
}

pub static PRESETS: [PresetInfo; 3] = [
    PresetInfo {
        name: "Classic Pomodoro",
        work_minutes: 25,
        break_minutes: 5,
        long_break_minutes: 15,
        sessions_before_long_break: 4,
    },
    PresetInfo {
        name: "Extended Focus",
        work_minutes: 50,
        break_minutes: 10,
        long_break_minutes: 20,
        sessions_before_long_break: 3,
    },
    PresetInfo {
        name: "Deep Work",
        work_minutes: 90,
        break_minutes: 15,
        long_break_minutes: 30,
        sessions_before_long_break: 2,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Short,
    Medium,
    Long,
}

impl BreakKind {
    /// Classifies a finished break by how long it lasted.
    pub fn from_seconds(seconds: u64) -> Self {
        match seconds {
            s if s < 10 * 60 => BreakKind::Short,
            s if s < 20 * 60 => BreakKind::Medium,
            _ => BreakKind::Long,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_travel_as_minutes() {
        assert_eq!(serde_json::to_string(&PomodoroPreset::Extended).unwrap(), "50");
        assert_eq!(
            serde_json::from_str::<PomodoroPreset>("90").unwrap(),
            PomodoroPreset::DeepWork
        );
        assert!(serde_json::from_str::<PomodoroPreset>("30").is_err());
    }

    #[test]
    fn catalogue_matches_preset_lengths() {
        for preset in [
            PomodoroPreset::Classic,
            PomodoroPreset::Extended,
            PomodoroPreset::DeepWork,
        ] {
            assert_eq!(u32::from(preset), preset.info().work_minutes);
        }
    }

    #[test]
    fn break_kind_thresholds() {
        assert_eq!(BreakKind::from_seconds(0), BreakKind::Short);
        assert_eq!(BreakKind::from_seconds(599), BreakKind::Short);
        assert_eq!(BreakKind::from_seconds(600), BreakKind::Medium);
        assert_eq!(BreakKind::from_seconds(1200), BreakKind::Long);
    }
}
