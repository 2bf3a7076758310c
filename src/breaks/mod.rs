pub mod presets;
pub mod state;

pub use presets::{BreakKind, PomodoroPreset, PresetInfo, PRESETS};
pub use state::{BreakPreferences, BreakReminder, BreakState, BreakSummary};
