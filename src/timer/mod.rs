pub mod controller;
pub mod events;
pub mod registry;
pub mod state;

pub use controller::{
    BreakSettingsUpdate, CommitOutcome, ControllerOptions, RetryPolicy, StopReport,
    TimerController, TimerFieldsUpdate, TimerSnapshot, TimerView,
};
pub use events::TimerEvent;
pub use registry::TimerRegistry;
pub use state::{TimerError, TimerState, TimerStatus, TransitionError};
