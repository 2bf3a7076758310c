pub mod session;

pub use session::{
    rounded_minutes, validation, ActivityType, Language, Session, SessionCommit, SessionCreate,
    SessionDraft, SessionUpdate,
};
