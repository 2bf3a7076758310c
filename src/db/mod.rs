mod connection;
pub mod helpers;
mod migrations;
pub mod models;
pub mod repositories;

pub use connection::{Database, IN_MEMORY_PATH};
pub use models::{
    ActivityType, Language, Session, SessionCommit, SessionCreate, SessionDraft, SessionUpdate,
};
