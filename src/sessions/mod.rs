pub mod service;
pub mod store;

pub use service::{ServiceError, SessionService};
pub use store::SessionStore;
