//! User directory for the messagely app: registration, credential checks,
//! login tracking and per-user message listings.

pub mod config;
pub mod db;
pub mod error;
pub mod password;
pub mod state;
pub mod telemetry;
pub mod users;

pub use error::{Result, UserError};
pub use users::services::UserDirectory;
