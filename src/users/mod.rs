pub mod dto;
pub mod memory;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use dto::{PublicUser, ReceivedMessage, RegisterUser, RegisteredUser, SentMessage, UserDetail};
pub use memory::InMemoryUserStore;
pub use repo::{PgUserStore, UserStore};
