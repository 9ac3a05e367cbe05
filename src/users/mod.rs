pub mod error;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod service;

pub use error::UserError;
pub use password::{hash_password, verify_password};
pub use repo::{IdentityStore, MemoryIdentityStore, PgIdentityStore};
pub use repo_types::{User, UserRecord};
pub use service::UserService;
