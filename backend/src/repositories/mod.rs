pub mod blob;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod session;
pub mod token;
pub mod user;

pub use blob::{Blob, BlobStore, PgBlobStore};
pub use session::{PgSessionRepository, SessionRepository};
pub use token::{PgTokenStore, TokenStore};
pub use user::{PgUserRepository, UserRepository};
