//! Claim store backends.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryClaimStore;
pub use sqlite::SqliteClaimStore;
