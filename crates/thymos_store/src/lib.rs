pub mod sqlite;

pub use sqlite::SlotClaim;
pub use sqlite::SqliteStore;
