pub mod error;
pub mod sqlite;

pub use error::StoreError;
pub use sqlite::{EntryAnalysisUpdate, SqliteStore};

#[cfg(test)]
mod tests;
