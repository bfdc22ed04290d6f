pub mod coordinator;
pub mod debounce;
pub mod materialize;
pub mod stats;
pub mod summary;

pub use coordinator::{AnalysisCoordinator, AnalysisError, AnalysisReport};
pub use debounce::DebounceGuard;
pub use materialize::{materialize, PatternBatch};
pub use summary::{dominant_labels, CachedSummary, DailySummaryCache};
