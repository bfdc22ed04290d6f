pub mod config;
pub mod events;
pub mod records;

pub use config::{AnalysisConfig, LlmConfig, RetryConfig, StoreConfig, SummaryConfig, TesseraConfig};
pub use events::{EventBus, PipelineEvent};
pub use records::{ExtractedPattern, JournalEntry, PatternCascade, PatternCategory};
