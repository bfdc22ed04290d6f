pub mod analysis;
pub mod client;
pub mod error;
pub mod prompts;
pub mod providers;
pub mod retry;

pub use analysis::{analyze_entry_text, parse_entry_analysis, summarize_day, EntryAnalysis, RawCascade, RawPattern};
pub use client::{GenerationParams, GenerativeClient};
pub use error::ExtractError;
pub use providers::{GeminiClient, MockClient};
