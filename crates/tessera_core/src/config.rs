use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TesseraConfig {
    pub llm: LlmConfig,
    pub analysis: AnalysisConfig,
    pub summary: SummaryConfig,
    pub store: StoreConfig,
}

impl TesseraConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: TesseraConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TESSERA_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("TESSERA_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("TESSERA_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("TESSERA_REQUEST_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.llm.request_timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("TESSERA_DEBOUNCE_SECS") {
            if let Ok(n) = v.parse() {
                self.analysis.debounce_window_secs = n;
            }
        }
        if let Ok(v) = std::env::var("TESSERA_DB_PATH") {
            self.store.db_path = v;
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "gemini" or "mock".
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Explicit request timeout; transport defaults are never relied on.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-1.5-flash".to_string(),
            base_url: None,
            max_tokens: 2048,
            temperature: 0.2,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// How long an analysis attempt marker suppresses duplicates.
    /// The source history never settled on a constant, so it is a
    /// parameter here.
    pub debounce_window_secs: u64,
    pub retry: RetryConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            debounce_window_secs: 120,
            retry: RetryConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_secs(self.debounce_window_secs)
    }
}

/// Bounded exponential backoff for transient extraction failures.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_factor: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Cap on how many pattern rows are rendered into one summary prompt.
    pub max_patterns_per_request: usize,
    /// How many dominant pattern labels to keep alongside the narrative.
    pub dominant_label_count: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            max_patterns_per_request: 50,
            dominant_label_count: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: "tessera.db".to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
