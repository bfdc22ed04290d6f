//! Analysis coordinator: drives the whole pipeline for one entry.
//! Debounce check, extraction call, materialization, transactional
//! commit, event broadcast.
//!
//! All dependencies are injected at construction; there is no ambient
//! global state. The extraction call is the only suspension point;
//! once the response arrives, materialization and the commit run
//! within the same cooperative task.

use crate::debounce::DebounceGuard;
use crate::materialize::materialize;
use crate::summary::{dominant_labels, CachedSummary, DailySummaryCache};
use chrono::NaiveDate;
use std::sync::Arc;
use tessera_core::{EventBus, PipelineEvent, SummaryConfig, TesseraConfig};
use tessera_extraction::{analyze_entry_text, summarize_day, ExtractError, GenerationParams, GenerativeClient};
use tessera_store::{EntryAnalysisUpdate, SqliteStore, StoreError};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("entry not found: {0}")]
    EntryNotFound(Uuid),

    /// Empty entries are rejected before any network call is made.
    #[error("entry has no content to analyze")]
    EmptyEntry,

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What one `analyze` call did.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisReport {
    Completed {
        pattern_count: usize,
        cascade_count: usize,
        dropped_cascades: usize,
    },
    /// Suppressed by the debounce guard; no network call was made.
    Skipped,
}

pub struct AnalysisCoordinator {
    store: SqliteStore,
    client: Arc<dyn GenerativeClient>,
    guard: DebounceGuard,
    events: EventBus,
    params: GenerationParams,
    summary_cfg: SummaryConfig,
    summaries: Mutex<DailySummaryCache>,
}

impl AnalysisCoordinator {
    pub fn new(
        store: SqliteStore,
        client: Arc<dyn GenerativeClient>,
        config: &TesseraConfig,
    ) -> Self {
        Self {
            store,
            client,
            guard: DebounceGuard::new(config.analysis.debounce_window()),
            events: EventBus::default(),
            params: GenerationParams::from_config(&config.llm),
            summary_cfg: config.summary.clone(),
            summaries: Mutex::new(DailySummaryCache::new()),
        }
    }

    /// Subscribe to pipeline events for display refresh.
    pub fn events(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // Entry analysis
    // ========================================================================

    /// Analyze one unanalyzed entry. A fresh debounce marker makes this
    /// a no-op (`AnalysisReport::Skipped`). On failure the entry stays
    /// unanalyzed and the marker is released so the user can retry at
    /// once.
    pub async fn analyze(&self, entry_id: Uuid) -> Result<AnalysisReport, AnalysisError> {
        if !self.guard.try_begin(entry_id).await {
            tracing::debug!("Analysis for {} suppressed by debounce guard", entry_id);
            self.events.emit(PipelineEvent::AnalysisSkipped { entry_id });
            return Ok(AnalysisReport::Skipped);
        }

        match self.run_analysis(entry_id).await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.guard.clear(entry_id).await;
                self.events.emit(PipelineEvent::AnalysisFailed {
                    entry_id,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Explicit user re-analysis of an already-analyzed entry: wipe the
    /// previous pattern and cascade rows and the cached analysis
    /// fields, then run the normal path. Never triggered on a schedule.
    pub async fn reanalyze(&self, entry_id: Uuid) -> Result<AnalysisReport, AnalysisError> {
        if !self.guard.try_begin(entry_id).await {
            self.events.emit(PipelineEvent::AnalysisSkipped { entry_id });
            return Ok(AnalysisReport::Skipped);
        }

        let result = async {
            self.store.clear_analysis(entry_id).await?;
            self.run_analysis(entry_id).await
        }
        .await;

        match result {
            Ok(report) => Ok(report),
            Err(e) => {
                self.guard.clear(entry_id).await;
                self.events.emit(PipelineEvent::AnalysisFailed {
                    entry_id,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Analyze everything still unanalyzed, sequentially, one at a
    /// time. Per-entry failures are reported and do not stop the loop.
    pub async fn analyze_pending(
        &self,
    ) -> Result<Vec<(Uuid, Result<AnalysisReport, AnalysisError>)>, StoreError> {
        let pending = self.store.unanalyzed_entries().await?;
        let mut results = Vec::with_capacity(pending.len());
        for entry in pending {
            let result = self.analyze(entry.id).await;
            if let Err(e) = &result {
                tracing::warn!("Analysis of entry {} failed: {}", entry.id, e);
            }
            results.push((entry.id, result));
        }
        Ok(results)
    }

    async fn run_analysis(&self, entry_id: Uuid) -> Result<AnalysisReport, AnalysisError> {
        let entry = self
            .store
            .entry(entry_id)
            .await?
            .ok_or(AnalysisError::EntryNotFound(entry_id))?;
        if entry.content.trim().is_empty() {
            return Err(AnalysisError::EmptyEntry);
        }

        self.events.emit(PipelineEvent::AnalysisStarted { entry_id });

        let analysis =
            analyze_entry_text(self.client.as_ref(), &entry.content, self.params.clone()).await?;
        let batch = materialize(&entry, &analysis);
        let update = EntryAnalysisUpdate {
            summary: analysis.summary.clone(),
            confidence: analysis.confidence,
            overall_intensity: analysis.overall_intensity.round().clamp(0.0, 10.0) as u8,
        };

        self.store
            .commit_analysis(entry.id, &update, &batch.patterns, &batch.cascades)
            .await?;

        tracing::info!(
            "Entry {} analyzed: {} patterns, {} cascades ({} dropped)",
            entry.id,
            batch.patterns.len(),
            batch.cascades.len(),
            batch.dropped_cascades
        );
        self.events.emit(PipelineEvent::AnalysisCompleted {
            entry_id: entry.id,
            pattern_count: batch.patterns.len(),
            cascade_count: batch.cascades.len(),
        });

        Ok(AnalysisReport::Completed {
            pattern_count: batch.patterns.len(),
            cascade_count: batch.cascades.len(),
            dropped_cascades: batch.dropped_cascades,
        })
    }

    // ========================================================================
    // Daily summaries
    // ========================================================================

    /// The memoized narrative for `day`, if still valid (same pattern
    /// count, day not rolled over). Never generates.
    pub async fn cached_summary(
        &self,
        day: NaiveDate,
        today: NaiveDate,
    ) -> Result<Option<CachedSummary>, AnalysisError> {
        let current_count = self.store.pattern_count_on_day(day).await?;
        let cache = self.summaries.lock().await;
        Ok(cache.get(day, current_count, today).cloned())
    }

    /// Generate (or regenerate) the narrative for `day`. Invoked only
    /// on explicit user request. A day with no patterns yields `None`
    /// without a network call; a failed call leaves any previous cache
    /// entry untouched and surfaces no summary.
    pub async fn generate_summary(
        &self,
        day: NaiveDate,
    ) -> Result<Option<CachedSummary>, AnalysisError> {
        let patterns = self.store.patterns_on_day(day).await?;
        if patterns.is_empty() {
            return Ok(None);
        }

        let capped = &patterns[..patterns.len().min(self.summary_cfg.max_patterns_per_request)];
        let text =
            summarize_day(self.client.as_ref(), day, capped, self.params.clone()).await?;

        let summary = CachedSummary {
            day,
            text,
            dominant: dominant_labels(&patterns, self.summary_cfg.dominant_label_count),
            pattern_count: patterns.len(),
        };
        self.summaries.lock().await.put(summary.clone());
        self.events.emit(PipelineEvent::SummaryGenerated { day });
        Ok(Some(summary))
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }
}
