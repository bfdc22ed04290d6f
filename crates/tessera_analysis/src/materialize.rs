//! Materializer: convert one parsed extraction result into persisted
//! record shapes owned by a single entry.

use std::collections::HashMap;
use tessera_core::{ExtractedPattern, JournalEntry, PatternCascade};
use tessera_extraction::EntryAnalysis;
use uuid::Uuid;

/// The rows produced from one extraction result.
#[derive(Debug, Clone, Default)]
pub struct PatternBatch {
    pub patterns: Vec<ExtractedPattern>,
    pub cascades: Vec<PatternCascade>,
    /// Cascades whose endpoints the model referenced but never emitted.
    pub dropped_cascades: usize,
}

/// Build pattern and cascade rows for `entry` from `analysis`.
///
/// Every pattern inherits the analysis-level confidence and the entry's
/// timestamp, so all rows of one batch share a timestamp and a cascade
/// can never span two entries. Cascade endpoints resolve
/// through a lookup table scoped to this call; a cascade referencing a
/// pattern type that was not emitted is dropped rather than failing the
/// batch, since cascades are secondary to the patterns themselves.
pub fn materialize(entry: &JournalEntry, analysis: &EntryAnalysis) -> PatternBatch {
    let mut patterns = Vec::with_capacity(analysis.patterns.len());
    let mut by_type: HashMap<&str, Uuid> = HashMap::new();

    for raw in &analysis.patterns {
        let id = Uuid::new_v4();
        // Duplicate type labels keep the first occurrence as the
        // cascade endpoint.
        by_type.entry(raw.pattern_type.as_str()).or_insert(id);
        patterns.push(ExtractedPattern {
            id,
            pattern_type: raw.pattern_type.clone(),
            category: raw.category,
            intensity: raw.intensity.round().clamp(0.0, 10.0) as u8,
            triggers: raw.triggers.clone(),
            coping_used: raw.coping_used.clone(),
            time_of_day: raw.time_of_day.clone(),
            details: raw.details.clone(),
            confidence: analysis.confidence,
            timestamp: entry.timestamp,
            entry_id: entry.id,
        });
    }

    let mut cascades = Vec::new();
    let mut dropped = 0;
    for raw in &analysis.cascades {
        match (by_type.get(raw.from.as_str()), by_type.get(raw.to.as_str())) {
            (Some(&from_pattern), Some(&to_pattern)) => {
                cascades.push(PatternCascade {
                    id: Uuid::new_v4(),
                    from_pattern,
                    to_pattern,
                    confidence: raw.confidence,
                    description: raw.description.clone(),
                    timestamp: entry.timestamp,
                    entry_id: entry.id,
                });
            }
            _ => {
                tracing::debug!(
                    "Dropping cascade {:?} -> {:?}: endpoint not in this batch",
                    raw.from,
                    raw.to
                );
                dropped += 1;
            }
        }
    }

    PatternBatch {
        patterns,
        cascades,
        dropped_cascades: dropped,
    }
}
