//! Daily summary cache: memoizes one generated narrative per calendar
//! day, invalidated when the day's pattern count changes or the day
//! rolls over. Regeneration happens only on explicit user action.

use chrono::NaiveDate;
use std::collections::HashMap;
use tessera_core::ExtractedPattern;

/// One memoized daily narrative.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSummary {
    pub day: NaiveDate,
    pub text: String,
    /// Most prominent pattern labels for the day, for headline display.
    pub dominant: Vec<String>,
    /// Pattern count at generation time; a mismatch invalidates.
    pub pattern_count: usize,
}

#[derive(Debug, Default)]
pub struct DailySummaryCache {
    entries: HashMap<NaiveDate, CachedSummary>,
}

impl DailySummaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cached entry is valid only while the day's current pattern
    /// count equals the cached count and the day is still "today" at
    /// read time. Anything else reads as absent; stale entries are kept
    /// in place rather than cleared, so a transient generation failure
    /// never wipes the last good narrative.
    pub fn get(
        &self,
        day: NaiveDate,
        current_count: usize,
        today: NaiveDate,
    ) -> Option<&CachedSummary> {
        let cached = self.entries.get(&day)?;
        if day == today && cached.pattern_count == current_count {
            Some(cached)
        } else {
            None
        }
    }

    /// Overwrite the entry for `summary.day`.
    pub fn put(&mut self, summary: CachedSummary) {
        self.entries.insert(summary.day, summary);
    }
}

/// Most prominent pattern labels for a day: ranked by occurrence count,
/// then by summed intensity, then alphabetically for stability.
pub fn dominant_labels(patterns: &[ExtractedPattern], count: usize) -> Vec<String> {
    let mut tally: HashMap<&str, (usize, u32)> = HashMap::new();
    for p in patterns {
        let slot = tally.entry(p.pattern_type.as_str()).or_insert((0, 0));
        slot.0 += 1;
        slot.1 += p.intensity as u32;
    }

    let mut ranked: Vec<(&str, usize, u32)> = tally
        .into_iter()
        .map(|(label, (occurrences, total))| (label, occurrences, total))
        .collect();
    ranked.sort_by(|(la, ca, ia), (lb, cb, ib)| cb.cmp(ca).then(ib.cmp(ia)).then(la.cmp(lb)));
    ranked
        .into_iter()
        .take(count)
        .map(|(label, _, _)| label.to_string())
        .collect()
}
