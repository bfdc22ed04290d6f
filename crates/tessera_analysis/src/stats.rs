//! Read-only aggregation over already-loaded records, for dashboards
//! and the CLI stats view. No writes, no network calls.

use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use tessera_core::{ExtractedPattern, PatternCategory};

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStat {
    pub category: PatternCategory,
    pub count: usize,
    pub mean_intensity: f32,
}

/// Per-category counts and mean intensity, most frequent first.
pub fn category_breakdown(patterns: &[ExtractedPattern]) -> Vec<CategoryStat> {
    let mut tally: HashMap<PatternCategory, (usize, u32)> = HashMap::new();
    for p in patterns {
        let slot = tally.entry(p.category).or_insert((0, 0));
        slot.0 += 1;
        slot.1 += p.intensity as u32;
    }

    let mut stats: Vec<CategoryStat> = tally
        .into_iter()
        .map(|(category, (count, total))| CategoryStat {
            category,
            count,
            mean_intensity: total as f32 / count as f32,
        })
        .collect();
    stats.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(a.category.label().cmp(b.category.label()))
    });
    stats
}

/// The `n` most frequent trigger strings across the given patterns.
pub fn top_triggers(patterns: &[ExtractedPattern], n: usize) -> Vec<(String, usize)> {
    top_strings(patterns.iter().flat_map(|p| p.triggers.iter()), n)
}

/// The `n` most frequent coping strategies across the given patterns.
pub fn top_coping(patterns: &[ExtractedPattern], n: usize) -> Vec<(String, usize)> {
    top_strings(patterns.iter().flat_map(|p| p.coping_used.iter()), n)
}

fn top_strings<'a>(items: impl Iterator<Item = &'a String>, n: usize) -> Vec<(String, usize)> {
    let mut tally: HashMap<&str, usize> = HashMap::new();
    for item in items {
        *tally.entry(item.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = tally.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(n)
        .map(|(s, count)| (s.to_string(), count))
        .collect()
}

/// Length of the consecutive-day run ending today (or yesterday, so an
/// entry not yet written today does not break the streak at breakfast).
pub fn day_streak(days: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut unique: Vec<NaiveDate> = days.to_vec();
    unique.sort();
    unique.dedup();

    let Some(&latest) = unique.last() else {
        return 0;
    };
    if (today - latest).num_days() > 1 {
        return 0;
    }

    let mut streak = 1;
    for pair in unique.windows(2).rev() {
        if (pair[1] - pair[0]).num_days() == 1 {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

/// Mean pattern intensity per local calendar day, oldest first.
pub fn intensity_by_day(patterns: &[ExtractedPattern]) -> Vec<(NaiveDate, f32)> {
    let mut tally: HashMap<NaiveDate, (u32, usize)> = HashMap::new();
    for p in patterns {
        let day = p.timestamp.with_timezone(&Local).date_naive();
        let slot = tally.entry(day).or_insert((0, 0));
        slot.0 += p.intensity as u32;
        slot.1 += 1;
    }
    let mut series: Vec<(NaiveDate, f32)> = tally
        .into_iter()
        .map(|(day, (total, count))| (day, total as f32 / count as f32))
        .collect();
    series.sort_by_key(|(day, _)| *day);
    series
}
