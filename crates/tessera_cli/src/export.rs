//! Pattern-log export: plain serialization of extracted pattern rows.

use anyhow::Result;
use tessera_core::ExtractedPattern;

pub fn to_json(patterns: &[ExtractedPattern]) -> Result<String> {
    Ok(serde_json::to_string_pretty(patterns)?)
}

pub fn to_csv(patterns: &[ExtractedPattern]) -> String {
    let mut out = String::from(
        "id,entry_id,timestamp,type,category,intensity,confidence,triggers,coping_used,time_of_day,details\n",
    );
    for p in patterns {
        let fields = [
            p.id.to_string(),
            p.entry_id.to_string(),
            p.timestamp.to_rfc3339(),
            p.pattern_type.clone(),
            p.category.label().to_string(),
            p.intensity.to_string(),
            format!("{:.2}", p.confidence),
            p.triggers.join("; "),
            p.coping_used.join("; "),
            p.time_of_day.clone().unwrap_or_default(),
            p.details.clone().unwrap_or_default(),
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Quote a field when it contains a delimiter, quote, or newline;
/// embedded quotes are doubled.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{JournalEntry, PatternCategory};
    use uuid::Uuid;

    fn pattern() -> ExtractedPattern {
        let entry = JournalEntry::new("x", None, 0);
        ExtractedPattern {
            id: Uuid::new_v4(),
            pattern_type: "Sensory Overload".to_string(),
            category: PatternCategory::Sensory,
            intensity: 8,
            triggers: vec!["loud, sudden noise".to_string()],
            coping_used: vec![],
            time_of_day: None,
            details: Some("said \"too much\"".to_string()),
            confidence: 0.8,
            timestamp: entry.timestamp,
            entry_id: entry.id,
        }
    }

    #[test]
    fn test_csv_escapes_delimiters_and_quotes() {
        let rendered = to_csv(&[pattern()]);
        let mut lines = rendered.lines();
        assert!(lines.next().unwrap().starts_with("id,entry_id,timestamp"));
        let row = lines.next().unwrap();
        assert!(row.contains("\"loud, sudden noise\""));
        assert!(row.contains("\"said \"\"too much\"\"\""));
    }

    #[test]
    fn test_json_round_trips() {
        let patterns = vec![pattern()];
        let rendered = to_json(&patterns).unwrap();
        let parsed: Vec<ExtractedPattern> = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].pattern_type, "Sensory Overload");
    }
}
