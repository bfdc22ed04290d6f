//! Instruction templates for the two extraction-style calls.
//!
//! The JSON field names in these templates are a stable contract with
//! existing prompt engineering; do not rename them.

/// System instruction for per-entry pattern extraction.
pub const ENTRY_ANALYSIS_PROMPT: &str = r#"You analyze a personal journal entry written by an autistic/PDA person and extract behavioral, sensory, and emotional patterns.

Rules:
1. Only report patterns the text actually supports; do not speculate.
2. "category" must be exactly one of: Sensory, Executive Function, Social & Communication, Energy & Regulation, Routine & Change, Demand Avoidance, Physical & Sleep, Special Interests.
3. "intensity" is an integer 0-10 describing how strongly the pattern shows in this entry.
4. "cascades" describe one pattern leading to another within this entry; "from" and "to" must repeat the exact "type" strings of patterns you emitted.
5. "confidence" is 0.0-1.0 for the whole analysis; "summary" is one or two plain sentences; "overallIntensity" is an integer 0-10 for the entry as a whole.
6. If the entry contains no identifiable pattern, return an empty "patterns" array.

Return a single JSON object and nothing else:
{"patterns": [{"type": "Sensory Overload", "category": "Sensory", "intensity": 8, "triggers": ["loud noise"], "timeOfDay": "morning", "copingUsed": ["left the room"], "details": "..."}], "cascades": [{"from": "Sensory Overload", "to": "Shutdown", "confidence": 0.7, "description": "..."}], "confidence": 0.8, "summary": "...", "overallIntensity": 6}"#;

/// System instruction for the daily narrative summary call.
pub const DAILY_SUMMARY_PROMPT: &str = r#"You write a short, gentle daily reflection for an autistic/PDA person based on the behavior patterns extracted from their journal that day.

Rules:
1. Two or three sentences, second person, plain language, no clinical jargon.
2. Mention the most prominent patterns and any coping that helped; never scold.
3. Output plain text only - no JSON, no markdown, no headings."#;

/// Render one pattern row into a line of the daily-summary request body.
pub fn summary_line(
    pattern_type: &str,
    category: &str,
    intensity: u8,
    triggers: &[String],
    coping: &[String],
) -> String {
    let mut line = format!("- {} ({}, intensity {})", pattern_type, category, intensity);
    if !triggers.is_empty() {
        line.push_str(&format!("; triggers: {}", triggers.join(", ")));
    }
    if !coping.is_empty() {
        line.push_str(&format!("; coping: {}", coping.join(", ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line_full() {
        let line = summary_line(
            "Sensory Overload",
            "Sensory",
            8,
            &["loud noise".to_string()],
            &["left early".to_string()],
        );
        assert_eq!(
            line,
            "- Sensory Overload (Sensory, intensity 8); triggers: loud noise; coping: left early"
        );
    }

    #[test]
    fn test_summary_line_bare() {
        let line = summary_line("Shutdown", "Energy & Regulation", 5, &[], &[]);
        assert_eq!(line, "- Shutdown (Energy & Regulation, intensity 5)");
    }
}
