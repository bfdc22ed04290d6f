//! Entry analysis: one structured-generation call per journal entry,
//! parsed into a typed [`EntryAnalysis`].
//!
//! The wire field names (`type`, `category`, `intensity`, `triggers`,
//! `timeOfDay`, `copingUsed`, `details`, cascade `from`/`to`, top-level
//! `confidence`/`summary`/`overallIntensity`) are a stable contract.

use crate::client::{GenerationParams, GenerativeClient};
use crate::error::ExtractError;
use crate::prompts;
use chrono::NaiveDate;
use serde::Deserialize;
use tessera_core::{ExtractedPattern, PatternCategory};

/// One pattern object as the model emits it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPattern {
    #[serde(rename = "type")]
    pub pattern_type: String,
    pub category: PatternCategory,
    pub intensity: f32,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub time_of_day: Option<String>,
    #[serde(default)]
    pub coping_used: Vec<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// One cascade object, referencing pattern `type` values.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCascade {
    pub from: String,
    pub to: String,
    pub confidence: f32,
    #[serde(default)]
    pub description: Option<String>,
}

/// The parsed result of a single extraction call.
///
/// `patterns`, `confidence`, `summary`, and `overall_intensity` are
/// required; a response missing any of them is malformed. `cascades`
/// is optional and defaults to empty.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryAnalysis {
    pub patterns: Vec<RawPattern>,
    #[serde(default)]
    pub cascades: Vec<RawCascade>,
    pub confidence: f32,
    pub summary: String,
    pub overall_intensity: f32,
}

impl EntryAnalysis {
    /// Clamp model-supplied scalars into their documented ranges.
    fn clamp_ranges(&mut self) {
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self.overall_intensity = self.overall_intensity.clamp(0.0, 10.0);
        for p in &mut self.patterns {
            p.intensity = p.intensity.clamp(0.0, 10.0);
        }
        for c in &mut self.cascades {
            c.confidence = c.confidence.clamp(0.0, 1.0);
        }
    }
}

/// Analyze one journal entry's text.
///
/// The caller is expected to have rejected empty content already; this
/// function does not re-check. Any failure leaves the entry
/// unanalyzed so the user action can be retried.
pub async fn analyze_entry_text(
    client: &dyn GenerativeClient,
    text: &str,
    params: GenerationParams,
) -> Result<EntryAnalysis, ExtractError> {
    let response = client
        .generate(prompts::ENTRY_ANALYSIS_PROMPT, text, params)
        .await?;
    let analysis = parse_entry_analysis(&response)?;
    tracing::debug!(
        "Extracted {} patterns, {} cascades (confidence {:.2})",
        analysis.patterns.len(),
        analysis.cascades.len(),
        analysis.confidence
    );
    Ok(analysis)
}

/// Generate a short narrative for one day's already-extracted patterns.
///
/// This is the second, differently-prompted call of the pipeline. The
/// caller guarantees `patterns` is non-empty. Returns plain text with
/// any code fences stripped.
pub async fn summarize_day(
    client: &dyn GenerativeClient,
    day: NaiveDate,
    patterns: &[ExtractedPattern],
    params: GenerationParams,
) -> Result<String, ExtractError> {
    let mut body = format!("Patterns extracted on {}:\n", day);
    for p in patterns {
        body.push_str(&prompts::summary_line(
            &p.pattern_type,
            p.category.label(),
            p.intensity,
            &p.triggers,
            &p.coping_used,
        ));
        body.push('\n');
    }

    let response = client
        .generate(prompts::DAILY_SUMMARY_PROMPT, &body, params)
        .await?;
    let text = strip_fences(&response).trim().to_string();
    if text.is_empty() {
        return Err(ExtractError::MalformedResponse(
            "summary response is empty".to_string(),
        ));
    }
    Ok(text)
}

/// Parse the model's reply, tolerating markdown code fences around the
/// JSON but nothing structurally missing.
pub fn parse_entry_analysis(text: &str) -> Result<EntryAnalysis, ExtractError> {
    let trimmed = text.trim();

    // Try direct parse first
    let parsed = match serde_json::from_str::<EntryAnalysis>(trimmed) {
        Ok(a) => Some(a),
        Err(_) => {
            // Fall back to the outermost {...} span (code-fence wrapped
            // or surrounded by prose)
            match (trimmed.find('{'), trimmed.rfind('}')) {
                (Some(start), Some(end)) if start < end => {
                    serde_json::from_str::<EntryAnalysis>(&trimmed[start..=end]).ok()
                }
                _ => None,
            }
        }
    };

    let mut analysis = parsed.ok_or_else(|| {
        tracing::debug!("Unparseable extraction response: {}", trimmed);
        ExtractError::MalformedResponse(
            "response is not the expected analysis JSON object".to_string(),
        )
    })?;

    analysis.clamp_ranges();
    Ok(analysis)
}

fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("```text\n") and the closing fence.
    let inner = inner.split_once('\n').map(|(_, rest)| rest).unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"{
        "patterns": [
            {"type": "Sensory Overload", "category": "Sensory", "intensity": 8,
             "triggers": ["loud noise"], "timeOfDay": "midday",
             "copingUsed": ["left early"], "details": "cafeteria"}
        ],
        "cascades": [
            {"from": "Sensory Overload", "to": "Sensory Overload", "confidence": 0.6,
             "description": "spiral"}
        ],
        "confidence": 0.85,
        "summary": "A loud environment was overwhelming.",
        "overallIntensity": 7
    }"#;

    #[test]
    fn test_parse_clean_json() {
        let a = parse_entry_analysis(GOOD).unwrap();
        assert_eq!(a.patterns.len(), 1);
        assert_eq!(a.patterns[0].pattern_type, "Sensory Overload");
        assert_eq!(a.patterns[0].category, PatternCategory::Sensory);
        assert_eq!(a.patterns[0].triggers, vec!["loud noise"]);
        assert_eq!(a.cascades.len(), 1);
        assert!((a.confidence - 0.85).abs() < 0.001);
        assert!((a.overall_intensity - 7.0).abs() < 0.001);
    }

    #[test]
    fn test_parse_code_block_wrapped() {
        let wrapped = format!("```json\n{}\n```", GOOD);
        let a = parse_entry_analysis(&wrapped).unwrap();
        assert_eq!(a.patterns.len(), 1);
    }

    #[test]
    fn test_parse_missing_patterns_is_malformed() {
        // The canonical malformed case: summary present, patterns absent.
        let err = parse_entry_analysis(r#"{"summary": "ok"}"#).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        let err = parse_entry_analysis("I cannot analyze this entry.").unwrap_err();
        assert!(matches!(err, ExtractError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_unknown_category_is_malformed() {
        let bad = r#"{"patterns": [{"type": "X", "category": "Mood", "intensity": 3}],
                      "confidence": 0.5, "summary": "s", "overallIntensity": 2}"#;
        let err = parse_entry_analysis(bad).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_defaults_optional_fields() {
        let minimal = r#"{"patterns": [{"type": "Shutdown", "category": "Energy & Regulation",
                          "intensity": 5}],
                          "confidence": 0.4, "summary": "s", "overallIntensity": 5}"#;
        let a = parse_entry_analysis(minimal).unwrap();
        assert!(a.cascades.is_empty());
        assert!(a.patterns[0].triggers.is_empty());
        assert!(a.patterns[0].coping_used.is_empty());
        assert!(a.patterns[0].time_of_day.is_none());
        assert!(a.patterns[0].details.is_none());
    }

    #[test]
    fn test_parse_clamps_out_of_range_scalars() {
        let wild = r#"{"patterns": [{"type": "X", "category": "Sensory", "intensity": 14}],
                       "cascades": [{"from": "X", "to": "X", "confidence": 3.0}],
                       "confidence": 1.7, "summary": "s", "overallIntensity": -2}"#;
        let a = parse_entry_analysis(wild).unwrap();
        assert!((a.patterns[0].intensity - 10.0).abs() < 0.001);
        assert!((a.cascades[0].confidence - 1.0).abs() < 0.001);
        assert!((a.confidence - 1.0).abs() < 0.001);
        assert!(a.overall_intensity.abs() < 0.001);
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("plain"), "plain");
        assert_eq!(strip_fences("```text\nhello\n```"), "hello\n");
        assert_eq!(strip_fences("```\nhello\n```"), "hello\n");
    }
}
