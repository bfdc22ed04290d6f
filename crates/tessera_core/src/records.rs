//! Domain records shared across the pipeline: journal entries, the
//! patterns extracted from them, and cascades linking patterns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed category taxonomy for extracted patterns.
///
/// The wire labels are part of the extraction contract and must stay
/// stable; they are also what gets stored in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternCategory {
    Sensory,
    #[serde(rename = "Executive Function")]
    ExecutiveFunction,
    #[serde(rename = "Social & Communication")]
    SocialCommunication,
    #[serde(rename = "Energy & Regulation")]
    EnergyRegulation,
    #[serde(rename = "Routine & Change")]
    RoutineChange,
    #[serde(rename = "Demand Avoidance")]
    DemandAvoidance,
    #[serde(rename = "Physical & Sleep")]
    PhysicalSleep,
    #[serde(rename = "Special Interests")]
    SpecialInterests,
}

impl PatternCategory {
    pub const ALL: [PatternCategory; 8] = [
        PatternCategory::Sensory,
        PatternCategory::ExecutiveFunction,
        PatternCategory::SocialCommunication,
        PatternCategory::EnergyRegulation,
        PatternCategory::RoutineChange,
        PatternCategory::DemandAvoidance,
        PatternCategory::PhysicalSleep,
        PatternCategory::SpecialInterests,
    ];

    /// Stable wire/storage label.
    pub fn label(&self) -> &'static str {
        match self {
            PatternCategory::Sensory => "Sensory",
            PatternCategory::ExecutiveFunction => "Executive Function",
            PatternCategory::SocialCommunication => "Social & Communication",
            PatternCategory::EnergyRegulation => "Energy & Regulation",
            PatternCategory::RoutineChange => "Routine & Change",
            PatternCategory::DemandAvoidance => "Demand Avoidance",
            PatternCategory::PhysicalSleep => "Physical & Sleep",
            PatternCategory::SpecialInterests => "Special Interests",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.label() == label)
    }
}

impl std::fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A raw journal entry. Analysis fields start empty and are filled in
/// a single transaction when an analysis commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub title: Option<String>,
    /// Self-reported mood, 0-5.
    pub mood: u8,
    pub is_analyzed: bool,
    /// Narrative produced by the last successful analysis.
    pub analysis_summary: Option<String>,
    /// Model confidence for the last analysis, 0.0-1.0.
    pub analysis_confidence: f32,
    /// Whole-entry intensity, 0-10.
    pub overall_intensity: u8,
}

impl JournalEntry {
    /// A fresh, unanalyzed entry timestamped now.
    pub fn new(content: impl Into<String>, title: Option<String>, mood: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            content: content.into(),
            title,
            mood: mood.min(5),
            is_analyzed: false,
            analysis_summary: None,
            analysis_confidence: 0.0,
            overall_intensity: 0,
        }
    }
}

/// One behavioral/sensory observation extracted from a single entry.
///
/// Created only by the materializer, never mutated afterwards; deleted
/// only when the owning entry is re-analyzed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedPattern {
    pub id: Uuid,
    /// Free-form label from the model, e.g. "Sensory Overload".
    pub pattern_type: String,
    pub category: PatternCategory,
    /// 0-10.
    pub intensity: u8,
    pub triggers: Vec<String>,
    pub coping_used: Vec<String>,
    pub time_of_day: Option<String>,
    pub details: Option<String>,
    /// Inherited from the parent analysis call.
    pub confidence: f32,
    /// Copied from the owning entry.
    pub timestamp: DateTime<Utc>,
    pub entry_id: Uuid,
}

/// A claimed causal/sequential link between two patterns.
///
/// Invariant: both endpoints belong to the same analysis batch (same
/// entry, same timestamp). The materializer resolves endpoints through
/// a batch-local lookup table, so a cascade can never point outside
/// its own entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternCascade {
    pub id: Uuid,
    pub from_pattern: Uuid,
    pub to_pattern: Uuid,
    pub confidence: f32,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub entry_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels_round_trip() {
        for cat in PatternCategory::ALL {
            assert_eq!(PatternCategory::from_label(cat.label()), Some(cat));
        }
    }

    #[test]
    fn test_category_unknown_label() {
        assert_eq!(PatternCategory::from_label("Mood"), None);
        assert_eq!(PatternCategory::from_label("sensory"), None);
    }

    #[test]
    fn test_category_wire_names() {
        let json = serde_json::to_string(&PatternCategory::ExecutiveFunction).unwrap();
        assert_eq!(json, "\"Executive Function\"");
        let cat: PatternCategory = serde_json::from_str("\"Demand Avoidance\"").unwrap();
        assert_eq!(cat, PatternCategory::DemandAvoidance);
    }

    #[test]
    fn test_new_entry_clamps_mood() {
        let entry = JournalEntry::new("text", None, 9);
        assert_eq!(entry.mood, 5);
        assert!(!entry.is_analyzed);
        assert!(entry.analysis_summary.is_none());
    }
}
