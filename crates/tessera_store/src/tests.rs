use crate::sqlite::{EntryAnalysisUpdate, SqliteStore};
use chrono::Local;
use tessera_core::{ExtractedPattern, JournalEntry, PatternCascade, PatternCategory};
use uuid::Uuid;

fn sample_entry(content: &str) -> JournalEntry {
    JournalEntry::new(content, Some("test".to_string()), 3)
}

/// Build a pattern row owned by `entry`, as the materializer would.
fn sample_pattern(entry: &JournalEntry, pattern_type: &str, intensity: u8) -> ExtractedPattern {
    ExtractedPattern {
        id: Uuid::new_v4(),
        pattern_type: pattern_type.to_string(),
        category: PatternCategory::Sensory,
        intensity,
        triggers: vec!["loud noise".to_string()],
        coping_used: vec!["left early".to_string()],
        time_of_day: None,
        details: None,
        confidence: 0.8,
        timestamp: entry.timestamp,
        entry_id: entry.id,
    }
}

fn sample_update() -> EntryAnalysisUpdate {
    EntryAnalysisUpdate {
        summary: "A loud environment was overwhelming.".to_string(),
        confidence: 0.8,
        overall_intensity: 7,
    }
}

#[tokio::test]
async fn test_entry_round_trip() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let entry = sample_entry("quiet morning");
    store.insert_entry(&entry).await.unwrap();

    let loaded = store.entry(entry.id).await.unwrap().unwrap();
    assert_eq!(loaded.id, entry.id);
    assert_eq!(loaded.content, "quiet morning");
    assert_eq!(loaded.title.as_deref(), Some("test"));
    assert_eq!(loaded.mood, 3);
    assert!(!loaded.is_analyzed);
    // Storage truncates to whole seconds
    assert_eq!(loaded.timestamp.timestamp(), entry.timestamp.timestamp());
}

#[tokio::test]
async fn test_unanalyzed_entries_oldest_first() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut first = sample_entry("first");
    first.timestamp = first.timestamp - chrono::Duration::hours(2);
    let second = sample_entry("second");
    store.insert_entry(&second).await.unwrap();
    store.insert_entry(&first).await.unwrap();

    let pending = store.unanalyzed_entries().await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].content, "first");
    assert_eq!(pending[1].content, "second");
}

#[tokio::test]
async fn test_commit_analysis_populates_entry_and_children() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let entry = sample_entry("loud cafeteria");
    store.insert_entry(&entry).await.unwrap();

    let p1 = sample_pattern(&entry, "Sensory Overload", 8);
    let p2 = sample_pattern(&entry, "Shutdown", 5);
    let cascade = PatternCascade {
        id: Uuid::new_v4(),
        from_pattern: p1.id,
        to_pattern: p2.id,
        confidence: 0.6,
        description: Some("overload led to shutdown".to_string()),
        timestamp: entry.timestamp,
        entry_id: entry.id,
    };

    store
        .commit_analysis(entry.id, &sample_update(), &[p1.clone(), p2], &[cascade])
        .await
        .unwrap();

    // is_analyzed == true implies the summary fields are populated
    let loaded = store.entry(entry.id).await.unwrap().unwrap();
    assert!(loaded.is_analyzed);
    assert_eq!(
        loaded.analysis_summary.as_deref(),
        Some("A loud environment was overwhelming.")
    );
    assert!((loaded.analysis_confidence - 0.8).abs() < 0.001);
    assert_eq!(loaded.overall_intensity, 7);

    let patterns = store.patterns_for_entry(entry.id).await.unwrap();
    assert_eq!(patterns.len(), 2);
    assert_eq!(patterns[0].pattern_type, "Sensory Overload"); // highest intensity first
    assert_eq!(patterns[0].triggers, vec!["loud noise"]);
    assert_eq!(patterns[0].coping_used, vec!["left early"]);

    let cascades = store.cascades_for_entry(entry.id).await.unwrap();
    assert_eq!(cascades.len(), 1);
    assert_eq!(cascades[0].from_pattern, p1.id);
}

#[tokio::test]
async fn test_commit_analysis_replaces_previous_rows() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let entry = sample_entry("repeat");
    store.insert_entry(&entry).await.unwrap();

    let first_batch = vec![
        sample_pattern(&entry, "A", 3),
        sample_pattern(&entry, "B", 4),
        sample_pattern(&entry, "C", 5),
    ];
    store
        .commit_analysis(entry.id, &sample_update(), &first_batch, &[])
        .await
        .unwrap();
    assert_eq!(store.patterns_for_entry(entry.id).await.unwrap().len(), 3);

    // Second commit fully replaces the first, never accumulates
    let second_batch = vec![sample_pattern(&entry, "D", 6)];
    store
        .commit_analysis(entry.id, &sample_update(), &second_batch, &[])
        .await
        .unwrap();
    let patterns = store.patterns_for_entry(entry.id).await.unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].pattern_type, "D");
}

#[tokio::test]
async fn test_commit_analysis_unknown_entry_rolls_back() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let ghost = sample_entry("never inserted");
    let pattern = sample_pattern(&ghost, "X", 2);

    let result = store
        .commit_analysis(ghost.id, &sample_update(), &[pattern], &[])
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_clear_analysis_resets_entry_and_drops_children() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let entry = sample_entry("to reset");
    store.insert_entry(&entry).await.unwrap();

    let p1 = sample_pattern(&entry, "A", 3);
    let p2 = sample_pattern(&entry, "B", 4);
    let cascade = PatternCascade {
        id: Uuid::new_v4(),
        from_pattern: p1.id,
        to_pattern: p2.id,
        confidence: 0.5,
        description: None,
        timestamp: entry.timestamp,
        entry_id: entry.id,
    };
    store
        .commit_analysis(entry.id, &sample_update(), &[p1, p2], &[cascade])
        .await
        .unwrap();

    store.clear_analysis(entry.id).await.unwrap();

    let loaded = store.entry(entry.id).await.unwrap().unwrap();
    assert!(!loaded.is_analyzed);
    assert!(loaded.analysis_summary.is_none());
    assert_eq!(loaded.overall_intensity, 0);
    assert!(store.patterns_for_entry(entry.id).await.unwrap().is_empty());
    assert!(store.cascades_for_entry(entry.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_entry_cascades_to_children() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let entry = sample_entry("doomed");
    store.insert_entry(&entry).await.unwrap();
    let pattern = sample_pattern(&entry, "A", 3);
    store
        .commit_analysis(entry.id, &sample_update(), &[pattern], &[])
        .await
        .unwrap();

    assert!(store.delete_entry(entry.id).await.unwrap());
    assert!(store.entry(entry.id).await.unwrap().is_none());
    assert!(store.patterns_for_entry(entry.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_patterns_on_day_counts_local_day() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let entry = sample_entry("today");
    store.insert_entry(&entry).await.unwrap();
    let pattern = sample_pattern(&entry, "A", 3);
    store
        .commit_analysis(entry.id, &sample_update(), &[pattern], &[])
        .await
        .unwrap();

    let day = entry.timestamp.with_timezone(&Local).date_naive();
    assert_eq!(store.pattern_count_on_day(day).await.unwrap(), 1);
    assert_eq!(store.patterns_on_day(day).await.unwrap().len(), 1);

    let other_day = day - chrono::Duration::days(3);
    assert_eq!(store.pattern_count_on_day(other_day).await.unwrap(), 0);
}

#[tokio::test]
async fn test_on_disk_database_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");
    let store = SqliteStore::open(&db_path).await.unwrap();
    let entry = sample_entry("persisted");
    store.insert_entry(&entry).await.unwrap();
    assert_eq!(store.list_entries(10).await.unwrap().len(), 1);
}
