use crate::error::StoreError;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;
use tessera_core::{ExtractedPattern, JournalEntry, PatternCascade, PatternCategory};
use uuid::Uuid;

/// Fields written onto an entry when its analysis commits.
#[derive(Debug, Clone)]
pub struct EntryAnalysisUpdate {
    pub summary: String,
    pub confidence: f32,
    pub overall_intensity: u8,
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        Self::connect(&db_url, 5).await
    }

    /// A private in-memory database. Restricted to a single connection
    /// so every query sees the same database.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn connect(db_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON").execute(conn).await?;
                    Ok(())
                })
            })
            .connect(db_url)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                id TEXT PRIMARY KEY,
                timestamp INTEGER NOT NULL,
                content TEXT NOT NULL,
                title TEXT,
                mood INTEGER NOT NULL DEFAULT 0,
                is_analyzed INTEGER NOT NULL DEFAULT 0,
                analysis_summary TEXT,
                analysis_confidence REAL NOT NULL DEFAULT 0,
                overall_intensity INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_timestamp ON entries(timestamp)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS patterns (
                id TEXT PRIMARY KEY,
                entry_id TEXT NOT NULL,
                pattern_type TEXT NOT NULL,
                category TEXT NOT NULL,
                intensity INTEGER NOT NULL,
                triggers_json TEXT NOT NULL,
                coping_json TEXT NOT NULL,
                time_of_day TEXT,
                details TEXT,
                confidence REAL NOT NULL,
                timestamp INTEGER NOT NULL,
                FOREIGN KEY(entry_id) REFERENCES entries(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_patterns_entry ON patterns(entry_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_patterns_timestamp ON patterns(timestamp)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_patterns_category ON patterns(category)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cascades (
                id TEXT PRIMARY KEY,
                entry_id TEXT NOT NULL,
                from_pattern TEXT NOT NULL,
                to_pattern TEXT NOT NULL,
                confidence REAL NOT NULL,
                description TEXT,
                timestamp INTEGER NOT NULL,
                FOREIGN KEY(entry_id) REFERENCES entries(id) ON DELETE CASCADE,
                FOREIGN KEY(from_pattern) REFERENCES patterns(id) ON DELETE CASCADE,
                FOREIGN KEY(to_pattern) REFERENCES patterns(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cascades_entry ON cascades(entry_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ========================================================================
    // Entries
    // ========================================================================

    pub async fn insert_entry(&self, entry: &JournalEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO entries (id, timestamp, content, title, mood, is_analyzed,
                                 analysis_summary, analysis_confidence, overall_intensity)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.timestamp.timestamp())
        .bind(&entry.content)
        .bind(&entry.title)
        .bind(entry.mood as i64)
        .bind(entry.is_analyzed)
        .bind(&entry.analysis_summary)
        .bind(entry.analysis_confidence as f64)
        .bind(entry.overall_intensity as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn entry(&self, id: Uuid) -> Result<Option<JournalEntry>, StoreError> {
        let row = sqlx::query("SELECT * FROM entries WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| entry_from_row(&r)).transpose()
    }

    pub async fn list_entries(&self, limit: i64) -> Result<Vec<JournalEntry>, StoreError> {
        let rows = sqlx::query("SELECT * FROM entries ORDER BY timestamp DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(entry_from_row).collect()
    }

    /// Entries awaiting analysis, oldest first (they are processed in a
    /// simple sequential loop).
    pub async fn unanalyzed_entries(&self) -> Result<Vec<JournalEntry>, StoreError> {
        let rows = sqlx::query("SELECT * FROM entries WHERE is_analyzed = 0 ORDER BY timestamp ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(entry_from_row).collect()
    }

    /// User-initiated deletion. Child pattern and cascade rows go with
    /// the entry via foreign keys.
    pub async fn delete_entry(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM entries WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Analysis commit / reset
    // ========================================================================

    /// Commit one analysis: replace the entry's pattern and cascade rows
    /// and mark it analyzed, as a single transaction.
    ///
    /// Either all of it commits or none of it does; a crash mid-write
    /// cannot leave an entry marked analyzed with no child rows. The
    /// delete-then-insert shape also makes re-analysis idempotent with
    /// respect to row count.
    pub async fn commit_analysis(
        &self,
        entry_id: Uuid,
        update: &EntryAnalysisUpdate,
        patterns: &[ExtractedPattern],
        cascades: &[PatternCascade],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let id_str = entry_id.to_string();

        // Old cascades are removed transitively through the pattern FKs.
        sqlx::query("DELETE FROM patterns WHERE entry_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;

        for p in patterns {
            sqlx::query(
                r#"
                INSERT INTO patterns (id, entry_id, pattern_type, category, intensity,
                                      triggers_json, coping_json, time_of_day, details,
                                      confidence, timestamp)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(p.id.to_string())
            .bind(p.entry_id.to_string())
            .bind(&p.pattern_type)
            .bind(p.category.label())
            .bind(p.intensity as i64)
            .bind(serde_json::to_string(&p.triggers).unwrap_or_else(|_| "[]".to_string()))
            .bind(serde_json::to_string(&p.coping_used).unwrap_or_else(|_| "[]".to_string()))
            .bind(&p.time_of_day)
            .bind(&p.details)
            .bind(p.confidence as f64)
            .bind(p.timestamp.timestamp())
            .execute(&mut *tx)
            .await?;
        }

        for c in cascades {
            sqlx::query(
                r#"
                INSERT INTO cascades (id, entry_id, from_pattern, to_pattern,
                                      confidence, description, timestamp)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(c.id.to_string())
            .bind(c.entry_id.to_string())
            .bind(c.from_pattern.to_string())
            .bind(c.to_pattern.to_string())
            .bind(c.confidence as f64)
            .bind(&c.description)
            .bind(c.timestamp.timestamp())
            .execute(&mut *tx)
            .await?;
        }

        let updated = sqlx::query(
            r#"
            UPDATE entries
            SET is_analyzed = 1, analysis_summary = ?, analysis_confidence = ?,
                overall_intensity = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.summary)
        .bind(update.confidence as f64)
        .bind(update.overall_intensity as i64)
        .bind(&id_str)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Rolls back the inserted child rows on drop.
            return Err(StoreError::EntryNotFound(entry_id));
        }

        tx.commit().await?;
        tracing::debug!(
            "Committed analysis for entry {}: {} patterns, {} cascades",
            entry_id,
            patterns.len(),
            cascades.len()
        );
        Ok(())
    }

    /// The analyzed -> analyzing reset: drop child rows and clear the
    /// cached analysis fields in one transaction, so no orphaned rows
    /// survive into the re-analysis and the entry is never displayed as
    /// a mix of old and new analysis.
    pub async fn clear_analysis(&self, entry_id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let id_str = entry_id.to_string();

        sqlx::query("DELETE FROM patterns WHERE entry_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE entries
            SET is_analyzed = 0, analysis_summary = NULL, analysis_confidence = 0,
                overall_intensity = 0
            WHERE id = ?
            "#,
        )
        .bind(&id_str)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    // ========================================================================
    // Patterns and cascades
    // ========================================================================

    pub async fn patterns_for_entry(
        &self,
        entry_id: Uuid,
    ) -> Result<Vec<ExtractedPattern>, StoreError> {
        let rows = sqlx::query("SELECT * FROM patterns WHERE entry_id = ? ORDER BY intensity DESC")
            .bind(entry_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(pattern_from_row).collect()
    }

    pub async fn cascades_for_entry(
        &self,
        entry_id: Uuid,
    ) -> Result<Vec<PatternCascade>, StoreError> {
        let rows = sqlx::query("SELECT * FROM cascades WHERE entry_id = ?")
            .bind(entry_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(cascade_from_row).collect()
    }

    /// All patterns whose timestamps fall on the given local calendar day.
    pub async fn patterns_on_day(&self, day: NaiveDate) -> Result<Vec<ExtractedPattern>, StoreError> {
        let (start, end) = local_day_bounds(day);
        let rows = sqlx::query(
            "SELECT * FROM patterns WHERE timestamp >= ? AND timestamp < ? ORDER BY intensity DESC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(pattern_from_row).collect()
    }

    /// Cheap count used for daily-summary cache validation.
    pub async fn pattern_count_on_day(&self, day: NaiveDate) -> Result<usize, StoreError> {
        let (start, end) = local_day_bounds(day);
        let row = sqlx::query("SELECT COUNT(*) AS n FROM patterns WHERE timestamp >= ? AND timestamp < ?")
            .bind(start)
            .bind(end)
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.get("n");
        Ok(n as usize)
    }

    pub async fn patterns_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ExtractedPattern>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM patterns WHERE timestamp >= ? AND timestamp < ? ORDER BY timestamp ASC",
        )
        .bind(start.timestamp())
        .bind(end.timestamp())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(pattern_from_row).collect()
    }
}

/// Epoch-second bounds of a calendar day in the device-local timezone.
fn local_day_bounds(day: NaiveDate) -> (i64, i64) {
    let start_naive = day.and_hms_opt(0, 0, 0).expect("midnight always exists");
    let end_naive = start_naive + chrono::Duration::days(1);
    let start = Local
        .from_local_datetime(&start_naive)
        .earliest()
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| start_naive.and_utc().timestamp());
    let end = Local
        .from_local_datetime(&end_naive)
        .earliest()
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| end_naive.and_utc().timestamp());
    (start, end)
}

// ============================================================================
// Row decoding
// ============================================================================

fn parse_uuid(s: String) -> Result<Uuid, StoreError> {
    Uuid::parse_str(&s).map_err(|e| StoreError::Decode(format!("bad uuid {:?}: {}", s, e)))
}

fn parse_timestamp(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::Decode(format!("bad timestamp {}", secs)))
}

fn parse_string_list(json: String) -> Result<Vec<String>, StoreError> {
    serde_json::from_str(&json).map_err(|e| StoreError::Decode(format!("bad string list: {}", e)))
}

fn entry_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<JournalEntry, StoreError> {
    Ok(JournalEntry {
        id: parse_uuid(row.get("id"))?,
        timestamp: parse_timestamp(row.get("timestamp"))?,
        content: row.get("content"),
        title: row.get("title"),
        mood: row.get::<i64, _>("mood") as u8,
        is_analyzed: row.get::<i64, _>("is_analyzed") != 0,
        analysis_summary: row.get("analysis_summary"),
        analysis_confidence: row.get::<f64, _>("analysis_confidence") as f32,
        overall_intensity: row.get::<i64, _>("overall_intensity") as u8,
    })
}

fn pattern_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ExtractedPattern, StoreError> {
    let category_label: String = row.get("category");
    let category = PatternCategory::from_label(&category_label)
        .ok_or_else(|| StoreError::Decode(format!("unknown category {:?}", category_label)))?;
    Ok(ExtractedPattern {
        id: parse_uuid(row.get("id"))?,
        entry_id: parse_uuid(row.get("entry_id"))?,
        pattern_type: row.get("pattern_type"),
        category,
        intensity: row.get::<i64, _>("intensity") as u8,
        triggers: parse_string_list(row.get("triggers_json"))?,
        coping_used: parse_string_list(row.get("coping_json"))?,
        time_of_day: row.get("time_of_day"),
        details: row.get("details"),
        confidence: row.get::<f64, _>("confidence") as f32,
        timestamp: parse_timestamp(row.get("timestamp"))?,
    })
}

fn cascade_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<PatternCascade, StoreError> {
    Ok(PatternCascade {
        id: parse_uuid(row.get("id"))?,
        entry_id: parse_uuid(row.get("entry_id"))?,
        from_pattern: parse_uuid(row.get("from_pattern"))?,
        to_pattern: parse_uuid(row.get("to_pattern"))?,
        confidence: row.get::<f64, _>("confidence") as f32,
        description: row.get("description"),
        timestamp: parse_timestamp(row.get("timestamp"))?,
    })
}
