//! Finalized brief storage
//!
//! SQLite, single file, works offline. The interview core never touches
//! this; hosts hand a completed profile and brief over once a conversation
//! reaches completion.

use crate::types::{StrategicBrief, StrategicProfile};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

const SCHEMA: &str = r#"
-- One row per finished conversation
CREATE TABLE IF NOT EXISTS briefs (
    conversation_id TEXT PRIMARY KEY,
    name TEXT,
    profile_json TEXT NOT NULL,
    brief_json TEXT NOT NULL,
    strategic_clarity INTEGER NOT NULL,
    implementation_readiness INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_briefs_updated ON briefs(updated_at);
"#;

/// A stored profile + brief pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBrief {
    pub conversation_id: String,
    pub profile: StrategicProfile,
    pub brief: StrategicBrief,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row, without the full JSON payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BriefSummary {
    pub conversation_id: String,
    pub name: Option<String>,
    pub strategic_clarity: u8,
    pub implementation_readiness: u8,
    pub updated_at: String,
}

pub struct BriefStore {
    conn: Connection,
}

/// Open (or create) the store at `path`
pub fn init_store(path: &Path) -> Result<BriefStore> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {:?}", path))?;
    BriefStore::with_connection(conn)
}

impl BriefStore {
    pub fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// Insert or replace the brief for a conversation. A regenerated brief
    /// keeps the original `created_at`.
    pub fn save(
        &self,
        conversation_id: &str,
        profile: &StrategicProfile,
        brief: &StrategicBrief,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO briefs (conversation_id, name, profile_json, brief_json,
                                 strategic_clarity, implementation_readiness, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(conversation_id) DO UPDATE SET
                 name = excluded.name,
                 profile_json = excluded.profile_json,
                 brief_json = excluded.brief_json,
                 strategic_clarity = excluded.strategic_clarity,
                 implementation_readiness = excluded.implementation_readiness,
                 updated_at = excluded.updated_at",
            params![
                conversation_id,
                profile.name,
                serde_json::to_string(profile)?,
                serde_json::to_string(brief)?,
                profile.strategic_clarity,
                profile.implementation_readiness,
                now,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, conversation_id: &str) -> Result<Option<StoredBrief>> {
        let row = self
            .conn
            .query_row(
                "SELECT profile_json, brief_json, created_at, updated_at
                 FROM briefs WHERE conversation_id = ?1",
                params![conversation_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((profile_json, brief_json, created_at, updated_at)) = row else {
            return Ok(None);
        };

        Ok(Some(StoredBrief {
            conversation_id: conversation_id.to_string(),
            profile: serde_json::from_str(&profile_json)
                .context("Stored profile is not valid JSON")?,
            brief: serde_json::from_str(&brief_json).context("Stored brief is not valid JSON")?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        }))
    }

    /// Most recently updated first
    pub fn list_recent(&self, limit: usize) -> Result<Vec<BriefSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT conversation_id, name, strategic_clarity, implementation_readiness, updated_at
             FROM briefs ORDER BY updated_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(BriefSummary {
                conversation_id: row.get(0)?,
                name: row.get(1)?,
                strategic_clarity: row.get(2)?,
                implementation_readiness: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Bad timestamp in store: {}", value))?
        .with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BriefSection;
    use tempfile::tempdir;

    fn sample() -> (StrategicProfile, StrategicBrief) {
        let profile = StrategicProfile {
            name: Some("Dana".into()),
            strategic_clarity: 72,
            implementation_readiness: 65,
            ..Default::default()
        };
        let brief = StrategicBrief {
            personal_message: "Hi Dana".into(),
            sections: vec![BriefSection {
                title: "Focus".into(),
                content: "Win ten studios".into(),
                reasoning: "Proof before scale".into(),
            }],
        };
        (profile, brief)
    }

    #[test]
    fn test_save_and_get() {
        let store = BriefStore::in_memory().unwrap();
        let (profile, brief) = sample();
        store.save("c-1", &profile, &brief).unwrap();

        let stored = store.get("c-1").unwrap().unwrap();
        assert_eq!(stored.profile, profile);
        assert_eq!(stored.brief, brief);
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_resave_replaces_brief() {
        let store = BriefStore::in_memory().unwrap();
        let (profile, brief) = sample();
        store.save("c-1", &profile, &brief).unwrap();

        let regenerated = StrategicBrief {
            personal_message: "Updated".into(),
            ..brief
        };
        store.save("c-1", &profile, &regenerated).unwrap();

        let stored = store.get("c-1").unwrap().unwrap();
        assert_eq!(stored.brief.personal_message, "Updated");
        assert!(stored.updated_at >= stored.created_at);
        assert_eq!(store.list_recent(10).unwrap().len(), 1);
    }

    #[test]
    fn test_list_recent_on_disk() {
        let dir = tempdir().unwrap();
        let store = init_store(&dir.path().join("briefs.db")).unwrap();
        let (profile, brief) = sample();
        store.save("c-1", &profile, &brief).unwrap();
        store.save("c-2", &StrategicProfile::default(), &brief).unwrap();

        let recent = store.list_recent(1).unwrap();
        assert_eq!(recent.len(), 1);

        let all = store.list_recent(10).unwrap();
        assert_eq!(all.len(), 2);
        let dana = all.iter().find(|s| s.conversation_id == "c-1").unwrap();
        assert_eq!(dana.name.as_deref(), Some("Dana"));
        assert_eq!(dana.strategic_clarity, 72);
    }
}
