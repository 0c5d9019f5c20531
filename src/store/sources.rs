//! Source table access: upsert-by-name seeding, listing, and status updates.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::error::{EngineError, EngineResult};
use crate::model::{Source, SourceKind};
use crate::store::{format_ts, parse_ts, SqliteStore};

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<Source> {
    let kind: String = row.get(3)?;
    let last_update: Option<String> = row.get(7)?;
    Ok(Source {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        kind: SourceKind::parse(&kind).unwrap_or(SourceKind::Feed),
        category: row.get(4)?,
        language: row.get(5)?,
        is_active: row.get(6)?,
        last_update: last_update.as_deref().map(parse_ts),
    })
}

impl SqliteStore {
    /// Insert the source if no row with the same name exists. Idempotent:
    /// re-seeding is a no-op. Returns true when a row was inserted.
    pub fn upsert_source_by_name(&self, source: &Source) -> EngineResult<bool> {
        let conn = self.connection()?;
        let exists: bool = conn
            .prepare("SELECT EXISTS(SELECT 1 FROM sources WHERE name = ?1)")?
            .query_row([&source.name], |row| row.get(0))?;
        if exists {
            return Ok(false);
        }
        conn.execute(
            "INSERT INTO sources (id, name, url, kind, category, language, is_active, last_update)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                source.id,
                source.name,
                source.url,
                source.kind.as_str(),
                source.category,
                source.language,
                source.is_active,
                source.last_update.map(format_ts),
            ],
        )?;
        Ok(true)
    }

    /// All sources, active or not. Inactive sources stay queryable; the fetch
    /// fan-out filters on `is_active` itself.
    pub fn list_sources(&self) -> EngineResult<Vec<Source>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, url, kind, category, language, is_active, last_update
             FROM sources ORDER BY name",
        )?;
        let rows = stmt.query_map([], source_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_source_by_name(&self, name: &str) -> EngineResult<Option<Source>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, url, kind, category, language, is_active, last_update
             FROM sources WHERE name = ?1",
        )?;
        match stmt.query_row([name], source_from_row) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(EngineError::from(e)),
        }
    }

    pub fn set_source_active(&self, id: &str, is_active: bool) -> EngineResult<()> {
        let conn = self.connection()?;
        conn.execute(
            "UPDATE sources SET is_active = ?2, last_update = ?3 WHERE id = ?1",
            params![id, is_active, format_ts(Utc::now())],
        )?;
        Ok(())
    }

    pub fn touch_source(&self, id: &str, at: DateTime<Utc>) -> EngineResult<()> {
        let conn = self.connection()?;
        conn.execute(
            "UPDATE sources SET last_update = ?2 WHERE id = ?1",
            params![id, format_ts(at)],
        )?;
        Ok(())
    }
}
