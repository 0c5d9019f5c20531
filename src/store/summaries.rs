//! Summary persistence, one row per article. The analyzer is the only writer;
//! repeated puts overwrite in place so a regenerated summary stays 1:1.

use rusqlite::params;

use crate::error::{EngineError, EngineResult};
use crate::model::{Impact, Sentiment, Summary};
use crate::store::SqliteStore;

impl SqliteStore {
    pub fn get_summary(&self, article_id: &str) -> EngineResult<Option<Summary>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT article_id, summary_text, key_points, sentiment, impact, related_topics
             FROM summaries WHERE article_id = ?1",
        )?;
        let summary = stmt.query_row([article_id], |row| {
            let key_points: String = row.get(2)?;
            let sentiment: String = row.get(3)?;
            let impact: String = row.get(4)?;
            let related: String = row.get(5)?;
            Ok(Summary {
                article_id: row.get(0)?,
                summary_text: row.get(1)?,
                key_points: serde_json::from_str(&key_points).unwrap_or_default(),
                sentiment: Sentiment::parse(&sentiment).unwrap_or(Sentiment::Neutral),
                impact: Impact::parse(&impact).unwrap_or(Impact::Low),
                related_topics: serde_json::from_str(&related).unwrap_or_default(),
            })
        });
        match summary {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(EngineError::from(e)),
        }
    }

    pub fn put_summary(&self, summary: &Summary) -> EngineResult<()> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO summaries (article_id, summary_text, key_points, sentiment, impact, related_topics)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(article_id) DO UPDATE SET
                 summary_text = excluded.summary_text,
                 key_points = excluded.key_points,
                 sentiment = excluded.sentiment,
                 impact = excluded.impact,
                 related_topics = excluded.related_topics",
            params![
                summary.article_id,
                summary.summary_text,
                serde_json::to_string(&summary.key_points).unwrap_or_else(|_| "[]".into()),
                summary.sentiment.as_str(),
                summary.impact.as_str(),
                serde_json::to_string(&summary.related_topics).unwrap_or_else(|_| "[]".into()),
            ],
        )?;
        Ok(())
    }
}
