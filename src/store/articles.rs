//! Article persistence: idempotent saves keyed by URL, ordered reads,
//! case-insensitive substring search, and retention cleanup.

use chrono::Utc;
use rusqlite::{params, Row};
use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::model::Article;
use crate::store::{format_ts, parse_ts, SqliteStore};

/// Result of a batch save. `skipped` counts URL duplicates (no-op writes),
/// `failed` counts items whose individual insert errored and was logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct StoreStats {
    pub total_articles: usize,
    pub total_sources: usize,
    pub by_category: Vec<(String, usize)>,
    pub by_source: Vec<(String, usize)>,
}

const ARTICLE_COLUMNS: &str = "a.id, a.title, a.description, a.content, a.url, s.name, a.published_at, a.category, a.tags, a.image_url, a.author";

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<Article> {
    let published: String = row.get(6)?;
    let tags_json: String = row.get(8)?;
    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        content: row.get(3)?,
        url: row.get(4)?,
        source_name: row.get(5)?,
        published_at: parse_ts(&published),
        category: row.get(7)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        image_url: row.get(9)?,
        author: row.get(10)?,
    })
}

impl SqliteStore {
    /// Save a batch of articles. Idempotent per URL: an existing row is left
    /// untouched (first write wins). A failing item is logged and counted,
    /// never aborts the batch.
    pub fn save_articles(&self, items: &[Article]) -> EngineResult<SaveOutcome> {
        let mut outcome = SaveOutcome::default();
        for article in items {
            match self.save_one(article) {
                Ok(true) => outcome.inserted += 1,
                Ok(false) => outcome.skipped += 1,
                Err(e) => {
                    outcome.failed += 1;
                    tracing::warn!(url = %article.url, error = %e, "article save failed");
                }
            }
        }
        Ok(outcome)
    }

    /// Returns `Ok(true)` if the article was inserted, `Ok(false)` if an
    /// article with the same URL already exists.
    fn save_one(&self, article: &Article) -> EngineResult<bool> {
        let conn = self.connection()?;

        let exists: bool = conn
            .prepare("SELECT EXISTS(SELECT 1 FROM articles WHERE url = ?1)")?
            .query_row([&article.url], |row| row.get(0))?;
        if exists {
            return Ok(false);
        }

        // Resolve the owning source by name, creating a placeholder row when
        // the article arrived from a source the registry has not seen yet.
        let source_id: String = match conn
            .prepare("SELECT id FROM sources WHERE name = ?1")?
            .query_row([&article.source_name], |row| row.get(0))
        {
            Ok(id) => id,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                let id = slugify(&article.source_name);
                conn.execute(
                    "INSERT INTO sources (id, name, url, kind, category, language) VALUES (?1, ?2, '', 'feed', ?3, 'en')",
                    params![id, article.source_name, article.category],
                )?;
                id
            }
            Err(e) => return Err(EngineError::from(e)),
        };

        conn.execute(
            "INSERT INTO articles (id, title, description, content, url, source_id, published_at, category, tags, image_url, author)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                article.id,
                article.title,
                article.description,
                article.content,
                article.url,
                source_id,
                format_ts(article.published_at),
                article.category,
                serde_json::to_string(&article.tags).unwrap_or_else(|_| "[]".into()),
                article.image_url,
                article.author,
            ],
        )?;
        Ok(true)
    }

    pub fn get_article(&self, id: &str) -> EngineResult<Option<Article>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a JOIN sources s ON s.id = a.source_id WHERE a.id = ?1"
        ))?;
        match stmt.query_row([id], article_from_row) {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(EngineError::from(e)),
        }
    }

    pub fn get_latest(&self, limit: usize, category: Option<&str>) -> EngineResult<Vec<Article>> {
        let conn = self.connection()?;
        let mut out = Vec::new();
        match category {
            Some(cat) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ARTICLE_COLUMNS} FROM articles a JOIN sources s ON s.id = a.source_id
                     WHERE a.category = ?1 ORDER BY a.published_at DESC LIMIT ?2"
                ))?;
                let rows = stmt.query_map(params![cat, limit as i64], article_from_row)?;
                for row in rows {
                    out.push(row?);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ARTICLE_COLUMNS} FROM articles a JOIN sources s ON s.id = a.source_id
                     ORDER BY a.published_at DESC LIMIT ?1"
                ))?;
                let rows = stmt.query_map(params![limit as i64], article_from_row)?;
                for row in rows {
                    out.push(row?);
                }
            }
        }
        Ok(out)
    }

    /// Case-insensitive substring search over title, description, and tags,
    /// newest first. This is the one consistent matching policy across the
    /// store-backed and in-memory search paths.
    pub fn search_articles(&self, query: &str, limit: usize) -> EngineResult<Vec<Article>> {
        let conn = self.connection()?;
        let needle = format!("%{}%", query.to_lowercase());
        let mut stmt = conn.prepare(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a JOIN sources s ON s.id = a.source_id
             WHERE lower(a.title) LIKE ?1 OR lower(a.description) LIKE ?1 OR lower(a.tags) LIKE ?1
             ORDER BY a.published_at DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![needle, limit as i64], article_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_by_category(&self, category: &str, limit: usize) -> EngineResult<Vec<Article>> {
        self.get_latest(limit, Some(category))
    }

    pub fn get_by_source(&self, source_name: &str, limit: usize) -> EngineResult<Vec<Article>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a JOIN sources s ON s.id = a.source_id
             WHERE s.name = ?1 ORDER BY a.published_at DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![source_name, limit as i64], article_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Delete articles whose `published_at` precedes `now - days`. Returns the
    /// number of deleted rows.
    pub fn cleanup_older_than(&self, days: u32) -> EngineResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
        let conn = self.connection()?;
        let deleted = conn.execute(
            "DELETE FROM articles WHERE published_at < ?1",
            [format_ts(cutoff)],
        )?;
        Ok(deleted as u64)
    }

    pub fn count_articles(&self) -> EngineResult<usize> {
        let conn = self.connection()?;
        let n: i64 = conn.query_row("SELECT count(*) FROM articles", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn stats(&self) -> EngineResult<StoreStats> {
        let conn = self.connection()?;
        let total_articles: i64 =
            conn.query_row("SELECT count(*) FROM articles", [], |row| row.get(0))?;
        let total_sources: i64 = conn.query_row(
            "SELECT count(*) FROM sources WHERE is_active = 1",
            [],
            |row| row.get(0),
        )?;

        let mut by_category = Vec::new();
        {
            let mut stmt = conn.prepare(
                "SELECT category, count(*) FROM articles GROUP BY category ORDER BY count(*) DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?;
            for row in rows {
                by_category.push(row?);
            }
        }

        let mut by_source = Vec::new();
        {
            let mut stmt = conn.prepare(
                "SELECT s.name, count(*) FROM articles a JOIN sources s ON s.id = a.source_id
                 GROUP BY s.name ORDER BY count(*) DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?;
            for row in rows {
                by_source.push(row?);
            }
        }

        Ok(StoreStats {
            total_articles: total_articles as usize,
            total_sources: total_sources as usize,
            by_category,
            by_source,
        })
    }
}

fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn mk_article(url: &str, days_ago: i64) -> Article {
        Article {
            id: url.replace(['/', ':', '.'], "-"),
            title: format!("Title for {url}"),
            description: "A machine learning breakthrough.".into(),
            content: None,
            url: url.to_string(),
            source_name: "TechCrunch AI".into(),
            published_at: Utc::now() - Duration::days(days_ago),
            category: "general".into(),
            tags: vec!["machine learning".into()],
            image_url: None,
            author: Some("Jane Roe".into()),
        }
    }

    #[test]
    fn saving_same_url_twice_keeps_one_row() {
        let store = SqliteStore::in_memory().unwrap();
        let a = mk_article("https://example.com/one", 0);

        let first = store.save_articles(std::slice::from_ref(&a)).unwrap();
        assert_eq!(first.inserted, 1);

        let second = store.save_articles(std::slice::from_ref(&a)).unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(store.count_articles().unwrap(), 1);
    }

    #[test]
    fn n_items_m_distinct_urls_yields_m_rows() {
        let store = SqliteStore::in_memory().unwrap();
        let items = vec![
            mk_article("https://example.com/a", 0),
            mk_article("https://example.com/b", 1),
            mk_article("https://example.com/a", 2),
        ];
        store.save_articles(&items).unwrap();
        assert_eq!(store.count_articles().unwrap(), 2);
    }

    #[test]
    fn latest_is_ordered_newest_first() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .save_articles(&[
                mk_article("https://example.com/old", 5),
                mk_article("https://example.com/new", 1),
            ])
            .unwrap();
        let latest = store.get_latest(10, None).unwrap();
        assert_eq!(latest[0].url, "https://example.com/new");
        assert_eq!(latest[1].url, "https://example.com/old");
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .save_articles(&[mk_article("https://example.com/ml", 0)])
            .unwrap();
        assert_eq!(store.search_articles("MACHINE", 10).unwrap().len(), 1);
        assert_eq!(store.search_articles("breakthrough", 10).unwrap().len(), 1);
        assert_eq!(store.search_articles("quantum", 10).unwrap().len(), 0);
    }

    #[test]
    fn cleanup_deletes_only_articles_past_cutoff() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .save_articles(&[
                mk_article("https://example.com/today", 0),
                mk_article("https://example.com/stale", 2),
            ])
            .unwrap();
        let deleted = store.cleanup_older_than(1).unwrap();
        assert_eq!(deleted, 1);
        let remaining = store.get_latest(10, None).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].url, "https://example.com/today");
    }

    #[test]
    fn unknown_source_gets_a_placeholder_row() {
        let store = SqliteStore::in_memory().unwrap();
        let mut a = mk_article("https://example.com/x", 0);
        a.source_name = "Fresh Wire".into();
        store.save_articles(&[a]).unwrap();
        let stats = store.stats().unwrap();
        assert!(stats.by_source.iter().any(|(name, _)| name == "Fresh Wire"));
    }
}
