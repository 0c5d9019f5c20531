//! Engine configuration. Environment variables win, then a config file
//! (TOML or JSON), then built-in defaults. A sources file can replace the
//! seeded registry list.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::{Source, SourceKind};

pub const ENV_DB_PATH: &str = "NEWS_DB_PATH";
pub const ENV_BIND_ADDR: &str = "NEWS_BIND_ADDR";
pub const ENV_SYNC_INTERVAL: &str = "NEWS_SYNC_INTERVAL_MINUTES";
pub const ENV_SOURCES_PATH: &str = "NEWS_SOURCES_PATH";

const DEFAULT_DB_PATH: &str = "data/news.db";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub db_path: String,
    pub bind_addr: String,
    /// Periodic sync interval; `None` disables the background scheduler.
    pub sync_interval_minutes: Option<u64>,
    /// Optional file with additional sources to upsert at startup.
    pub sources_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            sync_interval_minutes: Some(30),
            sources_path: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration: `config/news.toml` or `config/news.json` when
    /// present, then environment overrides on top.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file_default()?;

        if let Ok(p) = std::env::var(ENV_DB_PATH) {
            cfg.db_path = p;
        }
        if let Ok(a) = std::env::var(ENV_BIND_ADDR) {
            cfg.bind_addr = a;
        }
        if let Ok(v) = std::env::var(ENV_SYNC_INTERVAL) {
            let minutes: u64 = v
                .parse()
                .with_context(|| format!("{ENV_SYNC_INTERVAL}={v} is not a number"))?;
            cfg.sync_interval_minutes = (minutes > 0).then_some(minutes);
        }
        if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
            cfg.sources_path = Some(PathBuf::from(p));
        }
        Ok(cfg)
    }

    fn load_file_default() -> Result<Self> {
        let toml_p = PathBuf::from("config/news.toml");
        if toml_p.exists() {
            return Self::load_file(&toml_p);
        }
        let json_p = PathBuf::from("config/news.json");
        if json_p.exists() {
            return Self::load_file(&json_p);
        }
        Ok(Self::default())
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "toml" => toml::from_str(&content).context("parsing toml config"),
            "json" => serde_json::from_str(&content).context("parsing json config"),
            other => Err(anyhow!("unsupported config format: {other}")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SourcesFile {
    sources: Vec<SourceEntry>,
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    id: String,
    name: String,
    url: String,
    kind: String,
    #[serde(default = "default_category")]
    category: String,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_category() -> String {
    "general".into()
}
fn default_language() -> String {
    "en".into()
}
fn default_active() -> bool {
    true
}

/// Parse a sources file (TOML or JSON). Entries with an unknown kind are a
/// configuration error recovered locally: logged and skipped, the rest of the
/// file still loads.
pub fn load_sources_file(path: &Path) -> Result<Vec<Source>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let parsed: SourcesFile = match ext.as_str() {
        "toml" => toml::from_str(&content).context("parsing toml sources")?,
        "json" => serde_json::from_str(&content).context("parsing json sources")?,
        other => return Err(anyhow!("unsupported sources format: {other}")),
    };

    let mut out = Vec::with_capacity(parsed.sources.len());
    for entry in parsed.sources {
        let Some(kind) = SourceKind::parse(&entry.kind) else {
            tracing::warn!(
                source = %entry.name,
                kind = %entry.kind,
                "unsupported source kind, skipping entry"
            );
            continue;
        };
        out.push(Source {
            id: entry.id,
            name: entry.name,
            url: entry.url,
            kind,
            category: entry.category,
            language: entry.language,
            is_active: entry.is_active,
            last_update: None,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_a_config_file() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.db_path, "data/news.db");
        assert_eq!(cfg.sync_interval_minutes, Some(30));
    }

    #[test]
    fn toml_config_parses_with_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.toml");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "db_path = \"/tmp/x.db\"").unwrap();
        let cfg = EngineConfig::load_file(&path).unwrap();
        assert_eq!(cfg.db_path, "/tmp/x.db");
        // untouched fields keep their defaults
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn sources_file_skips_unknown_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");
        fs::write(
            &path,
            r#"{"sources": [
                {"id": "a", "name": "A", "url": "https://a.example.com/feed", "kind": "feed"},
                {"id": "b", "name": "B", "url": "https://b.example.com", "kind": "carrier-pigeon"}
            ]}"#,
        )
        .unwrap();
        let sources = load_sources_file(&path).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].id, "a");
        assert_eq!(sources[0].kind, SourceKind::Feed);
        assert_eq!(sources[0].category, "general");
    }

    #[test]
    fn rss_is_an_alias_for_feed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.toml");
        fs::write(
            &path,
            "[[sources]]\nid = \"x\"\nname = \"X\"\nurl = \"https://x.example.com/rss\"\nkind = \"rss\"\n",
        )
        .unwrap();
        let sources = load_sources_file(&path).unwrap();
        assert_eq!(sources[0].kind, SourceKind::Feed);
    }
}
