//! Per-source article retrieval and normalization.
//!
//! `ArticleFetcher` is the seam the aggregator and sync scheduler depend on;
//! `HttpFetcher` is the production implementation, polymorphic over the
//! source kind (feed | api | scrape). A fan-out caller contains each
//! source's network/parse error locally so one bad endpoint never takes the
//! batch down.

pub mod api;
pub mod feed;
pub mod scrape;

use async_trait::async_trait;
use metrics::counter;
use std::time::Duration;

use crate::error::EngineResult;
use crate::model::{Article, Source, SourceKind};

#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    /// Fetch and normalize articles from one source. Callers running a
    /// fan-out contain a per-source error locally (log-and-skip or an
    /// `errors[]` entry) so one bad endpoint never fails the batch.
    async fn fetch(&self, source: &Source) -> EngineResult<Vec<Article>>;
}

pub struct HttpFetcher {
    http: reqwest::Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent("ai-news-aggregator/0.1 (+github.com/lumlich/ai-news-aggregator)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self { http }
    }

    async fn fetch_inner(&self, source: &Source) -> EngineResult<Vec<Article>> {
        match source.kind {
            SourceKind::Feed => feed::fetch(&self.http, source).await,
            SourceKind::Api => api::fetch(&self.http, source).await,
            SourceKind::Scrape => scrape::fetch(&self.http, source).await,
        }
    }
}

#[async_trait]
impl ArticleFetcher for HttpFetcher {
    async fn fetch(&self, source: &Source) -> EngineResult<Vec<Article>> {
        match self.fetch_inner(source).await {
            Ok(items) => {
                counter!("fetch_articles_total").increment(items.len() as u64);
                Ok(items)
            }
            Err(e) => {
                counter!("fetch_errors_total").increment(1);
                Err(e)
            }
        }
    }
}

/// AI-domain keyword vocabulary used for tag inference. Case-insensitive
/// substring match over title + description.
pub const AI_KEYWORDS: &[&str] = &[
    "ai",
    "artificial intelligence",
    "machine learning",
    "ml",
    "deep learning",
    "neural network",
    "chatgpt",
    "gpt",
    "llm",
    "large language model",
    "computer vision",
    "nlp",
    "natural language processing",
    "robotics",
    "autonomous",
    "automation",
    "algorithm",
    "data science",
];

pub fn infer_tags(title: &str, description: &str) -> Vec<String> {
    let text = format!("{title} {description}").to_lowercase();
    AI_KEYWORDS
        .iter()
        .filter(|kw| text.contains(*kw))
        .map(|kw| kw.to_string())
        .collect()
}

/// Normalize feed text: decode HTML entities, strip tags, normalize curly
/// quotes, collapse whitespace. Sentence punctuation is kept intact since the
/// summarizer splits on it later.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // Length cap: 2000 chars
    if out.chars().count() > 2000 {
        out = out.chars().take(2000).collect();
    }

    out
}

/// Pull the first `<img src="...">` out of an HTML fragment.
pub fn image_from_html(html: &str) -> Option<String> {
    static RE_IMG: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re = RE_IMG.get_or_init(|| regex::Regex::new(r#"<img[^>]+src="([^"]+)""#).unwrap());
    re.captures(html).map(|c| c[1].to_string())
}

pub(crate) fn make_article_id(source_id: &str, idx: usize) -> String {
    format!(
        "{}-{}-{}",
        source_id,
        chrono::Utc::now().timestamp_millis(),
        idx
    )
}
