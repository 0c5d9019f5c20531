//! Core domain types shared across the fetch, store, and analysis layers.

use chrono::{DateTime, Local, Months, Utc};
use serde::{Deserialize, Serialize};

/// A configured news source. Identity is `id`; `name` is used for idempotent
/// upserts when the built-in seed list is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
    pub category: String,
    pub language: String,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Feed,
    Api,
    Scrape,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Feed => "feed",
            SourceKind::Api => "api",
            SourceKind::Scrape => "scrape",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "feed" | "rss" => Some(SourceKind::Feed),
            "api" => Some(SourceKind::Api),
            "scrape" => Some(SourceKind::Scrape),
            _ => None,
        }
    }
}

/// A normalized news article. Identity is the canonical `url`: the store keeps
/// at most one row per URL and re-saves are no-ops.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub url: String,
    pub source_name: String,
    pub published_at: DateTime<Utc>,
    pub category: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }

    /// Numeric mapping used for per-source average sentiment.
    pub fn as_score(&self) -> f64 {
        match self {
            Sentiment::Positive => 1.0,
            Sentiment::Negative => -1.0,
            Sentiment::Neutral => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::High => "high",
            Impact::Medium => "medium",
            Impact::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Impact::High),
            "medium" => Some(Impact::Medium),
            "low" => Some(Impact::Low),
            _ => None,
        }
    }
}

/// Derived per-article summary, one-to-one with an article, created lazily on
/// the first summary request and cached in the store thereafter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Summary {
    pub article_id: String,
    pub summary_text: String,
    pub key_points: Vec<String>,
    pub sentiment: Sentiment,
    pub impact: Impact,
    pub related_topics: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicTrend {
    pub topic: String,
    pub frequency: usize,
    pub trend: TrendDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceStat {
    pub source: String,
    pub article_count: usize,
    pub avg_sentiment: f64,
}

/// Percentages; they sum to 100 for a non-empty corpus and are all zero for an
/// empty one.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SentimentDistribution {
    pub positive: u32,
    pub negative: u32,
    pub neutral: u32,
}

/// Ephemeral corpus-level trend report. Recomputed on every request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendReport {
    pub timeframe: Timeframe,
    pub top_topics: Vec<TopicTrend>,
    pub top_sources: Vec<SourceStat>,
    pub sentiment_distribution: SentimentDistribution,
    pub emerging_topics: Vec<String>,
    pub declining_topics: Vec<String>,
}

impl TrendReport {
    /// All-empty/zeroed report, returned when the filtered corpus is empty.
    pub fn empty(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            top_topics: Vec::new(),
            top_sources: Vec::new(),
            sentiment_distribution: SentimentDistribution::default(),
            emerging_topics: Vec::new(),
            declining_topics: Vec::new(),
        }
    }
}

/// Date-range filter shared by search (`today|week|month`) and trend analysis
/// (`week|month|quarter`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Today,
    Week,
    Month,
    Quarter,
}

impl Timeframe {
    /// Earliest `published_at` still included by this filter, relative to
    /// `now`. `Today` means local midnight, mirroring the upstream behavior.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Timeframe::Today => {
                let local_midnight = now
                    .with_timezone(&Local)
                    .date_naive()
                    .and_hms_opt(0, 0, 0)
                    .expect("midnight is a valid time");
                local_midnight
                    .and_local_timezone(Local)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or(now)
            }
            Timeframe::Week => now - chrono::Duration::days(7),
            Timeframe::Month => now.checked_sub_months(Months::new(1)).unwrap_or(now),
            Timeframe::Quarter => now.checked_sub_months(Months::new(3)).unwrap_or(now),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Today => "today",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
            Timeframe::Quarter => "quarter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "today" | "day" => Some(Timeframe::Today),
            "week" => Some(Timeframe::Week),
            "month" => Some(Timeframe::Month),
            "quarter" => Some(Timeframe::Quarter),
            _ => None,
        }
    }
}

/// Filter articles to those at or after the timeframe cutoff.
pub fn filter_by_timeframe(articles: Vec<Article>, timeframe: Timeframe, now: DateTime<Utc>) -> Vec<Article> {
    let cutoff = timeframe.cutoff(now);
    articles
        .into_iter()
        .filter(|a| a.published_at >= cutoff)
        .collect()
}
