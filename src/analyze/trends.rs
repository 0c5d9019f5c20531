//! Corpus-level trend computation. Pure functions over an article snapshot —
//! no I/O, suitable for unit tests and offline evaluation.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::analyze::rules;
use crate::model::{
    Article, SentimentDistribution, SourceStat, Timeframe, TopicTrend, TrendDirection,
    TrendReport,
};

/// Recent window used for per-topic direction and emerging/declining lists.
const RECENT_WINDOW_DAYS: i64 = 7;

/// Per-topic direction thresholds.
const RISING_RATIO: f64 = 0.3;
const DECLINING_RATIO: f64 = 0.1;

/// Emerging/declining list thresholds: strictly greater than 0.4 to emerge,
/// strictly below 0.1 with a total strictly above 2 to decline.
const EMERGING_RATIO: f64 = 0.4;
const DECLINING_MIN_TOTAL: usize = 2;

/// Build the full trend report for an already timeframe-filtered snapshot.
/// An empty snapshot yields the all-zero report rather than an error.
pub fn compute_trend_report(
    articles: &[Article],
    timeframe: Timeframe,
    now: DateTime<Utc>,
) -> TrendReport {
    if articles.is_empty() {
        return TrendReport::empty(timeframe);
    }

    let tally = tally_topics(articles, now);
    let (emerging_topics, declining_topics) = classify_topics(&tally);

    TrendReport {
        timeframe,
        top_topics: top_topics(&tally),
        top_sources: top_sources(articles),
        sentiment_distribution: sentiment_distribution(articles),
        emerging_topics,
        declining_topics,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TopicCount {
    total: usize,
    recent: usize,
}

impl TopicCount {
    fn recent_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.recent as f64 / self.total as f64
        }
    }
}

fn tally_topics(articles: &[Article], now: DateTime<Utc>) -> Vec<(String, TopicCount)> {
    let recent_cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
    let mut counts: HashMap<&str, TopicCount> = HashMap::new();
    for article in articles {
        let is_recent = article.published_at >= recent_cutoff;
        for tag in &article.tags {
            let entry = counts.entry(tag.as_str()).or_default();
            entry.total += 1;
            if is_recent {
                entry.recent += 1;
            }
        }
    }

    let mut tally: Vec<(String, TopicCount)> = counts
        .into_iter()
        .map(|(tag, count)| (tag.to_string(), count))
        .collect();
    // Frequency descending; alphabetical tie-break keeps output deterministic.
    tally.sort_by(|a, b| b.1.total.cmp(&a.1.total).then_with(|| a.0.cmp(&b.0)));
    tally
}

fn direction_of(count: &TopicCount) -> TrendDirection {
    let ratio = count.recent_ratio();
    if ratio > RISING_RATIO {
        TrendDirection::Rising
    } else if ratio < DECLINING_RATIO {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    }
}

fn top_topics(tally: &[(String, TopicCount)]) -> Vec<TopicTrend> {
    tally
        .iter()
        .take(10)
        .map(|(topic, count)| TopicTrend {
            topic: topic.clone(),
            frequency: count.total,
            trend: direction_of(count),
        })
        .collect()
}

/// Emerging: recent ratio strictly above 0.4. Declining: recent ratio
/// strictly below 0.1 AND total strictly above 2. Both lists cap at 5.
fn classify_topics(tally: &[(String, TopicCount)]) -> (Vec<String>, Vec<String>) {
    let emerging = tally
        .iter()
        .filter(|(_, c)| c.recent_ratio() > EMERGING_RATIO)
        .take(5)
        .map(|(topic, _)| topic.clone())
        .collect();
    let declining = tally
        .iter()
        .filter(|(_, c)| c.recent_ratio() < DECLINING_RATIO && c.total > DECLINING_MIN_TOTAL)
        .take(5)
        .map(|(topic, _)| topic.clone())
        .collect();
    (emerging, declining)
}

fn top_sources(articles: &[Article]) -> Vec<SourceStat> {
    let mut stats: HashMap<&str, (usize, f64)> = HashMap::new();
    for article in articles {
        let text = format!("{} {}", article.title, article.description).to_lowercase();
        let entry = stats.entry(article.source_name.as_str()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += rules::sentiment_of(&text).as_score();
    }

    let mut out: Vec<SourceStat> = stats
        .into_iter()
        .map(|(source, (count, sum))| SourceStat {
            source: source.to_string(),
            article_count: count,
            avg_sentiment: sum / count as f64,
        })
        .collect();
    out.sort_by(|a, b| {
        b.article_count
            .cmp(&a.article_count)
            .then_with(|| a.source.cmp(&b.source))
    });
    out.truncate(10);
    out
}

/// Percentages summing to exactly 100 for a non-empty input (largest-remainder
/// rounding), all zero otherwise.
fn sentiment_distribution(articles: &[Article]) -> SentimentDistribution {
    let total = articles.len();
    if total == 0 {
        return SentimentDistribution::default();
    }

    let mut counts = [0usize; 3]; // positive, negative, neutral
    for article in articles {
        let text = format!("{} {}", article.title, article.description).to_lowercase();
        match rules::sentiment_of(&text) {
            crate::model::Sentiment::Positive => counts[0] += 1,
            crate::model::Sentiment::Negative => counts[1] += 1,
            crate::model::Sentiment::Neutral => counts[2] += 1,
        }
    }

    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * 100.0 / total as f64)
        .collect();
    let mut pct: Vec<u32> = exact.iter().map(|&x| x.floor() as u32).collect();
    let mut rem: u32 = 100 - pct.iter().sum::<u32>();

    // Hand leftover points to the largest fractional parts, earliest slot on
    // ties, so the three shares always total 100.
    let mut order: Vec<usize> = (0..3).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
    });
    for idx in order {
        if rem == 0 {
            break;
        }
        pct[idx] += 1;
        rem -= 1;
    }

    SentimentDistribution {
        positive: pct[0],
        negative: pct[1],
        neutral: pct[2],
    }
}
