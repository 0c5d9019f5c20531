//! Rule-based summarization fallback. Deterministic by construction: fixed
//! vocabularies, fixed clause splitting, majority-vote sentiment, tiered
//! impact. This is the path taken whenever the external summarizer is
//! unavailable, so identical inputs must keep producing identical summaries.

use crate::model::{Article, Impact, Sentiment, Summary};

const TECH_TERMS: &[&str] = &[
    "gpt",
    "llm",
    "neural network",
    "machine learning",
    "deep learning",
];

const COMPANIES: &[&str] = &["openai", "google", "microsoft", "meta", "anthropic"];

const RELEASE_TOKENS: &[&str] = &["release", "launch", "announce"];

const POSITIVE_WORDS: &[&str] = &[
    "breakthrough",
    "improve",
    "advance",
    "success",
    "innovative",
    "revolutionary",
];

const NEGATIVE_WORDS: &[&str] = &[
    "problem",
    "issue",
    "concern",
    "risk",
    "threat",
    "failure",
];

const HIGH_IMPACT_WORDS: &[&str] = &[
    "breakthrough",
    "revolutionary",
    "game-changing",
    "major",
    "significant",
];

const MEDIUM_IMPACT_WORDS: &[&str] = &["new", "update", "improve", "enhance", "release"];

/// Build the full rule-based summary for an article.
pub fn generate(article: &Article) -> Summary {
    let text = format!("{} {}", article.title, article.description).to_lowercase();

    Summary {
        article_id: article.id.clone(),
        summary_text: extract_summary(&article.description),
        key_points: extract_key_points(&text),
        sentiment: sentiment_of(&text),
        impact: impact_of(&text),
        related_topics: article.tags.iter().take(5).cloned().collect(),
    }
}

/// First two sentence-delimited clauses of the description, or the whole
/// description when fewer than two clauses exist.
pub fn extract_summary(description: &str) -> String {
    let clauses: Vec<&str> = description
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if clauses.len() >= 2 {
        format!("{}. {}.", clauses[0], clauses[1])
    } else {
        description.to_string()
    }
}

/// One bullet per matched tech term and company, plus a release bullet, with
/// a single generic bullet when nothing matched. Expects lowercased input.
pub fn extract_key_points(text: &str) -> Vec<String> {
    let mut points = Vec::new();
    for term in TECH_TERMS {
        if text.contains(term) {
            points.push(format!("Covers {term} technology"));
        }
    }
    for company in COMPANIES {
        if text.contains(company) {
            points.push(format!("News involving {company}"));
        }
    }
    if RELEASE_TOKENS.iter().any(|t| text.contains(t)) {
        points.push("New product release".to_string());
    }
    if points.is_empty() {
        points.push("General AI development coverage".to_string());
    }
    points
}

/// Majority vote over fixed positive/negative vocabularies; ties are neutral.
/// Expects lowercased input.
pub fn sentiment_of(text: &str) -> Sentiment {
    let positive = POSITIVE_WORDS.iter().filter(|w| text.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| text.contains(*w)).count();
    if positive > negative {
        Sentiment::Positive
    } else if negative > positive {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// High beats medium beats low; the first tier with any hit wins. Expects
/// lowercased input.
pub fn impact_of(text: &str) -> Impact {
    if HIGH_IMPACT_WORDS.iter().any(|w| text.contains(w)) {
        Impact::High
    } else if MEDIUM_IMPACT_WORDS.iter().any(|w| text.contains(w)) {
        Impact::Medium
    } else {
        Impact::Low
    }
}
