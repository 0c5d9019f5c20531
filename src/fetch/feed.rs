//! RSS feed fetching. Items are deserialized with quick-xml into a small
//! struct mirror of the channel, then normalized into `Article`s.

use anyhow::Context;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::error::{EngineError, EngineResult};
use crate::fetch::{image_from_html, infer_tags, make_article_id, normalize_text};
use crate::model::{Article, Source};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    // quick-xml's serde deserializer matches on the local element name with the
    // namespace prefix stripped, so these rename to the bare local names.
    #[serde(rename = "encoded")]
    content_encoded: Option<String>,
    #[serde(rename = "creator")]
    creator: Option<String>,
    author: Option<String>,
    #[serde(rename = "content")]
    media_content: Option<MediaRef>,
    #[serde(rename = "thumbnail")]
    media_thumbnail: Option<MediaRef>,
}

#[derive(Debug, Deserialize)]
struct MediaRef {
    #[serde(rename = "@url")]
    url: Option<String>,
}

fn parse_rfc2822_utc(ts: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
}

pub async fn fetch(http: &reqwest::Client, source: &Source) -> EngineResult<Vec<Article>> {
    let body = http
        .get(&source.url)
        .send()
        .await
        .map_err(|e| EngineError::SourceUnreachable(format!("{}: {e}", source.name)))?
        .text()
        .await
        .map_err(|e| EngineError::SourceUnreachable(format!("{}: {e}", source.name)))?;
    parse_feed(&body, source)
}

/// Parse an RSS document into articles. Split out from `fetch` so fixtures can
/// exercise the full normalization path without a network.
pub fn parse_feed(xml: &str, source: &Source) -> EngineResult<Vec<Article>> {
    let cleaned = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&cleaned)
        .context("parsing rss xml")
        .map_err(|e| EngineError::FeedParse(format!("{}: {e:#}", source.name)))?;

    let now = chrono::Utc::now();
    let mut out = Vec::with_capacity(rss.channel.item.len());
    for (idx, item) in rss.channel.item.into_iter().enumerate() {
        let title = normalize_text(item.title.as_deref().unwrap_or_default());
        let description = normalize_text(item.description.as_deref().unwrap_or_default());
        let url = item.link.clone().unwrap_or_default();
        if title.is_empty() || url.is_empty() {
            continue;
        }

        let published_at = item
            .pub_date
            .as_deref()
            .and_then(parse_rfc2822_utc)
            .unwrap_or(now);

        let image_url = item
            .media_content
            .as_ref()
            .and_then(|m| m.url.clone())
            .or_else(|| item.media_thumbnail.as_ref().and_then(|m| m.url.clone()))
            .or_else(|| {
                item.content_encoded
                    .as_deref()
                    .and_then(image_from_html)
            });

        let author = item
            .creator
            .clone()
            .or(item.author.clone())
            .filter(|a| !a.trim().is_empty());

        let tags = infer_tags(&title, &description);

        out.push(Article {
            id: make_article_id(&source.id, idx),
            title,
            description,
            content: item.content_encoded.map(|c| normalize_text(&c)),
            url,
            source_name: source.name.clone(),
            published_at,
            category: source.category.clone(),
            tags,
            image_url,
            author,
        });
    }
    Ok(out)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceKind;

    fn src() -> Source {
        Source {
            id: "techcrunch-ai".into(),
            name: "TechCrunch AI".into(),
            url: "https://example.com/feed".into(),
            kind: SourceKind::Feed,
            category: "general".into(),
            language: "en".into(),
            is_active: true,
            last_update: None,
        }
    }

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Example</title>
    <item>
      <title>OpenAI announces a GPT upgrade</title>
      <link>https://example.com/gpt-upgrade</link>
      <pubDate>Mon, 02 Jun 2025 10:00:00 GMT</pubDate>
      <description>A major machine learning advance.</description>
    </item>
    <item>
      <title></title>
      <link>https://example.com/empty-title</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_and_skips_empty_titles() {
        let articles = parse_feed(FEED, &src()).unwrap();
        assert_eq!(articles.len(), 1);
        let a = &articles[0];
        assert_eq!(a.url, "https://example.com/gpt-upgrade");
        assert_eq!(a.source_name, "TechCrunch AI");
        assert_eq!(a.published_at.timestamp(), 1748858400);
        assert!(a.tags.contains(&"gpt".to_string()));
        assert!(a.tags.contains(&"machine learning".to_string()));
    }

    #[test]
    fn missing_pub_date_defaults_to_ingestion_time() {
        let xml = r#"<rss><channel><item>
            <title>Untimed story</title>
            <link>https://example.com/untimed</link>
        </item></channel></rss>"#;
        let before = chrono::Utc::now();
        let articles = parse_feed(xml, &src()).unwrap();
        assert_eq!(articles.len(), 1);
        assert!(articles[0].published_at >= before - chrono::Duration::seconds(5));
    }

    #[test]
    fn broken_xml_is_a_parse_error() {
        let err = parse_feed("this is not xml <<<", &src()).unwrap_err();
        assert!(matches!(err, EngineError::FeedParse(_)));
    }
}
