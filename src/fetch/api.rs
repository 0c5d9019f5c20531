//! JSON news-API fetching (NewsAPI-style payloads: a top-level `articles`
//! array). Field names follow the common wire shape; anything missing is
//! tolerated.

use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::fetch::{infer_tags, make_article_id, normalize_text};
use crate::model::{Article, Source};

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    articles: Vec<ApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiArticle {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    published_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    tags: Vec<String>,
    url_to_image: Option<String>,
    author: Option<String>,
}

pub async fn fetch(http: &reqwest::Client, source: &Source) -> EngineResult<Vec<Article>> {
    let resp: ApiResponse = http
        .get(&source.url)
        .send()
        .await
        .map_err(|e| EngineError::SourceUnreachable(format!("{}: {e}", source.name)))?
        .json()
        .await
        .map_err(|e| EngineError::FeedParse(format!("{}: {e}", source.name)))?;

    let now = chrono::Utc::now();
    let mut out = Vec::with_capacity(resp.articles.len());
    for (idx, item) in resp.articles.into_iter().enumerate() {
        let title = normalize_text(item.title.as_deref().unwrap_or_default());
        let description = normalize_text(item.description.as_deref().unwrap_or_default());
        let url = item.url.unwrap_or_default();
        if title.is_empty() || url.is_empty() {
            continue;
        }

        let tags = if item.tags.is_empty() {
            infer_tags(&title, &description)
        } else {
            item.tags
        };

        out.push(Article {
            id: make_article_id(&source.id, idx),
            title,
            description,
            content: item.content,
            url,
            source_name: source.name.clone(),
            published_at: item.published_at.unwrap_or(now),
            category: source.category.clone(),
            tags,
            image_url: item.url_to_image,
            author: item.author.filter(|a| !a.trim().is_empty()),
        });
    }
    Ok(out)
}
