//! HTML scraping for sources without a feed. Selector conventions match the
//! common article-list markup: `.article` blocks with `.title`,
//! `.description`, `.author`, a link, and an optional image.

use scraper::{Html, Selector};

use crate::error::{EngineError, EngineResult};
use crate::fetch::{infer_tags, make_article_id, normalize_text};
use crate::model::{Article, Source};

pub async fn fetch(http: &reqwest::Client, source: &Source) -> EngineResult<Vec<Article>> {
    let body = http
        .get(&source.url)
        .send()
        .await
        .map_err(|e| EngineError::SourceUnreachable(format!("{}: {e}", source.name)))?
        .text()
        .await
        .map_err(|e| EngineError::SourceUnreachable(format!("{}: {e}", source.name)))?;
    Ok(parse_page(&body, source))
}

/// Selector parsing cannot fail for the constant selectors below, so this
/// path never errors; an unexpected page shape just yields nothing.
pub fn parse_page(html: &str, source: &Source) -> Vec<Article> {
    let doc = Html::parse_document(html);
    let sel_article = Selector::parse(".article").expect("valid selector");
    let sel_title = Selector::parse(".title").expect("valid selector");
    let sel_description = Selector::parse(".description").expect("valid selector");
    let sel_author = Selector::parse(".author").expect("valid selector");
    let sel_link = Selector::parse("a").expect("valid selector");
    let sel_img = Selector::parse("img").expect("valid selector");

    let now = chrono::Utc::now();
    let mut out = Vec::new();
    for (idx, el) in doc.select(&sel_article).enumerate() {
        let text_of = |sel: &Selector| {
            el.select(sel)
                .next()
                .map(|n| normalize_text(&n.text().collect::<String>()))
                .unwrap_or_default()
        };

        let title = text_of(&sel_title);
        let url = el
            .select(&sel_link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .unwrap_or_default()
            .to_string();
        if title.is_empty() || url.is_empty() {
            continue;
        }

        let description = text_of(&sel_description);
        let author = Some(text_of(&sel_author)).filter(|a| !a.is_empty());
        let image_url = el
            .select(&sel_img)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::to_string);
        let tags = infer_tags(&title, &description);

        out.push(Article {
            id: make_article_id(&source.id, idx),
            title,
            description,
            content: None,
            url,
            source_name: source.name.clone(),
            published_at: now,
            category: source.category.clone(),
            tags,
            image_url,
            author,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceKind;

    fn src() -> Source {
        Source {
            id: "scrape-wire".into(),
            name: "Scrape Wire".into(),
            url: "https://example.com".into(),
            kind: SourceKind::Scrape,
            category: "general".into(),
            language: "en".into(),
            is_active: true,
            last_update: None,
        }
    }

    #[test]
    fn scrapes_article_blocks() {
        let html = r#"
        <div class="article">
            <h2 class="title">Robotics startup raises round</h2>
            <p class="description">An autonomous systems company.</p>
            <span class="author">Sam Lee</span>
            <a href="https://example.com/robotics">read</a>
            <img src="https://cdn.example.com/r.jpg">
        </div>
        <div class="article"><a href="https://example.com/untitled">x</a></div>
        "#;
        let articles = parse_page(html, &src());
        assert_eq!(articles.len(), 1);
        let a = &articles[0];
        assert_eq!(a.url, "https://example.com/robotics");
        assert_eq!(a.author.as_deref(), Some("Sam Lee"));
        assert!(a.tags.contains(&"robotics".to_string()));
        assert_eq!(a.image_url.as_deref(), Some("https://cdn.example.com/r.jpg"));
    }
}
