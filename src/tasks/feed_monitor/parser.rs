use chrono::{DateTime, Utc};
use feed_rs::{
    model::{Entry, Link, Text},
    parser::{self, ParseFeedError},
};

const UNTITLED: &str = "Untitled";

/// One feed entry normalised into the shape the article store expects.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedArticle {
    pub original_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub article_url: String,
    pub published_at: DateTime<Utc>,
    pub thumbnail_url: Option<String>,
}

/// Parses an RSS, Atom or JSON feed document. Entry order is preserved;
/// entries without any link are dropped.
pub fn parse_feed(body: &[u8]) -> Result<Vec<ParsedArticle>, ParseFeedError> {
    let parsed = parser::Builder::new()
        .id_generator(link_based_id)
        .build()
        .parse(body)?;
    let fetched_at = Utc::now();

    let articles = parsed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let article = normalize_entry(entry, fetched_at);
            if article.is_none() {
                log::debug!("Skipping feed entry without a link");
            }
            article
        })
        .collect();
    Ok(articles)
}

/// Id for entries published without one, such as RSS items with no guid.
/// Derived from the link alone so a retitled item keeps its identity.
fn link_based_id(links: &[Link], title: &Option<Text>, uri: Option<&str>) -> String {
    match links.first() {
        Some(link) => parser::generate_id_from_link_and_title(link, &None),
        None => parser::generate_id(links, title, uri),
    }
}

fn normalize_entry(entry: Entry, fetched_at: DateTime<Utc>) -> Option<ParsedArticle> {
    let article_url = entry.links.first()?.href.trim().to_string();
    if article_url.is_empty() {
        return None;
    }

    let thumbnail_url = thumbnail_of(&entry);
    let summary = entry.summary.map(|s| s.content).filter(|s| !s.trim().is_empty());
    let content = entry.content.and_then(|c| c.body).filter(|s| !s.trim().is_empty());
    let title = entry
        .title
        .map(|t| t.content)
        .filter(|t| !t.trim().is_empty())
        .or_else(|| summary.clone())
        .unwrap_or_else(|| UNTITLED.to_string());
    let published_at = entry.published.or(entry.updated).unwrap_or(fetched_at);

    Some(ParsedArticle {
        original_id: entry.id,
        title,
        summary,
        content,
        article_url,
        published_at,
        thumbnail_url,
    })
}

fn thumbnail_of(entry: &Entry) -> Option<String> {
    let thumbnail = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.clone())
        .next();

    thumbnail.or_else(|| {
        entry
            .media
            .iter()
            .flat_map(|m| m.content.iter())
            .filter(|c| {
                c.content_type
                    .as_ref()
                    .is_some_and(|ct| ct.essence_str().starts_with("image/"))
            })
            .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
    })
}
