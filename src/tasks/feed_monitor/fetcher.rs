use std::time::Duration;

use reqwest::{header, Client};
use url::Url;

use super::parser::{parse_feed, ParsedArticle};
use crate::{
    models::feed_source::FeedSource,
    tasks::errors::{FetchError, FetchErrorKind},
};

// See: https://stackoverflow.com/a/7001617/5155484
const FEED_ACCEPT: &str = "application/rss+xml, application/rdf+xml, application/atom+xml, application/feed+json, application/xml;q=0.9, text/xml;q=0.8";
const USER_AGENT: &str = concat!("AmaforGladiatorsNews/", env!("CARGO_PKG_VERSION"));

/// Checks that `raw` is an absolute http(s) URL.
pub fn validate_feed_url(raw: &str) -> Result<Url, FetchErrorKind> {
    let url = Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchErrorKind::UnsupportedScheme(other.to_string())),
    }
}

/// Downloads and parses feed documents. Every request is bounded by the
/// configured timeout; failures are not retried.
#[derive(Clone)]
pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, source: &FeedSource) -> Result<Vec<ParsedArticle>, FetchError> {
        let wrap = |kind: FetchErrorKind| FetchError::new(source.id, kind);

        let url = validate_feed_url(&source.feed_url).map_err(wrap)?;
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, FEED_ACCEPT)
            .send()
            .await
            .map_err(|e| wrap(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(wrap(FetchErrorKind::Status(status)));
        }

        let body = response.bytes().await.map_err(|e| wrap(e.into()))?;
        parse_feed(&body[..]).map_err(|e| wrap(e.into()))
    }
}
