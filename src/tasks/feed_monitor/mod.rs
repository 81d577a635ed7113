pub mod fetcher;
pub mod parser;
pub mod runner;

pub use fetcher::{validate_feed_url, FeedFetcher};
pub use parser::{parse_feed, ParsedArticle};
pub use runner::IngestCycle;
