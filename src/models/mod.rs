pub mod article;
pub mod feed_source;
