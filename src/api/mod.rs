pub mod articles;
pub mod feed_sources;
pub mod health;
pub mod jobs;
pub mod routes;
