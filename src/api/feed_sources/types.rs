use serde::Deserialize;

use crate::models::feed_source::FeedCategory;

#[derive(Deserialize)]
pub struct RqSourceId {
    pub id: i32,
}

#[derive(Debug, Deserialize)]
pub struct FeedSourceCreate {
    pub name: String,
    pub feed_url: String,
    pub category: Option<FeedCategory>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedSourceQuery {
    pub category: Option<FeedCategory>,
}
