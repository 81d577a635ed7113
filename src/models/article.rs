use super::feed_source::{FeedCategory, FeedSource};
use crate::schema::*;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Associations, PartialEq,
)]
#[diesel(belongs_to(FeedSource))]
#[diesel(table_name = articles)]
pub struct Article {
    pub id: i32,
    pub feed_source_id: i32,
    /// identifier assigned by the publisher, unique within a feed source
    pub original_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub article_url: String,
    pub published_at: i64,
    pub thumbnail_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Default, Insertable)]
#[diesel(table_name = articles)]
pub struct NewArticle<'a> {
    pub feed_source_id: i32,
    pub original_id: &'a str,
    pub title: &'a str,
    pub summary: Option<&'a str>,
    pub content: Option<&'a str>,
    pub article_url: &'a str,
    pub published_at: i64,
    pub thumbnail_url: Option<&'a str>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Display fields refreshed when an already-known article is seen again.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = articles)]
#[diesel(treat_none_as_null = true)]
struct ArticleRefresh<'a> {
    title: &'a str,
    summary: Option<&'a str>,
    content: Option<&'a str>,
    thumbnail_url: Option<&'a str>,
    published_at: i64,
    updated_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub feed_source_id: Option<i32>,
    pub category: Option<FeedCategory>,
    pub limit: i64,
    pub offset: i64,
}

impl<'a> NewArticle<'a> {
    /// Inserts the article, or refreshes its display fields if
    /// `(feed_source_id, original_id)` is already stored.
    ///
    /// Runs in an IMMEDIATE transaction so two writers racing on the same key
    /// are serialised by SQLite's write lock.
    pub fn upsert(&self, conn: &mut SqliteConnection) -> QueryResult<(Article, UpsertOutcome)> {
        use crate::schema::articles::dsl::{articles, feed_source_id, original_id};

        conn.immediate_transaction(|conn| {
            let existing = articles
                .filter(feed_source_id.eq(self.feed_source_id))
                .filter(original_id.eq(self.original_id))
                .first::<Article>(conn)
                .optional()?;

            let now = Utc::now().timestamp();
            match existing {
                Some(found) => {
                    let refresh = ArticleRefresh {
                        title: self.title,
                        summary: self.summary,
                        content: self.content,
                        thumbnail_url: self.thumbnail_url,
                        published_at: self.published_at,
                        updated_at: now,
                    };
                    let updated = diesel::update(articles.find(found.id))
                        .set(&refresh)
                        .get_result::<Article>(conn)?;
                    Ok((updated, UpsertOutcome::Updated))
                }
                None => {
                    let row = NewArticle {
                        created_at: now,
                        updated_at: now,
                        ..*self
                    };
                    let inserted = diesel::insert_into(articles)
                        .values(&row)
                        .get_result::<Article>(conn)?;
                    Ok((inserted, UpsertOutcome::Created))
                }
            }
        })
    }
}

impl Article {
    pub fn get_by_id(conn: &mut SqliteConnection, article_id: i32) -> QueryResult<Option<Article>> {
        use crate::schema::articles::dsl::articles;
        articles.find(article_id).first::<Article>(conn).optional()
    }

    pub fn get_by_key(
        conn: &mut SqliteConnection,
        source_id: i32,
        key: &str,
    ) -> QueryResult<Option<Article>> {
        use crate::schema::articles::dsl::{articles, feed_source_id, original_id};
        articles
            .filter(feed_source_id.eq(source_id))
            .filter(original_id.eq(key))
            .first::<Article>(conn)
            .optional()
    }

    /// Newest first.
    pub fn list(conn: &mut SqliteConnection, filter: &ArticleFilter) -> QueryResult<Vec<Article>> {
        use crate::schema::articles::dsl as a;
        use crate::schema::feed_sources::dsl as fs;

        let mut query = a::articles
            .inner_join(fs::feed_sources)
            .select(Article::as_select())
            .into_boxed();
        if let Some(source_id) = filter.feed_source_id {
            query = query.filter(a::feed_source_id.eq(source_id));
        }
        if let Some(category) = filter.category {
            query = query.filter(fs::category.eq(category));
        }
        query
            .order((a::published_at.desc(), a::id.desc()))
            .limit(filter.limit)
            .offset(filter.offset)
            .load::<Article>(conn)
    }

    pub fn count_for_source(conn: &mut SqliteConnection, source_id: i32) -> QueryResult<i64> {
        use crate::schema::articles::dsl::{articles, feed_source_id};
        articles
            .filter(feed_source_id.eq(source_id))
            .count()
            .get_result(conn)
    }
}
