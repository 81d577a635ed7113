use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use crate::{
    errors::{AppError, AppResult},
    models::{
        article::{Article, ArticleFilter},
        feed_source::FeedCategory,
    },
    types::Pagination,
    RqDbPool,
};

#[derive(Debug, Default, Deserialize)]
pub struct ArticleQuery {
    pub feed_source_id: Option<i32>,
    pub category: Option<FeedCategory>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct RqArticleId {
    pub id: i32,
}

/// Newest articles first, optionally narrowed to one source or category.
#[get("")]
pub async fn list_articles(
    pool: RqDbPool,
    query: web::Query<ArticleQuery>,
) -> AppResult<HttpResponse> {
    let (limit, offset) = Pagination {
        limit: query.limit,
        offset: query.offset,
    }
    .resolve();
    let filter = ArticleFilter {
        feed_source_id: query.feed_source_id,
        category: query.category,
        limit,
        offset,
    };

    let mut conn = pool.get()?;
    let articles = Article::list(&mut conn, &filter)?;
    Ok(HttpResponse::Ok().json(articles))
}

#[get("/{id}")]
pub async fn get_article(pool: RqDbPool, path: web::Path<RqArticleId>) -> AppResult<HttpResponse> {
    let mut conn = pool.get()?;
    match Article::get_by_id(&mut conn, path.id)? {
        Some(article) => Ok(HttpResponse::Ok().json(article)),
        None => Err(AppError::resource_not_found("Article")),
    }
}
