use actix_web::{delete, get, patch, post, web, HttpResponse};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use super::types::{FeedSourceCreate, FeedSourceQuery, RqSourceId};
use crate::{
    errors::{AppError, AppResult},
    models::feed_source::{FeedCategory, FeedSource, NewFeedSource, PartialFeedSource},
    tasks::feed_monitor::validate_feed_url,
    RqDbPool,
};

const MAX_NAME_LEN: usize = 200;

fn validate_name(name: &str) -> AppResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::invalid_input("name", "Name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::invalid_input("name", "Name is too long"));
    }
    Ok(name)
}

fn map_unique(err: DieselError) -> AppError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            AppError::duplicate_resource("Feed source with this URL")
        }
        other => other.into(),
    }
}

#[get("")]
pub async fn get_all_feed_sources(
    pool: RqDbPool,
    query: web::Query<FeedSourceQuery>,
) -> AppResult<HttpResponse> {
    let mut conn = pool.get()?;
    let sources = match query.category {
        Some(category) => FeedSource::get_by_category(&mut conn, category)?,
        None => FeedSource::get_all(&mut conn)?,
    };
    Ok(HttpResponse::Ok().json(sources))
}

#[post("")]
pub async fn create_feed_source(
    pool: RqDbPool,
    req: web::Json<FeedSourceCreate>,
) -> AppResult<HttpResponse> {
    let name = validate_name(&req.name)?;
    let url = validate_feed_url(&req.feed_url)?;
    let category = req.category.unwrap_or(FeedCategory::General);

    let mut conn = pool.get()?;
    let source = NewFeedSource::new(name, url.as_str(), category)
        .insert(&mut conn)
        .map_err(map_unique)?;

    tracing::info!(
        feed_source_id = source.id,
        feed_url = %source.feed_url,
        category = %source.category,
        "Feed source created"
    );
    Ok(HttpResponse::Created().json(source))
}

#[get("/{id}")]
pub async fn get_feed_source(
    pool: RqDbPool,
    path: web::Path<RqSourceId>,
) -> AppResult<HttpResponse> {
    let mut conn = pool.get()?;
    match FeedSource::get_by_id(&mut conn, path.id)? {
        Some(source) => Ok(HttpResponse::Ok().json(source)),
        None => Err(AppError::resource_not_found("Feed source")),
    }
}

#[patch("/{id}")]
pub async fn update_feed_source(
    pool: RqDbPool,
    path: web::Path<RqSourceId>,
    req: web::Json<PartialFeedSource>,
) -> AppResult<HttpResponse> {
    let mut update = req.into_inner();
    if update.is_empty() {
        return Err(AppError::invalid_input("body", "No fields to update"));
    }
    if let Some(name) = update.name.take() {
        update.name = Some(validate_name(&name)?.to_string());
    }
    if let Some(feed_url) = update.feed_url.take() {
        update.feed_url = Some(validate_feed_url(&feed_url)?.to_string());
    }

    let mut conn = pool.get()?;
    if FeedSource::get_by_id(&mut conn, path.id)?.is_none() {
        return Err(AppError::resource_not_found("Feed source"));
    }
    let source = FeedSource::update(&mut conn, path.id, &update).map_err(map_unique)?;

    tracing::info!(feed_source_id = source.id, "Feed source updated");
    Ok(HttpResponse::Ok().json(source))
}

#[delete("/{id}")]
pub async fn delete_feed_source(
    pool: RqDbPool,
    path: web::Path<RqSourceId>,
) -> AppResult<HttpResponse> {
    let mut conn = pool.get()?;
    if !FeedSource::delete(&mut conn, path.id)? {
        return Err(AppError::resource_not_found("Feed source"));
    }
    tracing::info!(feed_source_id = path.id, "Feed source deleted");
    Ok(HttpResponse::NoContent().finish())
}
