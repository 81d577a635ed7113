use super::handlers;
use actix_web::{web, Scope};

pub fn routes() -> Scope {
    web::scope("/feed-sources")
        .service(handlers::get_all_feed_sources)
        .service(handlers::create_feed_source)
        .service(handlers::get_feed_source)
        .service(handlers::update_feed_source)
        .service(handlers::delete_feed_source)
}
