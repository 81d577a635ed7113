use super::handlers;
use actix_web::{web, Scope};

pub fn routes() -> Scope {
    web::scope("/articles")
        .service(handlers::list_articles)
        .service(handlers::get_article)
}
