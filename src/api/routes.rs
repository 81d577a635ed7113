use super::{articles, feed_sources, jobs};
use actix_web::{web, Scope};
use actix_web_httpauth::middleware::HttpAuthentication;

use crate::security::admin_validator;

/// Public read API plus the token-guarded `/admin` scope.
pub fn routes() -> Scope {
    web::scope("/api").service(articles::routes()).service(
        web::scope("/admin")
            .wrap(HttpAuthentication::bearer(admin_validator))
            .service(feed_sources::routes())
            .service(jobs::routes()),
    )
}
