use super::handlers;
use actix_web::{web, Scope};

pub fn routes() -> Scope {
    web::scope("/jobs")
        .service(handlers::get_jobs_status)
        .service(handlers::run_jobs)
}
