use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;

use crate::{observability::render_metrics, tasks::JobManager, RqDbPool};

/// Health check endpoint for load balancers
#[get("")]
pub async fn health_check(pool: RqDbPool, manager: web::Data<JobManager>) -> impl Responder {
    let jobs = manager.get_jobs_status();
    match pool.get() {
        Ok(_) => HttpResponse::Ok().json(json!({
            "status": "healthy",
            "database": "connected",
            "jobs": jobs,
        })),
        Err(_) => HttpResponse::ServiceUnavailable().json(json!({
            "status": "unhealthy",
            "database": "disconnected",
            "jobs": jobs,
        })),
    }
}

/// Liveness check - simple check to see if the app is alive
#[get("/live")]
pub async fn liveness_check() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[get("/jobs")]
pub async fn jobs_check(manager: web::Data<JobManager>) -> impl Responder {
    let status = manager.get_jobs_status();
    if status.is_running {
        HttpResponse::Ok().json(status)
    } else {
        HttpResponse::ServiceUnavailable().json(status)
    }
}

#[get("/metrics")]
pub async fn metrics_endpoint(pool: RqDbPool, manager: web::Data<JobManager>) -> impl Responder {
    let body = render_metrics(pool.get().is_ok(), &manager.get_jobs_status());
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(body)
}

pub fn routes() -> actix_web::Scope {
    web::scope("/health")
        .service(health_check)
        .service(liveness_check)
        .service(jobs_check)
        .service(metrics_endpoint)
}
