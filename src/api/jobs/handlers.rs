use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{errors::AppResult, tasks::JobManager};

#[derive(Debug, Default, Deserialize)]
pub struct RunJobRequest {
    /// Defaults to the stale-feed sweep
    pub job: Option<String>,
}

#[get("")]
pub async fn get_jobs_status(manager: web::Data<JobManager>) -> HttpResponse {
    HttpResponse::Ok().json(manager.get_jobs_status())
}

/// Queues an immediate cycle of a running job. A cycle already in flight
/// for that job absorbs the request.
#[post("/run")]
pub async fn run_jobs(
    manager: web::Data<JobManager>,
    req: Option<web::Json<RunJobRequest>>,
) -> AppResult<HttpResponse> {
    let job = req.and_then(|r| r.into_inner().job);
    manager.run_now(job.as_deref())?;
    tracing::info!(job = job.as_deref().unwrap_or("default"), "Manual job run requested");
    Ok(HttpResponse::Accepted().json(json!({ "status": "queued" })))
}
