use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::tasks::types::JobStatus;

/// Logging settings read from `LOG_LEVEL` and `LOG_FORMAT`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String,
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
        }
    }
}

/// Initialize structured logging. `log` records from dependencies and model
/// code are forwarded into the same subscriber.
pub fn init_logging(config: &ObservabilityConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        // JSON structured logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(false)
                    .with_span_list(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }

    info!(
        service = "amafor-news",
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.log_level,
        log_format = %config.log_format,
        "Logging initialized"
    );
}

/// Prometheus text exposition of database and job health.
pub fn render_metrics(database_up: bool, jobs: &JobStatus) -> String {
    let last_execution = jobs.last_execution.map(|t| t.timestamp()).unwrap_or(0);
    format!(
        "# HELP amafor_news_database_status Database health status (1=healthy, 0=unhealthy)\n\
         # TYPE amafor_news_database_status gauge\n\
         amafor_news_database_status {}\n\
         # HELP amafor_news_jobs_running Whether the feed scheduler is running\n\
         # TYPE amafor_news_jobs_running gauge\n\
         amafor_news_jobs_running {}\n\
         # HELP amafor_news_jobs_active_tasks Fetch cycles currently in flight\n\
         # TYPE amafor_news_jobs_active_tasks gauge\n\
         amafor_news_jobs_active_tasks {}\n\
         # HELP amafor_news_jobs_total Registered scheduler timers\n\
         # TYPE amafor_news_jobs_total gauge\n\
         amafor_news_jobs_total {}\n\
         # HELP amafor_news_jobs_last_execution_seconds Unix time the last fetch cycle finished\n\
         # TYPE amafor_news_jobs_last_execution_seconds gauge\n\
         amafor_news_jobs_last_execution_seconds {}\n",
        u8::from(database_up),
        u8::from(jobs.is_running),
        jobs.active_tasks,
        jobs.total_jobs,
        last_execution,
    )
}
