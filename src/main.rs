use std::{io, time::Duration};

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use amafor_news::{
    api,
    config::{AppConfig, JobsConfig},
    initialize_db_pool,
    models::feed_source::{FeedCategory, NewFeedSource},
    observability::{init_logging, ObservabilityConfig},
    run_migrations,
    security::{AdminToken, SecurityHeaders},
    tasks::{
        feed_monitor::{validate_feed_url, FeedFetcher, IngestCycle},
        types::CycleTarget,
        JobManager,
    },
    DbPool,
};
use clap::Parser;
use dotenvy::dotenv;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// CLI options
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run one stale-feed cycle and exit
    #[clap(long)]
    run_once: bool,

    /// Register a feed source by URL and exit
    #[clap(long, value_name = "URL", requires = "name")]
    add_source: Option<String>,

    /// Display name for --add-source
    #[clap(long)]
    name: Option<String>,

    /// Category for --add-source
    #[clap(long, default_value = "general")]
    category: FeedCategory,
}

fn io_error(e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

fn main() -> io::Result<()> {
    dotenv().ok();

    init_logging(&ObservabilityConfig::from_env());

    let args = Args::parse();
    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        io_error(e)
    })?;

    let db_pool = initialize_db_pool(&config.db_path).map_err(io_error)?;
    tracing::info!("Running database migrations");
    run_migrations(&db_pool).map_err(io_error)?;

    if let Some(url) = args.add_source.as_deref() {
        return cli_add_source(&db_pool, url, args.name.as_deref().unwrap_or_default(), args.category);
    }
    if args.run_once {
        return run_once(db_pool, config.jobs);
    }

    run_server(config, db_pool)
}

fn cli_add_source(pool: &DbPool, url: &str, name: &str, category: FeedCategory) -> io::Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(io_error("--name cannot be empty"));
    }
    let url = validate_feed_url(url).map_err(io_error)?;

    let mut conn = pool.get().map_err(io_error)?;
    let source = NewFeedSource::new(name, url.as_str(), category)
        .insert(&mut conn)
        .map_err(io_error)?;
    println!(
        "Feed source {} created: {} ({}, {})",
        source.id, source.name, source.feed_url, source.category
    );
    Ok(())
}

#[actix_web::main]
async fn run_once(db_pool: DbPool, jobs: JobsConfig) -> io::Result<()> {
    let fetcher = FeedFetcher::new(jobs.fetch_timeout).map_err(io_error)?;
    let cycle = IngestCycle::new(db_pool, fetcher);
    let summary = cycle
        .run(&CycleTarget::Stale {
            threshold: jobs.stale_after,
        })
        .await;
    tracing::info!(?summary, "Single fetch cycle finished");
    Ok(())
}

#[actix_web::main]
async fn run_server(config: AppConfig, db_pool: DbPool) -> io::Result<()> {
    let manager = web::Data::new(JobManager::new(db_pool.clone(), config.jobs.clone()));
    manager.start_all_jobs().map_err(io_error)?;

    let admin_token = web::Data::new(AdminToken::new(config.admin_token.clone()));
    let cors_origin = config.cors_origin.clone();
    let server_manager = manager.clone();

    tracing::info!(
        "Starting server at http://{}:{}",
        config.bind_address,
        config.port
    );

    let result = HttpServer::new(move || {
        let cors = match &cors_origin {
            Some(origin) => Cors::default().allowed_origin(origin),
            None => Cors::default().allow_any_origin(),
        }
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);

        App::new()
            .wrap(tracing_actix_web::TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(middleware::NormalizePath::new(
                middleware::TrailingSlash::Trim,
            ))
            .wrap(SecurityHeaders)
            .wrap(cors)
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(server_manager.clone())
            .app_data(admin_token.clone())
            .service(api::health::routes())
            .service(api::routes::routes())
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await;

    tracing::info!("Server stopped, shutting down jobs");
    manager.stop_all_jobs();
    if !manager.wait_idle(SHUTDOWN_GRACE).await {
        tracing::warn!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "Fetch cycles still running at shutdown"
        );
    }
    result
}
