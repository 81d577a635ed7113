use std::time::Duration;

use actix_web::{http::StatusCode, test, web, App};
use amafor_news::{
    api,
    config::JobsConfig,
    models::{
        article::NewArticle,
        feed_source::{FeedCategory, NewFeedSource},
    },
    security::{AdminToken, SecurityHeaders},
    tasks::JobManager,
    ConnectionOptions, DbPool,
};
use diesel::r2d2::{self, ConnectionManager};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde_json::{json, Value};
use tempfile::TempDir;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/migrations");
const TOKEN: &str = "test-admin-token";

fn create_test_db() -> (TempDir, DbPool) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite://{}", db_path.display());

    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .max_size(4)
        .connection_customizer(Box::new(ConnectionOptions))
        .build(manager)
        .expect("Failed to create pool");

    // Run migrations
    let mut conn = pool.get().expect("Failed to get connection");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");

    (temp_dir, pool)
}

fn quiet_jobs() -> JobsConfig {
    JobsConfig {
        fetch_interval: Duration::from_secs(3600),
        priority_interval: None,
        ..Default::default()
    }
}

fn create_test_app(
    pool: DbPool,
    manager: web::Data<JobManager>,
    token: Option<&str>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        Config = (),
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(pool))
        .app_data(manager)
        .app_data(web::Data::new(AdminToken::new(token.map(str::to_string))))
        .wrap(SecurityHeaders)
        .service(api::health::routes())
        .service(api::routes::routes())
}

fn bearer() -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", TOKEN))
}

#[actix_web::test]
async fn test_health_endpoints() {
    let (_dir, pool) = create_test_db();
    let manager = web::Data::new(JobManager::new(pool.clone(), quiet_jobs()));
    let app = test::init_service(create_test_app(pool, manager.clone(), Some(TOKEN))).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["database"], "connected");
    assert_eq!(body["jobs"]["is_running"], false);

    // jobs not started yet
    let req = test::TestRequest::get().uri("/health/jobs").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    manager.start_all_jobs().unwrap();
    let req = test::TestRequest::get().uri("/health/jobs").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["is_running"], true);
    assert_eq!(body["total_jobs"], 1);
    assert!(body["next_execution"].is_string());

    let req = test::TestRequest::get().uri("/health/metrics").to_request();
    let body = test::call_and_read_body(&app, req).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("amafor_news_database_status 1"));
    assert!(text.contains("amafor_news_jobs_running 1"));

    manager.stop_all_jobs();
}

#[actix_web::test]
async fn test_admin_requires_valid_token() {
    let (_dir, pool) = create_test_db();
    let manager = web::Data::new(JobManager::new(pool.clone(), quiet_jobs()));
    let app = test::init_service(create_test_app(pool, manager, Some(TOKEN))).await;

    let req = test::TestRequest::get()
        .uri("/api/admin/feed-sources")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/admin/feed-sources")
        .insert_header(("Authorization", "Bearer wrong-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/admin/feed-sources")
        .insert_header(bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_admin_locked_without_configured_token() {
    let (_dir, pool) = create_test_db();
    let manager = web::Data::new(JobManager::new(pool.clone(), quiet_jobs()));
    let app = test::init_service(create_test_app(pool, manager, None)).await;

    let req = test::TestRequest::get()
        .uri("/api/admin/jobs")
        .insert_header(bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_feed_source_crud() {
    let (_dir, pool) = create_test_db();
    let manager = web::Data::new(JobManager::new(pool.clone(), quiet_jobs()));
    let app = test::init_service(create_test_app(pool, manager, Some(TOKEN))).await;

    let req = test::TestRequest::post()
        .uri("/api/admin/feed-sources")
        .insert_header(bearer())
        .set_json(json!({
            "name": "Amafor Sports",
            "feed_url": "https://amafor.example/sports.xml",
            "category": "sports"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["category"], "sports");
    assert_eq!(created["is_active"], true);
    assert_eq!(created["fetch_status"], "never_run");

    // same URL again
    let req = test::TestRequest::post()
        .uri("/api/admin/feed-sources")
        .insert_header(bearer())
        .set_json(json!({
            "name": "Duplicate",
            "feed_url": "https://amafor.example/sports.xml"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "DUPLICATE_RESOURCE");

    for bad_url in ["not a url", "ftp://amafor.example/feed"] {
        let req = test::TestRequest::post()
            .uri("/api/admin/feed-sources")
            .insert_header(bearer())
            .set_json(json!({ "name": "Bad", "feed_url": bad_url }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{bad_url}");
    }

    let req = test::TestRequest::get()
        .uri("/api/admin/feed-sources?category=business")
        .insert_header(bearer())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    let req = test::TestRequest::get()
        .uri("/api/admin/feed-sources?category=sports")
        .insert_header(bearer())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/admin/feed-sources/{}", id))
        .insert_header(bearer())
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/admin/feed-sources/{}", id))
        .insert_header(bearer())
        .set_json(json!({ "name": "Gladiators Sports", "is_active": false }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = test::read_body_json(resp).await;
    assert_eq!(updated["name"], "Gladiators Sports");
    assert_eq!(updated["is_active"], false);
    assert_eq!(updated["feed_url"], "https://amafor.example/sports.xml");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/feed-sources/{}", id))
        .insert_header(bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/feed-sources/{}", id))
        .insert_header(bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_article_listing() {
    let (_dir, pool) = create_test_db();
    {
        let mut conn = pool.get().unwrap();
        let sports = NewFeedSource::new("Sports", "https://amafor.example/s", FeedCategory::Sports)
            .insert(&mut conn)
            .unwrap();
        let business =
            NewFeedSource::new("Business", "https://amafor.example/b", FeedCategory::Business)
                .insert(&mut conn)
                .unwrap();
        for (source_id, key, published_at) in [
            (sports.id, "s1", 100),
            (sports.id, "s2", 300),
            (business.id, "b1", 200),
        ] {
            NewArticle {
                feed_source_id: source_id,
                original_id: key,
                title: key,
                article_url: "https://amafor.example/article",
                published_at,
                ..Default::default()
            }
            .upsert(&mut conn)
            .unwrap();
        }
    }
    let manager = web::Data::new(JobManager::new(pool.clone(), quiet_jobs()));
    let app = test::init_service(create_test_app(pool, manager, Some(TOKEN))).await;

    let req = test::TestRequest::get().uri("/api/articles").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["s2", "b1", "s1"]);

    let req = test::TestRequest::get()
        .uri("/api/articles?category=sports&limit=1")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "s2");

    let id = body[0]["id"].as_i64().unwrap();
    let req = test::TestRequest::get()
        .uri(&format!("/api/articles/{}", id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["original_id"], "s2");

    let req = test::TestRequest::get().uri("/api/articles/9999").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_manual_job_run() {
    let (_dir, pool) = create_test_db();
    let manager = web::Data::new(JobManager::new(pool.clone(), quiet_jobs()));
    let app = test::init_service(create_test_app(pool, manager.clone(), Some(TOKEN))).await;

    let req = test::TestRequest::post()
        .uri("/api/admin/jobs/run")
        .insert_header(bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    manager.start_all_jobs().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/admin/jobs/run")
        .insert_header(bearer())
        .set_json(json!({ "job": "no-such-job" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/admin/jobs/run")
        .insert_header(bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let req = test::TestRequest::get()
        .uri("/api/admin/jobs")
        .insert_header(bearer())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["is_running"], true);

    manager.stop_all_jobs();
    assert!(manager.wait_idle(Duration::from_secs(5)).await);
}
