use chrono::Utc;
use futures_util::future::{join_all, BoxFuture};

use super::{fetcher::FeedFetcher, parser::ParsedArticle};
use crate::{
    models::{article::NewArticle, article::UpsertOutcome, feed_source::FeedSource},
    tasks::{
        errors::{FetchError, StoreError},
        scheduler::CycleRunner,
        types::{CycleSummary, CycleTarget},
    },
    DbPool,
};

/// The fetch-and-upsert cycle run by every scheduled timer.
pub struct IngestCycle {
    pool: DbPool,
    fetcher: FeedFetcher,
}

impl IngestCycle {
    pub fn new(pool: DbPool, fetcher: FeedFetcher) -> Self {
        Self { pool, fetcher }
    }

    /// Fetches every due source concurrently and stores what came back.
    /// Failures are logged per source or per article and never abort the cycle.
    pub async fn run(&self, target: &CycleTarget) -> CycleSummary {
        let sources = match self.select_sources(target) {
            Ok(sources) => sources,
            Err(e) => {
                tracing::error!(error = %e, ?target, "Could not load feed sources for cycle");
                return CycleSummary::default();
            }
        };
        if sources.is_empty() {
            tracing::debug!(?target, "No feed sources due");
            return CycleSummary::default();
        }

        tracing::info!(sources = sources.len(), ?target, "Starting fetch cycle");
        let results = join_all(sources.iter().map(|source| self.ingest_source(source))).await;

        let mut summary = CycleSummary::default();
        for result in &results {
            summary.merge(result);
        }
        summary
    }

    fn select_sources(&self, target: &CycleTarget) -> Result<Vec<FeedSource>, String> {
        let mut conn = self.pool.get().map_err(|e| e.to_string())?;
        let found = match target {
            CycleTarget::Stale { threshold } => {
                let threshold = chrono::Duration::from_std(*threshold).map_err(|e| e.to_string())?;
                FeedSource::needing_update(&mut conn, threshold, Utc::now())
            }
            CycleTarget::Categories(categories) => {
                FeedSource::active_in_categories(&mut conn, categories)
            }
        };
        found.map_err(|e| e.to_string())
    }

    async fn ingest_source(&self, source: &FeedSource) -> CycleSummary {
        let mut summary = CycleSummary {
            sources: 1,
            ..Default::default()
        };
        let fetched = self.fetcher.fetch(source).await;

        // no connection is held across the fetch above
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(
                    feed_source_id = source.id,
                    error = %e,
                    "Error getting DB connection, dropping fetched feed"
                );
                summary.failed = 1;
                return summary;
            }
        };

        // an admin may have deleted the source while it was being fetched
        match FeedSource::get_by_id(&mut conn, source.id) {
            Ok(Some(_)) => {}
            Ok(None) => {
                log_source_removed(source);
                return summary;
            }
            Err(e) => {
                tracing::error!(feed_source_id = source.id, error = %e, "Error reloading feed source");
                summary.failed = 1;
                return summary;
            }
        }

        let articles = match fetched {
            Ok(articles) => articles,
            Err(err) => {
                log_fetch_failure(source, &err);
                record_outcome(&mut conn, source, Some(&err.kind.to_string()));
                summary.failed = 1;
                return summary;
            }
        };

        for article in &articles {
            match store_article(&mut conn, source.id, article) {
                Ok(UpsertOutcome::Created) => summary.created += 1,
                Ok(UpsertOutcome::Updated) => summary.updated += 1,
                Err(e) if e.is_source_removed() => {
                    log_source_removed(source);
                    return summary;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Error storing article");
                    summary.store_errors += 1;
                }
            }
        }
        record_outcome(&mut conn, source, None);
        summary.succeeded = 1;

        tracing::info!(
            feed_source_id = source.id,
            feed_url = %source.feed_url,
            items = articles.len(),
            created = summary.created,
            updated = summary.updated,
            store_errors = summary.store_errors,
            "Feed processed"
        );
        summary
    }
}

impl CycleRunner for IngestCycle {
    fn run_cycle(&self, target: CycleTarget) -> BoxFuture<'_, CycleSummary> {
        Box::pin(async move { self.run(&target).await })
    }
}

fn log_source_removed(source: &FeedSource) {
    tracing::info!(
        feed_source_id = source.id,
        feed_url = %source.feed_url,
        "Feed source removed during fetch, dropping its articles"
    );
}

fn log_fetch_failure(source: &FeedSource, err: &FetchError) {
    tracing::warn!(
        feed_source_id = err.feed_source_id,
        feed_url = %source.feed_url,
        error = %err.kind,
        "Error fetching feed"
    );
}

fn record_outcome(conn: &mut diesel::SqliteConnection, source: &FeedSource, error: Option<&str>) {
    if let Err(e) = FeedSource::record_fetch(conn, source.id, error, Utc::now()) {
        tracing::warn!(feed_source_id = source.id, error = %e, "Error recording fetch status");
    }
}

fn store_article(
    conn: &mut diesel::SqliteConnection,
    feed_source_id: i32,
    article: &ParsedArticle,
) -> Result<UpsertOutcome, StoreError> {
    let row = NewArticle {
        feed_source_id,
        original_id: &article.original_id,
        title: &article.title,
        summary: article.summary.as_deref(),
        content: article.content.as_deref(),
        article_url: &article.article_url,
        published_at: article.published_at.timestamp(),
        thumbnail_url: article.thumbnail_url.as_deref(),
        ..Default::default()
    };
    row.upsert(conn)
        .map(|(_, outcome)| outcome)
        .map_err(|source| StoreError {
            feed_source_id,
            original_id: article.original_id.clone(),
            source,
        })
}
