use reqwest::StatusCode;
use thiserror::Error;

/// A feed source could not be fetched or parsed. Recovered per source.
#[derive(Debug, Error)]
#[error("feed source {feed_source_id}: {kind}")]
pub struct FetchError {
    pub feed_source_id: i32,
    #[source]
    pub kind: FetchErrorKind,
}

impl FetchError {
    pub fn new(feed_source_id: i32, kind: FetchErrorKind) -> Self {
        Self {
            feed_source_id,
            kind,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchErrorKind {
    #[error("invalid feed url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unsupported url scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected http status {0}")]
    Status(StatusCode),
    #[error("feed parsing error: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

/// One article could not be written. Recovered per record.
#[derive(Debug, Error)]
#[error("failed to store article '{original_id}' from feed source {feed_source_id}: {source}")]
pub struct StoreError {
    pub feed_source_id: i32,
    pub original_id: String,
    #[source]
    pub source: diesel::result::Error,
}

impl StoreError {
    /// The owning feed source no longer exists.
    pub fn is_source_removed(&self) -> bool {
        matches!(
            self.source,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::ForeignKeyViolation,
                _
            )
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerStateError {
    #[error("scheduler is already running")]
    AlreadyRunning,
    #[error("scheduler is not running")]
    NotRunning,
    #[error("no scheduled job named '{0}'")]
    UnknownJob(String),
}
