use crate::schema::*;
use chrono::{DateTime, Duration, Utc};
use diesel::{
    backend::Backend,
    deserialize::{self, FromSql},
    prelude::*,
    serialize::{self, Output, ToSql},
    sql_types::Integer,
    AsExpression, FromSqlRow,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, PartialEq)]
#[diesel(table_name = feed_sources)]
pub struct FeedSource {
    pub id: i32,
    pub name: String,
    pub feed_url: String,
    pub category: FeedCategory,
    /// inactive sources are kept for history but never fetched
    pub is_active: bool,
    /// unix seconds, None if never fetched
    pub last_fetched_at: Option<i64>,
    pub fetch_status: FetchStatus,
    pub last_error: Option<String>,
    pub created_at: i64,
}

#[repr(i32)]
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, AsExpression, FromSqlRow)]
#[diesel(sql_type=Integer)]
#[serde(rename_all = "snake_case")]
pub enum FeedCategory {
    Sports = 0,
    General = 1,
    Business = 2,
    Entertainment = 3,
    Regional = 4,
}

impl FeedCategory {
    pub const ALL: [FeedCategory; 5] = [
        FeedCategory::Sports,
        FeedCategory::General,
        FeedCategory::Business,
        FeedCategory::Entertainment,
        FeedCategory::Regional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedCategory::Sports => "sports",
            FeedCategory::General => "general",
            FeedCategory::Business => "business",
            FeedCategory::Entertainment => "entertainment",
            FeedCategory::Regional => "regional",
        }
    }
}

impl fmt::Display for FeedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown feed category '{}'", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for FeedCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FeedCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl<DB> FromSql<Integer, DB> for FeedCategory
where
    DB: Backend,
    i32: FromSql<Integer, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> deserialize::Result<Self> {
        match i32::from_sql(bytes)? {
            0 => Ok(FeedCategory::Sports),
            1 => Ok(FeedCategory::General),
            2 => Ok(FeedCategory::Business),
            3 => Ok(FeedCategory::Entertainment),
            4 => Ok(FeedCategory::Regional),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl<DB> ToSql<Integer, DB> for FeedCategory
where
    DB: Backend,
    i32: ToSql<Integer, DB>,
{
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, DB>) -> serialize::Result {
        match self {
            FeedCategory::Sports => 0.to_sql(out),
            FeedCategory::General => 1.to_sql(out),
            FeedCategory::Business => 2.to_sql(out),
            FeedCategory::Entertainment => 3.to_sql(out),
            FeedCategory::Regional => 4.to_sql(out),
        }
    }
}

#[repr(i32)]
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, AsExpression, FromSqlRow)]
#[diesel(sql_type=Integer)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    NeverRun = 0,
    Ok = 1,
    Error = 2,
}

impl<DB> FromSql<Integer, DB> for FetchStatus
where
    DB: Backend,
    i32: FromSql<Integer, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> deserialize::Result<Self> {
        match i32::from_sql(bytes)? {
            0 => Ok(FetchStatus::NeverRun),
            1 => Ok(FetchStatus::Ok),
            2 => Ok(FetchStatus::Error),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl<DB> ToSql<Integer, DB> for FetchStatus
where
    DB: Backend,
    i32: ToSql<Integer, DB>,
{
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, DB>) -> serialize::Result {
        match self {
            FetchStatus::NeverRun => 0.to_sql(out),
            FetchStatus::Ok => 1.to_sql(out),
            FetchStatus::Error => 2.to_sql(out),
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = feed_sources)]
pub struct NewFeedSource<'a> {
    pub name: &'a str,
    pub feed_url: &'a str,
    pub category: FeedCategory,
    pub is_active: bool,
    pub fetch_status: FetchStatus,
    pub created_at: i64,
}

impl<'a> NewFeedSource<'a> {
    pub fn new(name: &'a str, feed_url: &'a str, category: FeedCategory) -> Self {
        NewFeedSource {
            name,
            feed_url,
            category,
            is_active: true,
            fetch_status: FetchStatus::NeverRun,
            created_at: Utc::now().timestamp(),
        }
    }

    pub fn insert(&self, conn: &mut SqliteConnection) -> QueryResult<FeedSource> {
        use crate::schema::feed_sources::dsl::*;
        diesel::insert_into(feed_sources)
            .values(self)
            .get_result(conn)
            .map_err(|e| {
                log::warn!("Error inserting feed source {}: {e:?}", self.feed_url);
                e
            })
    }
}

/// Admin-editable fields. `None` leaves the column untouched.
#[derive(Debug, Default, Serialize, Deserialize, AsChangeset)]
#[diesel(table_name = feed_sources)]
pub struct PartialFeedSource {
    pub name: Option<String>,
    pub feed_url: Option<String>,
    pub category: Option<FeedCategory>,
    pub is_active: Option<bool>,
}

impl PartialFeedSource {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.feed_url.is_none()
            && self.category.is_none()
            && self.is_active.is_none()
    }
}

impl FeedSource {
    pub fn get_by_id(conn: &mut SqliteConnection, source_id: i32) -> QueryResult<Option<FeedSource>> {
        use crate::schema::feed_sources::dsl::feed_sources;
        feed_sources.find(source_id).first::<FeedSource>(conn).optional()
    }

    pub fn get_all(conn: &mut SqliteConnection) -> QueryResult<Vec<FeedSource>> {
        use crate::schema::feed_sources::dsl::{feed_sources, id};
        feed_sources.order(id.asc()).load::<FeedSource>(conn)
    }

    pub fn get_by_category(
        conn: &mut SqliteConnection,
        wanted: FeedCategory,
    ) -> QueryResult<Vec<FeedSource>> {
        use crate::schema::feed_sources::dsl::{category, feed_sources, id};
        feed_sources
            .filter(category.eq(wanted))
            .order(id.asc())
            .load::<FeedSource>(conn)
    }

    /// Active sources never fetched, or last fetched strictly before `now - threshold`.
    pub fn needing_update(
        conn: &mut SqliteConnection,
        threshold: Duration,
        now: DateTime<Utc>,
    ) -> QueryResult<Vec<FeedSource>> {
        use crate::schema::feed_sources::dsl::{feed_sources, id, is_active, last_fetched_at};
        let cutoff = (now - threshold).timestamp();
        feed_sources
            .filter(is_active.eq(true))
            .filter(last_fetched_at.is_null().or(last_fetched_at.lt(cutoff)))
            .order(id.asc())
            .load::<FeedSource>(conn)
    }

    pub fn active_in_categories(
        conn: &mut SqliteConnection,
        wanted: &[FeedCategory],
    ) -> QueryResult<Vec<FeedSource>> {
        use crate::schema::feed_sources::dsl::{category, feed_sources, id, is_active};
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        feed_sources
            .filter(is_active.eq(true))
            .filter(category.eq_any(wanted.to_vec()))
            .order(id.asc())
            .load::<FeedSource>(conn)
    }

    pub fn update(
        conn: &mut SqliteConnection,
        source_id: i32,
        update: &PartialFeedSource,
    ) -> QueryResult<FeedSource> {
        use crate::schema::feed_sources::dsl::{feed_sources, id};
        diesel::update(feed_sources.filter(id.eq(source_id)))
            .set(update)
            .get_result(conn)
    }

    /// Stamps the outcome of a fetch attempt. `error` is None on success.
    pub fn record_fetch(
        conn: &mut SqliteConnection,
        source_id: i32,
        error: Option<&str>,
        at: DateTime<Utc>,
    ) -> QueryResult<FeedSource> {
        use crate::schema::feed_sources::dsl::{
            feed_sources, fetch_status, id, last_error, last_fetched_at,
        };
        let status = match error {
            Some(_) => FetchStatus::Error,
            None => FetchStatus::Ok,
        };
        diesel::update(feed_sources.filter(id.eq(source_id)))
            .set((
                last_fetched_at.eq(Some(at.timestamp())),
                fetch_status.eq(status),
                last_error.eq(error),
            ))
            .get_result(conn)
    }

    /// Removes the source and every article ingested from it.
    pub fn delete(conn: &mut SqliteConnection, source_id: i32) -> QueryResult<bool> {
        conn.immediate_transaction(|conn| {
            {
                use crate::schema::articles::dsl::{articles, feed_source_id};
                diesel::delete(articles.filter(feed_source_id.eq(source_id))).execute(conn)?;
            }
            use crate::schema::feed_sources::dsl::{feed_sources, id};
            let removed = diesel::delete(feed_sources.filter(id.eq(source_id))).execute(conn)?;
            Ok(removed > 0)
        })
    }
}
