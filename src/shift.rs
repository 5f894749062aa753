//! Current-shift lookup against the production database.
//!
//! The production database is reached through an ordered list of endpoints;
//! the first one that accepts a connection is used for the life of the
//! source.

use crate::db::{repo, SqlValue, Store, StoreSettings};
use crate::error::DbError;
use crate::model::parse_timestamp;
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shift {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub work_group: String,
}

#[async_trait]
pub trait ShiftLookup: Send + Sync {
    async fn current_shift(&self) -> Result<Option<Shift>, DbError>;
}

#[derive(Debug, Clone)]
pub struct ShiftSource {
    store: Store,
    endpoint: String,
}

impl ShiftSource {
    /// Connects to the first reachable endpoint, in order.
    #[instrument(skip_all)]
    pub async fn connect(
        endpoints: &[String],
        pool_size: u32,
        statement_timeout: Duration,
    ) -> Result<Self, DbError> {
        let mut failures = Vec::new();
        for endpoint in endpoints {
            let settings = StoreSettings {
                url: endpoint.clone(),
                pool_size,
                statement_timeout,
            };
            match Store::connect(&settings).await {
                Ok(store) => {
                    info!(%endpoint, "connected to shift database");
                    return Ok(Self {
                        store,
                        endpoint: endpoint.clone(),
                    });
                }
                Err(err) => {
                    warn!(%endpoint, %err, "shift endpoint unavailable, trying next");
                    failures.push(format!("{endpoint}: {err}"));
                }
            }
        }
        if failures.is_empty() {
            return Err(DbError::ConnectionFailed("no shift endpoints configured".into()));
        }
        Err(DbError::ConnectionFailed(failures.join("; ")))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

#[async_trait]
impl ShiftLookup for ShiftSource {
    async fn current_shift(&self) -> Result<Option<Shift>, DbError> {
        let now = Local::now().naive_local();
        let Some(row) = repo::active_shift(&self.store, now).await? else {
            return Ok(None);
        };
        let text = |key: &str| row.get(key).and_then(SqlValue::as_text).map(str::to_string);
        let timestamp = |key: &str| {
            text(key)
                .as_deref()
                .and_then(parse_timestamp)
                .ok_or_else(|| DbError::Query(format!("CAL_SHIFTS.{key} is not a timestamp")))
        };
        Ok(Some(Shift {
            start: timestamp("START_SHIFT")?,
            end: timestamp("END_SHIFT")?,
            work_group: text("WORK_GROUP").unwrap_or_default(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    const CREATE_SHIFTS: &str = "CREATE TABLE CAL_SHIFTS (\
        START_SHIFT datetime NOT NULL, END_SHIFT datetime NOT NULL, WORK_GROUP varchar(8))";

    fn fmt(ts: NaiveDateTime) -> SqlValue {
        SqlValue::Text(ts.format(crate::model::TIMESTAMP_FORMAT).to_string())
    }

    #[tokio::test]
    async fn falls_back_to_next_endpoint() {
        let td = tempfile::tempdir().unwrap();
        let bad = format!("sqlite://{}", td.path().display());
        let good = "sqlite::memory:".to_string();
        let source = ShiftSource::connect(&[bad, good.clone()], 1, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(source.endpoint(), good);
    }

    #[tokio::test]
    async fn all_endpoints_failing_is_connection_failed() {
        let td = tempfile::tempdir().unwrap();
        let bad = format!("sqlite://{}", td.path().display());
        let err = ShiftSource::connect(&[bad], 1, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ConnectionFailed(_)));

        let err = ShiftSource::connect(&[], 1, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn current_shift_picks_active_window() {
        let endpoints = ["sqlite::memory:".to_string()];
        let source = ShiftSource::connect(&endpoints, 1, Duration::from_secs(5))
            .await
            .unwrap();
        source.store().update(CREATE_SHIFTS, &[]).await.unwrap();
        assert_eq!(source.current_shift().await.unwrap(), None);

        let now = Local::now().naive_local();
        let start = now - ChronoDuration::hours(2);
        let end = now + ChronoDuration::hours(10);
        for (s, e, group) in [
            (now - ChronoDuration::days(2), now - ChronoDuration::days(1), "A"),
            (start, end, "B"),
        ] {
            source
                .store()
                .update(
                    "INSERT INTO CAL_SHIFTS VALUES (?, ?, ?)",
                    &[fmt(s), fmt(e), SqlValue::Text(group.into())],
                )
                .await
                .unwrap();
        }

        let shift = source.current_shift().await.unwrap().unwrap();
        assert_eq!(shift.work_group, "B");
        assert_eq!(
            shift.start.format("%Y-%m-%d %H:%M:%S").to_string(),
            start.format("%Y-%m-%d %H:%M:%S").to_string()
        );
    }
}
