use super::model::{Row, SqlValue};
use crate::error::DbError;
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Column, Connection, Row as _, Sqlite, SqlitePool, TypeInfo, ValueRef};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Connection parameters for one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub url: String,
    pub pool_size: u32,
    pub statement_timeout: Duration,
}

impl StoreSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool_size: 8,
            statement_timeout: Duration::from_secs(5),
        }
    }
}

/// Relational store adapter over a bounded SQLite pool.
///
/// Every call borrows a pooled connection for a single statement and runs
/// under the configured deadline. Failures come back as [`DbError`] values.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    timeout: Duration,
    max_connections: usize,
}

impl Store {
    /// Build the pool and open the first connection eagerly.
    #[instrument(skip_all)]
    pub async fn connect(settings: &StoreSettings) -> Result<Self, DbError> {
        let url = prepare_sqlite_url(&settings.url);
        debug!(%url, pool_size = settings.pool_size, "creating connection pool");
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full);
        let max_connections = settings.pool_size.max(1);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            // Keeps in-memory databases alive between statements.
            .min_connections(1)
            .acquire_timeout(settings.statement_timeout)
            .connect_with(options)
            .await
            .map_err(|e| {
                error!(%e, "unable to connect to database");
                DbError::ConnectionFailed(e.to_string())
            })?;
        info!(%url, "connected to database");
        Ok(Self {
            pool,
            timeout: settings.statement_timeout,
            max_connections: max_connections as usize,
        })
    }

    /// Upper bound on statements that can run at once.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DbError::Query(e.to_string()))
    }

    /// Run a select and decode every row.
    #[instrument(skip_all)]
    pub async fn select(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DbError> {
        debug!(sql, ?params, "selecting");
        let result = async {
            let mut conn = self.acquire().await?;
            let fut = async {
                let rows = bind_params(sqlx::query(sql), params)
                    .fetch_all(&mut *conn)
                    .await?;
                rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()
            };
            self.with_deadline(fut).await
        };
        let rows = result.await.map_err(|e| {
            error!(%e, "unable to select");
            e
        })?;
        debug!(count = rows.len(), "selected rows");
        Ok(rows)
    }

    /// Execute a single statement in its own transaction and commit it.
    /// Returns the number of affected rows.
    #[instrument(skip_all)]
    pub async fn update(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DbError> {
        debug!(sql, ?params, "updating");
        let result = async {
            let mut conn = self.acquire().await?;
            let fut = async {
                let mut tx = conn.begin().await?;
                let res = bind_params(sqlx::query(sql), params)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                Ok::<_, sqlx::Error>(res.rows_affected())
            };
            self.with_deadline(fut).await
        };
        result.await.map_err(|e| {
            error!(%e, "unable to update");
            e
        })
    }

    // The deadline covers the statement itself; waiting for a free
    // connection is bounded separately by the pool's acquire timeout.
    async fn acquire(&self) -> Result<PoolConnection<Sqlite>, DbError> {
        self.pool.acquire().await.map_err(|e| match e {
            sqlx::Error::PoolTimedOut => DbError::Timeout(self.timeout),
            other => DbError::from(other),
        })
    }

    async fn with_deadline<T, F>(&self, fut: F) -> Result<T, DbError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => Err(DbError::from(e)),
            Err(_) => Err(DbError::Timeout(self.timeout)),
        }
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Integer(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Blob(b) => query.bind(b.as_slice()),
        };
    }
    query
}

// Decodes by the runtime storage class of each value, not the declared
// column type.
fn decode_row(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut out = Row::new();
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            let storage = raw.type_info().name().to_string();
            match storage.as_str() {
                "INTEGER" | "BOOLEAN" => SqlValue::Integer(row.try_get(i)?),
                "REAL" => SqlValue::Float(row.try_get(i)?),
                "BLOB" => SqlValue::Blob(row.try_get(i)?),
                _ => SqlValue::Text(row.try_get(i)?),
            }
        };
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = format!("sqlite://{expanded_path}");
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}
