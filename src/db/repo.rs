//! SQL for the robot tables. Column identifiers only ever come from the
//! static [`Field`] table; every caller-supplied value is bound.

use super::model::{Row, SqlValue};
use super::store::Store;
use crate::error::DbError;
use crate::model::{Field, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use tracing::instrument;

pub const LIVE_DATA_TABLE: &str = "live_data";

#[instrument(skip_all)]
pub async fn robot_names(store: &Store) -> Result<Vec<String>, DbError> {
    let rows = store
        .select("SELECT name FROM robot_list ORDER BY name", &[])
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.get("name").and_then(SqlValue::as_text))
        .map(str::to_string)
        .collect())
}

/// `(column, declared type)` pairs for `live_data`, optionally narrowed to
/// one column.
#[instrument(skip_all)]
pub async fn live_data_column_types(
    store: &Store,
    column: Option<&str>,
) -> Result<Vec<(String, String)>, DbError> {
    let mut sql = String::from("SELECT name, type FROM pragma_table_info(?)");
    let mut params = vec![SqlValue::Text(LIVE_DATA_TABLE.to_string())];
    if let Some(column) = column {
        sql.push_str(" WHERE name = ?");
        params.push(SqlValue::Text(column.to_string()));
    }
    let rows = store.select(&sql, &params).await?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            let name = row.get("name")?.as_text()?;
            let ty = row.get("type")?.as_text()?;
            Some((name.to_string(), ty.to_string()))
        })
        .collect())
}

/// Reads one column for one robot. `None` when no row matches the name.
#[instrument(skip_all)]
pub async fn select_live_value(
    store: &Store,
    field: Field,
    robot: &str,
) -> Result<Option<SqlValue>, DbError> {
    let column = field.column();
    let sql = format!("SELECT {column} FROM {LIVE_DATA_TABLE} WHERE name = ?");
    let rows = store
        .select(&sql, &[SqlValue::Text(robot.to_string())])
        .await?;
    Ok(rows
        .into_iter()
        .next()
        .map(|mut row| row.remove(column).unwrap_or(SqlValue::Null)))
}

/// Writes one column for one robot and returns the affected row count.
#[instrument(skip_all)]
pub async fn update_live_value(
    store: &Store,
    field: Field,
    robot: &str,
    value: SqlValue,
) -> Result<u64, DbError> {
    let sql = format!(
        "UPDATE {LIVE_DATA_TABLE} SET {} = ? WHERE name = ?",
        field.column()
    );
    store
        .update(&sql, &[value, SqlValue::Text(robot.to_string())])
        .await
}

/// Metric rows whose `fromTime` falls within `[start, end]`.
#[instrument(skip_all)]
pub async fn metrics_between(
    store: &Store,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<Row>, DbError> {
    store
        .select(
            "SELECT * FROM metrics WHERE fromTime BETWEEN ? AND ? ORDER BY fromTime",
            &[
                SqlValue::Text(start.format(TIMESTAMP_FORMAT).to_string()),
                SqlValue::Text(end.format(TIMESTAMP_FORMAT).to_string()),
            ],
        )
        .await
}

/// Latest shift window containing `now`, if any.
#[instrument(skip_all)]
pub async fn active_shift(store: &Store, now: NaiveDateTime) -> Result<Option<Row>, DbError> {
    let rows = store
        .select(
            "SELECT START_SHIFT, END_SHIFT, WORK_GROUP FROM CAL_SHIFTS \
             WHERE ? BETWEEN START_SHIFT AND END_SHIFT \
             ORDER BY START_SHIFT DESC LIMIT 1",
            &[SqlValue::Text(now.format(TIMESTAMP_FORMAT).to_string())],
        )
        .await?;
    Ok(rows.into_iter().next())
}
