use crate::db::{repo, Row, Store};
use crate::error::DbError;
use chrono::{Local, NaiveDate, NaiveDateTime};
use tracing::{info, instrument};

/// First day metric collection ran.
pub fn collection_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 6, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Pass-through read of historical metric rows. Both bounds are inclusive;
/// `start` defaults to the collection start and `end` to now.
#[instrument(skip_all)]
pub async fn metrics(
    store: &Store,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
) -> Result<Vec<Row>, DbError> {
    let start = start.unwrap_or_else(collection_start);
    let end = end.unwrap_or_else(|| Local::now().naive_local());
    let rows = repo::metrics_between(store, start, end).await?;
    info!(%start, %end, count = rows.len(), "metrics selected");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SqlValue, StoreSettings};

    #[tokio::test]
    async fn filters_by_from_time() {
        let mut settings = StoreSettings::new("sqlite::memory:");
        settings.pool_size = 1;
        let store = Store::connect(&settings).await.unwrap();
        store.run_migrations().await.unwrap();
        let rows = [
            (1, "2022-05-31 23:00:00"),
            (2, "2023-01-10 08:00:00"),
            (3, "2023-02-01 08:00:00"),
        ];
        for (id, from) in rows {
            store
                .update(
                    "INSERT INTO metrics (id, robot, fromTime, toTime, distance, deliveries) \
                     VALUES (?, 'Rover', ?, ?, 12.5, 3)",
                    &[
                        SqlValue::Integer(id),
                        SqlValue::Text(from.into()),
                        SqlValue::Text(from.into()),
                    ],
                )
                .await
                .unwrap();
        }

        let all = metrics(&store, None, None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![SqlValue::Integer(2), SqlValue::Integer(3)]);

        let jan = metrics(
            &store,
            crate::model::parse_timestamp("2023-01-01 00:00:00"),
            crate::model::parse_timestamp("2023-01-31 23:59:59"),
        )
        .await
        .unwrap();
        assert_eq!(jan.len(), 1);
        assert_eq!(jan[0]["deliveries"], SqlValue::Integer(3));
        assert_eq!(jan[0]["robot"], SqlValue::Text("Rover".into()));
    }
}
