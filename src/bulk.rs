//! Bulk data endpoint: multi-robot, multi-field reads and writes.
//!
//! Reads are all-or-nothing: the first failing lookup fails the whole call.
//! Writes isolate failures per (robot, field) and report a status for each.
//! In-flight lookups are capped at the pool size so that queued work never
//! waits out a statement deadline.

use crate::catalog::SchemaCatalog;
use crate::error::RecordError;
use crate::model::{Field, Value, WriteStatus};
use crate::robot::{normalize_name, Robot};
use futures::stream::{self, StreamExt, TryStreamExt};
use futures::FutureExt;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

pub type ReadResult = BTreeMap<String, BTreeMap<String, Value>>;
pub type WriteReport = BTreeMap<String, BTreeMap<String, WriteStatus>>;

/// Either every item, or an explicit list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Only(Vec<T>),
}

impl Selection<String> {
    /// Parses a path segment: `all`, or `&`-separated names.
    pub fn from_segment(segment: &str) -> Self {
        if segment == "all" {
            return Selection::All;
        }
        Selection::Only(
            segment
                .split('&')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct BulkData {
    catalog: SchemaCatalog,
}

impl BulkData {
    pub fn new(catalog: SchemaCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Reads every requested field for every requested robot.
    #[instrument(skip_all)]
    pub async fn read(
        &self,
        robots: &Selection<String>,
        fields: &Selection<String>,
    ) -> Result<ReadResult, RecordError> {
        let robots = self.resolve_robots(robots).await?;
        let fields = self.resolve_fields(fields)?;
        info!(?robots, ?fields, "reading live data");

        let width = self.width();
        let opens: Vec<_> = robots
            .iter()
            .map(|name| Robot::open(&self.catalog, name).boxed())
            .collect();
        let records: Vec<Robot> = stream::iter(opens)
            .buffered(width)
            .try_collect()
            .await?;
        let lookups: Vec<_> = records
            .iter()
            .flat_map(|robot| {
                fields.iter().map(move |&field| {
                    async move {
                        let value = robot.get(field).await?;
                        Ok::<_, RecordError>((robot.name(), field, value))
                    }
                    .boxed()
                })
            })
            .collect();
        let values: Vec<_> = stream::iter(lookups).buffered(width).try_collect().await?;

        let mut out = ReadResult::new();
        for robot in &records {
            out.entry(robot.name().to_string()).or_default();
        }
        for (robot, field, value) in values {
            out.entry(robot.to_string())
                .or_default()
                .insert(field.as_str().to_string(), value);
        }
        Ok(out)
    }

    /// Writes raw wire values for every requested robot. Never fails as a
    /// whole; each (robot, field) pair gets its own status.
    #[instrument(skip_all)]
    pub async fn write(
        &self,
        robots: &Selection<String>,
        fields: &BTreeMap<String, String>,
    ) -> WriteReport {
        let robots = match self.resolve_robots(robots).await {
            Ok(robots) => robots,
            Err(err) => {
                warn!(%err, "unable to resolve robot list");
                let mut report = WriteReport::new();
                report.insert(
                    "all".to_string(),
                    fields
                        .keys()
                        .map(|f| (f.clone(), WriteStatus::Failed(err.to_string())))
                        .collect(),
                );
                return report;
            }
        };
        info!(?robots, fields = ?fields.keys().collect::<Vec<_>>(), "writing live data");

        let report: WriteReport = stream::iter(robots.iter())
            .map(|name| self.write_robot(name, fields))
            .buffered(self.width())
            .collect::<WriteReport>()
            .boxed()
            .await;
        info!(?report, "write status");
        report
    }

    async fn write_robot(
        &self,
        name: &str,
        fields: &BTreeMap<String, String>,
    ) -> (String, BTreeMap<String, WriteStatus>) {
        let robot = match Robot::open(&self.catalog, name).await {
            Ok(robot) => robot,
            Err(err) => {
                let statuses = fields
                    .keys()
                    .map(|f| (f.clone(), WriteStatus::Failed(err.to_string())))
                    .collect();
                return (normalize_name(name), statuses);
            }
        };

        // Fields of one robot go one at a time; robots run side by side.
        let mut statuses = BTreeMap::new();
        for (key, raw) in fields {
            let status = match Field::parse_field(key) {
                None => WriteStatus::Failed(RecordError::FieldNotFound(key.clone()).to_string()),
                Some(field) => match robot.set(field, Value::parse_literal(raw)).await {
                    Ok(()) => WriteStatus::Success,
                    Err(err) => WriteStatus::Failed(err.to_string()),
                },
            };
            statuses.insert(key.clone(), status);
        }
        (robot.name().to_string(), statuses)
    }

    fn width(&self) -> usize {
        self.catalog.store().max_connections()
    }

    async fn resolve_robots(&self, robots: &Selection<String>) -> Result<Vec<String>, RecordError> {
        match robots {
            Selection::All => Ok(self.catalog.robot_names().await?),
            Selection::Only(names) => Ok(names.iter().map(|n| normalize_name(n)).collect()),
        }
    }

    fn resolve_fields(&self, fields: &Selection<String>) -> Result<Vec<Field>, RecordError> {
        match fields {
            Selection::All => Ok(self.catalog.known_fields().to_vec()),
            Selection::Only(names) => names
                .iter()
                .map(|n| Field::parse_field(n).ok_or_else(|| RecordError::FieldNotFound(n.clone())))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_parse() {
        assert_eq!(Selection::from_segment("all"), Selection::All);
        assert_eq!(
            Selection::from_segment("rover&scout"),
            Selection::Only(vec!["rover".into(), "scout".into()])
        );
        assert_eq!(
            Selection::from_segment("battery&&"),
            Selection::Only(vec!["battery".into()])
        );
    }
}
