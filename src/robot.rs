use crate::catalog::SchemaCatalog;
use crate::db::{repo, SqlValue};
use crate::error::RecordError;
use crate::model::{parse_timestamp, Field, TypeTag, Value, TIMESTAMP_FORMAT};
use tracing::{debug, error, info, info_span, instrument, Instrument, Span};

/// Normalizes a robot name to the storage convention: first letter
/// uppercased, remainder unchanged.
pub fn normalize_name(name: &str) -> String {
    let mut chars = name.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Typed accessor over one robot's `live_data` row.
///
/// Holds only the robot name, the catalog (which carries the store handle)
/// and a tracing span. Every `get`/`set` is an independent round trip.
#[derive(Debug, Clone)]
pub struct Robot {
    name: String,
    catalog: SchemaCatalog,
    span: Span,
}

impl Robot {
    /// Opens a record for `name`, which must be present in the robot list.
    pub async fn open(catalog: &SchemaCatalog, name: &str) -> Result<Self, RecordError> {
        let normalized = normalize_name(name);
        let span = info_span!("robot", name = %normalized);
        let known = catalog
            .robot_names()
            .instrument(span.clone())
            .await?;
        if !known.iter().any(|n| n == &normalized) {
            span.in_scope(|| info!("rejected unknown robot name"));
            return Err(RecordError::InvalidRobotName(name.to_string()));
        }
        Ok(Self {
            name: normalized,
            catalog: catalog.clone(),
            span,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self, field: Field) -> Result<Value, RecordError> {
        self.get_inner(field).instrument(self.span.clone()).await
    }

    pub async fn set(&self, field: Field, value: Value) -> Result<(), RecordError> {
        self.set_inner(field, value)
            .instrument(self.span.clone())
            .await
    }

    #[instrument(skip_all, fields(field = %field))]
    async fn get_inner(&self, field: Field) -> Result<Value, RecordError> {
        debug!("getting value");
        let tag = self
            .catalog
            .field_type(field.column())
            .await?
            .ok_or_else(|| RecordError::FieldNotFound(field.as_str().to_string()))?;
        let Some(raw) = repo::select_live_value(self.catalog.store(), field, &self.name).await?
        else {
            error!("robot is listed but has no live_data row");
            return Err(RecordError::NotFound(self.name.clone()));
        };
        let value = from_stored(tag, raw);
        debug!(%value, "received value");
        Ok(value)
    }

    #[instrument(skip_all, fields(field = %field))]
    async fn set_inner(&self, field: Field, value: Value) -> Result<(), RecordError> {
        debug!(%value, "validating new value");
        let expected = self
            .catalog
            .field_type(field.column())
            .await?
            .ok_or_else(|| RecordError::FieldNotFound(field.as_str().to_string()))?;
        if value.type_tag() != Some(expected) {
            info!(expected = %expected, actual = value.kind(), "rejected value");
            return Err(RecordError::TypeMismatch {
                field,
                expected,
                actual: value.kind(),
            });
        }

        let affected =
            repo::update_live_value(self.catalog.store(), field, &self.name, to_stored(value))
                .await?;
        if affected == 0 {
            error!("robot is listed but has no live_data row");
            return Err(RecordError::NotFound(self.name.clone()));
        }
        info!("value written");
        Ok(())
    }
}

// Interprets a stored scalar according to the column's declared type.
// Booleans live as 0/1 integers; timestamps as text.
fn from_stored(tag: TypeTag, raw: SqlValue) -> Value {
    match (tag, raw) {
        (_, SqlValue::Null) => Value::Null,
        (TypeTag::Boolean, SqlValue::Integer(i)) => Value::Bool(i != 0),
        (TypeTag::Timestamp, SqlValue::Text(s)) => match parse_timestamp(&s) {
            Some(ts) => Value::Timestamp(ts),
            None => Value::Text(s),
        },
        (TypeTag::Float, SqlValue::Integer(i)) => Value::Float(i as f64),
        (_, SqlValue::Integer(i)) => Value::Integer(i),
        (_, SqlValue::Float(f)) => Value::Float(f),
        (_, SqlValue::Text(s)) => Value::Text(s),
        (_, SqlValue::Blob(b)) => Value::Text(String::from_utf8_lossy(&b).into_owned()),
    }
}

fn to_stored(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(b)),
        Value::Integer(i) => SqlValue::Integer(i),
        Value::Float(f) => SqlValue::Float(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Timestamp(ts) => SqlValue::Text(ts.format(TIMESTAMP_FORMAT).to_string()),
    }
}
