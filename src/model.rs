use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage format for `datetime` columns.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Closed set of validated native types for a live-data column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Integer,
    String,
    Float,
    Timestamp,
    Boolean,
}

impl TypeTag {
    /// Maps a raw catalog type name (`varchar(32)`, `TINYINT`, ...) to a tag.
    /// Returns `None` for names outside the known set.
    pub fn from_db_type(raw: &str) -> Option<Self> {
        let base = raw.split('(').next().unwrap_or(raw).trim();
        match base.to_ascii_lowercase().as_str() {
            "int" => Some(TypeTag::Integer),
            "varchar" => Some(TypeTag::String),
            "float" => Some(TypeTag::Float),
            "datetime" => Some(TypeTag::Timestamp),
            "tinyint" => Some(TypeTag::Boolean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Integer => "integer",
            TypeTag::String => "string",
            TypeTag::Float => "float",
            TypeTag::Timestamp => "timestamp",
            TypeTag::Boolean => "boolean",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live-data attribute of a robot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Disabled,
    Offline,
    Stuck,
    CurrentLocation,
    Displaying,
    NextLocation,
    UpdatedAt,
    LowBattery,
    LotList,
    Distance,
    YCoord,
    XCoord,
    ButtonPressed,
    Status,
    Battery,
}

impl Field {
    /// Every known field, in the order the bulk endpoint reports them.
    pub const ALL: [Field; 15] = [
        Field::Disabled,
        Field::Offline,
        Field::Stuck,
        Field::CurrentLocation,
        Field::Displaying,
        Field::NextLocation,
        Field::UpdatedAt,
        Field::LowBattery,
        Field::LotList,
        Field::Distance,
        Field::YCoord,
        Field::XCoord,
        Field::ButtonPressed,
        Field::Status,
        Field::Battery,
    ];

    /// API-facing name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Disabled => "disabled",
            Field::Offline => "offline",
            Field::Stuck => "stuck",
            Field::CurrentLocation => "current_location",
            Field::Displaying => "displaying",
            Field::NextLocation => "next_location",
            Field::UpdatedAt => "updated_at",
            Field::LowBattery => "low_battery",
            Field::LotList => "lot_list",
            Field::Distance => "distance",
            Field::YCoord => "y_coord",
            Field::XCoord => "x_coord",
            Field::ButtonPressed => "button_pressed",
            Field::Status => "status",
            Field::Battery => "battery",
        }
    }

    /// Column name in `live_data`.
    pub fn column(&self) -> &'static str {
        match self {
            Field::Disabled => "disabled",
            Field::Offline => "offline",
            Field::Stuck => "stuck",
            Field::CurrentLocation => "currentLocation",
            Field::Displaying => "displaying",
            Field::NextLocation => "nextLocation",
            Field::UpdatedAt => "updatedAt",
            Field::LowBattery => "lowBatteryThreshold",
            Field::LotList => "lotList",
            Field::Distance => "distance",
            Field::YCoord => "yCoord",
            Field::XCoord => "xCoord",
            Field::ButtonPressed => "buttonPressed",
            Field::Status => "status",
            Field::Battery => "battery",
        }
    }

    /// Type the migrations provision the field with.
    #[cfg(test)]
    pub fn declared_type(&self) -> TypeTag {
        match self {
            Field::Disabled | Field::Offline | Field::Stuck | Field::ButtonPressed => {
                TypeTag::Boolean
            }
            Field::CurrentLocation
            | Field::Displaying
            | Field::NextLocation
            | Field::LotList
            | Field::Status => TypeTag::String,
            Field::UpdatedAt => TypeTag::Timestamp,
            Field::LowBattery
            | Field::Distance
            | Field::YCoord
            | Field::XCoord
            | Field::Battery => TypeTag::Float,
        }
    }

    pub fn parse_field(name: &str) -> Option<Self> {
        Field::ALL.into_iter().find(|f| f.as_str() == name)
    }

    #[cfg(test)]
    pub fn from_column(column: &str) -> Option<Self> {
        Field::ALL.into_iter().find(|f| f.column() == column)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed live-data value as seen by callers of the record layer.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Native type of this value, or `None` for `Null`.
    pub fn type_tag(&self) -> Option<TypeTag> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(TypeTag::Boolean),
            Value::Integer(_) => Some(TypeTag::Integer),
            Value::Float(_) => Some(TypeTag::Float),
            Value::Text(_) => Some(TypeTag::String),
            Value::Timestamp(_) => Some(TypeTag::Timestamp),
        }
    }

    /// Name of the runtime type, used in mismatch reports.
    pub fn kind(&self) -> &'static str {
        self.type_tag().map(|t| t.as_str()).unwrap_or("null")
    }

    /// Best-effort conversion of a textual wire literal.
    ///
    /// Recognizes booleans, null, integers, floats, single/double quoted
    /// strings and `YYYY-MM-DD HH:MM:SS` timestamps. Anything else is kept as
    /// the raw string.
    pub fn parse_literal(raw: &str) -> Value {
        let s = raw.trim();
        match s {
            "True" | "true" => return Value::Bool(true),
            "False" | "false" => return Value::Bool(false),
            "None" | "null" => return Value::Null,
            _ => {}
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if looks_numeric(s) {
            if let Ok(f) = s.parse::<f64>() {
                return Value::Float(f);
            }
        }
        if s.len() >= 2 {
            let quoted = (s.starts_with('\'') && s.ends_with('\''))
                || (s.starts_with('"') && s.ends_with('"'));
            if quoted {
                return Value::Text(s[1..s.len() - 1].to_string());
            }
        }
        if let Some(ts) = parse_timestamp(s) {
            return Value::Timestamp(ts);
        }
        Value::Text(raw.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

// Rejects forms like "inf" or "NaN" that f64::from_str accepts.
fn looks_numeric(s: &str) -> bool {
    !s.is_empty()
        && s.chars().any(|c| c.is_ascii_digit())
        && s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

/// Parses stored or wire timestamps, with or without fractional seconds or a
/// `T` separator.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Outcome of writing one field for one robot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStatus {
    Success,
    Failed(String),
}

impl WriteStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, WriteStatus::Success)
    }
}

impl fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStatus::Success => f.write_str("write success"),
            WriteStatus::Failed(reason) => write!(f, "write failed: {reason}"),
        }
    }
}

impl Serialize for WriteStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_type_names_map_to_tags() {
        assert_eq!(TypeTag::from_db_type("int"), Some(TypeTag::Integer));
        assert_eq!(TypeTag::from_db_type("varchar(32)"), Some(TypeTag::String));
        assert_eq!(TypeTag::from_db_type("FLOAT"), Some(TypeTag::Float));
        assert_eq!(TypeTag::from_db_type("datetime"), Some(TypeTag::Timestamp));
        assert_eq!(TypeTag::from_db_type("tinyint"), Some(TypeTag::Boolean));
        assert_eq!(TypeTag::from_db_type("blob"), None);
        assert_eq!(TypeTag::from_db_type("text"), None);
    }

    #[test]
    fn field_table_is_consistent() {
        for field in Field::ALL {
            assert_eq!(Field::parse_field(field.as_str()), Some(field));
            assert_eq!(Field::from_column(field.column()), Some(field));
        }
        assert_eq!(Field::parse_field("buttonPressed"), None);
        assert_eq!(Field::LowBattery.column(), "lowBatteryThreshold");
    }

    #[test]
    fn parse_literal_variants() {
        assert_eq!(Value::parse_literal("True"), Value::Bool(true));
        assert_eq!(Value::parse_literal("false"), Value::Bool(false));
        assert_eq!(Value::parse_literal("None"), Value::Null);
        assert_eq!(Value::parse_literal("50"), Value::Integer(50));
        assert_eq!(Value::parse_literal("-3.5"), Value::Float(-3.5));
        assert_eq!(Value::parse_literal("1e3"), Value::Float(1000.0));
        assert_eq!(Value::parse_literal("'85'"), Value::Text("85".into()));
        assert_eq!(Value::parse_literal("inf"), Value::Text("inf".into()));
        assert_eq!(Value::parse_literal("Charging"), Value::Text("Charging".into()));
        assert_eq!(
            Value::parse_literal("2024-03-01 08:30:00"),
            Value::Timestamp(parse_timestamp("2024-03-01 08:30:00").unwrap())
        );
    }

    #[test]
    fn write_status_serializes_as_text() {
        let ok = serde_json::to_string(&WriteStatus::Success).unwrap();
        assert_eq!(ok, "\"write success\"");
        let failed = WriteStatus::Failed("boom".into());
        assert_eq!(failed.to_string(), "write failed: boom");
    }

    #[test]
    fn values_serialize_as_native_json() {
        let json = serde_json::to_value(vec![
            Value::Bool(true),
            Value::Float(1.5),
            Value::Text("x".into()),
            Value::Null,
        ])
        .unwrap();
        assert_eq!(json, serde_json::json!([true, 1.5, "x", null]));
    }
}
