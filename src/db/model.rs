//! Row and scalar types returned by the store adapter.
//!
//! These mirror what SQLite hands back at runtime. Typed interpretation
//! happens in the record layer.

use serde::Serialize;
use std::collections::BTreeMap;

/// A dynamically typed scalar, as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// One result row keyed by column name.
pub type Row = BTreeMap<String, SqlValue>;
