//! Database module: the relational store adapter and the SQL it runs.
//!
//! - `store`: pooled connection handling, parameter binding, deadlines.
//! - `model`: dynamically typed rows returned by the adapter.
//! - `repo`: SQL-only functions for the robot tables.
//!
//! The record layer imports from `robot_live_data::db` directly.

pub mod model;
pub mod repo;
pub mod store;

pub use model::{Row, SqlValue};
pub use store::{Store, StoreSettings};
