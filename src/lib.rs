//! Robot live-data service: typed access to each robot's current status row,
//! schema-driven validation, and bulk multi-robot reads and writes over HTTP.

pub mod api;
pub mod bulk;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod model;
pub mod robot;
pub mod shift;
