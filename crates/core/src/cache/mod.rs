//! Versioned cache partitions backed by SQLite.
//!
//! This module provides the durable store behind the worker's named caches,
//! using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Two partition names derived from a single version token
//! - Lazy partition creation and whole-partition deletion
//! - Per-partition and cross-partition request lookup
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod partitions;
pub mod registry;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use registry::{Partition, PartitionNames, PartitionRegistry, PartitionSummary};
pub use storage::{CacheStorage, RequestKey, ResponseSnapshot};
