//! Core types and shared functionality for the AQUANEV offline worker.
//!
//! This crate provides:
//! - Versioned cache partitions with a SQLite backend
//! - Unified error types
//! - Worker configuration

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{
    CacheDb, CacheStorage, Partition, PartitionNames, PartitionRegistry, PartitionSummary, RequestKey, ResponseSnapshot,
};
pub use config::{HostMatch, WorkerConfig};
pub use error::Error;
