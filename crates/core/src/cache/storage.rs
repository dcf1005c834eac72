//! Cache storage seam.
//!
//! The worker only talks to named partitions through [`CacheStorage`]. The
//! SQLite-backed [`CacheDb`](super::CacheDb) is the production implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::hash::compute_request_key;
use crate::Error;

/// Request descriptor used as the partition key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: &str, url: &str) -> Self {
        Self { method: method.to_ascii_uppercase(), url: url.to_string() }
    }

    /// Shorthand for a `GET` key.
    pub fn get(url: &str) -> Self {
        Self::new("GET", url)
    }

    /// Content-addressed hash of the key.
    pub fn hash(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }
}

/// Immutable snapshot of a response as stored in a partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ResponseSnapshot {
    /// Whether the status is in the 200-299 range.
    pub fn is_ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// First header value with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Durable named cache partitions.
///
/// Every call is atomic on its own; nothing spans calls.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the partition if it does not exist.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Whether the partition exists.
    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// Names of all existing partitions, in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a partition and all its entries. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Look up a request in one partition. A missing partition is a miss.
    async fn lookup(&self, name: &str, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error>;

    /// Look up a request across all partitions, oldest partition first.
    async fn lookup_any(&self, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error>;

    /// Store a response, replacing any previous entry for the same key.
    async fn put(&self, name: &str, key: &RequestKey, response: &ResponseSnapshot) -> Result<(), Error>;

    /// Number of entries in a partition.
    async fn entry_count(&self, name: &str) -> Result<u64, Error>;
}
