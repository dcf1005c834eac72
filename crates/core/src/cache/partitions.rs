//! Partition and entry operations on the SQLite store.

use async_trait::async_trait;
use chrono::Utc;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::storage::{CacheStorage, RequestKey, ResponseSnapshot};
use crate::Error;

type EntryRow = (String, i64, String, String, Vec<u8>);

fn snapshot_from_row(row: EntryRow) -> Result<ResponseSnapshot, Error> {
    let (url, status, status_text, headers_json, body) = row;
    let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status {status} out of range")))?;
    let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
    Ok(ResponseSnapshot { url, status, status_text, headers, body })
}

fn read_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn lookup(&self, name: &str, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        let name = name.to_string();
        let key_hash = key.hash();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, status_text, headers_json, body
                     FROM entries WHERE partition = ?1 AND key_hash = ?2",
                )?;

                match stmt.query_row(params![name, key_hash], read_entry) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(snapshot_from_row).transpose()
    }

    async fn lookup_any(&self, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        let key_hash = key.hash();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.url, e.status, e.status_text, e.headers_json, e.body
                     FROM entries e JOIN partitions p ON p.name = e.partition
                     WHERE e.key_hash = ?1
                     ORDER BY p.rowid ASC
                     LIMIT 1",
                )?;

                match stmt.query_row(params![key_hash], read_entry) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(snapshot_from_row).transpose()
    }

    async fn put(&self, name: &str, key: &RequestKey, response: &ResponseSnapshot) -> Result<(), Error> {
        let name = name.to_string();
        let key = key.clone();
        let key_hash = key.hash();
        let headers_json = serde_json::to_string(&response.headers)?;
        let response = response.clone();
        let stored_at = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, stored_at],
                )?;
                conn.execute(
                    "INSERT INTO entries (
                        partition, key_hash, method, url, status, status_text, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(partition, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        status_text = excluded.status_text,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        name,
                        key_hash,
                        key.method,
                        key.url,
                        i64::from(response.status),
                        response.status_text,
                        headers_json,
                        response.body,
                        stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn entry_count(&self, name: &str) -> Result<u64, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_snapshot(url: &str, body: &str) -> ResponseSnapshot {
        ResponseSnapshot {
            url: url.to_string(),
            status: 200,
            status_text: "OK".to_string(),
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_put_and_lookup() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("http://localhost:8080/index.html");
        db.put("aquanev-app-v1", &key, &make_snapshot(&key.url, "<html>")).await.unwrap();

        let found = db.lookup("aquanev-app-v1", &key).await.unwrap().unwrap();
        assert_eq!(found.body, b"<html>");
        assert_eq!(found.header("Content-Type"), Some("text/html"));
        assert!(db.has("aquanev-app-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_lookup_missing_partition_does_not_create() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("http://localhost:8080/");

        assert!(db.lookup("aquanev-app-v2", &key).await.unwrap().is_none());
        assert!(!db.has("aquanev-app-v2").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("https://fonts.gstatic.com/a.woff2");
        db.put("aquanev-ext-v1", &key, &make_snapshot(&key.url, "old")).await.unwrap();
        db.put("aquanev-ext-v1", &key, &make_snapshot(&key.url, "new")).await.unwrap();

        let found = db.lookup("aquanev-ext-v1", &key).await.unwrap().unwrap();
        assert_eq!(found.body, b"new");
        assert_eq!(db.entry_count("aquanev-ext-v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_method_is_part_of_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "http://localhost:8080/data";
        db.put("aquanev-app-v1", &RequestKey::get(url), &make_snapshot(url, "get")).await.unwrap();

        let head = db.lookup("aquanev-app-v1", &RequestKey::new("HEAD", url)).await.unwrap();
        assert!(head.is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("http://localhost:8080/");
        db.put("aquanev-app-v1", &key, &make_snapshot(&key.url, "shell")).await.unwrap();

        assert!(db.delete("aquanev-app-v1").await.unwrap());
        assert!(!db.delete("aquanev-app-v1").await.unwrap());
        assert_eq!(db.entry_count("aquanev-app-v1").await.unwrap(), 0);
        assert!(db.lookup_any(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_in_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("aquanev-app-v1").await.unwrap();
        db.open("aquanev-ext-v1").await.unwrap();
        db.open("aquanev-app-v1").await.unwrap();

        assert_eq!(db.keys().await.unwrap(), vec!["aquanev-app-v1", "aquanev-ext-v1"]);
    }

    #[tokio::test]
    async fn test_lookup_any_prefers_oldest_partition() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("https://example.org/logo.png");
        db.put("aquanev-app-v1", &key, &make_snapshot(&key.url, "first")).await.unwrap();
        db.put("aquanev-ext-v1", &key, &make_snapshot(&key.url, "second")).await.unwrap();

        let found = db.lookup_any(&key).await.unwrap().unwrap();
        assert_eq!(found.body, b"first");
    }
}
