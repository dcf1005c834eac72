//! In-process doubles for the network and storage seams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Semaphore;

use aquanev_core::{CacheDb, CacheStorage, Error, RequestKey, ResponseSnapshot};

use crate::fetch::{Network, Request, Response};

#[derive(Clone)]
enum Script {
    Respond { status: u16, body: String },
    Fail,
}

/// Network that answers from a per-URL script. Unscripted URLs fail.
#[derive(Default)]
pub struct ScriptedNetwork {
    scripts: Mutex<HashMap<String, Script>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), Script::Respond { status, body: body.to_string() });
    }

    pub fn fail(&self, url: &str) {
        self.scripts.lock().unwrap().insert(url.to_string(), Script::Fail);
    }

    /// Hold responses for `url` until permits are added to the returned gate.
    pub fn hold(&self, url: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().unwrap().insert(url.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        let gate = self.gates.lock().unwrap().get(&url).cloned();
        if let Some(gate) = gate {
            let permit = gate.acquire().await.map_err(|e| Error::Network(e.to_string()))?;
            permit.forget();
        }

        let script = self.scripts.lock().unwrap().get(&url).cloned();
        match script {
            Some(Script::Respond { status, body }) => Ok(Response {
                url,
                status,
                status_text: String::new(),
                headers: vec![("content-type".to_string(), "text/plain".to_string())],
                body: Bytes::from(body),
            }),
            Some(Script::Fail) | None => Err(Error::Network(format!("unreachable: {url}"))),
        }
    }
}

/// Storage wrapper that counts reads and writes.
pub struct CountingStorage {
    inner: CacheDb,
    lookups: AtomicUsize,
    puts: AtomicUsize,
}

impl CountingStorage {
    pub async fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: CacheDb::open_in_memory().await.unwrap(),
            lookups: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
        })
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStorage for CountingStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.inner.open(name).await
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.inner.has(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.keys().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.inner.delete(name).await
    }

    async fn lookup(&self, name: &str, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(name, key).await
    }

    async fn lookup_any(&self, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup_any(key).await
    }

    async fn put(&self, name: &str, key: &RequestKey, response: &ResponseSnapshot) -> Result<(), Error> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(name, key, response).await
    }

    async fn entry_count(&self, name: &str) -> Result<u64, Error> {
        self.inner.entry_count(name).await
    }
}
