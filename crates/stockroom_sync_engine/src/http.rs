//! HTTP remote implementation.
//!
//! This module provides an HTTP-based remote collection. The actual HTTP
//! client is abstracted via a trait to allow different implementations
//! (reqwest, hyper, ureq, etc.).
//!
//! Endpoints, relative to the base URL:
//! - `GET /collections/{name}` returns a JSON list of documents
//! - `PUT /collections/{name}/{id}` stores one JSON document

use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteCollection;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use stockroom_core::{Document, RecordId};
use tracing::debug;

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport.
pub trait HttpClient: Send + Sync {
    /// Sends a GET request and returns the response body.
    fn get(&self, url: &str) -> Result<Vec<u8>, String>;

    /// Sends a PUT request with a JSON body.
    fn put(&self, url: &str, body: Vec<u8>) -> Result<(), String>;

    /// Checks if the client is connected/healthy.
    fn is_healthy(&self) -> bool;
}

/// HTTP-based remote collection using JSON bodies.
pub struct HttpRemote<C: HttpClient> {
    /// Base URL of the document service (e.g., "https://inventory.example.com").
    base_url: String,
    /// HTTP client implementation.
    client: C,
    /// Connection state.
    connected: AtomicBool,
    /// Last error message.
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpRemote<C> {
    /// Creates a new HTTP remote.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Closes the remote; later calls fail as unavailable.
    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/collections/{}", self.base_url, collection)
    }

    fn ensure_connected(&self) -> SyncResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(SyncError::unavailable(format!(
                "not connected to {}",
                self.base_url
            )))
        }
    }

    fn record<T>(&self, url: &str, result: Result<T, String>) -> SyncResult<T> {
        match result {
            Ok(value) => {
                *self.last_error.write() = None;
                Ok(value)
            }
            Err(e) => {
                *self.last_error.write() = Some(e.clone());
                Err(SyncError::unavailable(format!("{}: {}", url, e)))
            }
        }
    }
}

impl<C: HttpClient> RemoteCollection for HttpRemote<C> {
    fn list_all(&self, collection: &str) -> SyncResult<Vec<Document>> {
        self.ensure_connected()?;
        let url = self.collection_url(collection);
        let body = self.record(&url, self.client.get(&url))?;

        let entries: Vec<Value> = serde_json::from_slice(&body)
            .map_err(|e| SyncError::Protocol(format!("failed to decode response: {}", e)))?;
        debug!(collection, count = entries.len(), "fetched remote collection");

        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::Object(doc) => Some(doc),
                _ => None,
            })
            .collect())
    }

    fn upsert(&self, collection: &str, id: &RecordId, document: &Document) -> SyncResult<()> {
        self.ensure_connected()?;
        let url = format!("{}/{}", self.collection_url(collection), id);
        let body = serde_json::to_vec(document)
            .map_err(|e| SyncError::Protocol(format!("failed to encode request: {}", e)))?;
        self.record(&url, self.client.put(&url, body))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.client.is_healthy()
    }
}

impl<C: HttpClient> std::fmt::Debug for HttpRemote<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRemote")
            .field("base_url", &self.base_url)
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
