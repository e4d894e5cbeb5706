//! Where the knowledge table comes from.
//!
//! # Sources
//!
//! | Type | Backing |
//! |---|---|
//! | [`HttpKnowledgeSource`] | Remote sheet endpoint (`GET <endpoint>` → JSON payload) |
//! | [`FileKnowledgeSource`] | Local JSON file with the same payload shape |
//!
//! The table is fetched once at startup.  A failed fetch never crashes the
//! kiosk: [`fetch_with_retry`] waits a fixed delay and tries again.
//!
//! The HTTP source doubles as the analytics sink through [`QueryLog`]: every
//! submitted query is sent as `GET <endpoint>?query=<text>&action=logOnly`
//! on a detached task, and failures are dropped.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use kiosk_types::KioskError;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::table::KnowledgeTable;

// ─────────────────────────────────────────────────────────────────────────────
// Traits
// ─────────────────────────────────────────────────────────────────────────────

/// Loads a complete [`KnowledgeTable`].
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<KnowledgeTable, KioskError>;
}

/// Fire-and-forget sink for submitted query text.
///
/// Implementations must return immediately and must never surface errors.
pub trait QueryLog: Send + Sync {
    fn record(&self, query: &str);
}

/// Fetch from `source`, retrying after `retry_delay` on failure.
///
/// `max_attempts: None` retries forever, which is what a kiosk wants at
/// boot; tests pass a bound.
///
/// # Errors
///
/// Returns the last error once `max_attempts` fetches have failed.
pub async fn fetch_with_retry(
    source: &dyn KnowledgeSource,
    retry_delay: Duration,
    max_attempts: Option<u32>,
) -> Result<KnowledgeTable, KioskError> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match source.fetch().await {
            Ok(table) => {
                info!(
                    source = %source.describe(),
                    entries = table.entry_count(),
                    attempt,
                    "knowledge table loaded"
                );
                return Ok(table);
            }
            Err(e) => {
                if max_attempts.is_some_and(|max| attempt >= max) {
                    return Err(e);
                }
                warn!(
                    source = %source.describe(),
                    error = %e,
                    attempt,
                    retry_in_ms = retry_delay.as_millis() as u64,
                    "knowledge fetch failed; retrying"
                );
                tokio::time::sleep(retry_delay).await;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HttpKnowledgeSource
// ─────────────────────────────────────────────────────────────────────────────

/// The remote sheet endpoint.
#[derive(Debug, Clone)]
pub struct HttpKnowledgeSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpKnowledgeSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Send one analytics log request and wait for it.
    ///
    /// [`QueryLog::record`] wraps this in a detached task.
    pub async fn send_log(&self, query: &str) -> Result<(), KioskError> {
        self.client
            .get(&self.endpoint)
            .query(&[("query", query), ("action", "logOnly")])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map(|_| ())
            .map_err(|e| KioskError::KnowledgeFetch(format!("query log failed: {e}")))
    }
}

#[async_trait]
impl KnowledgeSource for HttpKnowledgeSource {
    fn describe(&self) -> String {
        self.endpoint.clone()
    }

    async fn fetch(&self) -> Result<KnowledgeTable, KioskError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| KioskError::KnowledgeFetch(format!("{} unreachable: {e}", self.endpoint)))?;

        if !response.status().is_success() {
            return Err(KioskError::KnowledgeFetch(format!(
                "{} returned HTTP {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| KioskError::KnowledgeFetch(format!("invalid JSON payload: {e}")))?;
        KnowledgeTable::from_sheets(&payload)
    }
}

impl QueryLog for HttpKnowledgeSource {
    fn record(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime; query log dropped");
            return;
        };
        let source = self.clone();
        let query = query.to_string();
        handle.spawn(async move {
            if let Err(e) = source.send_log(&query).await {
                debug!(error = %e, "query log dropped");
            }
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FileKnowledgeSource
// ─────────────────────────────────────────────────────────────────────────────

/// A JSON file on disk with the same shape as the remote payload.
#[derive(Debug, Clone)]
pub struct FileKnowledgeSource {
    path: PathBuf,
}

impl FileKnowledgeSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl KnowledgeSource for FileKnowledgeSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<KnowledgeTable, KioskError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            KioskError::KnowledgeFetch(format!("failed to read {}: {e}", self.path.display()))
        })?;
        let payload: Value = serde_json::from_str(&raw)
            .map_err(|e| KioskError::Serialization(format!("{}: {e}", self.path.display())))?;
        KnowledgeTable::from_sheets(&payload)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
