//! Event source boundary.
//!
//! The aggregation core pulls already-decoded pass events from a source
//! with a high-water-mark cursor. `fetch_since` must return events in
//! non-decreasing `rtc_time` order per transponder and must be safe to
//! call repeatedly with the same cursor.

use crate::error::{RacecallError, Result};
use crate::timing::PassEvent;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

/// Pull-based supplier of decoded transponder passes.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch all events with `rtc_time > cursor`.
    ///
    /// Returns an empty batch when nothing new is available.
    async fn fetch_since(&self, cursor: u64) -> Result<Vec<PassEvent>>;

    /// Human-readable source description for diagnostics.
    fn describe(&self) -> String;
}

/// File-backed source reading one JSON pass event per line.
///
/// Loads the whole file up front; `fetch_since` replays events above the
/// cursor. Used for startup backfill testing and offline replay.
/// Malformed lines are logged and skipped, never fatal.
pub struct JsonlEventSource {
    events: Vec<PassEvent>,
    path: String,
}

impl JsonlEventSource {
    pub fn open(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut events = Vec::new();
        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<PassEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    eprintln!(
                        "racecall: skipping malformed pass event at {}:{}: {}",
                        path.display(),
                        lineno + 1,
                        e
                    );
                }
            }
        }
        events.sort_by_key(|e| e.rtc_time);
        Ok(Self {
            events,
            path: path.display().to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[async_trait]
impl EventSource for JsonlEventSource {
    async fn fetch_since(&self, cursor: u64) -> Result<Vec<PassEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.rtc_time > cursor)
            .cloned()
            .collect())
    }

    fn describe(&self) -> String {
        format!("jsonl file {}", self.path)
    }
}

/// HTTP source polling a decoder-bridge endpoint.
///
/// Expects `GET {url}?since={cursor}` to return a JSON array of pass
/// events above the cursor.
#[cfg(feature = "http-source")]
pub struct HttpEventSource {
    client: reqwest::Client,
    url: String,
}

#[cfg(feature = "http-source")]
impl HttpEventSource {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[cfg(feature = "http-source")]
#[async_trait]
impl EventSource for HttpEventSource {
    async fn fetch_since(&self, cursor: u64) -> Result<Vec<PassEvent>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("since", cursor)])
            .send()
            .await
            .map_err(|e| RacecallError::SourceFetch {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(RacecallError::SourceFetch {
                message: format!("{} returned {}", self.url, response.status()),
            });
        }

        response
            .json::<Vec<PassEvent>>()
            .await
            .map_err(|e| RacecallError::SourceDecode {
                message: e.to_string(),
            })
    }

    fn describe(&self) -> String {
        format!("http endpoint {}", self.url)
    }
}

/// Mock source for testing.
///
/// Serves scripted batches in order, then empty batches. Can be
/// configured to fail, and records the cursors it was called with.
#[derive(Default)]
pub struct MockEventSource {
    batches: Mutex<VecDeque<Vec<PassEvent>>>,
    fail_next: Mutex<bool>,
    cursors: Mutex<Vec<u64>>,
}

impl MockEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a batch to be served by the next fetch.
    pub fn with_batch(self, batch: Vec<PassEvent>) -> Self {
        self.batches.lock().unwrap_or_else(|e| e.into_inner()).push_back(batch);
        self
    }

    /// Make the next fetch fail with a source error.
    pub fn with_failure(self) -> Self {
        *self.fail_next.lock().unwrap_or_else(|e| e.into_inner()) = true;
        self
    }

    /// Cursors passed to `fetch_since`, in call order.
    pub fn cursors(&self) -> Vec<u64> {
        self.cursors.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn fetch_since(&self, cursor: u64) -> Result<Vec<PassEvent>> {
        self.cursors.lock().unwrap_or_else(|e| e.into_inner()).push(cursor);

        let mut fail = self.fail_next.lock().unwrap_or_else(|e| e.into_inner());
        if *fail {
            *fail = false;
            return Err(RacecallError::SourceFetch {
                message: "mock fetch failure".to_string(),
            });
        }
        drop(fail);

        Ok(self
            .batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_default())
    }

    fn describe(&self) -> String {
        "mock source".to_string()
    }
}
