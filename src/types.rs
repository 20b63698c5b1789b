use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::error::DeliveryError;

/// Callback invoked from the worker thread when a batch could not be delivered.
pub type ErrorCallback = Box<dyn Fn(&DeliveryError) + Send + Sync>;

pub const DEFAULT_API_PATH: &str = "/v1/batch";
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_PENDING_QUEUE_CAPACITY: usize = 10_000;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A single structured event as accepted by the ingestion API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub message: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Option<Map<String, Value>>,
}

impl Event {
    /// Create an event stamped with the current time and no metadata.
    pub fn new(message: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: source.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach one metadata entry, creating the map on first use.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Configuration for the ingestion client.
///
/// Zero values for `batch_size`, `flush_interval` and `pending_queue_capacity`
/// fall back to their defaults.
pub struct Options {
    /// Path appended to the endpoint. Default: `/v1/batch`.
    pub api_path: String,
    /// Number of buffered events that triggers a flush. Default: 100.
    pub batch_size: usize,
    /// Time between periodic flushes. Default: 1s.
    pub flush_interval: Duration,
    /// Maximum number of commands waiting for the worker. Default: 10,000.
    pub pending_queue_capacity: usize,
    /// Accept invalid or self-signed TLS certificates.
    pub skip_tls_verify: bool,
    /// Gzip the request body.
    pub use_compression: bool,
    /// Upper bound on a single delivery request. `None` waits forever. Default: 5s.
    pub request_timeout: Option<Duration>,
    /// Optional callback for failed deliveries. Runs on the worker thread,
    /// so it must not call back into the client.
    pub on_error: Option<ErrorCallback>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            api_path: DEFAULT_API_PATH.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            pending_queue_capacity: DEFAULT_PENDING_QUEUE_CAPACITY,
            skip_tls_verify: false,
            use_compression: false,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            on_error: None,
        }
    }
}

/// Delivery counters kept by the worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub batches_delivered: u64,
    pub batches_failed: u64,
    pub events_delivered: u64,
    pub events_dropped: u64,
}

impl DeliveryStats {
    pub(crate) fn record_delivered(&mut self, events: usize) {
        self.batches_delivered += 1;
        self.events_delivered += events as u64;
    }

    pub(crate) fn record_failed(&mut self, events: usize) {
        self.batches_failed += 1;
        self.events_dropped += events as u64;
    }

    /// Total number of delivery attempts, successful or not.
    pub fn attempts(&self) -> u64 {
        self.batches_delivered + self.batches_failed
    }
}
