//! Event ingestion client.
//!
//! Buffers structured events in memory and delivers them in batches to an
//! HTTP ingestion endpoint from a dedicated worker thread. Producers never
//! wait on the network: a batch is posted when it fills up or when the
//! flush interval elapses, and failed batches are dropped.
//!
//! ```rust,no_run
//! use event_ingest::{Event, IngestClient, Options};
//!
//! let client = IngestClient::new("ingest.example.com", Options::default()).unwrap();
//! client.send(Event::new("user signed in", "auth").with_metadata("user_id", 42));
//! client.close().unwrap();
//! ```

mod actor;
mod batch;
mod client;
mod delivery;
mod endpoint;
mod error;
mod timer;
mod types;

pub use client::IngestClient;
pub use delivery::{compress, encode, HttpTransport, Payload, Transport};
pub use endpoint::{delivery_url, normalize_endpoint};
pub use error::{DeliveryError, Error};
pub use types::{
    DeliveryStats, ErrorCallback, Event, Options, DEFAULT_API_PATH, DEFAULT_BATCH_SIZE,
    DEFAULT_FLUSH_INTERVAL, DEFAULT_PENDING_QUEUE_CAPACITY, DEFAULT_REQUEST_TIMEOUT,
};
