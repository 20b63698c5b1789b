use crate::actor::{Actor, Command};
use crate::delivery::{DeliveryClient, HttpTransport, Transport};
use crate::endpoint::{delivery_url, normalize_endpoint};
use crate::error::Error;
use crate::types::{
    DeliveryStats, Event, Options, DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL,
    DEFAULT_PENDING_QUEUE_CAPACITY,
};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use tracing::debug;

/// Buffered ingestion client.
///
/// Events are handed to a dedicated worker thread through a bounded queue.
/// The worker batches them and posts each batch to the ingestion endpoint,
/// either when the batch is full or on the periodic flush interval.
/// Delivery is fire-and-forget: failed batches are logged and dropped.
pub struct IngestClient {
    tx: SyncSender<Command>,
    closed: AtomicBool,
    // Joined on close
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl IngestClient {
    /// Create a client posting to `<endpoint><api_path>` over HTTP(S).
    ///
    /// Endpoints without a scheme default to `https://`.
    pub fn new(endpoint: &str, opts: Options) -> Result<Arc<Self>, Error> {
        let base = normalize_endpoint(endpoint)?;
        let url = delivery_url(&base, &opts.api_path);
        let transport = HttpTransport::new(url, opts.skip_tls_verify, opts.request_timeout)?;
        Self::with_transport(opts, transport)
    }

    /// Create a client delivering through a custom transport.
    ///
    /// `api_path`, `skip_tls_verify` and `request_timeout` are transport
    /// concerns and are ignored here.
    pub fn with_transport<T: Transport>(opts: Options, transport: T) -> Result<Arc<Self>, Error> {
        let batch_size = if opts.batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            opts.batch_size
        };
        let flush_interval = if opts.flush_interval.is_zero() {
            DEFAULT_FLUSH_INTERVAL
        } else {
            opts.flush_interval
        };
        let queue_capacity = if opts.pending_queue_capacity == 0 {
            DEFAULT_PENDING_QUEUE_CAPACITY
        } else {
            opts.pending_queue_capacity
        };

        let (tx, rx) = sync_channel(queue_capacity);
        let delivery = DeliveryClient::new(Box::new(transport), opts.use_compression);
        let actor = Actor::new(rx, delivery, batch_size, flush_interval, opts.on_error);

        let handle = std::thread::Builder::new()
            .name("ingest-worker".to_string())
            .spawn(move || actor.run())
            .map_err(Error::Spawn)?;

        debug!(
            "Ingest client started: batch_size={batch_size}, flush_interval={flush_interval:?}, queue_capacity={queue_capacity}"
        );

        Ok(Arc::new(Self {
            tx,
            closed: AtomicBool::new(false),
            worker: Mutex::new(Some(handle)),
        }))
    }

    /// Queue an event for delivery. Blocks only while the pending queue is
    /// full. Events sent after `close` are dropped.
    pub fn send(&self, event: Event) {
        if self.closed.load(Ordering::Relaxed) {
            debug!("Ingest client closed, dropping event");
            return;
        }
        if self.tx.send(Command::AddEvent(event)).is_err() {
            debug!("Ingest worker stopped, dropping event");
        }
    }

    /// Queue an event without blocking. Fails with [`Error::QueueFull`] when
    /// the pending queue is at capacity.
    pub fn try_send(&self, event: Event) -> Result<(), Error> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(Error::Closed);
        }
        self.tx
            .try_send(Command::AddEvent(event))
            .map_err(|e| match e {
                TrySendError::Full(_) => Error::QueueFull,
                TrySendError::Disconnected(_) => Error::Closed,
            })
    }

    /// Deliver everything queued so far and wait for the attempt to finish.
    ///
    /// Succeeds once the flush has run, even if the delivery itself failed.
    pub fn flush(&self) -> Result<(), Error> {
        let (ack_tx, ack_rx) = sync_channel(1);
        self.tx
            .send(Command::ForceFlush(ack_tx))
            .map_err(|_| Error::Closed)?;
        ack_rx.recv().map_err(|_| Error::Closed)
    }

    /// Snapshot of the worker's delivery counters.
    pub fn stats(&self) -> Result<DeliveryStats, Error> {
        let (reply_tx, reply_rx) = sync_channel(1);
        self.tx
            .send(Command::Stats(reply_tx))
            .map_err(|_| Error::Closed)?;
        reply_rx.recv().map_err(|_| Error::Closed)
    }

    /// Drain everything queued before this call, flush the final batch and
    /// stop the worker. Idempotent.
    pub fn close(&self) -> Result<(), Error> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(()); // Already closed
        }

        let (ack_tx, ack_rx) = sync_channel(1);
        let acked = self.tx.send(Command::Shutdown(ack_tx)).is_ok() && ack_rx.recv().is_ok();

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.join().map_err(|_| Error::WorkerPanicked)?;
        }

        if acked {
            Ok(())
        } else {
            Err(Error::Closed)
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

impl Drop for IngestClient {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Relaxed) {
            let _ = self.close();
        }
    }
}
