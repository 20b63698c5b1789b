use crate::batch::Batch;
use crate::delivery::DeliveryClient;
use crate::timer::FlushTimer;
use crate::types::{DeliveryStats, ErrorCallback, Event};

use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

#[derive(Debug)]
pub(crate) enum Command {
    AddEvent(Event),
    ForceFlush(SyncSender<()>),
    Stats(SyncSender<DeliveryStats>),
    Shutdown(SyncSender<()>),
}

/// Single owner of the pending batch.
///
/// Runs on the worker thread and handles one command or one timer tick per
/// iteration, so the batch never has a concurrent writer.
pub(crate) struct Actor {
    rx: Receiver<Command>,
    batch: Batch,
    delivery: DeliveryClient,
    timer: FlushTimer,
    stats: DeliveryStats,
    on_error: Option<ErrorCallback>,
}

impl Actor {
    pub(crate) fn new(
        rx: Receiver<Command>,
        delivery: DeliveryClient,
        batch_size: usize,
        flush_interval: Duration,
        on_error: Option<ErrorCallback>,
    ) -> Self {
        Self {
            rx,
            batch: Batch::new(batch_size),
            delivery,
            timer: FlushTimer::new(flush_interval, Instant::now()),
            stats: DeliveryStats::default(),
            on_error,
        }
    }

    pub(crate) fn run(mut self) {
        debug!("Ingest worker started");

        loop {
            // Check the timer before each receive so a busy queue cannot starve it
            if self.timer.fire(Instant::now()) {
                self.flush();
                continue;
            }

            let wait = self.timer.remaining(Instant::now());
            match self.rx.recv_timeout(wait) {
                Ok(command) => {
                    if !self.handle(command) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("All ingest handles dropped, flushing remaining events");
                    self.flush();
                    break;
                }
            }
        }

        debug!(
            "Ingest worker stopped: {} batches delivered, {} failed",
            self.stats.batches_delivered, self.stats.batches_failed
        );
    }

    /// Returns `false` once the worker must stop.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::AddEvent(event) => {
                if self.batch.push(event) {
                    self.flush();
                }
            }

            Command::ForceFlush(ack) => {
                self.flush();
                if ack.send(()).is_err() {
                    error!("Failed to acknowledge flush - caller dropped");
                }
            }

            Command::Stats(reply) => {
                if reply.send(self.stats).is_err() {
                    error!("Failed to send delivery stats - caller dropped");
                }
            }

            Command::Shutdown(ack) => {
                debug!("Ingest worker shutting down");
                self.flush();
                if ack.send(()).is_err() {
                    error!("Failed to acknowledge shutdown - caller dropped");
                }
                return false;
            }
        }
        true
    }

    /// Deliver the pending batch, if any. The batch is gone afterwards
    /// whether or not delivery succeeded.
    fn flush(&mut self) {
        let Some(events) = self.batch.take() else {
            return;
        };
        let count = events.len();

        match self.delivery.deliver(&events) {
            Ok(()) => {
                self.stats.record_delivered(count);
                debug!("Flushed batch of {count} events");
            }
            Err(err) => {
                self.stats.record_failed(count);
                warn!("Dropping batch of {count} events: {err}");
                if let Some(ref cb) = self.on_error {
                    cb(&err);
                }
            }
        }
    }
}
