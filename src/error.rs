/// Errors returned by the client handle.
///
/// Delivery failures never surface here; see [`DeliveryError`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("failed to build TLS connector: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("failed to spawn ingest worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ingest client is closed")]
    Closed,

    #[error("pending command queue is full")]
    QueueFull,

    #[error("ingest worker panicked")]
    WorkerPanicked,
}

/// Why a batch was dropped. Every variant is terminal for its batch.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("failed to encode batch: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to compress batch: {0}")]
    Compression(#[source] std::io::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("ingestion endpoint rejected batch with status {status}")]
    Rejected { status: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_display_includes_status() {
        let err = DeliveryError::Rejected { status: 503 };
        assert_eq!(
            err.to_string(),
            "ingestion endpoint rejected batch with status 503"
        );
    }

    #[test]
    fn closed_display() {
        assert_eq!(Error::Closed.to_string(), "ingest client is closed");
    }
}
