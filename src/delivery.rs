use crate::error::{DeliveryError, Error};
use crate::types::Event;

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

/// An encoded batch ready to be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub body: Vec<u8>,
    /// Value for the `Content-Encoding` header, set only when the body is compressed.
    pub content_encoding: Option<&'static str>,
}

/// Outbound side of delivery: posts one payload to the ingestion endpoint.
///
/// Only the worker thread calls `post`, one request at a time.
pub trait Transport: Send + 'static {
    fn post(&self, payload: &Payload) -> Result<(), DeliveryError>;
}

/// Serializes, optionally compresses, and posts a batch.
pub(crate) struct DeliveryClient {
    transport: Box<dyn Transport>,
    compression: bool,
}

impl DeliveryClient {
    pub(crate) fn new(transport: Box<dyn Transport>, compression: bool) -> Self {
        Self {
            transport,
            compression,
        }
    }

    pub(crate) fn deliver(&self, events: &[Event]) -> Result<(), DeliveryError> {
        let body = encode(events)?;
        let payload = if self.compression {
            Payload {
                body: compress(&body)?,
                content_encoding: Some("gzip"),
            }
        } else {
            Payload {
                body,
                content_encoding: None,
            }
        };
        self.transport.post(&payload)
    }
}

/// Encode events as a JSON array in buffer order.
pub fn encode(events: &[Event]) -> Result<Vec<u8>, DeliveryError> {
    Ok(serde_json::to_vec(events)?)
}

/// Gzip a payload body.
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>, DeliveryError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(DeliveryError::Compression)?;
    encoder.finish().map_err(DeliveryError::Compression)
}

/// HTTP(S) transport backed by a pooled `ureq` agent.
pub struct HttpTransport {
    agent: ureq::Agent,
    url: String,
}

impl HttpTransport {
    pub fn new(
        url: impl Into<String>,
        skip_tls_verify: bool,
        timeout: Option<Duration>,
    ) -> Result<Self, Error> {
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(skip_tls_verify)
            .danger_accept_invalid_hostnames(skip_tls_verify)
            .build()?;

        let mut builder = ureq::AgentBuilder::new().tls_connector(Arc::new(connector));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            agent: builder.build(),
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn post(&self, payload: &Payload) -> Result<(), DeliveryError> {
        let mut request = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json");
        if let Some(encoding) = payload.content_encoding {
            request = request.set("Content-Encoding", encoding);
        }

        match request.send_bytes(&payload.body) {
            Ok(resp) => {
                let status = resp.status();
                // Drain so the connection goes back to the pool
                let _ = std::io::copy(&mut resp.into_reader(), &mut std::io::sink());
                if !(200..300).contains(&status) {
                    return Err(DeliveryError::Rejected { status });
                }
                Ok(())
            }
            Err(ureq::Error::Status(status, resp)) => {
                let _ = std::io::copy(&mut resp.into_reader(), &mut std::io::sink());
                Err(DeliveryError::Rejected { status })
            }
            Err(ureq::Error::Transport(e)) => Err(DeliveryError::Transport(e.to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use std::sync::Mutex;

    /// Records every payload; fails when `reject` is set.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingTransport {
        pub(crate) payloads: Arc<Mutex<Vec<Payload>>>,
        pub(crate) reject: bool,
    }

    impl RecordingTransport {
        pub(crate) fn batches(&self) -> Vec<Vec<Event>> {
            self.payloads
                .lock()
                .unwrap()
                .iter()
                .map(|p| serde_json::from_slice(&decoded_body(p)).unwrap())
                .collect()
        }
    }

    impl Transport for RecordingTransport {
        fn post(&self, payload: &Payload) -> Result<(), DeliveryError> {
            self.payloads.lock().unwrap().push(payload.clone());
            if self.reject {
                Err(DeliveryError::Rejected { status: 500 })
            } else {
                Ok(())
            }
        }
    }

    pub(crate) fn decoded_body(payload: &Payload) -> Vec<u8> {
        match payload.content_encoding {
            Some("gzip") => {
                let mut out = Vec::new();
                GzDecoder::new(payload.body.as_slice())
                    .read_to_end(&mut out)
                    .unwrap();
                out
            }
            _ => payload.body.clone(),
        }
    }

    fn events() -> Vec<Event> {
        vec![
            Event::new("first", "test").with_metadata("n", 1),
            Event::new("second", "test"),
        ]
    }

    #[test]
    fn encode_is_json_array_in_order() {
        let body = encode(&events()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["message"], "first");
        assert_eq!(array[0]["metadata"]["n"], 1);
        assert_eq!(array[1]["message"], "second");
        assert!(array[1]["metadata"].is_null());
    }

    #[test]
    fn plain_delivery_has_no_content_encoding() {
        let transport = RecordingTransport::default();
        let client = DeliveryClient::new(Box::new(transport.clone()), false);
        client.deliver(&events()).unwrap();

        let payloads = transport.payloads.lock().unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].content_encoding, None);
        assert_eq!(payloads[0].body, encode(&events()).unwrap());
    }

    #[test]
    fn compressed_delivery_decodes_to_same_json() {
        let transport = RecordingTransport::default();
        let client = DeliveryClient::new(Box::new(transport.clone()), true);
        client.deliver(&events()).unwrap();

        let payloads = transport.payloads.lock().unwrap();
        assert_eq!(payloads[0].content_encoding, Some("gzip"));
        assert_ne!(payloads[0].body, encode(&events()).unwrap());
        assert_eq!(decoded_body(&payloads[0]), encode(&events()).unwrap());
    }

    #[test]
    fn transport_failure_is_returned() {
        let transport = RecordingTransport {
            reject: true,
            ..Default::default()
        };
        let client = DeliveryClient::new(Box::new(transport), false);
        let err = client.deliver(&events()).unwrap_err();
        assert!(matches!(err, DeliveryError::Rejected { status: 500 }));
    }

    /// URL of a local port that was just released, so nothing listens on it.
    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    #[test]
    fn unreachable_endpoint_is_transport_error() {
        let url = format!("{}/v1/batch", closed_port_url());
        let transport = HttpTransport::new(url, false, Some(Duration::from_secs(2))).unwrap();
        let payload = Payload {
            body: b"[]".to_vec(),
            content_encoding: None,
        };
        let err = transport.post(&payload).unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)));
    }

    #[test]
    fn skip_tls_verify_builds_transport() {
        for skip_tls_verify in [false, true] {
            let transport =
                HttpTransport::new("https://self-signed.example/v1/batch", skip_tls_verify, None)
                    .unwrap();
            assert_eq!(transport.url(), "https://self-signed.example/v1/batch");
        }
    }

    #[test]
    fn rejected_responses_are_drained_and_classified() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/v1/batch")
            .with_status(503)
            .with_body("unavailable")
            .expect(3)
            .create();

        let url = format!("{}/v1/batch", server.url());
        let transport = HttpTransport::new(url, false, Some(Duration::from_secs(5))).unwrap();
        let payload = Payload {
            body: b"[]".to_vec(),
            content_encoding: None,
        };
        for _ in 0..3 {
            let err = transport.post(&payload).unwrap_err();
            assert!(matches!(err, DeliveryError::Rejected { status: 503 }));
        }
        mock.assert();
    }
}
