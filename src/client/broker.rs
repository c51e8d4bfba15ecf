use std::time::Duration;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, HOST};
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tracing::warn;
use url::Url;

use crate::error::BridgeError;

/// The broker's answer to one interaction.
#[derive(Debug, Clone)]
pub struct BrokerReply {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Minimal HTTP/1.1 client for the contract broker.
///
/// Opens one connection per exchange; there is no pooling and no retry.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    timeout: Duration,
}

impl BrokerClient {
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// POST a JSON payload to `url` and collect the full response.
    ///
    /// Every failure to complete the exchange within the timeout, connect included,
    /// is reported as [`BridgeError::BrokerUnreachable`].
    pub async fn post_json(&self, url: &Url, payload: Bytes) -> Result<BrokerReply, BridgeError> {
        let unreachable = |reason: String| BridgeError::BrokerUnreachable {
            url: url.to_string(),
            reason,
        };

        let host = url
            .host_str()
            .ok_or_else(|| unreachable("missing host".to_string()))?;
        let port = url.port_or_known_default().unwrap_or(80);
        let authority = format!("{host}:{port}");

        let target = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        let request = Request::builder()
            .method(Method::POST)
            .uri(target)
            .header(HOST, &authority)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(payload))
            .map_err(|e| unreachable(e.to_string()))?;

        let exchange = async {
            let stream = TcpStream::connect(&authority)
                .await
                .map_err(|e| unreachable(e.to_string()))?;

            let (mut sender, conn) = http1::handshake(TokioIo::new(stream))
                .await
                .map_err(|e| unreachable(e.to_string()))?;

            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    warn!(error = %e, "Broker connection error");
                }
            });

            let response = sender
                .send_request(request)
                .await
                .map_err(|e| unreachable(e.to_string()))?;

            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| unreachable(e.to_string()))?
                .to_bytes();

            Ok::<_, BridgeError>(BrokerReply { status, body })
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| unreachable(format!("no response within {:?}", self.timeout)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = BrokerClient::new(Duration::from_secs(1));
        let url = Url::parse(&format!("http://127.0.0.1:{port}/pact/User/get_user")).unwrap();
        let err = client.post_json(&url, Bytes::from_static(b"{}")).await.unwrap_err();
        assert!(matches!(err, BridgeError::BrokerUnreachable { .. }));
    }

    #[tokio::test]
    async fn test_silent_broker_times_out() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let client = BrokerClient::new(Duration::from_millis(100));
        let url = Url::parse(&format!("http://127.0.0.1:{port}/pact/User/get_user")).unwrap();
        let err = client.post_json(&url, Bytes::from_static(b"{}")).await.unwrap_err();
        assert!(matches!(err, BridgeError::BrokerUnreachable { ref reason, .. } if reason.contains("no response")));
    }
}
