//! Transport for outbound integration calls.

use std::collections::BTreeMap;
use std::time::Duration;

use afya_core::integrations::HttpMethod;

/// A fully composed outbound request.
#[derive(Debug, Clone)]
pub struct DownstreamRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
    pub timeout: Duration,
}

/// Any HTTP response, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct DownstreamResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// JSON body when it parses, otherwise the raw text as a JSON string.
    /// `None` for an empty body.
    pub body: Option<serde_json::Value>,
}

/// A call that produced no HTTP response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DownstreamError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("{0}")]
    Transport(String),
}

/// Sends composed requests to external systems.
#[async_trait::async_trait]
pub trait Downstream: Send + Sync {
    async fn send(&self, request: DownstreamRequest)
        -> Result<DownstreamResponse, DownstreamError>;
}

// ---------------------------------------------------------------------------
// reqwest implementation
// ---------------------------------------------------------------------------

/// [`Downstream`] over a shared `reqwest` client.
///
/// The per-request timeout covers connect, send, and reading the body.
#[derive(Debug, Clone)]
pub struct HttpDownstream {
    client: reqwest::Client,
}

impl HttpDownstream {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }

    async fn round_trip(
        &self,
        request: &DownstreamRequest,
    ) -> Result<DownstreamResponse, reqwest::Error> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .unwrap_or(reqwest::Method::GET);

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = response.bytes().await?;

        Ok(DownstreamResponse {
            status,
            headers,
            body: decode_body(&bytes),
        })
    }
}

#[async_trait::async_trait]
impl Downstream for HttpDownstream {
    async fn send(
        &self,
        request: DownstreamRequest,
    ) -> Result<DownstreamResponse, DownstreamError> {
        match tokio::time::timeout(request.timeout, self.round_trip(&request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) if e.is_timeout() => Err(DownstreamError::Timeout(request.timeout.as_secs())),
            Ok(Err(e)) => Err(DownstreamError::Transport(e.to_string())),
            Err(_elapsed) => Err(DownstreamError::Timeout(request.timeout.as_secs())),
        }
    }
}

/// Decode a response body as JSON, falling back to a JSON string.
pub fn decode_body(bytes: &[u8]) -> Option<serde_json::Value> {
    if bytes.is_empty() {
        return None;
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(_) => Some(serde_json::Value::String(
            String::from_utf8_lossy(bytes).into_owned(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use assert_matches::assert_matches;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    /// Serve a throwaway router on an ephemeral port.
    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn request(method: HttpMethod, url: String, timeout: Duration) -> DownstreamRequest {
        DownstreamRequest {
            method,
            url,
            headers: BTreeMap::from([("X-Trace".to_string(), "abc".to_string())]),
            body: Some(json!({"amount": 100})),
            timeout,
        }
    }

    #[test]
    fn decode_body_prefers_json() {
        assert_eq!(decode_body(b""), None);
        assert_eq!(decode_body(br#"{"ok":true}"#), Some(json!({"ok": true})));
        assert_eq!(decode_body(b"plain text"), Some(json!("plain text")));
    }

    #[test]
    fn timeout_message_names_the_limit() {
        assert_eq!(
            DownstreamError::Timeout(5).to_string(),
            "request timed out after 5s"
        );
    }

    #[tokio::test]
    async fn non_2xx_is_a_response_not_an_error() {
        let app = Router::new().route(
            "/pay",
            post(|Json(body): Json<serde_json::Value>| async move {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"echo": body})))
            }),
        );
        let addr = serve(app).await;

        let downstream = HttpDownstream::new().unwrap();
        let response = downstream
            .send(request(
                HttpMethod::Post,
                format!("http://{addr}/pay"),
                Duration::from_secs(5),
            ))
            .await
            .unwrap();

        assert_eq!(response.status, 422);
        assert_eq!(response.body, Some(json!({"echo": {"amount": 100}})));
        assert_eq!(
            response.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let app = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let addr = serve(app).await;

        let downstream = HttpDownstream::new().unwrap();
        let result = downstream
            .send(request(
                HttpMethod::Get,
                format!("http://{addr}/slow"),
                Duration::from_secs(1),
            ))
            .await;

        assert_matches!(result, Err(DownstreamError::Timeout(1)));
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let downstream = HttpDownstream::new().unwrap();
        let result = downstream
            .send(request(
                HttpMethod::Get,
                format!("http://{addr}/"),
                Duration::from_secs(2),
            ))
            .await;

        assert_matches!(result, Err(DownstreamError::Transport(_)));
    }
}
