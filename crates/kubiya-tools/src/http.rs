//! Shared HTTP plumbing for REST-backed tools

use bytes::Bytes;
use kubiya_core::{KubiyaError, KubiyaResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use std::time::{Duration, Instant};
use tracing::debug;

/// How requests authenticate
#[derive(Clone)]
pub enum Auth {
    None,
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// HTTP basic auth
    Basic { username: String, password: String },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::None => write!(f, "None"),
            Auth::Bearer(_) => write!(f, "Bearer(***)"),
            Auth::Basic { username, .. } => write!(f, "Basic({}:***)", username),
        }
    }
}

/// Raw response; status is not interpreted
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
    pub elapsed: Duration,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json(&self) -> KubiyaResult<serde_json::Value> {
        serde_json::from_slice(&self.body)
            .map_err(|e| KubiyaError::parse(format!("Failed to parse response: {}", e)))
    }

    /// First of `error`, `message`, `detail` in a JSON error body
    pub fn error_message(&self) -> Option<String> {
        let body: serde_json::Value = serde_json::from_slice(&self.body).ok()?;
        ["error", "message", "detail"]
            .iter()
            .filter_map(|field| body.get(*field))
            .find_map(|v| match v {
                serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
                serde_json::Value::Null => None,
                other if !other.is_string() => Some(other.to_string()),
                _ => None,
            })
    }
}

/// Client bound to one base URL and credential
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: &str, auth: Auth, timeout: Duration, verify_tls: bool) -> KubiyaResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!verify_tls)
            .timeout(timeout)
            .build()
            .map_err(|e| KubiyaError::tool(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.auth {
            Auth::None => builder,
            Auth::Bearer(token) => builder.bearer_auth(token),
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
        }
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }
}

/// Send and read the whole body. Only transport failures are errors.
pub async fn send(request: RequestBuilder) -> KubiyaResult<HttpResponse> {
    let start = Instant::now();
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status().as_u16();
    let body = response.bytes().await.map_err(transport_error)?;
    let elapsed = start.elapsed();
    debug!(status, bytes = body.len(), elapsed_ms = elapsed.as_millis() as u64, "HTTP response");
    Ok(HttpResponse { status, body, elapsed })
}

/// Map a reqwest failure to a transport error with a human hint
pub fn transport_error(e: reqwest::Error) -> KubiyaError {
    if e.is_timeout() {
        KubiyaError::timeout(format!("Request timed out. Check network connectivity. ({})", e))
    } else if e.is_connect() {
        let detail = e.to_string();
        let hint = if detail.contains("dns") || detail.contains("resolve") {
            "Could not resolve host. Check the server URL."
        } else if detail.contains("certificate") || detail.contains("tls") || detail.contains("ssl") {
            "SSL/TLS connection failed. Check that the endpoint supports HTTPS."
        } else {
            "Failed to connect to host. Check the endpoint URL and network connectivity."
        };
        KubiyaError::transport(format!("{} ({})", hint, detail))
    } else if e.is_body() || e.is_decode() {
        KubiyaError::transport(format!("Failed to read response body: {}", e))
    } else {
        KubiyaError::transport(format!("Request failed: {}", e))
    }
}

/// Prefix `https://` when no scheme is given; drop trailing slashes
pub fn normalize_base_url(server: &str) -> String {
    let server = server.trim().trim_end_matches('/');
    if server.starts_with("http://") || server.starts_with("https://") {
        server.to_string()
    } else {
        format!("https://{}", server)
    }
}
