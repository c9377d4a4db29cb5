//! HTTP Transport
//!
//! The exchanger collaborator: the engine describes one request, the
//! transport returns one completed response. Cancellation of an in-flight
//! exchange is layered on by the flow, so implementations only need to honor
//! a plain asynchronous send.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{AuthError, AuthResult};

/// HTTP request definition.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

/// HTTP method; the engine only ever issues GET and POST.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Completed HTTP exchange.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// HTTP exchanger interface (for dependency injection).
#[async_trait]
pub trait HttpExchanger: Send + Sync {
    /// Send an HTTP request and await the completed exchange.
    async fn send(&self, request: HttpRequest) -> AuthResult<HttpResponse>;
}

/// Default reqwest-based exchanger.
pub struct ReqwestHttpExchanger {
    client: reqwest::Client,
    max_response_size: usize,
}

impl ReqwestHttpExchanger {
    /// Create a transport with default settings (30s timeout, 1MB cap).
    pub fn new() -> AuthResult<Self> {
        Self::with_options(Duration::from_secs(30), 1_048_576)
    }

    /// Create a transport with custom timeout and response-size cap.
    pub fn with_options(timeout: Duration, max_response_size: usize) -> AuthResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            // OAuth2 endpoints must never be followed through redirects.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::Generic(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_response_size,
        })
    }
}

#[async_trait]
impl HttpExchanger for ReqwestHttpExchanger {
    async fn send(&self, request: HttpRequest) -> AuthResult<HttpResponse> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AuthError::Generic(format!("Transport failure: {e}")))?;

        let status = response.status().as_u16();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.to_string().to_lowercase(), v.to_string());
            }
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_response_size {
                return Err(AuthError::Generic(format!(
                    "Response too large: {len} bytes"
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Generic(format!("Failed to read response body: {e}")))?;

        if body.len() > self.max_response_size {
            return Err(AuthError::Generic(format!(
                "Response too large: {} bytes",
                body.len()
            )));
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Mock exchanger for testing.
#[derive(Default)]
pub struct MockHttpExchanger {
    responses: std::sync::Mutex<Vec<AuthResult<HttpResponse>>>,
    request_history: std::sync::Mutex<Vec<HttpRequest>>,
}

impl MockHttpExchanger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response; responses are consumed first-in first-out.
    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        self.responses.lock().unwrap().push(Ok(response));
        self
    }

    /// Queue a JSON response with the given status.
    pub fn queue_json(&self, status: u16, body: &serde_json::Value) -> &Self {
        self.queue_response(HttpResponse {
            status,
            headers: [("content-type".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
            body: body.to_string(),
        })
    }

    /// Queue an error outcome.
    pub fn queue_error(&self, error: AuthError) -> &Self {
        self.responses.lock().unwrap().push(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.request_history.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.request_history.lock().unwrap().last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.request_history.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpExchanger for MockHttpExchanger {
    async fn send(&self, request: HttpRequest) -> AuthResult<HttpResponse> {
        self.request_history.lock().unwrap().push(request);

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(AuthError::Generic("No mock response available".into()));
        }
        responses.remove(0)
    }
}
