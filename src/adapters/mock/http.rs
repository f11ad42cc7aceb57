//! Mock HTTP client for testing.
//!
//! Provides a configurable mock HTTP client that can return predefined
//! responses or errors for testing purposes.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method (GET, POST or DELETE)
    pub method: String,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// Request body (for POST requests)
    pub body: Option<String>,
}

impl RecordedRequest {
    /// Parse the recorded body as JSON.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
    }
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a successful response
    Success(Response),
    /// Return an error
    Error(HttpError),
    /// Return a stream of bytes
    Stream(Vec<Bytes>),
    /// Return a stream error
    StreamError(HttpError),
}

/// Mock HTTP client for testing.
///
/// Responses are looked up in this order: a queued one-shot response for
/// `"METHOD url"`, a fixed response for `"METHOD url"`, a fixed response
/// for the URL (exact, then prefix), then the default.
///
/// # Example
///
/// ```ignore
/// use tether::adapters::mock::{MockHttpClient, MockResponse};
/// use tether::traits::{HttpClient, Response, Headers};
/// use bytes::Bytes;
///
/// let client = MockHttpClient::new();
/// client.set_method_response(
///     "DELETE",
///     "https://api.example.com/users/7/follow",
///     MockResponse::Success(Response::new(204, Bytes::new())),
/// );
///
/// let response = client.delete("https://api.example.com/users/7/follow", &Headers::new()).await?;
/// assert_eq!(response.status, 204);
/// assert_eq!(client.get_requests()[0].method, "DELETE");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    /// Configured responses by URL or "METHOD URL"
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    /// One-shot responses consumed in order
    queued: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    /// Default response when no specific match
    default_response: Arc<Mutex<Option<MockResponse>>>,
    /// Recorded requests for verification
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a response for a URL regardless of method.
    ///
    /// The URL is matched exactly first, then as a prefix.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        responses.insert(url.to_string(), response);
    }

    /// Set a response for one method on one URL.
    pub fn set_method_response(&self, method: &str, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        responses.insert(method_key(method, url), response);
    }

    /// Queue a one-shot response for one method on one URL.
    pub fn push_response(&self, method: &str, url: &str, response: MockResponse) {
        let mut queued = self.queued.lock().unwrap_or_else(|e| e.into_inner());
        queued
            .entry(method_key(method, url))
            .or_default()
            .push_back(response);
    }

    /// Set a default response for URLs without specific matches.
    pub fn set_default_response(&self, response: MockResponse) {
        let mut default = self.default_response.lock().unwrap_or_else(|e| e.into_inner());
        *default = Some(response);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Recorded requests made with `method`.
    pub fn requests_with_method(&self, method: &str) -> Vec<RecordedRequest> {
        self.get_requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    /// Clear all recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Clear all configured responses.
    pub fn clear_responses(&self) {
        self.responses.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.queued.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Record a request.
    fn record_request(&self, method: &str, url: &str, headers: &Headers, body: Option<String>) {
        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        requests.push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body,
        });
    }

    /// Get the response for a request.
    fn get_response(&self, method: &str, url: &str) -> Option<MockResponse> {
        let key = method_key(method, url);

        if let Some(queue) = self.queued.lock().unwrap_or_else(|e| e.into_inner()).get_mut(&key) {
            if let Some(response) = queue.pop_front() {
                return Some(response);
            }
        }

        let responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(response) = responses.get(&key) {
            return Some(response.clone());
        }

        if let Some(response) = responses.get(url) {
            return Some(response.clone());
        }

        // Prefix match, longest pattern first so specific paths win
        let mut prefixes: Vec<_> = responses
            .iter()
            .filter(|(pattern, _)| url.starts_with(pattern.as_str()))
            .collect();
        prefixes.sort_by_key(|(pattern, _)| std::cmp::Reverse(pattern.len()));
        if let Some((_, response)) = prefixes.first() {
            return Some((*response).clone());
        }

        let default = self.default_response.lock().unwrap_or_else(|e| e.into_inner());
        default.clone()
    }

    fn plain_response(&self, method: &str, url: &str) -> Result<Response, HttpError> {
        match self.get_response(method, url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            Some(MockResponse::Stream(_)) => Err(HttpError::Other(
                "Stream response on non-stream request".to_string(),
            )),
            Some(MockResponse::StreamError(err)) => Err(err),
            None => Err(HttpError::Other(format!(
                "No mock response for URL: {}",
                url
            ))),
        }
    }
}

fn method_key(method: &str, url: &str) -> String {
    format!("{} {}", method, url)
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("GET", url, headers, None);
        self.plain_response("GET", url)
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("POST", url, headers, Some(body.to_string()));
        self.plain_response("POST", url)
    }

    async fn delete(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("DELETE", url, headers, None);
        self.plain_response("DELETE", url)
    }

    async fn get_stream(&self, url: &str, headers: &Headers) -> Result<ByteStream, HttpError> {
        self.record_request("GET", url, headers, None);

        match self.get_response("GET", url) {
            Some(MockResponse::Stream(chunks)) => {
                let stream = futures::stream::iter(chunks.into_iter().map(Ok));
                Ok(Box::pin(stream))
            }
            Some(MockResponse::StreamError(err)) => Err(err),
            Some(MockResponse::Success(response)) => Err(HttpError::ServerError {
                status: response.status,
                message: "Non-stream response on stream request".to_string(),
            }),
            Some(MockResponse::Error(err)) => Err(err),
            None => Err(HttpError::Other(format!(
                "No mock response for URL: {}",
                url
            ))),
        }
    }
}
