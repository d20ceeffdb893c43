//! The authenticated HTTP channel to the Workgroup service.
//!
//! The core only needs "send this request, give me the status and parsed
//! body". [`Transport`] is that seam; [`http::HttpTransport`] is the
//! mutual-TLS implementation and tests plug in an in-memory server.

#[cfg(feature = "network")]
pub mod http;

use std::fmt;

use serde_json::Value;

use crate::error::TransportError;

#[cfg(feature = "network")]
pub use http::HttpTransport;

/// HTTP methods used by the Workgroup API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request against the Workgroup endpoint. `path` is relative to the
/// environment's base URL and never starts with a slash.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status code plus parsed body. Bodies that are not JSON are carried as
/// `Value::String`, empty bodies as `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Human-readable message for error reporting: the API's `message`
    /// field if present, else the raw body.
    pub fn message(&self) -> String {
        match &self.body {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            Value::Object(map) => match map.get("message") {
                Some(Value::String(message)) => message.clone(),
                _ => self.body.to_string(),
            },
            other => other.to_string(),
        }
    }
}

/// Blocking request/response channel. Timeouts and TLS are the
/// implementation's business; the core never retries.
pub trait Transport {
    fn perform(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn perform(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        (**self).perform(request)
    }
}

impl<T: Transport + ?Sized> Transport for std::rc::Rc<T> {
    fn perform(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        (**self).perform(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_message() {
        let response = ApiResponse::new(404, json!({"code": 404, "message": "Workgroup x:y does not exist"}));
        assert_eq!(response.message(), "Workgroup x:y does not exist");
        assert!(!response.is_success());

        let response = ApiResponse::new(500, Value::String("boom".to_string()));
        assert_eq!(response.message(), "boom");

        assert_eq!(ApiResponse::new(204, Value::Null).message(), "");
        assert!(ApiResponse::new(204, Value::Null).is_success());
    }

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::new(Method::Get, "")
            .with_query("type", "USER")
            .with_query("id", "someone");
        assert_eq!(request.query.len(), 2);
        assert_eq!(request.method.to_string(), "GET");
        assert!(request.body.is_none());
    }
}
