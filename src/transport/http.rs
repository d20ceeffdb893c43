/// Mutual-TLS HTTPS transport.
///
/// Presents the configured client certificate on every request, asks for JSON
/// responses, and bounds each call by the configured connect/read timeouts.
/// No retries: a timeout surfaces as `TransportError::Timeout`.
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Identity, Url};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ConfigError, TransportError};
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};

const USER_AGENT: &str = concat!("workgroup-client/", env!("CARGO_PKG_VERSION"));

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Build the HTTP client for `config`, loading the TLS identity up front
    /// so a bad certificate fails here rather than on the first request.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let base_url = config.environment.workgroup_url()?;
        let pem = config.identity_pem()?;
        let identity =
            Identity::from_pem(&pem).map_err(|e| ConfigError::Certificate(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .identity(identity)
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .connect_timeout(config.timeout.connect)
            .timeout(config.timeout.read)
            .build()
            .map_err(|e| ConfigError::Http(e.to_string()))?;

        log::debug!("HTTP transport ready for {} ({})", config.environment, base_url);
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        // Url::join would read the colon in a workgroup name as a scheme
        // separator, so paths are appended textually.
        let raw = if request.path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, request.path)
        };
        let mut url = Url::parse(&raw).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

impl Transport for HttpTransport {
    fn perform(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(request)?;
        log::debug!("{} {}", request.method, url);

        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Head => self.client.head(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder.send().map_err(classify)?;
        let status = response.status().as_u16();
        let text = response.text().map_err(classify)?;
        Ok(ApiResponse::new(status, parse_body(&text)))
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("  \n"), Value::Null);
        assert_eq!(parse_body("{\"name\":\"a:b\"}"), json!({"name": "a:b"}));
        assert_eq!(
            parse_body("<html>Bad Gateway</html>"),
            Value::String("<html>Bad Gateway</html>".to_string())
        );
    }

    #[test]
    fn test_missing_certificate_is_config_error() {
        let config = ClientConfig::custom("https://example.com/wg/v2", "/nonexistent/cert.pem");
        assert!(matches!(HttpTransport::new(&config), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_uat1_rejected_before_loading_certificate() {
        let config = ClientConfig::uat1("/nonexistent/cert.pem");
        assert!(matches!(
            HttpTransport::new(&config),
            Err(ConfigError::UnsupportedEnvironment(_))
        ));
    }
}
