//! Client configuration: which server environment to talk to, which TLS
//! client identity to present, and how long to wait.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Environments
// ---------------------------------------------------------------------------

const PROD_WORKGROUP_URL: &str = "https://aswsweb.stanford.edu/mais/workgroupsvc/workgroups/2.0";
const UAT_WORKGROUP_URL: &str = "https://aswsuat.stanford.edu/mais/workgroupsvc/workgroups/2.0";

/// A named server environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production.
    Prod,
    /// Production-track test environment.
    Uat,
    /// Secondary test environment. Only the legacy XML Workgroup API runs
    /// there, so it has no endpoint usable by this client.
    Uat1,
    /// Caller-supplied Workgroup endpoint.
    Custom(String),
}

impl Environment {
    /// Base URL of the Workgroup service, without a trailing slash.
    pub fn workgroup_url(&self) -> Result<String, ConfigError> {
        let url = match self {
            Environment::Prod => PROD_WORKGROUP_URL,
            Environment::Uat => UAT_WORKGROUP_URL,
            Environment::Uat1 => return Err(ConfigError::UnsupportedEnvironment(self.to_string())),
            Environment::Custom(url) => url.as_str(),
        };
        Ok(url.trim_end_matches('/').to_string())
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Prod => write!(f, "PROD"),
            Environment::Uat => write!(f, "UAT"),
            Environment::Uat1 => write!(f, "UAT1"),
            Environment::Custom(url) => write!(f, "custom({})", url),
        }
    }
}

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

/// Connect/read timeout pair applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    /// How long to wait for the TCP/TLS connection to open.
    pub connect: Duration,
    /// How long to wait for the response once the request is sent.
    pub read: Duration,
}

impl Timeout {
    pub fn new(connect: Duration, read: Duration) -> Self {
        Self { connect, read }
    }

    /// Same value for both timeouts.
    pub fn uniform(timeout: Duration) -> Self {
        Self::new(timeout, timeout)
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(30))
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Everything needed to open an authenticated channel to one environment.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub environment: Environment,
    /// PEM file holding a client certificate, or a private key followed by
    /// the certificate.
    pub cert: PathBuf,
    /// PEM private key, when it is kept apart from the certificate.
    pub key: Option<PathBuf>,
    pub timeout: Timeout,
}

impl ClientConfig {
    pub fn new(environment: Environment, cert: impl AsRef<Path>) -> Self {
        Self {
            environment,
            cert: cert.as_ref().to_path_buf(),
            key: None,
            timeout: Timeout::default(),
        }
    }

    /// Production endpoints.
    pub fn prod(cert: impl AsRef<Path>) -> Self {
        Self::new(Environment::Prod, cert)
    }

    /// UAT endpoints.
    pub fn uat(cert: impl AsRef<Path>) -> Self {
        Self::new(Environment::Uat, cert)
    }

    /// UAT1 endpoints. Connecting fails, see [`Environment::Uat1`].
    pub fn uat1(cert: impl AsRef<Path>) -> Self {
        Self::new(Environment::Uat1, cert)
    }

    pub fn custom(url: impl Into<String>, cert: impl AsRef<Path>) -> Self {
        Self::new(Environment::Custom(url.into()), cert)
    }

    /// Use a private key stored in its own file.
    pub fn with_key(mut self, key: impl AsRef<Path>) -> Self {
        self.key = Some(key.as_ref().to_path_buf());
        self
    }

    pub fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read the identity PEM bundle: the key file (if any) followed by the
    /// certificate file.
    pub fn identity_pem(&self) -> Result<Vec<u8>, ConfigError> {
        let mut pem = Vec::new();
        if let Some(key) = &self.key {
            pem.extend(read_file(key)?);
            pem.push(b'\n');
        }
        pem.extend(read_file(&self.cert)?);
        Ok(pem)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}
