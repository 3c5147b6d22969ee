// VyOS HTTP API transport
//
// Each command is posted as a form with a JSON `data` field and the API key:
//   POST https://<host>:<port>/<endpoint>  data={"op": "...", "path": [...]}

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use zeroize::Zeroizing;

use super::CommandExecutor;
use crate::modules::{Command, CommandBatch};
use crate::output::errors::VyosError;
use crate::runtime::Response;

/// Connection options for one device
#[derive(Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub key: Zeroizing<String>,
    /// Socket level timeout
    pub timeout: Duration,
    pub validate_certs: bool,
    /// Extra PEM root certificate to trust
    pub ca_path: Option<PathBuf>,
    pub use_proxy: bool,
}

impl ApiConfig {
    pub fn new(host: impl Into<String>, key: impl Into<String>) -> Self {
        ApiConfig {
            host: host.into(),
            port: 443,
            key: Zeroizing::new(key.into()),
            timeout: Duration::from_secs(30),
            validate_certs: true,
            ca_path: None,
            use_proxy: true,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_validate_certs(mut self, validate: bool) -> Self {
        self.validate_certs = validate;
        self
    }

    pub fn with_ca_path(mut self, path: Option<PathBuf>) -> Self {
        self.ca_path = path;
        self
    }

    pub fn with_proxy(mut self, use_proxy: bool) -> Self {
        self.use_proxy = use_proxy;
        self
    }

    /// Base URL of the API
    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("validate_certs", &self.validate_certs)
            .field("ca_path", &self.ca_path)
            .field("use_proxy", &self.use_proxy)
            .finish()
    }
}

/// Reply envelope returned by every API endpoint
#[derive(Debug, Deserialize)]
struct ApiReply {
    success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for one VyOS device
pub struct ApiClient {
    config: ApiConfig,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, VyosError> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.validate_certs);

        if let Some(ref path) = config.ca_path {
            let pem = std::fs::read(path).map_err(|e| VyosError::Io {
                message: format!("Failed to read CA certificate: {}", e),
                path: Some(path.clone()),
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| VyosError::Io {
                message: format!("Invalid PEM CA certificate: {}", e),
                path: Some(path.clone()),
            })?;
            builder = builder.add_root_certificate(cert);
        }

        if !config.use_proxy {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| VyosError::transport(&config.host, format!("Failed to build HTTP client: {}", e)))?;

        Ok(ApiClient { config, client })
    }

    /// Run a single command and return its `data`
    async fn run_command(&self, command: &Command) -> Result<Value, VyosError> {
        let url = format!("{}/{}", self.config.base_url(), command.verb().endpoint());
        let payload = request_payload(command);

        debug!(host = %self.config.host, url = %url, "posting '{}'", command);

        let key: &str = &self.config.key;
        let reply = self
            .client
            .post(&url)
            .form(&[("data", payload.to_string().as_str()), ("key", key)])
            .send()
            .await
            .map_err(|e| self.request_error(command, e))?;

        let status = reply.status();
        if !status.is_success() {
            let body = reply.text().await.unwrap_or_default();
            return Err(VyosError::transport(
                &self.config.host,
                format!("'{}' returned HTTP {}: {}", command, status, body.trim()),
            ));
        }

        let reply: ApiReply = reply
            .json()
            .await
            .map_err(|e| self.request_error(command, e))?;

        parse_reply(&self.config.host, command, reply)
    }

    fn request_error(&self, command: &Command, err: reqwest::Error) -> VyosError {
        // reqwest hides the root cause (refused, certificate) in the source chain
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        if err.is_timeout() {
            message.push_str(" (timed out)");
        }
        VyosError::transport(&self.config.host, format!("'{}' failed: {}", command, message))
    }
}

#[async_trait]
impl CommandExecutor for ApiClient {
    async fn execute_commands(&self, batch: &CommandBatch) -> Result<Response, VyosError> {
        let mut response = Response::default();
        for command in batch.iter() {
            response.push(self.run_command(command).await?);
        }
        Ok(response)
    }

    fn host_name(&self) -> &str {
        &self.config.host
    }
}

/// JSON `data` field for a command
fn request_payload(command: &Command) -> Value {
    json!({
        "op": command.verb().as_str(),
        "path": command.path(),
    })
}

fn parse_reply(host: &str, command: &Command, reply: ApiReply) -> Result<Value, VyosError> {
    if reply.success {
        return Ok(reply.data);
    }

    let error = reply
        .error
        .unwrap_or_else(|| "device reported failure without an error message".to_string());
    Err(VyosError::rejected(host, command.text(), error.trim()))
}
