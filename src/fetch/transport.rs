use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url, header::ACCEPT};
use serde_json::Value;
use thiserror::Error;

const ERROR_BODY_PREVIEW: usize = 256;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response body is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Source of raw JSON payloads for the fetch client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path_and_query` relative to the API root.
    async fn get_json(&self, path_and_query: &str) -> Result<Value, NetworkError>;
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: &str) -> Result<Self, NetworkError> {
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Self::with_client(client, base)
    }

    pub fn with_client(client: Client, base: &str) -> Result<Self, NetworkError> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("databyte/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path_and_query: &str) -> Result<Url, NetworkError> {
        Ok(self.base.join(path_and_query.trim_start_matches('/'))?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, path_and_query: &str) -> Result<Value, NetworkError> {
        let url = self.url(path_and_query)?;
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            return Err(NetworkError::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_PREVIEW).collect(),
            });
        }

        serde_json::from_slice(&bytes).map_err(NetworkError::Decode)
    }
}
