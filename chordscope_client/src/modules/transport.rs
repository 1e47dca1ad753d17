use crate::modules::config::ClientConfig;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::{Request, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("transport failed: {0}")]
    Other(String),
}

/// A fully read response. Bodies here are small JSON documents or one audio file.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// Executes prepared requests. The api pipeline only talks to the network through this.
pub trait Transport: Send + Sync {
    fn execute(&self, request: Request) -> BoxFuture<'_, Result<RawResponse, TransportError>>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: Request) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
        async move {
            let resp = self.client.execute(request).await?;
            let status = resp.status();
            let body = resp.bytes().await?;
            Ok(RawResponse::new(status, body.to_vec()))
        }
        .boxed()
    }
}
