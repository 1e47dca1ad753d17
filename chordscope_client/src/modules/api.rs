use crate::modules::config::ClientConfig;
use crate::modules::credentials::{attach_bearer, stored_access_token};
use crate::modules::error::ApiError;
use crate::modules::protocol::{RefreshResponse, LOGIN_PATH, REFRESH_PATH};
use crate::modules::refresh::{Entry, RefreshGate, RefreshOutcome};
use crate::modules::store::{KeyValueStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::modules::transport::{RawResponse, ReqwestTransport, Transport};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

#[derive(Debug, Clone)]
pub enum Payload {
    Empty,
    Json(Vec<u8>),
    File {
        field: String,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

/// A request description that can be turned into a fresh `reqwest::Request`
/// any number of times, so a 401 can be replayed.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub segments: Vec<String>,
    pub payload: Payload,
}

impl ApiRequest {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            segments: Vec::new(),
            payload: Payload::Empty,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn post_json<T: Serialize>(path: &str, body: &T) -> Result<Self, ApiError> {
        let bytes = serde_json::to_vec(body).map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(Self {
            payload: Payload::Json(bytes),
            ..Self::new(Method::POST, path)
        })
    }

    pub fn post_file(path: &str, field: &str, file_name: &str, mime: &str, bytes: Vec<u8>) -> Self {
        Self {
            payload: Payload::File {
                field: field.to_string(),
                file_name: file_name.to_string(),
                mime: mime.to_string(),
                bytes,
            },
            ..Self::new(Method::POST, path)
        }
    }

    /// Appends a percent-encoded path segment (`/history` + `abc 1` -> `/history/abc%201`).
    pub fn with_segment(mut self, segment: &str) -> Self {
        self.segments.push(segment.to_string());
        self
    }

    /// The login endpoint answers bad credentials with 401; that must never
    /// start a refresh.
    fn may_refresh(&self) -> bool {
        !self.path.contains(LOGIN_PATH)
    }
}

pub struct ApiClient {
    config: ClientConfig,
    http: reqwest::Client,
    transport: Arc<dyn Transport>,
    store: Arc<dyn KeyValueStore>,
    gate: RefreshGate,
}

impl ApiClient {
    pub fn new(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(&config)?;
        let http = transport.client().clone();
        Ok(Self {
            config,
            http,
            transport: Arc::new(transport),
            store,
            gate: RefreshGate::new(),
        })
    }

    pub fn with_transport(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            config,
            http,
            transport,
            store,
            gate: RefreshGate::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn is_refreshing(&self) -> bool {
        self.gate.is_refreshing()
    }

    fn prepare(&self, request: &ApiRequest) -> Result<reqwest::Request, ApiError> {
        let mut url = self.config.endpoint(&request.path)?;
        if !request.segments.is_empty() {
            let shown = url.to_string();
            url.path_segments_mut()
                .map_err(|_| ApiError::Endpoint(format!("{shown} cannot take path segments")))?
                .extend(&request.segments);
        }

        let builder = self.http.request(request.method.clone(), url);
        let builder = match &request.payload {
            Payload::Empty => builder,
            Payload::Json(bytes) => builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(bytes.clone()),
            Payload::File {
                field,
                file_name,
                mime,
                bytes,
            } => {
                let part = reqwest::multipart::Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime)?;
                builder.multipart(reqwest::multipart::Form::new().part(field.clone(), part))
            }
        };
        Ok(builder.build()?)
    }

    /// Sends `request` with the stored access token. A 401 (outside login)
    /// goes through the shared refresh and the request is replayed once with
    /// the new token; a second 401 is returned as a plain status error. If the
    /// stored token already changed since the request was sent, it is replayed
    /// with that token without another refresh.
    pub async fn send(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        let token = stored_access_token(self.store.as_ref())?;
        let prepared = attach_bearer(self.prepare(request)?, token.as_deref());
        let response = self.transport.execute(prepared).await?;

        if response.status != StatusCode::UNAUTHORIZED || !request.may_refresh() {
            return ensure_success(response);
        }

        warn!(method = %request.method, path = %request.path, "request rejected with 401");
        let sent_with = token;
        let token = match stored_access_token(self.store.as_ref())? {
            // A refresh finished while this request was in flight.
            Some(current) if sent_with.as_deref() != Some(current.as_str()) => current,
            _ => self.refreshed_token().await?,
        };

        debug!(method = %request.method, path = %request.path, "replaying with refreshed token");
        let replay = attach_bearer(self.prepare(request)?, Some(&token));
        ensure_success(self.transport.execute(replay).await?)
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        decode_json(&response)
    }

    async fn refreshed_token(&self) -> Result<String, ApiError> {
        match self.gate.enter() {
            Entry::Leader(lease) => {
                let outcome = self.run_refresh().await;
                lease.publish(outcome.clone());
                outcome.into_result()
            }
            Entry::Waiter(slot) => RefreshGate::wait(slot).await,
        }
    }

    async fn run_refresh(&self) -> RefreshOutcome {
        match self.refresh_tokens().await {
            Ok(token) => {
                info!("access token refreshed");
                RefreshOutcome::Refreshed(token)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed; clearing stored credentials");
                if let Err(clear_err) = self.store.clear() {
                    warn!(error = %clear_err, "failed to clear credential store");
                }
                let reason = match e {
                    ApiError::SessionExpired(reason) => reason,
                    other => other.to_string(),
                };
                RefreshOutcome::Failed(reason)
            }
        }
    }

    async fn refresh_tokens(&self) -> Result<String, ApiError> {
        let refresh_token = self
            .store
            .get(REFRESH_TOKEN_KEY)?
            .filter(|t| !t.is_empty())
            .map(Zeroizing::new)
            .ok_or_else(|| ApiError::SessionExpired("no refresh token available".to_string()))?;

        let request = ApiRequest::post_json(REFRESH_PATH, &serde_json::json!({}))?;
        let prepared = attach_bearer(self.prepare(&request)?, Some(refresh_token.as_str()));
        let response = ensure_success(self.transport.execute(prepared).await?)?;
        let body: RefreshResponse = decode_json(&response)?;

        if body.access_token.is_empty() {
            return Err(ApiError::Parse("refresh returned an empty access token".to_string()));
        }
        self.store.set(ACCESS_TOKEN_KEY, &body.access_token)?;
        if let Some(rt) = body.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            self.store.set(REFRESH_TOKEN_KEY, rt)?;
        }
        Ok(body.access_token)
    }
}

pub fn ensure_success(response: RawResponse) -> Result<RawResponse, ApiError> {
    if response.status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::BadStatus {
            status: response.status,
            body: response.text(),
        })
    }
}

pub fn decode_json<T: DeserializeOwned>(response: &RawResponse) -> Result<T, ApiError> {
    serde_json::from_slice(&response.body)
        .map_err(|e| ApiError::Parse(format!("{e}: {}", response.text())))
}
