#![allow(dead_code)]

use chordscope_client::api::ApiClient;
use chordscope_client::config::ClientConfig;
use chordscope_client::store::{KeyValueStore, MemoryStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use chordscope_client::transport::{RawResponse, Transport, TransportError};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, Request, StatusCode};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<Vec<u8>>,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        let body = self.body.as_deref().expect("request has a buffered body");
        serde_json::from_slice(body).expect("request body is json")
    }
}

type Handler = Box<dyn Fn(&Recorded) -> RawResponse + Send + Sync>;

/// In-process stand-in for the API server. Every request is recorded and
/// answered by `handler`; paths listed in `delays` answer after a sleep so
/// concurrent callers pile up behind them.
pub struct ScriptedTransport {
    handler: Handler,
    delays: Vec<(String, Duration)>,
    log: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new(handler: impl Fn(&Recorded) -> RawResponse + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            delays: Vec::new(),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.push((path.to_string(), delay));
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|r| r.path == path).count()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: Request) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
        let header = |name| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let rec = Recorded {
            method: request.method().clone(),
            path: request.url().path().to_string(),
            authorization: header(AUTHORIZATION),
            content_type: header(reqwest::header::CONTENT_TYPE),
            body: request.body().and_then(|b| b.as_bytes()).map(<[u8]>::to_vec),
        };
        self.log.lock().unwrap().push(rec.clone());

        let delay = self
            .delays
            .iter()
            .find(|(p, _)| *p == rec.path)
            .map(|(_, d)| *d);
        let resp = (self.handler)(&rec);

        async move {
            match delay {
                Some(d) => tokio::time::sleep(d).await,
                None => tokio::task::yield_now().await,
            }
            Ok(resp)
        }
        .boxed()
    }
}

pub fn json(status: StatusCode, value: serde_json::Value) -> RawResponse {
    RawResponse::new(status, serde_json::to_vec(&value).unwrap())
}

pub fn unauthorized() -> RawResponse {
    json(StatusCode::UNAUTHORIZED, serde_json::json!({ "detail": "token expired" }))
}

pub fn client(transport: &Arc<ScriptedTransport>, store: &Arc<MemoryStore>) -> Arc<ApiClient> {
    let config = ClientConfig::new("http://api.test").unwrap();
    let transport: Arc<dyn Transport> = transport.clone();
    let store: Arc<dyn KeyValueStore> = store.clone();
    Arc::new(ApiClient::with_transport(config, store, transport).unwrap())
}

pub fn store_with_tokens(access: &str, refresh: Option<&str>) -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.set(ACCESS_TOKEN_KEY, access).unwrap();
    if let Some(refresh) = refresh {
        store.set(REFRESH_TOKEN_KEY, refresh).unwrap();
    }
    Arc::new(store)
}
