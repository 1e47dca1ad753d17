use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    /// Applies to every call. Analysis of long tracks is slow, so the default is generous.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(base_url.trim())?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Reads `CHORDSCOPE_API_URL` and `CHORDSCOPE_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, url::ParseError> {
        let base = std::env::var("CHORDSCOPE_API_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Ok(Self::new(&base)?.with_timeout(http_timeout_from_env()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Joins an absolute API path onto the base url, keeping any path prefix
    /// the base already carries (`https://host/chords/` + `/api/x`).
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
    }
}

fn http_timeout_from_env() -> Duration {
    let secs = std::env::var("CHORDSCOPE_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS)
        .clamp(5, 600);
    Duration::from_secs(secs)
}
