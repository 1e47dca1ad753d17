use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";
pub const REFRESH_PATH: &str = "/api/auth/refresh";
pub const ANALYZE_LINK_PATH: &str = "/api/analyze/analyze/link";
pub const ANALYZE_FILE_PATH: &str = "/api/analyze/analyze/file";
pub const HISTORY_PATH: &str = "/api/analyze/history";
pub const AUDIO_PATH: &str = "/api/analyze/audio";

/// Multipart field name the analysis endpoint reads the upload from.
pub const FILE_FIELD: &str = "file";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterResponse {
    pub email: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Older servers report the display name under `user`.
    #[serde(default)]
    pub user: Option<String>,
}

impl RegisterResponse {
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.user.as_deref())
            .filter(|n| !n.is_empty())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AnalyzeLinkRequest {
    pub youtube_url: String,
}

/// One chord held over `[start_time, end_time)` seconds of the track.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChordInterval {
    pub chord: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub bar: i32,
    #[serde(default, alias = "prevChord", alias = "prev_chord")]
    pub previous_chord: Option<String>,
    #[serde(default, alias = "nextChord")]
    pub next_chord: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AnalysisResult {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub tempo_bpm: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_chords")]
    pub chords: Vec<ChordInterval>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    pub analysis: AnalysisResult,
}

impl AnalyzeResponse {
    /// The analysis with the job id filled in from the envelope when the
    /// inner result does not carry one.
    pub fn into_analysis(self) -> AnalysisResult {
        let mut analysis = self.analysis;
        if analysis.job_id.is_none() {
            analysis.job_id = self.job_id;
        }
        analysis
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct HistoryItem {
    #[serde(default, deserialize_with = "lenient_id")]
    pub song_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub youtube_url: Option<String>,
    #[serde(default)]
    pub tempo_bpm: Option<f64>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub beats_per_bar: Option<u32>,
    #[serde(default, deserialize_with = "lenient_chords")]
    pub chords: Vec<ChordInterval>,
    #[serde(default)]
    pub analyzed_at: Option<String>,
}

impl HistoryItem {
    /// Identifier used for `GET`/`DELETE /api/analyze/history/{id}`.
    ///
    /// `song_id` is the server's canonical key; `id` and `job_id` are kept on
    /// the struct for display only.
    pub fn identifier(&self) -> Option<&str> {
        self.song_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn to_analysis(&self) -> AnalysisResult {
        AnalysisResult {
            key: self.key.clone(),
            tempo_bpm: self.tempo_bpm,
            title: Some(self.title.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            job_id: self.job_id.clone().or_else(|| self.song_id.clone()),
            chords: self.chords.clone(),
        }
    }
}

/// `GET /api/analyze/history` answers either `{ "history": [...] }` or a bare array.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum HistoryResponse {
    Wrapped { history: Vec<HistoryItem> },
    Bare(Vec<HistoryItem>),
}

impl HistoryResponse {
    pub fn into_items(self) -> Vec<HistoryItem> {
        match self {
            HistoryResponse::Wrapped { history } => history,
            HistoryResponse::Bare(items) => items,
        }
    }
}

/// Decode a chord payload that may arrive as a list, as a JSON string holding
/// a list, or as garbage. Anything that is not a well-formed list is empty.
pub fn decode_chords(value: Value) -> Vec<ChordInterval> {
    match value {
        Value::Array(_) => serde_json::from_value(value).unwrap_or_default(),
        Value::String(text) => serde_json::from_str(&text).unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn lenient_chords<'de, D>(deserializer: D) -> Result<Vec<ChordInterval>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(decode_chords).unwrap_or_default())
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
