use crate::modules::api::{ApiClient, ApiRequest};
use crate::modules::error::ApiError;
use crate::modules::protocol::{
    AnalysisResult, AnalyzeLinkRequest, AnalyzeResponse, HistoryItem, HistoryResponse,
    ANALYZE_FILE_PATH, ANALYZE_LINK_PATH, AUDIO_PATH, FILE_FIELD, HISTORY_PATH,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct AnalysisService {
    api: Arc<ApiClient>,
    current: watch::Sender<Option<AnalysisResult>>,
}

impl AnalysisService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let (current, _) = watch::channel(None);
        Self { api, current }
    }

    pub async fn analyze_link(&self, youtube_url: &str) -> Result<AnalysisResult, ApiError> {
        let request = ApiRequest::post_json(
            ANALYZE_LINK_PATH,
            &AnalyzeLinkRequest {
                youtube_url: youtube_url.trim().to_string(),
            },
        )?;
        let resp: AnalyzeResponse = self.api.send_json(&request).await?;
        Ok(self.adopt(resp))
    }

    pub async fn analyze_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<AnalysisResult, ApiError> {
        let mime = mime_for(file_name);
        debug!(file_name, mime, size = bytes.len(), "uploading audio for analysis");
        let request = ApiRequest::post_file(ANALYZE_FILE_PATH, FILE_FIELD, file_name, mime, bytes);
        let resp: AnalyzeResponse = self.api.send_json(&request).await?;
        Ok(self.adopt(resp))
    }

    pub async fn analyze_path(&self, path: &Path) -> Result<AnalysisResult, ApiError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        self.analyze_file(&file_name, bytes).await
    }

    fn adopt(&self, resp: AnalyzeResponse) -> AnalysisResult {
        let analysis = resp.into_analysis();
        info!(
            job_id = analysis.job_id.as_deref().unwrap_or("-"),
            chords = analysis.chords.len(),
            "analysis complete"
        );
        self.set_analysis(analysis.clone());
        analysis
    }

    pub async fn history(&self) -> Result<Vec<HistoryItem>, ApiError> {
        let resp: HistoryResponse = self.api.send_json(&ApiRequest::get(HISTORY_PATH)).await?;
        let items = resp.into_items();
        debug!(count = items.len(), "history loaded");
        Ok(items)
    }

    pub async fn history_item(&self, id: &str) -> Result<HistoryItem, ApiError> {
        let id = checked_id(id)?;
        self.api
            .send_json(&ApiRequest::get(HISTORY_PATH).with_segment(id))
            .await
    }

    /// Deletes `item` on the server. Items without a usable identifier are
    /// rejected before any request is built.
    pub async fn delete_history_item(&self, item: &HistoryItem) -> Result<(), ApiError> {
        let Some(id) = item.identifier() else {
            warn!(title = %item.title, "refusing to delete history item without identifier");
            return Err(ApiError::MissingIdentifier);
        };
        self.delete_history_id(id).await
    }

    pub async fn delete_history_id(&self, id: &str) -> Result<(), ApiError> {
        let id = checked_id(id)?;
        self.api
            .send(&ApiRequest::delete(HISTORY_PATH).with_segment(id))
            .await?;
        info!(id, "history item deleted");
        Ok(())
    }

    /// Makes a history entry the current analysis and returns it.
    pub fn load_from_history(&self, item: &HistoryItem) -> AnalysisResult {
        let analysis = item.to_analysis();
        self.set_analysis(analysis.clone());
        analysis
    }

    /// Downloads the analysed audio; the endpoint requires the bearer token.
    pub async fn audio(&self, job_id: &str) -> Result<Vec<u8>, ApiError> {
        let job_id = checked_id(job_id)?;
        let resp = self
            .api
            .send(&ApiRequest::get(AUDIO_PATH).with_segment(job_id))
            .await?;
        Ok(resp.body)
    }

    pub fn set_analysis(&self, analysis: AnalysisResult) {
        self.current.send_replace(Some(analysis));
    }

    pub fn analysis(&self) -> Option<AnalysisResult> {
        self.current.borrow().clone()
    }

    pub fn clear_analysis(&self) {
        self.current.send_replace(None);
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AnalysisResult>> {
        self.current.subscribe()
    }
}

fn checked_id(id: &str) -> Result<&str, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        Err(ApiError::MissingIdentifier)
    } else {
        Ok(id)
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" | "oga" => "audio/ogg",
        "m4a" | "mp4" | "aac" => "audio/mp4",
        "webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}
