use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::app_config::ServiceConfig;
use crate::errors::ServiceError;
use crate::flashcards::{
    DuplicateCheckRequest, DuplicateCheckResponse, DuplicationStatus, GenerateMoreRequest,
    GeneratedFlashcard, GenerationRequest, GenerationResponse, SendRequest, SendResponse,
};

use super::{FlashcardService, ProcessVideoRequest, ProcessedVideo, SubtitleSource};

const PROCESS_VIDEO_PATH: &str = "api/process-video";
const GENERATE_PATH: &str = "api/generate-flashcards";
const GENERATE_MORE_PATH: &str = "api/generate-more-flashcards";
const CHECK_DUPLICATES_PATH: &str = "api/check-duplicates";
const SEND_PATH: &str = "api/send-to-anki";

/// Client for the flashcard backend
#[derive(Debug, Clone)]
pub struct HttpFlashcardService {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client for making requests
    client: Client,
}

impl HttpFlashcardService {
    /// Create a client for `endpoint`
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let parsed = Url::parse(endpoint)
            .map_err(|e| ServiceError::RequestFailed(format!("Invalid service endpoint '{}': {}", endpoint, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        Self::new(&config.endpoint, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, ServiceError>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.url_for(path);
        debug!("POST {}", url);

        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ServiceError::ConnectionError(format!("Failed to reach {}: {}", url, e))
            } else {
                ServiceError::RequestFailed(format!("Request to {} failed: {}", url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Service error ({}) from {}: {}", status, path, error_text);
            return Err(api_error(status.as_u16(), &error_text));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| ServiceError::ParseError(format!("Invalid response from {}: {}", path, e)))
    }
}

/// Build an `ApiError` from a failure body, preferring its `detail` field
pub(crate) fn api_error(status_code: u16, body: &str) -> ServiceError {
    let message = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("detail") {
            Some(serde_json::Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        _ => body.to_string(),
    };
    ServiceError::ApiError { status_code, message }
}

#[async_trait]
impl FlashcardService for HttpFlashcardService {
    async fn generate(&self, request: GenerationRequest) -> Result<Vec<GeneratedFlashcard>, ServiceError> {
        let response: GenerationResponse = self.post_json(GENERATE_PATH, &request).await?;
        Ok(response.flashcards)
    }

    async fn generate_more(&self, request: GenerateMoreRequest) -> Result<Vec<GeneratedFlashcard>, ServiceError> {
        let response: GenerationResponse = self.post_json(GENERATE_MORE_PATH, &request).await?;
        Ok(response.flashcards)
    }

    async fn check_duplicates(&self, request: DuplicateCheckRequest) -> Result<Vec<DuplicationStatus>, ServiceError> {
        let response: DuplicateCheckResponse = self.post_json(CHECK_DUPLICATES_PATH, &request).await?;
        Ok(response.duplication_status)
    }

    async fn send_cards(&self, request: SendRequest) -> Result<String, ServiceError> {
        let response: SendResponse = self.post_json(SEND_PATH, &request).await?;
        Ok(response.message)
    }
}

#[async_trait]
impl SubtitleSource for HttpFlashcardService {
    async fn process_video(&self, video_url: &str) -> Result<ProcessedVideo, ServiceError> {
        let request = ProcessVideoRequest {
            video_url: video_url.to_string(),
        };
        self.post_json(PROCESS_VIDEO_PATH, &request).await
    }
}
