/*!
 * Boundary services the engine talks to.
 *
 * The engine never performs I/O itself. It hands `ServiceCall`s to an
 * implementation of `FlashcardService` and gets `Completion`s back:
 * - `http`: client for the JSON-over-HTTP backend
 * - `mock`: scripted service for tests and offline runs
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::errors::ServiceError;
use crate::flashcards::{
    Completion, DuplicateCheckRequest, DuplicationStatus, GenerateMoreRequest, GeneratedFlashcard,
    GenerationRequest, SendRequest, ServiceCall, ServiceOutcome,
};
use crate::subtitle_processor::SubtitleCue;

pub mod http;
pub mod mock;

/// Flashcard generation, duplicate check and card-store submission
///
/// Implementations only move data across the boundary. Results are applied
/// by the workflow, never by the service.
#[async_trait]
pub trait FlashcardService: Send + Sync + Debug {
    /// Generate the initial candidates for a selection
    async fn generate(&self, request: GenerationRequest) -> Result<Vec<GeneratedFlashcard>, ServiceError>;

    /// Generate additional candidates
    async fn generate_more(&self, request: GenerateMoreRequest) -> Result<Vec<GeneratedFlashcard>, ServiceError>;

    /// Flag which cards already exist in the card store, in request order
    async fn check_duplicates(&self, request: DuplicateCheckRequest) -> Result<Vec<DuplicationStatus>, ServiceError>;

    /// Write cards into the card store; returns the human-readable outcome
    async fn send_cards(&self, request: SendRequest) -> Result<String, ServiceError>;
}

/// Turns a video URL into a cue track
#[async_trait]
pub trait SubtitleSource: Send + Sync + Debug {
    async fn process_video(&self, video_url: &str) -> Result<ProcessedVideo, ServiceError>;
}

/// Request body for video processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessVideoRequest {
    pub video_url: String,
}

/// A processed video and its cues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedVideo {
    pub message: String,
    pub video_id: String,
    #[serde(default)]
    pub video_title: Option<String>,
    pub subtitles: Vec<SubtitleCue>,
}

/// Run one workflow call against a service and package the result
pub async fn execute(service: &dyn FlashcardService, call: ServiceCall) -> Completion {
    let token = call.token();
    let outcome = match call {
        ServiceCall::Generate { request, .. } => ServiceOutcome::Generated(service.generate(request).await),
        ServiceCall::GenerateMore { request, .. } => {
            ServiceOutcome::Generated(service.generate_more(request).await)
        }
        ServiceCall::CheckDuplicates { request, .. } => {
            ServiceOutcome::Checked(service.check_duplicates(request).await)
        }
        ServiceCall::Send { request, .. } => ServiceOutcome::Sent(service.send_cards(request).await),
    };
    Completion::new(token, outcome)
}
