/*!
 * Mock flashcard service for testing.
 *
 * Behaviours:
 * - `MockFlashcardService::working()` - every call succeeds
 * - `MockFlashcardService::failing()` - every call fails with an API error
 * - `MockFlashcardService::slow(ms)` - succeeds after a delay
 * - `MockFlashcardService::failing_on(op)` - only the given operation fails
 *
 * Generated sentences are numbered across the whole service so tests can
 * name the ones the duplicate check should flag.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ServiceError;
use crate::flashcards::{
    ContextType, DuplicateCheckRequest, DuplicationStatus, GenerateMoreRequest, GeneratedFlashcard,
    GenerationRequest, SendRequest,
};
use crate::subtitle_processor::SubtitleCue;

use super::{FlashcardService, ProcessedVideo, SubtitleSource};

/// Operations the mock can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Generate,
    GenerateMore,
    CheckDuplicates,
    Send,
    ProcessVideo,
}

/// Behavior mode for the mock service
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always fails with an error
    Failing,
    /// Succeeds after a delay
    Slow { delay_ms: u64 },
    /// Fails only for one operation
    FailOn(MockOperation),
}

/// Scripted `FlashcardService` and `SubtitleSource`
#[derive(Debug, Clone)]
pub struct MockFlashcardService {
    behavior: MockBehavior,
    cards_per_request: usize,
    duplicate_sentences: HashSet<String>,
    cues: Vec<SubtitleCue>,
    generated_count: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<MockOperation>>>,
    sent: Arc<Mutex<Vec<SendRequest>>>,
}

impl MockFlashcardService {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            cards_per_request: 3,
            duplicate_sentences: HashSet::new(),
            cues: Vec::new(),
            generated_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    pub fn failing_on(operation: MockOperation) -> Self {
        Self::new(MockBehavior::FailOn(operation))
    }

    /// Number of cards returned per generation call
    pub fn with_cards_per_request(mut self, count: usize) -> Self {
        self.cards_per_request = count;
        self
    }

    /// Sentences the duplicate check reports as already stored
    pub fn with_duplicates<I, S>(mut self, sentences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.duplicate_sentences.extend(sentences.into_iter().map(Into::into));
        self
    }

    /// Cue track returned by `process_video`
    pub fn with_cues(mut self, cues: Vec<SubtitleCue>) -> Self {
        self.cues = cues;
        self
    }

    /// The sentence generated as the `n`th card (1-based) for `words`
    pub fn sentence_for(words: &[String], n: usize) -> String {
        format!("{} example {}.", words.join(" "), n)
    }

    /// Operations called so far, in order
    pub fn calls(&self) -> Vec<MockOperation> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, operation: MockOperation) -> usize {
        self.calls.lock().iter().filter(|op| **op == operation).count()
    }

    /// Send requests received so far
    pub fn sent_requests(&self) -> Vec<SendRequest> {
        self.sent.lock().clone()
    }

    async fn enter(&self, operation: MockOperation) -> Result<(), ServiceError> {
        self.calls.lock().push(operation);

        match self.behavior {
            MockBehavior::Working => Ok(()),
            MockBehavior::Failing => Err(Self::failure(operation)),
            MockBehavior::FailOn(failing) if failing == operation => Err(Self::failure(operation)),
            MockBehavior::FailOn(_) => Ok(()),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(())
            }
        }
    }

    fn failure(operation: MockOperation) -> ServiceError {
        ServiceError::ApiError {
            status_code: 500,
            message: format!("Simulated {:?} failure", operation),
        }
    }

    fn make_cards(&self, words: &[String], context_type: ContextType) -> Vec<GeneratedFlashcard> {
        (0..self.cards_per_request)
            .map(|_| {
                let n = self.generated_count.fetch_add(1, Ordering::SeqCst) + 1;
                GeneratedFlashcard::new(
                    Self::sentence_for(words, n),
                    format!("{} exemplo {} ({}).", words.join(" "), n, context_type),
                    words.join(" "),
                )
            })
            .collect()
    }
}

#[async_trait]
impl FlashcardService for MockFlashcardService {
    async fn generate(&self, request: GenerationRequest) -> Result<Vec<GeneratedFlashcard>, ServiceError> {
        self.enter(MockOperation::Generate).await?;
        Ok(self.make_cards(&request.words, ContextType::InContext))
    }

    async fn generate_more(&self, request: GenerateMoreRequest) -> Result<Vec<GeneratedFlashcard>, ServiceError> {
        self.enter(MockOperation::GenerateMore).await?;
        Ok(self.make_cards(&request.base.words, request.context_type))
    }

    async fn check_duplicates(&self, request: DuplicateCheckRequest) -> Result<Vec<DuplicationStatus>, ServiceError> {
        self.enter(MockOperation::CheckDuplicates).await?;
        // Echo cards without ids, as the real backend does
        Ok(request
            .flashcards
            .into_iter()
            .map(|card| DuplicationStatus {
                is_duplicate: self.duplicate_sentences.contains(&card.english_sentence),
                flashcard: GeneratedFlashcard::new(
                    card.english_sentence,
                    card.portuguese_translation,
                    card.term_translation,
                ),
            })
            .collect())
    }

    async fn send_cards(&self, request: SendRequest) -> Result<String, ServiceError> {
        self.enter(MockOperation::Send).await?;
        let count = request.flashcards.len();
        self.sent.lock().push(request);
        Ok(format!("{} flashcards were sent successfully!", count))
    }
}

#[async_trait]
impl SubtitleSource for MockFlashcardService {
    async fn process_video(&self, video_url: &str) -> Result<ProcessedVideo, ServiceError> {
        self.enter(MockOperation::ProcessVideo).await?;
        let video_id = crate::session::history::youtube_video_id(video_url)
            .unwrap_or_else(|| "mock-video".to_string());
        Ok(ProcessedVideo {
            message: "Subtitles processed successfully!".to_string(),
            video_title: Some(format!("Mock video {}", video_id)),
            video_id,
            subtitles: self.cues.clone(),
        })
    }
}
