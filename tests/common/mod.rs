/*!
 * Common test utilities for the cuecards test suite
 */

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use cuecards::errors::ServiceError;
use cuecards::flashcards::{
    DuplicateCheckRequest, DuplicationStatus, GenerateMoreRequest, GeneratedFlashcard,
    GenerationRequest, SendRequest,
};
use cuecards::services::FlashcardService;
use cuecards::services::mock::MockFlashcardService;
use cuecards::session::{EngineHandle, SessionSnapshot};
use cuecards::subtitle_processor::SubtitleCue;

/// Route engine logs to the test harness; `RUST_LOG=debug` shows stale discards
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample SRT file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = r#"1
00:00:01,000 --> 00:00:04,000
This is a test subtitle.

2
00:00:05,000 --> 00:00:09,000
It contains multiple entries.

3
00:00:10,000 --> 00:00:14,000
For testing purposes.
"#;
    create_test_file(dir, filename, content)
}

/// Single cue used by the "hello world" scenarios
pub fn hello_world_cues() -> Vec<SubtitleCue> {
    vec![SubtitleCue::from_strings("00:00:00.000", "00:00:02.000", "hello world")]
}

/// A short track with distinct neighbours
pub fn sample_cues() -> Vec<SubtitleCue> {
    vec![
        SubtitleCue::from_strings("00:00:01.000", "00:00:03.000", "Where are you going?"),
        SubtitleCue::from_strings("00:00:03.500", "00:00:06.000", "The quick brown fox jumps."),
        SubtitleCue::from_strings("00:00:07.000", "00:00:09.000", "Over the lazy dog."),
    ]
}

/// Poll the engine until `predicate` holds on a snapshot
pub async fn wait_for<F>(engine: &EngineHandle, mut predicate: F) -> SessionSnapshot
where
    F: FnMut(&SessionSnapshot) -> bool,
{
    for _ in 0..400 {
        let snapshot = engine.snapshot().await.expect("engine should be running");
        if predicate(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached; last snapshot: {:?}", engine.snapshot().await);
}

/// Mock service whose duplicate check blocks until released
///
/// Lets a test hold a workflow in `Checking` while it does something else.
#[derive(Debug, Clone)]
pub struct GatedService {
    pub inner: MockFlashcardService,
    gate: Arc<Semaphore>,
}

impl GatedService {
    pub fn new(inner: MockFlashcardService) -> Self {
        Self {
            inner,
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    /// Let one blocked duplicate check return
    pub fn release_one(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl FlashcardService for GatedService {
    async fn generate(&self, request: GenerationRequest) -> Result<Vec<GeneratedFlashcard>, ServiceError> {
        self.inner.generate(request).await
    }

    async fn generate_more(&self, request: GenerateMoreRequest) -> Result<Vec<GeneratedFlashcard>, ServiceError> {
        self.inner.generate_more(request).await
    }

    async fn check_duplicates(&self, request: DuplicateCheckRequest) -> Result<Vec<DuplicationStatus>, ServiceError> {
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        self.inner.check_duplicates(request).await
    }

    async fn send_cards(&self, request: SendRequest) -> Result<String, ServiceError> {
        self.inner.send_cards(request).await
    }
}
