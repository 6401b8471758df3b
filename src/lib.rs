/*!
 * # cuecards - subtitle-driven flashcard study engine
 *
 * The core of a language-learning player: it keeps the current subtitle in
 * sync with the playback clock, builds word selections by clicks on that
 * subtitle, and drives the review of generated flashcards through duplicate
 * check and submission to a card store.
 *
 * ## Features
 *
 * - Active-cue resolution over SRT and WebVTT cue tracks
 * - Contiguous multi-word selection by repeated clicks
 * - Flashcard review workflow with id-keyed edits and "generate more"
 * - Stale-response discard across workflow instances
 * - HTTP client for the flashcard backend, plus a scripted mock
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `clock`: Playback clock handle and periodic sampler
 * - `subtitle_processor`: Cue model, parsing and active-cue lookup
 * - `selection`: Word selection on the active cue
 * - `flashcards`: Card model and the review workflow state machine
 * - `services`: Boundary services (HTTP backend, mock)
 * - `session`: Study session, engine actor and history of processed videos
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod clock;
pub mod errors;
pub mod flashcards;
pub mod selection;
pub mod services;
pub mod session;
pub mod subtitle_processor;

// Re-export main types for easier usage
pub use app_config::Config;
pub use clock::{ClockSampler, PlaybackClock, SimulatedPlayer};
pub use errors::{AppError, EngineError, ServiceError};
pub use flashcards::{CardId, Flashcard, FlashcardWorkflow, WorkflowStep};
pub use selection::SelectionTracker;
pub use services::FlashcardService;
pub use session::{Engine, EngineCommand, EngineHandle, StudySession};
pub use subtitle_processor::{SubtitleCue, Timestamp};
