/*!
 * Study session management.
 *
 * This module provides:
 * - `study`: the per-video session state (cues, selection, workflow)
 * - `engine`: the actor that drives a session from clock ticks, commands and responses
 * - `history`: the record of processed videos
 */

pub mod engine;
pub mod history;
pub mod study;

// Re-export main types
pub use engine::{Engine, EngineCommand, EngineHandle};
pub use history::{HistoryEntry, HistoryStore, InMemoryHistory};
pub use study::{SessionSnapshot, StudySession, WorkflowSnapshot};
