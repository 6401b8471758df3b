/*!
 * Error types for the cuecards engine.
 *
 * This module contains custom error types for the different layers of the
 * application, using the thiserror crate for ergonomic error definitions:
 * - `ServiceError`: failures reported by the backend services at the boundary
 * - `EngineError`: rejected input and illegal workflow transitions
 * - `AppError`: top-level wrapper used by the binary
 */

use thiserror::Error;

use crate::flashcards::{CardId, WorkflowStep};

/// Errors that can occur when calling the backend services
///
/// Every variant carries a human-readable detail; `Display` is what gets
/// surfaced to the learner as the workflow's last error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// Error when making a request fails before a response arrives
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing a service response fails
    #[error("Failed to parse service response: {0}")]
    ParseError(String),

    /// Error returned by the service itself
    #[error("Service responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Detail message from the service
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The response was well-formed but does not match the request
    #[error("Unexpected service response: {0}")]
    UnexpectedResponse(String),
}

impl ServiceError {
    /// The detail string meant for display, without the category prefix
    pub fn detail(&self) -> &str {
        match self {
            Self::RequestFailed(detail)
            | Self::ParseError(detail)
            | Self::ConnectionError(detail)
            | Self::UnexpectedResponse(detail) => detail,
            Self::ApiError { message, .. } => message,
        }
    }
}

/// Errors raised by the selection-and-review engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed source URL or token, rejected before any state change
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Trigger not allowed from the current workflow step
    #[error("Cannot {action} while in {step} step")]
    InvalidTransition {
        /// The rejected trigger
        action: &'static str,
        /// The step the workflow was in
        step: WorkflowStep,
    },

    /// No candidate with this id exists
    #[error("Unknown card: {0}")]
    UnknownCard(CardId),

    /// A workflow can only start from a non-empty selection
    #[error("Selection is empty")]
    EmptySelection,

    /// Submission requires at least one chosen card
    #[error("No cards chosen")]
    NothingChosen,

    /// The command needs a live workflow instance
    #[error("No active flashcard workflow")]
    NoActiveWorkflow,

    /// The engine task is no longer running
    #[error("Engine has stopped")]
    Stopped,

    /// A boundary service failed
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a backend service
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Error from the engine
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
