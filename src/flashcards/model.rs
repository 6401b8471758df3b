/*!
 * Flashcard data model and the wire shapes exchanged with the backend.
 *
 * Field names follow the backend's JSON contract (snake_case). Cards are
 * keyed by `CardId` everywhere; the position of a card in a list is never
 * used to identify it because lists get spliced.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier of a candidate flashcard
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        CardId(id.into())
    }

    /// Mint a fresh client-side id
    pub fn mint() -> Self {
        CardId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A flashcard with its identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: CardId,
    /// Example sentence in English using the selected term
    pub english_sentence: String,
    /// Full translation of the example sentence
    pub portuguese_translation: String,
    /// Translation of the term within the sentence
    pub term_translation: String,
}

impl Flashcard {
    pub fn new(
        id: CardId,
        english_sentence: impl Into<String>,
        portuguese_translation: impl Into<String>,
        term_translation: impl Into<String>,
    ) -> Self {
        Self {
            id,
            english_sentence: english_sentence.into(),
            portuguese_translation: portuguese_translation.into(),
            term_translation: term_translation.into(),
        }
    }
}

/// A flashcard as produced by the generation service; the id may be absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFlashcard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CardId>,
    pub english_sentence: String,
    pub portuguese_translation: String,
    pub term_translation: String,
}

impl GeneratedFlashcard {
    pub fn new(
        english_sentence: impl Into<String>,
        portuguese_translation: impl Into<String>,
        term_translation: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            english_sentence: english_sentence.into(),
            portuguese_translation: portuguese_translation.into(),
            term_translation: term_translation.into(),
        }
    }

    /// Attach an identity, minting one when the service supplied none
    pub fn into_flashcard(self) -> Flashcard {
        Flashcard {
            id: self.id.unwrap_or_else(CardId::mint),
            english_sentence: self.english_sentence,
            portuguese_translation: self.portuguese_translation,
            term_translation: self.term_translation,
        }
    }
}

/// A chosen card annotated by the duplicate check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationCard {
    pub flashcard: Flashcard,
    pub is_duplicate: bool,
}

/// One entry of a duplicate-check response, as received
///
/// The backend echoes the card back without necessarily keeping its id, so
/// the workflow re-attaches identities by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicationStatus {
    pub flashcard: GeneratedFlashcard,
    pub is_duplicate: bool,
}

/// Scope of a "generate more" request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    /// Scoped to the current cue's surrounding text
    InContext,
    /// Unconstrained, optionally themed
    OutOfContext,
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InContext => f.write_str("in_context"),
            Self::OutOfContext => f.write_str("out_of_context"),
        }
    }
}

/// Request for the initial batch of candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub words: Vec<String>,
    pub previous_subtitle: String,
    pub current_subtitle: String,
    pub next_subtitle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_themes: Option<Vec<String>>,
}

/// Request for additional candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateMoreRequest {
    #[serde(flatten)]
    pub base: GenerationRequest,
    pub existing_flashcards: Vec<Flashcard>,
    pub context_type: ContextType,
}

/// Response shape shared by generation and "generate more"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub flashcards: Vec<GeneratedFlashcard>,
}

/// Request to check chosen cards against the card store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCheckRequest {
    pub words: Vec<String>,
    pub flashcards: Vec<Flashcard>,
}

/// Duplicate-check response, in request order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCheckResponse {
    pub duplication_status: Vec<DuplicationStatus>,
}

/// Request to write non-duplicate cards into the card store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendRequest {
    pub words: Vec<String>,
    pub flashcards: Vec<Flashcard>,
}

/// Successful send response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendResponse {
    pub message: String,
}
