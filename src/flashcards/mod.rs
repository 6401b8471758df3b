/*!
 * Flashcard candidates and the review workflow around them.
 *
 * - `model`: card identity, card fields and the backend wire shapes
 * - `workflow`: the Selection → Checking → Confirmation → Sending → Done state machine
 */

pub mod model;
pub mod workflow;

pub use model::{
    CardId, ConfirmationCard, ContextType, DuplicateCheckRequest, DuplicateCheckResponse,
    DuplicationStatus, Flashcard, GenerateMoreRequest, GeneratedFlashcard, GenerationRequest,
    GenerationResponse, SendRequest, SendResponse,
};
pub use workflow::{
    Completion, FlashcardWorkflow, RequestKind, RequestToken, ServiceCall, ServiceOutcome,
    WorkflowStep, NOTHING_TO_ADD,
};
