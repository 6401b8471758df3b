/*!
 * Flashcard review workflow.
 *
 * A workflow instance is created when a selection is committed and lives
 * until it is dismissed or replaced. It never performs I/O: every trigger
 * that needs the backend returns a `ServiceCall`, and the caller feeds the
 * result back through `apply` as a `Completion`.
 *
 * Every call carries a `RequestToken` holding the instance epoch. A
 * completion is applied only if its epoch matches and the workflow is still
 * waiting for that request; anything else is dropped.
 */

use log::{debug, info, warn};
use std::collections::HashSet;
use std::fmt;

use crate::errors::{EngineError, ServiceError};
use crate::subtitle_processor::CueContext;

use super::model::{
    CardId, ConfirmationCard, ContextType, DuplicateCheckRequest, DuplicationStatus, Flashcard,
    GenerateMoreRequest, GeneratedFlashcard, GenerationRequest, SendRequest,
};

/// Status shown when confirmation finds nothing new to send
pub const NOTHING_TO_ADD: &str = "No new cards to add.";

/// Steps of the review workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorkflowStep {
    #[default]
    Selection,
    Checking,
    Confirmation,
    Sending,
    Done,
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Selection => "selection",
            Self::Checking => "checking",
            Self::Confirmation => "confirmation",
            Self::Sending => "sending",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// What an outstanding request was for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Generate,
    GenerateMore(ContextType),
    CheckDuplicates,
    Send,
}

/// Identifies one outstanding request of one workflow instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken {
    pub epoch: u64,
    pub seq: u64,
    pub kind: RequestKind,
}

/// A backend call the workflow is waiting on
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    Generate { token: RequestToken, request: GenerationRequest },
    GenerateMore { token: RequestToken, request: GenerateMoreRequest },
    CheckDuplicates { token: RequestToken, request: DuplicateCheckRequest },
    Send { token: RequestToken, request: SendRequest },
}

impl ServiceCall {
    pub fn token(&self) -> RequestToken {
        match self {
            Self::Generate { token, .. }
            | Self::GenerateMore { token, .. }
            | Self::CheckDuplicates { token, .. }
            | Self::Send { token, .. } => *token,
        }
    }
}

/// Result of a backend call
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceOutcome {
    Generated(Result<Vec<GeneratedFlashcard>, ServiceError>),
    Checked(Result<Vec<DuplicationStatus>, ServiceError>),
    Sent(Result<String, ServiceError>),
}

/// A finished backend call, routed back to the workflow that issued it
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub token: RequestToken,
    pub outcome: ServiceOutcome,
}

impl Completion {
    pub fn new(token: RequestToken, outcome: ServiceOutcome) -> Self {
        Self { token, outcome }
    }
}

/// One review session over a committed selection
#[derive(Debug, Clone)]
pub struct FlashcardWorkflow {
    epoch: u64,
    next_seq: u64,
    words: Vec<String>,
    context: CueContext,
    custom_themes: Option<Vec<String>>,
    step: WorkflowStep,
    candidates: Vec<Flashcard>,
    chosen: HashSet<CardId>,
    // Cards sent to the duplicate check, in request order
    checking: Vec<Flashcard>,
    confirmation_list: Vec<ConfirmationCard>,
    editing_id: Option<CardId>,
    status_message: Option<String>,
    last_error: Option<ServiceError>,
    // End of the contiguous in-context block at the front of `candidates`
    insertion_offset: usize,
    pending: Vec<RequestToken>,
}

impl FlashcardWorkflow {
    /// Start a workflow for `words` and request the first candidates
    pub fn start(
        epoch: u64,
        words: Vec<String>,
        context: CueContext,
        custom_themes: Option<Vec<String>>,
    ) -> Result<(Self, ServiceCall), EngineError> {
        if words.iter().all(|w| w.trim().is_empty()) {
            return Err(EngineError::EmptySelection);
        }

        let mut workflow = Self {
            epoch,
            next_seq: 0,
            words,
            context,
            custom_themes: custom_themes.filter(|themes| !themes.is_empty()),
            step: WorkflowStep::Selection,
            candidates: Vec::new(),
            chosen: HashSet::new(),
            checking: Vec::new(),
            confirmation_list: Vec::new(),
            editing_id: None,
            status_message: None,
            last_error: None,
            insertion_offset: 0,
            pending: Vec::new(),
        };

        info!("Starting flashcard workflow #{} for '{}'", epoch, workflow.phrase());
        let token = workflow.issue(RequestKind::Generate);
        let request = workflow.generation_request();
        Ok((workflow, ServiceCall::Generate { token, request }))
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn step(&self) -> WorkflowStep {
        self.step
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn phrase(&self) -> String {
        self.words.join(" ")
    }

    pub fn context(&self) -> &CueContext {
        &self.context
    }

    pub fn candidates(&self) -> &[Flashcard] {
        &self.candidates
    }

    pub fn candidate(&self, id: &CardId) -> Option<&Flashcard> {
        self.candidates.iter().find(|card| &card.id == id)
    }

    pub fn is_chosen(&self, id: &CardId) -> bool {
        self.chosen.contains(id)
    }

    /// Chosen cards in candidate order
    pub fn chosen_cards(&self) -> Vec<Flashcard> {
        self.candidates
            .iter()
            .filter(|card| self.chosen.contains(&card.id))
            .cloned()
            .collect()
    }

    pub fn chosen_count(&self) -> usize {
        self.chosen.len()
    }

    pub fn confirmation_list(&self) -> &[ConfirmationCard] {
        &self.confirmation_list
    }

    /// Confirmed cards not flagged as duplicates
    pub fn non_duplicates(&self) -> Vec<Flashcard> {
        self.confirmation_list
            .iter()
            .filter(|entry| !entry.is_duplicate)
            .map(|entry| entry.flashcard.clone())
            .collect()
    }

    pub fn editing_id(&self) -> Option<&CardId> {
        self.editing_id.as_ref()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn last_error(&self) -> Option<&ServiceError> {
        self.last_error.as_ref()
    }

    pub fn insertion_offset(&self) -> usize {
        self.insertion_offset
    }

    /// Whether any request of this instance is still outstanding
    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_requests(&self) -> &[RequestToken] {
        &self.pending
    }

    /// Mark or unmark a candidate; returns the new chosen state
    pub fn toggle(&mut self, id: &CardId) -> Result<bool, EngineError> {
        self.require_step(WorkflowStep::Selection, "toggle a card")?;
        self.require_candidate(id)?;

        if self.chosen.remove(id) {
            Ok(false)
        } else {
            self.chosen.insert(id.clone());
            Ok(true)
        }
    }

    /// Enter edit mode for a candidate
    pub fn begin_edit(&mut self, id: &CardId) -> Result<&Flashcard, EngineError> {
        self.require_step(WorkflowStep::Selection, "edit a card")?;
        let index = self.require_candidate(id)?;
        self.editing_id = Some(id.clone());
        Ok(&self.candidates[index])
    }

    /// Replace the card being edited, matched by id, and leave edit mode
    pub fn save_edit(&mut self, edited: Flashcard) -> Result<(), EngineError> {
        self.require_step(WorkflowStep::Selection, "save an edit")?;
        if self.editing_id.as_ref() != Some(&edited.id) {
            return Err(EngineError::InvalidTransition {
                action: "save an edit for a card not being edited",
                step: self.step,
            });
        }

        let index = self.require_candidate(&edited.id)?;
        debug!("Saving edit for card {}", edited.id);
        // Chosen is keyed by id, so a chosen card follows its edit
        self.candidates[index] = edited;
        self.editing_id = None;
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.editing_id = None;
    }

    /// Ask for additional candidates
    pub fn request_more(&mut self, context_type: ContextType) -> Result<ServiceCall, EngineError> {
        self.require_step(WorkflowStep::Selection, "generate more cards")?;

        let token = self.issue(RequestKind::GenerateMore(context_type));
        let request = GenerateMoreRequest {
            base: self.generation_request(),
            existing_flashcards: self.candidates.clone(),
            context_type,
        };
        debug!("Requesting more {} cards for workflow #{}", context_type, self.epoch);
        Ok(ServiceCall::GenerateMore { token, request })
    }

    /// Send the chosen cards to the duplicate check
    pub fn submit(&mut self) -> Result<ServiceCall, EngineError> {
        self.require_step(WorkflowStep::Selection, "submit")?;
        if self.chosen.is_empty() {
            return Err(EngineError::NothingChosen);
        }

        self.checking = self.chosen_cards();
        self.editing_id = None;
        self.last_error = None;
        self.step = WorkflowStep::Checking;

        info!("Checking {} card(s) for duplicates", self.checking.len());
        let token = self.issue(RequestKind::CheckDuplicates);
        let request = DuplicateCheckRequest {
            words: self.words.clone(),
            flashcards: self.checking.clone(),
        };
        Ok(ServiceCall::CheckDuplicates { token, request })
    }

    /// Return from confirmation to selection without clearing anything
    pub fn go_back(&mut self) -> Result<(), EngineError> {
        self.require_step(WorkflowStep::Confirmation, "go back")?;
        self.step = WorkflowStep::Selection;
        Ok(())
    }

    /// Confirm the checked cards
    ///
    /// Returns `None` when every card is a duplicate: the workflow finishes
    /// without calling the backend.
    pub fn confirm(&mut self) -> Result<Option<ServiceCall>, EngineError> {
        self.require_step(WorkflowStep::Confirmation, "confirm")?;

        let cards = self.non_duplicates();
        if cards.is_empty() {
            info!("All checked cards are duplicates, nothing to send");
            self.step = WorkflowStep::Done;
            self.status_message = Some(NOTHING_TO_ADD.to_string());
            return Ok(None);
        }

        self.step = WorkflowStep::Sending;
        info!("Sending {} card(s)", cards.len());
        let token = self.issue(RequestKind::Send);
        let request = SendRequest {
            words: self.words.clone(),
            flashcards: cards,
        };
        Ok(Some(ServiceCall::Send { token, request }))
    }

    /// Apply a finished backend call; returns false when it was discarded
    pub fn apply(&mut self, completion: Completion) -> bool {
        let Completion { token, outcome } = completion;

        if token.epoch != self.epoch {
            debug!("Discarding response for workflow #{} (current #{})", token.epoch, self.epoch);
            return false;
        }
        let Some(position) = self.pending.iter().position(|pending| *pending == token) else {
            debug!("Discarding response for request {:?} that is no longer awaited", token.kind);
            return false;
        };
        self.pending.remove(position);

        match (token.kind, outcome) {
            (RequestKind::Generate, ServiceOutcome::Generated(result)) => {
                self.apply_generated(result, ContextType::InContext)
            }
            (RequestKind::GenerateMore(context_type), ServiceOutcome::Generated(result)) => {
                self.apply_generated(result, context_type)
            }
            (RequestKind::CheckDuplicates, ServiceOutcome::Checked(result)) => self.apply_checked(result),
            (RequestKind::Send, ServiceOutcome::Sent(result)) => self.apply_sent(result),
            (kind, outcome) => {
                // The token is already consumed; fail the step instead of waiting forever
                warn!("Mismatched outcome {:?} for request {:?}", outcome, kind);
                let error = ServiceError::UnexpectedResponse(format!("mismatched outcome for {:?} request", kind));
                match kind {
                    RequestKind::Generate => self.apply_generated(Err(error), ContextType::InContext),
                    RequestKind::GenerateMore(context_type) => self.apply_generated(Err(error), context_type),
                    RequestKind::CheckDuplicates => self.apply_checked(Err(error)),
                    RequestKind::Send => self.apply_sent(Err(error)),
                }
            }
        }
    }

    fn apply_generated(
        &mut self,
        result: Result<Vec<GeneratedFlashcard>, ServiceError>,
        context_type: ContextType,
    ) -> bool {
        if self.step == WorkflowStep::Done {
            debug!("Discarding generated cards for finished workflow #{}", self.epoch);
            return false;
        }

        let generated = match result {
            Ok(generated) => generated,
            Err(e) => {
                warn!("Card generation failed: {}", e);
                self.last_error = Some(e);
                return true;
            }
        };

        let cards = self.assign_ids(generated);
        let count = cards.len();
        match context_type {
            ContextType::InContext => {
                let at = self.insertion_offset.min(self.candidates.len());
                self.candidates.splice(at..at, cards);
                self.insertion_offset = at + count;
            }
            ContextType::OutOfContext => self.candidates.extend(cards),
        }
        self.last_error = None;
        info!("Received {} {} card(s), {} candidates total", count, context_type, self.candidates.len());
        true
    }

    fn apply_checked(&mut self, result: Result<Vec<DuplicationStatus>, ServiceError>) -> bool {
        if self.step != WorkflowStep::Checking {
            return false;
        }

        let result = result.and_then(|statuses| {
            if statuses.len() == self.checking.len() {
                Ok(statuses)
            } else {
                Err(ServiceError::UnexpectedResponse(format!(
                    "duplicate check returned {} entries for {} cards",
                    statuses.len(),
                    self.checking.len()
                )))
            }
        });

        match result {
            Ok(statuses) => {
                // Identities come from the request; the response is in the same order
                self.confirmation_list = self
                    .checking
                    .iter()
                    .zip(statuses)
                    .map(|(card, status)| ConfirmationCard {
                        flashcard: card.clone(),
                        is_duplicate: status.is_duplicate,
                    })
                    .collect();
                self.step = WorkflowStep::Confirmation;
                info!(
                    "Duplicate check done: {} new, {} duplicate",
                    self.non_duplicates().len(),
                    self.confirmation_list.len() - self.non_duplicates().len()
                );
            }
            Err(e) => {
                warn!("Duplicate check failed: {}", e);
                self.last_error = Some(e);
                self.step = WorkflowStep::Selection;
            }
        }
        true
    }

    fn apply_sent(&mut self, result: Result<String, ServiceError>) -> bool {
        if self.step != WorkflowStep::Sending {
            return false;
        }

        match result {
            Ok(message) => {
                info!("Cards sent: {}", message);
                self.status_message = Some(message);
            }
            Err(e) => {
                warn!("Sending cards failed: {}", e);
                self.status_message = Some(e.detail().to_string());
                self.last_error = Some(e);
            }
        }
        self.step = WorkflowStep::Done;
        true
    }

    // Ids must stay unique within the candidate list
    fn assign_ids(&self, generated: Vec<GeneratedFlashcard>) -> Vec<Flashcard> {
        let mut seen: HashSet<CardId> = self.candidates.iter().map(|card| card.id.clone()).collect();
        generated
            .into_iter()
            .map(|card| {
                let mut card = card.into_flashcard();
                if !seen.insert(card.id.clone()) {
                    card.id = CardId::mint();
                    seen.insert(card.id.clone());
                }
                card
            })
            .collect()
    }

    fn generation_request(&self) -> GenerationRequest {
        GenerationRequest {
            words: self.words.clone(),
            previous_subtitle: self.context.previous.clone(),
            current_subtitle: self.context.current.clone(),
            next_subtitle: self.context.next.clone(),
            custom_themes: self.custom_themes.clone(),
        }
    }

    fn issue(&mut self, kind: RequestKind) -> RequestToken {
        let token = RequestToken {
            epoch: self.epoch,
            seq: self.next_seq,
            kind,
        };
        self.next_seq += 1;
        self.pending.push(token);
        token
    }

    fn require_step(&self, expected: WorkflowStep, action: &'static str) -> Result<(), EngineError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidTransition { action, step: self.step })
        }
    }

    fn require_candidate(&self, id: &CardId) -> Result<usize, EngineError> {
        self.candidates
            .iter()
            .position(|card| &card.id == id)
            .ok_or_else(|| EngineError::UnknownCard(id.clone()))
    }
}
