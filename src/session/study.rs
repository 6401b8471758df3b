/*!
 * Per-video study session.
 *
 * A `StudySession` owns everything tied to one loaded cue track: the cues,
 * the active cue, the word selection and at most one flashcard workflow.
 * It is synchronous; the engine drives it from a single task.
 */

use log::{debug, info, warn};

use crate::app_config::{Config, CueChangePolicy};
use crate::errors::{EngineError, ServiceError};
use crate::flashcards::{
    CardId, Completion, ConfirmationCard, ContextType, Flashcard, FlashcardWorkflow, ServiceCall,
    WorkflowStep,
};
use crate::selection::{clean_token, SelectionTracker};
use crate::subtitle_processor::{resolve_active_index, CueContext, SubtitleCue};

/// Point-in-time view of a workflow, for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSnapshot {
    pub epoch: u64,
    pub step: WorkflowStep,
    pub phrase: String,
    pub candidates: Vec<Flashcard>,
    pub chosen: Vec<CardId>,
    pub confirmation_list: Vec<ConfirmationCard>,
    pub editing_id: Option<CardId>,
    pub status_message: Option<String>,
    pub last_error: Option<ServiceError>,
    pub loading: bool,
}

impl WorkflowSnapshot {
    fn of(workflow: &FlashcardWorkflow) -> Self {
        Self {
            epoch: workflow.epoch(),
            step: workflow.step(),
            phrase: workflow.phrase(),
            candidates: workflow.candidates().to_vec(),
            chosen: workflow.chosen_cards().into_iter().map(|card| card.id).collect(),
            confirmation_list: workflow.confirmation_list().to_vec(),
            editing_id: workflow.editing_id().cloned(),
            status_message: workflow.status_message().map(str::to_string),
            last_error: workflow.last_error().cloned(),
            loading: workflow.is_loading(),
        }
    }
}

/// Point-in-time view of a session, for rendering
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub current_time: Option<f64>,
    pub active_index: Option<usize>,
    pub active_cue: Option<SubtitleCue>,
    pub selection: Vec<String>,
    pub workflow: Option<WorkflowSnapshot>,
}

impl SessionSnapshot {
    pub fn phrase(&self) -> String {
        self.selection.join(" ")
    }
}

#[derive(Debug)]
pub struct StudySession {
    cues: Vec<SubtitleCue>,
    policy: CueChangePolicy,
    custom_themes: Option<Vec<String>>,
    current_time: Option<f64>,
    active_index: Option<usize>,
    tracker: SelectionTracker,
    workflow: Option<FlashcardWorkflow>,
    last_epoch: u64,
}

impl StudySession {
    pub fn new(cues: Vec<SubtitleCue>, policy: CueChangePolicy) -> Self {
        Self {
            cues,
            policy,
            custom_themes: None,
            current_time: None,
            active_index: None,
            tracker: SelectionTracker::new(),
            workflow: None,
            last_epoch: 0,
        }
    }

    pub fn from_config(cues: Vec<SubtitleCue>, config: &Config) -> Self {
        let mut session = Self::new(cues, config.playback.cue_change_policy);
        session.custom_themes = config.generation.themes();
        session
    }

    pub fn set_custom_themes(&mut self, themes: Option<Vec<String>>) {
        self.custom_themes = themes.filter(|themes| !themes.is_empty());
    }

    pub fn cues(&self) -> &[SubtitleCue] {
        &self.cues
    }

    pub fn policy(&self) -> CueChangePolicy {
        self.policy
    }

    pub fn current_time(&self) -> Option<f64> {
        self.current_time
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn active_cue(&self) -> Option<&SubtitleCue> {
        self.active_index.and_then(|index| self.cues.get(index))
    }

    pub fn selection(&self) -> &SelectionTracker {
        &self.tracker
    }

    pub fn workflow(&self) -> Option<&FlashcardWorkflow> {
        self.workflow.as_ref()
    }

    /// Swap in a new cue track
    ///
    /// The old selection and workflow belong to the old track and are dropped.
    pub fn replace_cues(&mut self, cues: Vec<SubtitleCue>) {
        info!("Loading {} cues", cues.len());
        self.cues = cues;
        self.dismiss();
        self.active_index = None;
        self.tracker.reset("");
        if let Some(time) = self.current_time {
            self.on_time(time);
        }
    }

    /// Observe a playback position; returns true when the active cue changed
    pub fn on_time(&mut self, time_secs: f64) -> bool {
        if !time_secs.is_finite() || time_secs < 0.0 {
            debug!("Ignoring invalid playback time {}", time_secs);
            return false;
        }
        self.current_time = Some(time_secs);

        let index = resolve_active_index(&self.cues, time_secs);
        let text = index.map(|i| self.cues[i].text.as_str()).unwrap_or("");

        let changed = match self.policy {
            CueChangePolicy::Text => self.tracker.on_cue_changed(text),
            CueChangePolicy::Identity => {
                if index != self.active_index {
                    self.tracker.reset(text);
                    true
                } else {
                    false
                }
            }
        };
        if changed {
            debug!("Active cue at {:.3}s: {:?}", time_secs, index);
        }
        self.active_index = index;
        changed
    }

    /// Click a word of the active cue
    pub fn click_word(&mut self, raw_word: &str) -> Result<bool, EngineError> {
        if self.active_index.is_none() {
            warn!("Ignoring click on '{}' with no active cue", raw_word);
            return Err(EngineError::InvalidInput("No active subtitle to select from".to_string()));
        }
        if self.tracker.on_word_clicked(raw_word) {
            return Ok(true);
        }
        let word = clean_token(raw_word);
        if word.is_empty() {
            return Ok(false);
        }
        warn!("Rejecting click on '{}', not in the active cue", word);
        Err(EngineError::InvalidInput(format!("'{}' is not in the current subtitle", word)))
    }

    /// Start a workflow for the current selection, replacing any previous one
    pub fn commit_selection(&mut self) -> Result<ServiceCall, EngineError> {
        if self.tracker.is_empty() {
            return Err(EngineError::EmptySelection);
        }

        let context = self
            .active_index
            .map(|index| CueContext::around(&self.cues, index))
            .unwrap_or_else(|| CueContext {
                current: self.tracker.active_cue_text().to_string(),
                ..CueContext::default()
            });

        let epoch = self.last_epoch + 1;
        let (workflow, call) = FlashcardWorkflow::start(
            epoch,
            self.tracker.selected().to_vec(),
            context,
            self.custom_themes.clone(),
        )?;
        self.last_epoch = epoch;

        if let Some(previous) = self.workflow.replace(workflow) {
            info!("Discarding workflow #{} for a new selection", previous.epoch());
        }
        Ok(call)
    }

    pub fn toggle_card(&mut self, id: &CardId) -> Result<bool, EngineError> {
        self.workflow_mut()?.toggle(id)
    }

    pub fn begin_edit(&mut self, id: &CardId) -> Result<Flashcard, EngineError> {
        self.workflow_mut()?.begin_edit(id).cloned()
    }

    pub fn save_edit(&mut self, edited: Flashcard) -> Result<(), EngineError> {
        self.workflow_mut()?.save_edit(edited)
    }

    pub fn cancel_edit(&mut self) -> Result<(), EngineError> {
        self.workflow_mut()?.cancel_edit();
        Ok(())
    }

    pub fn request_more(&mut self, context_type: ContextType) -> Result<ServiceCall, EngineError> {
        self.workflow_mut()?.request_more(context_type)
    }

    pub fn submit(&mut self) -> Result<ServiceCall, EngineError> {
        self.workflow_mut()?.submit()
    }

    pub fn go_back(&mut self) -> Result<(), EngineError> {
        self.workflow_mut()?.go_back()
    }

    pub fn confirm(&mut self) -> Result<Option<ServiceCall>, EngineError> {
        self.workflow_mut()?.confirm()
    }

    /// Drop the current workflow; its outstanding responses will be ignored
    pub fn dismiss(&mut self) -> bool {
        match self.workflow.take() {
            Some(workflow) => {
                info!("Dismissed workflow #{}", workflow.epoch());
                true
            }
            None => false,
        }
    }

    /// Route a finished service call to the workflow that issued it
    pub fn complete(&mut self, completion: Completion) -> bool {
        match self.workflow.as_mut() {
            Some(workflow) if workflow.epoch() == completion.token.epoch => workflow.apply(completion),
            _ => {
                debug!(
                    "Discarding {:?} response from workflow #{}",
                    completion.token.kind, completion.token.epoch
                );
                false
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_time: self.current_time,
            active_index: self.active_index,
            active_cue: self.active_cue().cloned(),
            selection: self.tracker.selected().to_vec(),
            workflow: self.workflow.as_ref().map(WorkflowSnapshot::of),
        }
    }

    fn workflow_mut(&mut self) -> Result<&mut FlashcardWorkflow, EngineError> {
        self.workflow.as_mut().ok_or(EngineError::NoActiveWorkflow)
    }
}
