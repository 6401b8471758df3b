/*!
 * The study engine actor.
 *
 * One tokio task owns the `StudySession` and the `ClockSampler`. It waits on
 * a single channel for commands and service completions, and on the sampler
 * for clock ticks. Each wake-up is handled to completion before the next one
 * is taken, so ticks never overlap and completions never race commands.
 *
 * Service calls run on spawned tasks and post their `Completion` back into
 * the channel. Nothing is cancelled on the network: the workflow's epoch
 * check discards what arrives late.
 */

use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::clock::{ClockSampler, PlaybackClock};
use crate::errors::EngineError;
use crate::flashcards::{CardId, Completion, ContextType, Flashcard, ServiceCall};
use crate::services::{self, FlashcardService};
use crate::subtitle_processor::SubtitleCue;

use super::study::{SessionSnapshot, StudySession};

/// User and host commands accepted by the engine
#[derive(Debug)]
pub enum EngineCommand {
    ReplaceCues(Vec<SubtitleCue>),
    AttachClock(Arc<dyn PlaybackClock>),
    DetachClock,
    /// Play/pause notification from the player
    PlaybackStateChanged { playing: bool },
    /// A position pushed by the host, e.g. after a seek while paused
    ObserveTime(f64),
    ClickWord(String),
    CommitSelection,
    ToggleCard(CardId),
    BeginEdit(CardId),
    SaveEdit(Flashcard),
    CancelEdit,
    RequestMore(ContextType),
    Submit,
    GoBack,
    Confirm,
    Dismiss,
}

#[derive(Debug)]
enum EngineMessage {
    Command {
        command: EngineCommand,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Completed(Completion),
    Shutdown,
}

enum Wake {
    Message(EngineMessage),
    Tick(f64),
    Closed,
}

/// Cloneable handle to a running engine
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: mpsc::UnboundedSender<EngineMessage>,
}

impl EngineHandle {
    /// Run a command and wait until the engine has applied it
    pub async fn send(&self, command: EngineCommand) -> Result<(), EngineError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(EngineMessage::Command { command, reply })
            .map_err(|_| EngineError::Stopped)?;
        response.await.map_err(|_| EngineError::Stopped)?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, EngineError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(EngineMessage::Snapshot(reply))
            .map_err(|_| EngineError::Stopped)?;
        response.await.map_err(|_| EngineError::Stopped)
    }

    /// Ask the engine to stop after the messages already queued
    pub fn shutdown(&self) {
        let _ = self.sender.send(EngineMessage::Shutdown);
    }

    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }
}

pub struct Engine {
    session: StudySession,
    sampler: ClockSampler,
    service: Arc<dyn FlashcardService>,
    receiver: mpsc::UnboundedReceiver<EngineMessage>,
    // Weak so that dropping every handle stops the engine
    completions: mpsc::WeakUnboundedSender<EngineMessage>,
}

impl Engine {
    /// Start the engine on the current tokio runtime
    pub fn spawn(
        session: StudySession,
        sampler: ClockSampler,
        service: Arc<dyn FlashcardService>,
    ) -> (EngineHandle, JoinHandle<StudySession>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let engine = Engine {
            session,
            sampler,
            service,
            receiver,
            completions: sender.downgrade(),
        };
        let task = tokio::spawn(engine.run());
        (EngineHandle { sender }, task)
    }

    async fn run(mut self) -> StudySession {
        info!("Study engine started with {} cues", self.session.cues().len());

        loop {
            let wake = tokio::select! {
                message = self.receiver.recv() => match message {
                    Some(message) => Wake::Message(message),
                    None => Wake::Closed,
                },
                time = self.sampler.next_sample() => Wake::Tick(time),
            };

            match wake {
                Wake::Tick(time) => {
                    self.session.on_time(time);
                }
                Wake::Message(EngineMessage::Command { command, reply }) => {
                    let result = self.execute(command);
                    if let Err(e) = &result {
                        warn!("{}", e);
                    }
                    let _ = reply.send(result);
                }
                Wake::Message(EngineMessage::Snapshot(reply)) => {
                    let _ = reply.send(self.session.snapshot());
                }
                Wake::Message(EngineMessage::Completed(completion)) => {
                    self.session.complete(completion);
                }
                Wake::Message(EngineMessage::Shutdown) | Wake::Closed => break,
            }
        }

        info!("Study engine stopped");
        self.session
    }

    fn execute(&mut self, command: EngineCommand) -> Result<(), EngineError> {
        match command {
            EngineCommand::ReplaceCues(cues) => {
                self.session.replace_cues(cues);
                self.sample_if_playing();
                Ok(())
            }
            EngineCommand::AttachClock(handle) => {
                self.sampler.attach(handle);
                self.sample_if_playing();
                Ok(())
            }
            EngineCommand::DetachClock => {
                self.sampler.detach();
                Ok(())
            }
            EngineCommand::PlaybackStateChanged { playing } => {
                self.sampler.set_playing(playing);
                Ok(())
            }
            EngineCommand::ObserveTime(time) => {
                self.session.on_time(time);
                Ok(())
            }
            EngineCommand::ClickWord(word) => self.session.click_word(&word).map(drop),
            EngineCommand::CommitSelection => {
                let call = self.session.commit_selection()?;
                self.dispatch(call);
                Ok(())
            }
            EngineCommand::ToggleCard(id) => self.session.toggle_card(&id).map(drop),
            EngineCommand::BeginEdit(id) => self.session.begin_edit(&id).map(drop),
            EngineCommand::SaveEdit(card) => self.session.save_edit(card),
            EngineCommand::CancelEdit => self.session.cancel_edit(),
            EngineCommand::RequestMore(context_type) => {
                let call = self.session.request_more(context_type)?;
                self.dispatch(call);
                Ok(())
            }
            EngineCommand::Submit => {
                let call = self.session.submit()?;
                self.dispatch(call);
                Ok(())
            }
            EngineCommand::GoBack => self.session.go_back(),
            EngineCommand::Confirm => {
                if let Some(call) = self.session.confirm()? {
                    self.dispatch(call);
                }
                Ok(())
            }
            EngineCommand::Dismiss => {
                self.session.dismiss();
                Ok(())
            }
        }
    }

    // A paused player is never sampled; hosts push positions with ObserveTime
    fn sample_if_playing(&mut self) {
        if !self.sampler.is_ticking() {
            return;
        }
        if let Some(time) = self.sampler.sample() {
            self.session.on_time(time);
        }
    }

    fn dispatch(&self, call: ServiceCall) {
        let service = Arc::clone(&self.service);
        let completions = self.completions.clone();
        debug!("Dispatching {:?} request #{}", call.token().kind, call.token().seq);

        tokio::spawn(async move {
            let completion = services::execute(service.as_ref(), call).await;
            match completions.upgrade() {
                Some(sender) => {
                    let _ = sender.send(EngineMessage::Completed(completion));
                }
                None => debug!("Engine gone, dropping {:?} response", completion.token.kind),
            }
        });
    }
}
