/*!
 * End-to-end scenarios: engine actor, study session and mock service together
 */

use std::sync::Arc;
use std::time::Duration;

use cuecards::app_config::CueChangePolicy;
use cuecards::clock::{ClockSampler, SimulatedPlayer};
use cuecards::errors::EngineError;
use cuecards::flashcards::{CardId, WorkflowStep, NOTHING_TO_ADD};
use cuecards::services::FlashcardService;
use cuecards::services::mock::{MockFlashcardService, MockOperation};
use cuecards::session::{Engine, EngineCommand, EngineHandle, SessionSnapshot, StudySession};
use cuecards::subtitle_processor::SubtitleCue;

use crate::common::{self, wait_for, GatedService};

fn spawn(cues: Vec<SubtitleCue>, service: Arc<dyn FlashcardService>) -> EngineHandle {
    common::init_logging();
    let session = StudySession::new(cues, CueChangePolicy::Text);
    let (engine, _task) = Engine::spawn(session, ClockSampler::default(), service);
    engine
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn candidate_ids(snapshot: &SessionSnapshot) -> Vec<CardId> {
    snapshot
        .workflow
        .as_ref()
        .map(|w| w.candidates.iter().map(|c| c.id.clone()).collect())
        .unwrap_or_default()
}

fn step(snapshot: &SessionSnapshot) -> Option<WorkflowStep> {
    snapshot.workflow.as_ref().map(|w| w.step)
}

/// Select "hello world" on the single cue and wait for the first candidates
async fn select_and_generate(engine: &EngineHandle) -> SessionSnapshot {
    engine.send(EngineCommand::ObserveTime(1.0)).await.unwrap();
    engine.send(EngineCommand::ClickWord("hello".into())).await.unwrap();
    engine.send(EngineCommand::ClickWord("world".into())).await.unwrap();
    engine.send(EngineCommand::CommitSelection).await.unwrap();
    wait_for(engine, |s| !candidate_ids(s).is_empty() && !s.workflow.as_ref().unwrap().loading).await
}

#[tokio::test]
async fn test_helloWorld_scenario_shouldRequestGenerationForBothWords() {
    let mock = MockFlashcardService::working();
    let engine = spawn(common::hello_world_cues(), Arc::new(mock.clone()));

    engine.send(EngineCommand::ObserveTime(1.0)).await.unwrap();
    let snapshot = engine.snapshot().await.unwrap();
    assert_eq!(snapshot.active_cue.unwrap().text, "hello world");

    engine.send(EngineCommand::ClickWord("hello".into())).await.unwrap();
    assert_eq!(engine.snapshot().await.unwrap().selection, vec!["hello"]);
    engine.send(EngineCommand::ClickWord("world".into())).await.unwrap();
    assert_eq!(engine.snapshot().await.unwrap().selection, vec!["hello", "world"]);

    engine.send(EngineCommand::CommitSelection).await.unwrap();
    let snapshot = wait_for(&engine, |s| candidate_ids(s).len() == 3).await;

    let workflow = snapshot.workflow.unwrap();
    assert_eq!(workflow.phrase, "hello world");
    assert_eq!(workflow.step, WorkflowStep::Selection);
    assert_eq!(
        workflow.candidates[0].english_sentence,
        MockFlashcardService::sentence_for(&words(&["hello", "world"]), 1)
    );
    assert_eq!(mock.calls(), vec![MockOperation::Generate]);
}

#[tokio::test]
async fn test_confirm_withOneDuplicate_shouldSendExactlyTheOther() {
    let phrase = words(&["hello", "world"]);
    let mock = MockFlashcardService::working()
        .with_cards_per_request(2)
        .with_duplicates([MockFlashcardService::sentence_for(&phrase, 1)]);
    let engine = spawn(common::hello_world_cues(), Arc::new(mock.clone()));

    let snapshot = select_and_generate(&engine).await;
    for id in candidate_ids(&snapshot) {
        engine.send(EngineCommand::ToggleCard(id)).await.unwrap();
    }
    engine.send(EngineCommand::Submit).await.unwrap();
    let snapshot = wait_for(&engine, |s| step(s) == Some(WorkflowStep::Confirmation)).await;
    let confirmation = snapshot.workflow.unwrap().confirmation_list;
    assert_eq!(confirmation.len(), 2);
    assert!(confirmation[0].is_duplicate);
    assert!(!confirmation[1].is_duplicate);

    engine.send(EngineCommand::Confirm).await.unwrap();
    let snapshot = wait_for(&engine, |s| step(s) == Some(WorkflowStep::Done)).await;

    let sent = mock.sent_requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].flashcards.len(), 1);
    assert_eq!(sent[0].flashcards[0].english_sentence, MockFlashcardService::sentence_for(&phrase, 2));
    assert_eq!(sent[0].flashcards[0].id, confirmation[1].flashcard.id);
    assert_eq!(
        snapshot.workflow.unwrap().status_message.as_deref(),
        Some("1 flashcards were sent successfully!")
    );
}

#[tokio::test]
async fn test_confirm_withOnlyDuplicates_shouldFinishWithoutSending() {
    let phrase = words(&["hello", "world"]);
    let mock = MockFlashcardService::working()
        .with_cards_per_request(1)
        .with_duplicates([MockFlashcardService::sentence_for(&phrase, 1)]);
    let engine = spawn(common::hello_world_cues(), Arc::new(mock.clone()));

    let snapshot = select_and_generate(&engine).await;
    engine.send(EngineCommand::ToggleCard(candidate_ids(&snapshot)[0].clone())).await.unwrap();
    engine.send(EngineCommand::Submit).await.unwrap();
    wait_for(&engine, |s| step(s) == Some(WorkflowStep::Confirmation)).await;

    engine.send(EngineCommand::Confirm).await.unwrap();
    let snapshot = engine.snapshot().await.unwrap();
    let workflow = snapshot.workflow.unwrap();
    assert_eq!(workflow.step, WorkflowStep::Done);
    assert_eq!(workflow.status_message.as_deref(), Some(NOTHING_TO_ADD));
    assert_eq!(mock.call_count(MockOperation::Send), 0);
}

#[tokio::test]
async fn test_lateCheckResponse_afterNewCommit_shouldNotTouchNewWorkflow() {
    let gated = GatedService::new(MockFlashcardService::working());
    let engine = spawn(common::hello_world_cues(), Arc::new(gated.clone()));

    let snapshot = select_and_generate(&engine).await;
    let old_epoch = snapshot.workflow.as_ref().unwrap().epoch;
    engine.send(EngineCommand::ToggleCard(candidate_ids(&snapshot)[0].clone())).await.unwrap();
    engine.send(EngineCommand::Submit).await.unwrap();
    assert_eq!(step(&engine.snapshot().await.unwrap()), Some(WorkflowStep::Checking));

    // New phrase while the check is still outstanding
    engine.send(EngineCommand::ClickWord("world".into())).await.unwrap();
    engine.send(EngineCommand::CommitSelection).await.unwrap();
    let fresh = wait_for(&engine, |s| {
        s.workflow.as_ref().is_some_and(|w| w.epoch != old_epoch && !w.candidates.is_empty())
    })
    .await;
    let fresh_workflow = fresh.workflow.clone().unwrap();
    assert_eq!(fresh_workflow.phrase, "world");

    gated.release_one();
    for _ in 0..200 {
        if gated.inner.call_count(MockOperation::CheckDuplicates) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(gated.inner.call_count(MockOperation::CheckDuplicates), 1);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let after = engine.snapshot().await.unwrap().workflow.unwrap();
    assert_eq!(after, fresh_workflow);
    assert_eq!(after.step, WorkflowStep::Selection);
    assert!(after.confirmation_list.is_empty());
}

#[tokio::test]
async fn test_checkFailure_shouldReturnToSelectionWithChosenIntact() {
    let engine = spawn(
        common::hello_world_cues(),
        Arc::new(MockFlashcardService::failing_on(MockOperation::CheckDuplicates)),
    );

    let snapshot = select_and_generate(&engine).await;
    let id = candidate_ids(&snapshot)[1].clone();
    engine.send(EngineCommand::ToggleCard(id.clone())).await.unwrap();
    engine.send(EngineCommand::Submit).await.unwrap();

    let snapshot = wait_for(&engine, |s| {
        s.workflow.as_ref().is_some_and(|w| w.step == WorkflowStep::Selection && w.last_error.is_some())
    })
    .await;
    let workflow = snapshot.workflow.unwrap();
    assert_eq!(workflow.chosen, vec![id]);
    assert_eq!(workflow.candidates.len(), 3);
}

#[tokio::test]
async fn test_sendFailure_shouldFinishWithFailureMessage() {
    let engine = spawn(common::hello_world_cues(), Arc::new(MockFlashcardService::failing_on(MockOperation::Send)));

    let snapshot = select_and_generate(&engine).await;
    engine.send(EngineCommand::ToggleCard(candidate_ids(&snapshot)[0].clone())).await.unwrap();
    engine.send(EngineCommand::Submit).await.unwrap();
    wait_for(&engine, |s| step(s) == Some(WorkflowStep::Confirmation)).await;
    engine.send(EngineCommand::Confirm).await.unwrap();

    let snapshot = wait_for(&engine, |s| step(s) == Some(WorkflowStep::Done)).await;
    let workflow = snapshot.workflow.unwrap();
    assert_eq!(workflow.status_message.as_deref(), Some("Simulated Send failure"));
    assert!(workflow.last_error.is_some());
}

#[tokio::test]
async fn test_commands_inWrongState_shouldReturnTypedErrors() {
    let engine = spawn(common::hello_world_cues(), Arc::new(MockFlashcardService::working()));

    assert_eq!(engine.send(EngineCommand::Submit).await, Err(EngineError::NoActiveWorkflow));
    assert_eq!(engine.send(EngineCommand::CommitSelection).await, Err(EngineError::EmptySelection));
    assert!(matches!(
        engine.send(EngineCommand::ClickWord("hello".into())).await,
        Err(EngineError::InvalidInput(_))
    ));

    select_and_generate(&engine).await;
    assert!(matches!(
        engine.send(EngineCommand::Confirm).await,
        Err(EngineError::InvalidTransition { step: WorkflowStep::Selection, .. })
    ));
    assert_eq!(engine.send(EngineCommand::Submit).await, Err(EngineError::NothingChosen));
}

#[tokio::test]
async fn test_dismiss_withRequestInFlight_shouldIgnoreLateResponse() {
    let mock = MockFlashcardService::slow(50);
    let engine = spawn(common::hello_world_cues(), Arc::new(mock.clone()));

    engine.send(EngineCommand::ObserveTime(1.0)).await.unwrap();
    engine.send(EngineCommand::ClickWord("hello".into())).await.unwrap();
    engine.send(EngineCommand::CommitSelection).await.unwrap();
    engine.send(EngineCommand::Dismiss).await.unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(mock.call_count(MockOperation::Generate), 1);
    assert!(engine.snapshot().await.unwrap().workflow.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_clockTicks_shouldDriveActiveCueOnlyWhilePlaying() {
    let engine = spawn(common::sample_cues(), Arc::new(MockFlashcardService::working()));
    let player = Arc::new(SimulatedPlayer::new());
    player.seek(4.0);
    engine.send(EngineCommand::AttachClock(player.clone())).await.unwrap();
    // Attaching a paused player takes no sample
    assert_eq!(engine.snapshot().await.unwrap().active_index, None);

    engine.send(EngineCommand::ObserveTime(4.0)).await.unwrap();
    assert_eq!(engine.snapshot().await.unwrap().active_index, Some(1));

    engine.send(EngineCommand::ClickWord("quick".into())).await.unwrap();

    // Paused: seeking moves the player but nothing samples it
    player.seek(7.5);
    tokio::time::sleep(Duration::from_secs(2)).await;
    let snapshot = engine.snapshot().await.unwrap();
    assert_eq!(snapshot.active_index, Some(1));
    assert_eq!(snapshot.selection, vec!["quick"]);

    player.play();
    engine.send(EngineCommand::PlaybackStateChanged { playing: true }).await.unwrap();
    let snapshot = wait_for(&engine, |s| s.active_index == Some(2)).await;
    assert!(snapshot.selection.is_empty());
    assert_eq!(snapshot.active_cue.unwrap().text, "Over the lazy dog.");

    // Past the last cue nothing is active
    player.seek(20.0);
    wait_for(&engine, |s| s.active_index.is_none()).await;
}

#[tokio::test]
async fn test_shutdown_shouldReturnSession() {
    let session = StudySession::new(common::sample_cues(), CueChangePolicy::Identity);
    let (engine, task) = Engine::spawn(session, ClockSampler::default(), Arc::new(MockFlashcardService::working()));
    engine.send(EngineCommand::ObserveTime(1.5)).await.unwrap();
    engine.shutdown();

    let session = task.await.unwrap();
    assert_eq!(session.active_index(), Some(0));
    assert!(matches!(engine.snapshot().await, Err(EngineError::Stopped)));
}
