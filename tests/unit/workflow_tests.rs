/*!
 * Tests for the flashcard review workflow
 */

use std::collections::HashSet;

use cuecards::errors::EngineError;
use cuecards::flashcards::{
    CardId, Completion, ContextType, DuplicationStatus, FlashcardWorkflow, GeneratedFlashcard,
    ServiceCall, ServiceOutcome, WorkflowStep, NOTHING_TO_ADD,
};
use cuecards::subtitle_processor::CueContext;

fn card(n: usize) -> GeneratedFlashcard {
    GeneratedFlashcard::new(format!("sentence {}", n), format!("frase {}", n), format!("termo {}", n))
}

fn generated(call: &ServiceCall, range: std::ops::Range<usize>) -> Completion {
    Completion::new(call.token(), ServiceOutcome::Generated(Ok(range.map(card).collect())))
}

fn start() -> (FlashcardWorkflow, ServiceCall) {
    FlashcardWorkflow::start(7, vec!["fox".to_string()], CueContext::default(), Some(vec!["travel".to_string()]))
        .unwrap()
}

fn assert_chosen_subset(workflow: &FlashcardWorkflow) {
    let ids: HashSet<&CardId> = workflow.candidates().iter().map(|c| &c.id).collect();
    for chosen in workflow.chosen_cards() {
        assert!(ids.contains(&chosen.id));
    }
    assert_eq!(workflow.chosen_cards().len(), workflow.chosen_count());
}

#[test]
fn test_chosen_afterMixedOperations_shouldStaySubsetOfCandidates() {
    let (mut workflow, call) = start();
    workflow.apply(generated(&call, 0..3));

    let ids: Vec<CardId> = workflow.candidates().iter().map(|c| c.id.clone()).collect();
    workflow.toggle(&ids[0]).unwrap();
    workflow.toggle(&ids[2]).unwrap();
    assert_chosen_subset(&workflow);

    let more = workflow.request_more(ContextType::InContext).unwrap();
    workflow.apply(generated(&more, 3..5));
    assert_chosen_subset(&workflow);

    let mut edited = workflow.begin_edit(&ids[2]).unwrap().clone();
    edited.english_sentence = "edited".to_string();
    workflow.save_edit(edited).unwrap();
    assert_chosen_subset(&workflow);

    let out = workflow.request_more(ContextType::OutOfContext).unwrap();
    workflow.apply(generated(&out, 5..6));
    workflow.toggle(&ids[0]).unwrap();
    assert_chosen_subset(&workflow);

    let chosen: Vec<String> = workflow.chosen_cards().into_iter().map(|c| c.english_sentence).collect();
    assert_eq!(chosen, vec!["edited"]);
}

#[test]
fn test_inContextSplice_shouldKeepChosenByIdNotPosition() {
    let (mut workflow, call) = start();
    workflow.apply(generated(&call, 0..2));
    let out = workflow.request_more(ContextType::OutOfContext).unwrap();
    workflow.apply(generated(&out, 10..11));

    let tail = workflow.candidates()[2].id.clone();
    workflow.toggle(&tail).unwrap();

    let more = workflow.request_more(ContextType::InContext).unwrap();
    workflow.apply(generated(&more, 2..4));

    assert_eq!(workflow.candidates()[4].id, tail);
    assert_eq!(workflow.chosen_cards()[0].english_sentence, "sentence 10");
}

#[test]
fn test_sending_shouldOnlyBeReachableThroughConfirmation() {
    let (mut workflow, call) = start();
    workflow.apply(generated(&call, 0..2));

    assert!(matches!(workflow.confirm(), Err(EngineError::InvalidTransition { .. })));
    assert_ne!(workflow.step(), WorkflowStep::Sending);

    let id = workflow.candidates()[0].id.clone();
    workflow.toggle(&id).unwrap();
    let check = workflow.submit().unwrap();
    assert!(workflow.confirm().is_err());
    assert_eq!(workflow.step(), WorkflowStep::Checking);

    workflow.apply(Completion::new(
        check.token(),
        ServiceOutcome::Checked(Ok(vec![DuplicationStatus { flashcard: card(0), is_duplicate: false }])),
    ));
    assert_eq!(workflow.step(), WorkflowStep::Confirmation);
    assert!(workflow.confirm().unwrap().is_some());
    assert_eq!(workflow.step(), WorkflowStep::Sending);
}

#[test]
fn test_confirm_withZeroNonDuplicates_shouldFinishWithoutCall() {
    let (mut workflow, call) = start();
    workflow.apply(generated(&call, 0..2));
    let ids: Vec<CardId> = workflow.candidates().iter().map(|c| c.id.clone()).collect();
    for id in &ids {
        workflow.toggle(id).unwrap();
    }
    let check = workflow.submit().unwrap();
    let statuses = (0..2).map(|n| DuplicationStatus { flashcard: card(n), is_duplicate: true }).collect();
    workflow.apply(Completion::new(check.token(), ServiceOutcome::Checked(Ok(statuses))));

    assert_eq!(workflow.confirm().unwrap(), None);
    assert_eq!(workflow.step(), WorkflowStep::Done);
    assert_eq!(workflow.status_message(), Some(NOTHING_TO_ADD));
    assert!(!workflow.is_loading());
}

#[test]
fn test_confirm_shouldSendOnlyNonDuplicatesWithTheirIds() {
    let (mut workflow, call) = start();
    workflow.apply(generated(&call, 0..2));
    let ids: Vec<CardId> = workflow.candidates().iter().map(|c| c.id.clone()).collect();
    workflow.toggle(&ids[0]).unwrap();
    workflow.toggle(&ids[1]).unwrap();

    let check = workflow.submit().unwrap();
    workflow.apply(Completion::new(
        check.token(),
        ServiceOutcome::Checked(Ok(vec![
            DuplicationStatus { flashcard: card(0), is_duplicate: true },
            DuplicationStatus { flashcard: card(1), is_duplicate: false },
        ])),
    ));

    match workflow.confirm().unwrap() {
        Some(ServiceCall::Send { request, .. }) => {
            assert_eq!(request.flashcards.len(), 1);
            assert_eq!(request.flashcards[0].id, ids[1]);
            assert_eq!(request.words, vec!["fox"]);
        }
        other => panic!("unexpected call {:?}", other),
    }
}

#[test]
fn test_generationFailure_shouldStayInSelectionWithError() {
    let (mut workflow, call) = start();
    workflow.apply(Completion::new(
        call.token(),
        ServiceOutcome::Generated(Err(cuecards::errors::ServiceError::ConnectionError("offline".into()))),
    ));
    assert_eq!(workflow.step(), WorkflowStep::Selection);
    assert!(workflow.candidates().is_empty());
    assert_eq!(workflow.last_error().map(|e| e.detail()), Some("offline"));
}

#[test]
fn test_themes_shouldBeForwardedToGeneration() {
    let (_, call) = start();
    match call {
        ServiceCall::Generate { request, .. } => {
            assert_eq!(request.custom_themes, Some(vec!["travel".to_string()]));
        }
        other => panic!("unexpected call {:?}", other),
    }
}

#[test]
fn test_lateGeneration_afterDone_shouldBeDiscarded() {
    let (mut workflow, call) = start();
    workflow.apply(generated(&call, 0..1));
    let more = workflow.request_more(ContextType::InContext).unwrap();

    let id = workflow.candidates()[0].id.clone();
    workflow.toggle(&id).unwrap();
    let check = workflow.submit().unwrap();
    workflow.apply(Completion::new(
        check.token(),
        ServiceOutcome::Checked(Ok(vec![DuplicationStatus { flashcard: card(0), is_duplicate: true }])),
    ));
    workflow.confirm().unwrap();
    assert_eq!(workflow.step(), WorkflowStep::Done);

    assert!(!workflow.apply(generated(&more, 1..3)));
    assert_eq!(workflow.candidates().len(), 1);
}
