use minutes::audio::AudioInput;
use minutes::backend::{BackendRegistry, EngineKind};
use minutes::config::Config;
use minutes::error::MinutesError;
use minutes::extraction::generator::MockGenerator;
use minutes::extraction::{ActionItemStage, ExtractionRules, SummarizationStage};
use minutes::pipeline::{ActionItem, Pipeline, StageMethod, StageStatus, Transcript};
use minutes::stt::transcriber::MockTranscriber;
use std::sync::Arc;

const MEETING: &str =
    "Sarah will send the report. The meeting went well. We need to schedule a follow-up.";

fn texts(items: &[ActionItem]) -> Vec<&str> {
    items.iter().map(ActionItem::as_str).collect()
}

fn transcribing(text: &str) -> BackendRegistry {
    BackendRegistry::empty().with_transcriber(
        EngineKind::Standard,
        Arc::new(MockTranscriber::new("tiny").with_text(text)),
    )
}

#[test]
fn three_sentence_meeting_without_models() {
    let pipeline = Pipeline::new(Arc::new(transcribing(MEETING)), &Config::default());
    let result = pipeline
        .run(&AudioInput::new(vec![1; 32], "standup.wav"))
        .unwrap();

    assert_eq!(result.transcript.text(), MEETING);
    assert_eq!(result.summary.as_str(), MEETING);
    assert_eq!(
        texts(&result.action_items),
        vec!["Sarah will send the report", "We need to schedule a follow-up"]
    );
    assert!(
        !texts(&result.action_items)
            .iter()
            .any(|i| i.contains("The meeting went well"))
    );

    assert_eq!(result.engine, Some(EngineKind::Standard));
    assert_eq!(result.stages.summarization.method, Some(StageMethod::Rules));
    assert_eq!(result.stages.action_items.method, Some(StageMethod::Rules));
    assert_eq!(result.stages.action_items.status, StageStatus::Degraded);
    assert!(result.is_degraded());
}

#[test]
fn forced_fallback_finds_the_deadline_clause() {
    let registry = BackendRegistry::empty()
        .with_action_extractor(Arc::new(MockGenerator::new("flan").with_failure("out of memory")));
    let stage = ActionItemStage::new(Arc::new(registry), Arc::new(ExtractionRules::default()));

    let output = stage
        .extract_action_items(&Transcript::new("We must finish the report by Friday.", None))
        .unwrap();
    let (items, report) = output.into_parts(0);

    assert!(
        items
            .iter()
            .any(|i| i.as_str().contains("We must finish the report by Friday"))
    );
    assert_eq!(report.method, Some(StageMethod::Rules));
    assert!(report.note.unwrap().contains("out of memory"));
}

#[test]
fn blank_transcript_is_rejected_by_both_stages() {
    let registry = Arc::new(BackendRegistry::empty());
    let rules = Arc::new(ExtractionRules::default());
    let summarizer = SummarizationStage::new(registry.clone(), rules.clone());
    let extractor = ActionItemStage::new(registry, rules);

    for text in ["", "   ", "\n\t "] {
        let transcript = Transcript::new(text, None);
        assert!(matches!(
            summarizer.summarize(&transcript),
            Err(MinutesError::EmptyInput)
        ));
        assert!(matches!(
            extractor.extract_action_items(&transcript),
            Err(MinutesError::EmptyInput)
        ));
    }
}

#[test]
fn action_items_never_empty() {
    let pipeline = Pipeline::new(Arc::new(BackendRegistry::empty()), &Config::default());
    let inputs = [
        MEETING,
        "Lovely weather today.",
        "ok",
        "The quarter closed. Numbers looked fine!",
    ];

    for text in inputs {
        let result = pipeline.analyze(Transcript::new(text, None)).unwrap();
        assert!(!result.action_items.is_empty(), "no items for {text:?}");
    }
}

#[test]
fn no_match_reports_placeholder_defaults() {
    let pipeline = Pipeline::new(Arc::new(BackendRegistry::empty()), &Config::default());
    let result = pipeline
        .analyze(Transcript::new("Lovely weather today.", None))
        .unwrap();

    assert_eq!(
        texts(&result.action_items),
        vec![
            "Review the meeting transcript",
            "Schedule follow-up meeting",
            "Update documentation"
        ]
    );
    assert_eq!(
        result.stages.action_items.method,
        Some(StageMethod::Placeholder)
    );
    assert_eq!(result.stages.action_items.status, StageStatus::Degraded);
}

#[test]
fn repeated_analysis_is_identical() {
    let pipeline = Pipeline::new(Arc::new(BackendRegistry::empty()), &Config::default());
    let first = pipeline.analyze(Transcript::new(MEETING, None)).unwrap();
    let second = pipeline.analyze(Transcript::new(MEETING, None)).unwrap();

    assert_eq!(first.summary, second.summary);
    assert_eq!(first.action_items, second.action_items);
}

#[test]
fn model_outputs_win_when_loaded() {
    let registry = transcribing(MEETING)
        .with_summarizer(Arc::new(
            MockGenerator::new("flan-t5-small").with_response("Report and follow-up agreed."),
        ))
        .with_action_extractor(Arc::new(
            MockGenerator::new("flan-t5-small")
                .with_response("1. Sarah sends the report\n2. Schedule a follow-up"),
        ));
    let result = Pipeline::new(Arc::new(registry), &Config::default())
        .run(&AudioInput::new(vec![1; 8], "m.wav"))
        .unwrap();

    assert_eq!(result.summary.as_str(), "Report and follow-up agreed.");
    assert_eq!(
        texts(&result.action_items),
        vec!["Sarah sends the report", "Schedule a follow-up"]
    );
    assert!(!result.is_degraded());
}

#[test]
fn empty_model_summary_becomes_placeholder() {
    let registry = BackendRegistry::empty()
        .with_summarizer(Arc::new(MockGenerator::new("flan").with_response("  ")));
    let result = Pipeline::new(Arc::new(registry), &Config::default())
        .analyze(Transcript::new(MEETING, None))
        .unwrap();

    assert_eq!(
        result.stages.summarization.method,
        Some(StageMethod::Placeholder)
    );
    assert_eq!(result.stages.summarization.status, StageStatus::Degraded);
}

#[test]
fn transcription_failure_stops_the_run() {
    let registry = BackendRegistry::empty().with_transcriber(
        EngineKind::Fast,
        Arc::new(MockTranscriber::new("tiny").with_empty()),
    );
    let err = Pipeline::new(Arc::new(registry), &Config::default())
        .run(&AudioInput::new(vec![1], "m.wav"))
        .unwrap_err();
    assert!(matches!(err, MinutesError::EmptyTranscription));
}
