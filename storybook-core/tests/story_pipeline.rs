//! End-to-end pipeline tests over mock collaborators.
//!
//! These cover the full flow the application drives: theme in, story out,
//! every paragraph illustrated, narration script derived and played to the
//! end with synchronized highlight events.

use std::time::Instant;

use storybook_core::narration::{NarrationConfig, SpeechEvent};
use storybook_core::story::{split_sentences, ImageSource};
use storybook_core::testing::{
    assert_fully_illustrated, assert_script_ordered, MockImageApi, MockProber, MockSpeech,
    TestHarness,
};
use storybook_core::{NarrationEngine, NarrationEvent, NarrationState};
use tokio::sync::mpsc;

#[tokio::test]
async fn test_theme_to_narrated_story() {
    let mut harness = TestHarness::new();

    // Theme in, story out.
    let story = harness
        .session
        .generate("小兔子的森林冒险")
        .await
        .expect("generation should succeed")
        .clone();

    assert!(story.paragraphs.len() >= 5);
    assert_fully_illustrated(&story);

    // Script length equals the per-paragraph sentence counts.
    let script = harness.session.narration_script();
    let expected: usize = story
        .paragraphs
        .iter()
        .map(|p| split_sentences(&p.text).len())
        .sum();
    assert_eq!(script.len(), expected);
    assert_script_ordered(&script);

    // Every sentence points into the story.
    for sentence in &script {
        assert!(sentence.paragraph < story.paragraphs.len());
        assert!(story.paragraphs[sentence.paragraph]
            .text
            .contains(sentence.text.trim_end_matches('。')));
    }

    // Narrate the whole script with a recording backend.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let config = NarrationConfig {
        inter_sentence_pause: std::time::Duration::ZERO,
        ..NarrationConfig::default()
    };
    let mut engine = NarrationEngine::new(MockSpeech::new(), tx).with_config(config);
    engine.load_story(&story);

    engine.start().unwrap();
    while let Some(id) = engine.in_flight() {
        engine.handle_speech_event(SpeechEvent::Started { utterance: id });
        engine.handle_speech_event(SpeechEvent::Finished { utterance: id });
        engine.tick(Instant::now());
    }

    assert_eq!(engine.state(), NarrationState::Stopped);
    assert_eq!(engine.sentence_index(), script.len());
    assert_eq!(engine.speech().spoken.len(), script.len());

    // Sentence highlights arrived in script order.
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    let highlighted: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            NarrationEvent::SentenceActive { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect();
    let expected_texts: Vec<String> = script.iter().map(|s| s.text.clone()).collect();
    assert_eq!(highlighted, expected_texts);
    assert!(events.contains(&NarrationEvent::Finished));
}

#[tokio::test]
async fn test_every_tier_combination_leaves_images() {
    let combos = [
        (MockImageApi::succeeding(), MockProber::all_live()),
        (MockImageApi::failing(), MockProber::all_live()),
        (MockImageApi::task_failing(), MockProber::dead()),
        (MockImageApi::async_task(10), MockProber::dead()),
    ];

    for (api, prober) in combos {
        let mut harness = TestHarness::with_tiers(api, prober);
        let story = harness.session.generate("小兔子").await.unwrap();
        assert_fully_illustrated(story);
    }
}

#[tokio::test]
async fn test_poll_exhaustion_falls_through_to_placeholder() {
    // The task never leaves pending within the attempt budget and the
    // catalog is dead, so every paragraph must land on vector art.
    let mut harness = TestHarness::with_tiers(MockImageApi::async_task(100), MockProber::dead());
    let story = harness.session.generate("小兔子").await.unwrap();

    assert!(story
        .paragraphs
        .iter()
        .all(|p| matches!(p.image, Some(ImageSource::Vector(_)))));
}

#[tokio::test]
async fn test_generation_failure_surfaces_once() {
    let mut harness = TestHarness::failing_fetch();
    let err = harness.session.generate("小兔子").await.unwrap_err();
    assert!(err.to_string().contains("story"));
    assert!(harness.session.story().is_none());
    assert!(harness.session.narration_script().is_empty());
}
