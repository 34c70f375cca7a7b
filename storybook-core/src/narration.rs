//! Sentence-driven narration engine.
//!
//! The engine walks the narration script one sentence at a time, driving a
//! speech backend and emitting highlight events for the rendering
//! collaborator. It is an event-driven state machine: speech lifecycle
//! events are fed in through [`NarrationEngine::handle_speech_event`] and
//! the inter-sentence pause is realized as a deadline checked by
//! [`NarrationEngine::tick`], so the engine itself never blocks.
//!
//! Every utterance gets a fresh id and the engine only honors events for
//! the id currently in flight; anything else is a stale callback from a
//! cancelled utterance and is dropped.

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::story::{narration_script, Sentence, Story};

/// Errors from narration control.
#[derive(Debug, Error)]
pub enum NarrationError {
    #[error("no sentences to narrate")]
    EmptyScript,
}

/// A speech backend failure for a single utterance.
#[derive(Debug, Error)]
#[error("speech synthesis failed: {0}")]
pub struct SpeechError(pub String);

/// Identifies one utterance handed to the speech backend.
pub type UtteranceId = u64;

/// One sentence prepared for the speech backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// Speaking rate relative to the voice default.
    pub rate: f32,
    /// Pitch relative to the voice default.
    pub pitch: f32,
    pub volume: f32,
    /// Language tag used for voice selection (e.g. "zh").
    pub language: String,
}

/// Lifecycle events reported for an utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    /// Speech output actually began (not merely was requested).
    Started { utterance: UtteranceId },
    Finished { utterance: UtteranceId },
    Errored {
        utterance: UtteranceId,
        message: String,
    },
}

/// A speech output backend.
///
/// `speak` begins an utterance; lifecycle events are delivered back to the
/// engine by whoever drives the backend. `cancel` silences any in-flight
/// output immediately and must be safe to call repeatedly.
pub trait SpeechSynthesizer {
    fn speak(&mut self, id: UtteranceId, utterance: &Utterance) -> Result<(), SpeechError>;
    fn cancel(&mut self);
}

/// Narration playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationState {
    Idle,
    Playing,
    Paused,
    Stopped,
}

/// Synchronization events for the rendering collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrationEvent {
    /// Highlight this paragraph exclusively, clearing any previous one.
    ParagraphActive { paragraph: usize },
    /// Speech output began for this sentence.
    SentenceActive { text: String, paragraph: usize },
    /// Position after an advance: `index` sentences done out of `total`.
    Progress { index: usize, total: usize },
    /// All highlighting cleared.
    Cleared,
    /// The script was narrated to its end.
    Finished,
}

/// Delivery parameters and pacing.
#[derive(Debug, Clone)]
pub struct NarrationConfig {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub language: String,
    pub inter_sentence_pause: Duration,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        // Slightly slow and slightly high suits read-aloud for children.
        Self {
            rate: 0.9,
            pitch: 1.1,
            volume: 1.0,
            language: "zh".to_string(),
            inter_sentence_pause: Duration::from_millis(500),
        }
    }
}

/// The narration state machine.
pub struct NarrationEngine<S: SpeechSynthesizer> {
    speech: S,
    events: mpsc::UnboundedSender<NarrationEvent>,
    config: NarrationConfig,
    script: Vec<Sentence>,
    state: NarrationState,
    sentence_index: usize,
    next_utterance: UtteranceId,
    in_flight: Option<UtteranceId>,
    next_due: Option<Instant>,
}

impl<S: SpeechSynthesizer> NarrationEngine<S> {
    pub fn new(speech: S, events: mpsc::UnboundedSender<NarrationEvent>) -> Self {
        Self {
            speech,
            events,
            config: NarrationConfig::default(),
            script: Vec::new(),
            state: NarrationState::Idle,
            sentence_index: 0,
            next_utterance: 0,
            in_flight: None,
            next_due: None,
        }
    }

    pub fn with_config(mut self, config: NarrationConfig) -> Self {
        self.config = config;
        self
    }

    /// Rebuild the script for a newly displayed story and reset playback.
    pub fn load_story(&mut self, story: &Story) {
        self.cancel_in_flight();
        self.script = narration_script(story);
        self.state = NarrationState::Idle;
        self.sentence_index = 0;
        self.next_due = None;
        self.emit(NarrationEvent::Cleared);
        self.emit(NarrationEvent::Progress {
            index: 0,
            total: self.script.len(),
        });
    }

    pub fn state(&self) -> NarrationState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == NarrationState::Playing
    }

    pub fn sentence_index(&self) -> usize {
        self.sentence_index
    }

    pub fn script_len(&self) -> usize {
        self.script.len()
    }

    /// Id of the utterance currently in flight, if any.
    pub fn in_flight(&self) -> Option<UtteranceId> {
        self.in_flight
    }

    pub fn speech(&self) -> &S {
        &self.speech
    }

    pub fn speech_mut(&mut self) -> &mut S {
        &mut self.speech
    }

    /// Begin (or restart) narration.
    ///
    /// Fails with [`NarrationError::EmptyScript`] when there is nothing to
    /// narrate; no state changes in that case.
    pub fn start(&mut self) -> Result<(), NarrationError> {
        if self.script.is_empty() {
            return Err(NarrationError::EmptyScript);
        }

        match self.state {
            NarrationState::Playing => Ok(()),
            NarrationState::Paused => {
                self.resume();
                Ok(())
            }
            NarrationState::Idle | NarrationState::Stopped => {
                if self.sentence_index >= self.script.len() {
                    self.sentence_index = 0;
                }
                self.state = NarrationState::Playing;
                self.speak_current();
                Ok(())
            }
        }
    }

    /// Toggle between playing and paused.
    pub fn toggle(&mut self) -> Result<(), NarrationError> {
        if self.state == NarrationState::Playing {
            self.pause();
            Ok(())
        } else {
            self.start()
        }
    }

    /// Suspend narration, keeping the current position.
    ///
    /// The in-flight utterance is cancelled; resuming re-speaks the current
    /// sentence from its start, so the sentence index never skips or
    /// repeats.
    pub fn pause(&mut self) {
        if self.state != NarrationState::Playing {
            return;
        }
        self.state = NarrationState::Paused;
        self.cancel_in_flight();
        self.next_due = None;
    }

    /// Continue narration from the current sentence.
    pub fn resume(&mut self) {
        if self.state != NarrationState::Paused {
            return;
        }
        self.state = NarrationState::Playing;
        self.speak_current();
    }

    /// Stop narration, cancel speech, and rewind to the beginning.
    ///
    /// Idempotent: once stopped at the start, further calls do nothing.
    pub fn stop(&mut self) {
        if self.state == NarrationState::Idle {
            return;
        }
        if self.state == NarrationState::Stopped && self.sentence_index == 0 {
            return;
        }

        self.cancel_in_flight();
        self.next_due = None;
        self.sentence_index = 0;
        self.state = NarrationState::Stopped;
        self.emit(NarrationEvent::Cleared);
        self.emit(NarrationEvent::Progress {
            index: 0,
            total: self.script.len(),
        });
    }

    /// Feed a speech lifecycle event into the state machine.
    ///
    /// Events for anything but the in-flight utterance are stale callbacks
    /// from cancelled speech and are dropped.
    pub fn handle_speech_event(&mut self, event: SpeechEvent) {
        match event {
            SpeechEvent::Started { utterance } => {
                if self.in_flight != Some(utterance) {
                    debug!(utterance, "dropping stale speech start");
                    return;
                }
                if let Some(sentence) = self.script.get(self.sentence_index) {
                    self.emit(NarrationEvent::SentenceActive {
                        text: sentence.text.clone(),
                        paragraph: sentence.paragraph,
                    });
                }
            }
            SpeechEvent::Finished { utterance } => {
                if self.in_flight != Some(utterance) {
                    debug!(utterance, "dropping stale speech completion");
                    return;
                }
                self.in_flight = None;
                self.advance();
            }
            SpeechEvent::Errored { utterance, message } => {
                if self.in_flight != Some(utterance) {
                    debug!(utterance, "dropping stale speech error");
                    return;
                }
                warn!(
                    sentence = self.sentence_index,
                    message = %message,
                    "speech synthesis failed, skipping sentence"
                );
                self.in_flight = None;
                self.advance();
            }
        }
    }

    /// Fire the inter-sentence deadline when it is due.
    pub fn tick(&mut self, now: Instant) {
        if self.state != NarrationState::Playing {
            return;
        }
        if let Some(due) = self.next_due {
            if now >= due {
                self.next_due = None;
                self.speak_current();
            }
        }
    }

    fn speak_current(&mut self) {
        let Some(sentence) = self.script.get(self.sentence_index) else {
            self.finish();
            return;
        };

        self.emit(NarrationEvent::ParagraphActive {
            paragraph: sentence.paragraph,
        });

        let id = self.next_utterance;
        self.next_utterance += 1;
        self.in_flight = Some(id);

        let utterance = Utterance {
            text: sentence.text.clone(),
            rate: self.config.rate,
            pitch: self.config.pitch,
            volume: self.config.volume,
            language: self.config.language.clone(),
        };

        if let Err(err) = self.speech.speak(id, &utterance) {
            warn!(
                sentence = self.sentence_index,
                error = %err,
                "speech synthesis failed, skipping sentence"
            );
            self.in_flight = None;
            self.advance();
        }
    }

    /// Move past the current sentence after its completion (or failure).
    fn advance(&mut self) {
        self.sentence_index += 1;
        self.emit(NarrationEvent::Progress {
            index: self.sentence_index,
            total: self.script.len(),
        });

        if self.sentence_index >= self.script.len() {
            self.finish();
            return;
        }

        if self.state == NarrationState::Playing {
            self.next_due = Some(Instant::now() + self.config.inter_sentence_pause);
        }
    }

    /// Natural end of the script: stopped, position kept at the end.
    fn finish(&mut self) {
        self.state = NarrationState::Stopped;
        self.in_flight = None;
        self.next_due = None;
        self.emit(NarrationEvent::Cleared);
        self.emit(NarrationEvent::Finished);
    }

    fn cancel_in_flight(&mut self) {
        if self.in_flight.take().is_some() {
            self.speech.cancel();
        }
    }

    fn emit(&self, event: NarrationEvent) {
        // The receiver may be gone (e.g. headless teardown); that is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::Story;
    use crate::testing::MockSpeech;

    fn three_sentence_story() -> Story {
        Story::new(
            "测试",
            vec!["第一句。".to_string(), "第二句。第三句。".to_string()],
        )
    }

    fn engine_with_story(
        story: &Story,
    ) -> (
        NarrationEngine<MockSpeech>,
        mpsc::UnboundedReceiver<NarrationEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = NarrationConfig {
            inter_sentence_pause: Duration::ZERO,
            ..NarrationConfig::default()
        };
        let mut engine = NarrationEngine::new(MockSpeech::new(), tx).with_config(config);
        engine.load_story(story);
        (engine, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<NarrationEvent>) -> Vec<NarrationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Complete the in-flight utterance and let the pause deadline fire.
    fn complete_current(engine: &mut NarrationEngine<MockSpeech>) {
        let id = engine.in_flight().expect("an utterance should be in flight");
        engine.handle_speech_event(SpeechEvent::Started { utterance: id });
        engine.handle_speech_event(SpeechEvent::Finished { utterance: id });
        engine.tick(Instant::now());
    }

    #[test]
    fn test_empty_script_start_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut engine = NarrationEngine::new(MockSpeech::new(), tx);

        assert!(matches!(engine.start(), Err(NarrationError::EmptyScript)));
        assert_eq!(engine.state(), NarrationState::Idle);
        assert_eq!(engine.sentence_index(), 0);
    }

    #[test]
    fn test_three_sentences_advance_to_stopped() {
        let story = three_sentence_story();
        let (mut engine, mut rx) = engine_with_story(&story);

        engine.start().unwrap();
        assert_eq!(engine.state(), NarrationState::Playing);
        assert_eq!(engine.sentence_index(), 0);

        complete_current(&mut engine);
        assert_eq!(engine.sentence_index(), 1);

        complete_current(&mut engine);
        assert_eq!(engine.sentence_index(), 2);

        complete_current(&mut engine);
        assert_eq!(engine.sentence_index(), 3);
        assert_eq!(engine.state(), NarrationState::Stopped);

        let events = drain(&mut rx);
        assert!(events.contains(&NarrationEvent::Finished));
        // Paragraph highlights: sentence 0 in paragraph 0, sentences 1-2 in paragraph 1.
        let highlights: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                NarrationEvent::ParagraphActive { paragraph } => Some(*paragraph),
                _ => None,
            })
            .collect();
        assert_eq!(highlights, vec![0, 1, 1]);
    }

    #[test]
    fn test_sentence_active_only_after_speech_starts() {
        let story = three_sentence_story();
        let (mut engine, mut rx) = engine_with_story(&story);

        engine.start().unwrap();
        let before: Vec<NarrationEvent> = drain(&mut rx);
        assert!(!before
            .iter()
            .any(|e| matches!(e, NarrationEvent::SentenceActive { .. })));

        let id = engine.in_flight().unwrap();
        engine.handle_speech_event(SpeechEvent::Started { utterance: id });
        let after = drain(&mut rx);
        assert!(matches!(
            after.as_slice(),
            [NarrationEvent::SentenceActive { text, paragraph: 0 }] if text.as_str() == "第一句。"
        ));
    }

    #[test]
    fn test_synthesis_error_skips_and_continues() {
        let story = three_sentence_story();
        let (mut engine, _rx) = engine_with_story(&story);

        engine.start().unwrap();
        complete_current(&mut engine);

        // Sentence 2 of 3 fails; narration must keep going.
        let id = engine.in_flight().unwrap();
        engine.handle_speech_event(SpeechEvent::Errored {
            utterance: id,
            message: "synthesis unavailable".to_string(),
        });
        engine.tick(Instant::now());
        assert_eq!(engine.sentence_index(), 2);
        assert_eq!(engine.state(), NarrationState::Playing);

        complete_current(&mut engine);
        assert_eq!(engine.sentence_index(), 3);
        assert_eq!(engine.state(), NarrationState::Stopped);
    }

    #[test]
    fn test_pause_resume_preserves_index() {
        let story = three_sentence_story();
        let (mut engine, _rx) = engine_with_story(&story);

        engine.start().unwrap();
        complete_current(&mut engine);
        assert_eq!(engine.sentence_index(), 1);

        let paused_utterance = engine.in_flight().unwrap();
        engine.pause();
        assert_eq!(engine.state(), NarrationState::Paused);
        assert_eq!(engine.sentence_index(), 1);
        assert_eq!(engine.speech().cancelled, 1);

        // A completion from the cancelled utterance must not advance.
        engine.handle_speech_event(SpeechEvent::Finished {
            utterance: paused_utterance,
        });
        assert_eq!(engine.sentence_index(), 1);

        engine.resume();
        assert_eq!(engine.state(), NarrationState::Playing);
        assert_eq!(engine.sentence_index(), 1);
        // The same sentence is re-spoken under a fresh utterance id.
        let respoken = engine.speech().spoken.last().unwrap();
        assert_eq!(respoken.1.text, "第二句。");
        assert_ne!(respoken.0, paused_utterance);
    }

    #[test]
    fn test_toggle_round_trip() {
        let story = three_sentence_story();
        let (mut engine, _rx) = engine_with_story(&story);

        engine.toggle().unwrap();
        assert_eq!(engine.state(), NarrationState::Playing);
        engine.toggle().unwrap();
        assert_eq!(engine.state(), NarrationState::Paused);
        engine.toggle().unwrap();
        assert_eq!(engine.state(), NarrationState::Playing);
    }

    #[test]
    fn test_stop_resets_and_ignores_late_completion() {
        let story = three_sentence_story();
        let (mut engine, mut rx) = engine_with_story(&story);

        engine.start().unwrap();
        complete_current(&mut engine);
        let id = engine.in_flight().unwrap();

        engine.stop();
        assert_eq!(engine.state(), NarrationState::Stopped);
        assert_eq!(engine.sentence_index(), 0);
        assert_eq!(engine.speech().cancelled, 1);
        assert!(drain(&mut rx).contains(&NarrationEvent::Cleared));

        // Late completion after stop: stale, must not re-advance.
        engine.handle_speech_event(SpeechEvent::Finished { utterance: id });
        assert_eq!(engine.sentence_index(), 0);
        assert_eq!(engine.state(), NarrationState::Stopped);

        // Repeated stop is a no-op.
        engine.stop();
        assert_eq!(engine.speech().cancelled, 1);
    }

    #[test]
    fn test_restart_after_natural_end() {
        let story = three_sentence_story();
        let (mut engine, _rx) = engine_with_story(&story);

        engine.start().unwrap();
        for _ in 0..3 {
            complete_current(&mut engine);
        }
        assert_eq!(engine.state(), NarrationState::Stopped);
        assert_eq!(engine.sentence_index(), 3);

        engine.start().unwrap();
        assert_eq!(engine.state(), NarrationState::Playing);
        assert_eq!(engine.sentence_index(), 0);
    }

    #[test]
    fn test_failing_backend_never_halts() {
        let story = three_sentence_story();
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = NarrationConfig {
            inter_sentence_pause: Duration::ZERO,
            ..NarrationConfig::default()
        };
        let mut engine =
            NarrationEngine::new(MockSpeech::failing(), tx).with_config(config);
        engine.load_story(&story);

        // Every speak call fails synchronously; each failure advances, and
        // each advance arms a zero-length pause fired by the next tick.
        engine.start().unwrap();
        engine.tick(Instant::now());
        engine.tick(Instant::now());

        assert_eq!(engine.sentence_index(), 3);
        assert_eq!(engine.state(), NarrationState::Stopped);
    }

    #[test]
    fn test_load_story_resets_playback() {
        let story = three_sentence_story();
        let (mut engine, _rx) = engine_with_story(&story);

        engine.start().unwrap();
        complete_current(&mut engine);
        assert_eq!(engine.sentence_index(), 1);

        engine.load_story(&story);
        assert_eq!(engine.state(), NarrationState::Idle);
        assert_eq!(engine.sentence_index(), 0);
        assert_eq!(engine.script_len(), 3);
    }
}
