//! Speech backends for the worker.
//!
//! The narration engine consumes lifecycle events rather than callbacks, so
//! backends here expose `poll_events` and the worker polls them once per
//! tick. `SystemSpeech` wraps the platform's speech facility; `PrintSpeech`
//! narrates to stdout for headless runs.

use storybook_core::narration::{SpeechError, SpeechEvent, SpeechSynthesizer, Utterance, UtteranceId};
use tracing::{debug, warn};
use tts::Tts;

/// Polls without audible output before a short utterance is presumed done.
const QUIET_POLL_LIMIT: u32 = 3;

/// A speech backend the worker can poll for lifecycle events.
pub trait EventedSpeech: SpeechSynthesizer {
    fn poll_events(&mut self) -> Vec<SpeechEvent>;
}

struct UtteranceTrack {
    id: UtteranceId,
    started: bool,
    quiet_polls: u32,
}

/// Platform speech synthesis.
pub struct SystemSpeech {
    tts: Tts,
    current: Option<UtteranceTrack>,
}

impl SystemSpeech {
    pub fn new() -> Result<Self, SpeechError> {
        let tts = Tts::default().map_err(|e| SpeechError(e.to_string()))?;
        Ok(Self { tts, current: None })
    }

    /// Pick a voice whose language tag or name matches the utterance
    /// language. Falls back to the platform default when none does.
    fn select_voice(&mut self, language: &str) {
        let Ok(voices) = self.tts.voices() else {
            return;
        };
        let wanted = voices.iter().find(|voice| {
            voice.language().to_string().starts_with(language)
                || voice.name().contains("Chinese")
        });
        if let Some(voice) = wanted {
            if self.tts.set_voice(voice).is_err() {
                debug!(voice = %voice.name(), "could not select voice");
            }
        }
    }

    fn apply_delivery(&mut self, utterance: &Utterance) {
        let rate = (self.tts.normal_rate() * utterance.rate)
            .clamp(self.tts.min_rate(), self.tts.max_rate());
        let pitch = (self.tts.normal_pitch() * utterance.pitch)
            .clamp(self.tts.min_pitch(), self.tts.max_pitch());
        let volume = (self.tts.normal_volume() * utterance.volume)
            .clamp(self.tts.min_volume(), self.tts.max_volume());

        let _ = self.tts.set_rate(rate);
        let _ = self.tts.set_pitch(pitch);
        let _ = self.tts.set_volume(volume);
    }
}

impl SpeechSynthesizer for SystemSpeech {
    fn speak(&mut self, id: UtteranceId, utterance: &Utterance) -> Result<(), SpeechError> {
        self.select_voice(&utterance.language);
        self.apply_delivery(utterance);

        self.tts
            .speak(utterance.text.clone(), true)
            .map_err(|e| SpeechError(e.to_string()))?;

        self.current = Some(UtteranceTrack {
            id,
            started: false,
            quiet_polls: 0,
        });
        Ok(())
    }

    fn cancel(&mut self) {
        let _ = self.tts.stop();
        self.current = None;
    }
}

impl EventedSpeech for SystemSpeech {
    fn poll_events(&mut self) -> Vec<SpeechEvent> {
        let Some(track) = self.current.as_mut() else {
            return Vec::new();
        };

        let speaking = self.tts.is_speaking().unwrap_or(false);
        match (track.started, speaking) {
            (false, true) => {
                track.started = true;
                vec![SpeechEvent::Started { utterance: track.id }]
            }
            (true, false) => {
                let id = track.id;
                self.current = None;
                vec![SpeechEvent::Finished { utterance: id }]
            }
            (false, false) => {
                // A very short utterance can finish between polls without
                // ever being observed speaking.
                track.quiet_polls += 1;
                if track.quiet_polls >= QUIET_POLL_LIMIT {
                    let id = track.id;
                    self.current = None;
                    vec![
                        SpeechEvent::Started { utterance: id },
                        SpeechEvent::Finished { utterance: id },
                    ]
                } else {
                    Vec::new()
                }
            }
            (true, true) => Vec::new(),
        }
    }
}

/// Narration to stdout for headless mode: each utterance is printed and
/// completes on the next poll.
pub struct PrintSpeech {
    pending: Option<UtteranceId>,
}

impl PrintSpeech {
    pub fn new() -> Self {
        Self { pending: None }
    }
}

impl Default for PrintSpeech {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for PrintSpeech {
    fn speak(&mut self, id: UtteranceId, utterance: &Utterance) -> Result<(), SpeechError> {
        println!("[SPEAK] {}", utterance.text);
        self.pending = Some(id);
        Ok(())
    }

    fn cancel(&mut self) {
        self.pending = None;
    }
}

impl EventedSpeech for PrintSpeech {
    fn poll_events(&mut self) -> Vec<SpeechEvent> {
        match self.pending.take() {
            Some(id) => vec![
                SpeechEvent::Started { utterance: id },
                SpeechEvent::Finished { utterance: id },
            ],
            None => Vec::new(),
        }
    }
}

/// Speech that completes instantly without output. Highlighting still
/// advances, matching how the original behaves without synthesis support.
pub struct SilentSpeech {
    pending: Option<UtteranceId>,
}

impl SilentSpeech {
    pub fn new() -> Self {
        Self { pending: None }
    }
}

impl Default for SilentSpeech {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for SilentSpeech {
    fn speak(&mut self, id: UtteranceId, _utterance: &Utterance) -> Result<(), SpeechError> {
        self.pending = Some(id);
        Ok(())
    }

    fn cancel(&mut self) {
        self.pending = None;
    }
}

impl EventedSpeech for SilentSpeech {
    fn poll_events(&mut self) -> Vec<SpeechEvent> {
        match self.pending.take() {
            Some(id) => vec![
                SpeechEvent::Started { utterance: id },
                SpeechEvent::Finished { utterance: id },
            ],
            None => Vec::new(),
        }
    }
}

/// The worker's speech backend, chosen once at startup.
pub enum WorkerSpeech {
    System(SystemSpeech),
    Silent(SilentSpeech),
}

impl WorkerSpeech {
    /// Use platform synthesis when available, otherwise stay silent.
    pub fn detect() -> Self {
        match SystemSpeech::new() {
            Ok(speech) => WorkerSpeech::System(speech),
            Err(err) => {
                warn!(error = %err, "speech synthesis unavailable, narration will be silent");
                WorkerSpeech::Silent(SilentSpeech::new())
            }
        }
    }
}

impl SpeechSynthesizer for WorkerSpeech {
    fn speak(&mut self, id: UtteranceId, utterance: &Utterance) -> Result<(), SpeechError> {
        match self {
            WorkerSpeech::System(speech) => speech.speak(id, utterance),
            WorkerSpeech::Silent(speech) => speech.speak(id, utterance),
        }
    }

    fn cancel(&mut self) {
        match self {
            WorkerSpeech::System(speech) => speech.cancel(),
            WorkerSpeech::Silent(speech) => speech.cancel(),
        }
    }
}

impl EventedSpeech for WorkerSpeech {
    fn poll_events(&mut self) -> Vec<SpeechEvent> {
        match self {
            WorkerSpeech::System(speech) => speech.poll_events(),
            WorkerSpeech::Silent(speech) => speech.poll_events(),
        }
    }
}
