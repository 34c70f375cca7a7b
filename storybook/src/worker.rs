//! Background worker owning the session, narration engine, and speech.
//!
//! The UI thread never blocks on the network or on speech output: it sends
//! requests over a channel and drains responses each frame. The worker runs
//! on its own thread with a current-thread runtime, polls the speech
//! backend for lifecycle events, and drives the narration engine's pacing
//! deadline.

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use storybook_core::{
    NarrationEngine, NarrationEvent, NarrationState, Story, StorySession,
};
use tracing::warn;

use crate::speech::EventedSpeech;

/// How often the worker ticks pacing and speech polling while idle.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Requests from the UI to the worker.
#[derive(Debug, Clone)]
pub enum WorkerRequest {
    /// Generate (or regenerate) a story for a theme.
    Generate(String),
    /// Toggle play/pause.
    TogglePlayback,
    /// Stop narration and rewind.
    StopPlayback,
    /// The window lost focus; suspend if playing.
    FocusLost,
    Shutdown,
}

/// Responses from the worker to the UI.
#[derive(Debug, Clone)]
pub enum WorkerResponse {
    /// Progress text while generating.
    Status(String),
    /// A freshly generated, fully illustrated story.
    StoryReady(Story),
    /// Story generation failed; UI returns to the input screen.
    GenerationFailed(String),
    /// A narration synchronization event.
    Narration(NarrationEvent),
    /// Playback state changed.
    PlaybackState(NarrationState),
    /// A control request was rejected (e.g. nothing to narrate).
    ControlError(String),
}

/// Spawn the worker thread.
///
/// The speech backend is built inside the worker thread, so only the
/// factory has to cross threads.
pub fn spawn_worker<S, F>(
    session: StorySession,
    make_speech: F,
) -> (Sender<WorkerRequest>, Receiver<WorkerResponse>)
where
    S: EventedSpeech + 'static,
    F: FnOnce() -> S + Send + 'static,
{
    let (request_tx, request_rx) = channel();
    let (response_tx, response_rx) = channel();

    std::thread::spawn(move || {
        worker_loop(session, make_speech(), request_rx, response_tx);
    });

    (request_tx, response_rx)
}

fn worker_loop<S: EventedSpeech>(
    mut session: StorySession,
    speech: S,
    requests: Receiver<WorkerRequest>,
    responses: Sender<WorkerResponse>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            warn!(error = %err, "worker runtime failed to start");
            let _ = responses.send(WorkerResponse::GenerationFailed(err.to_string()));
            return;
        }
    };

    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut engine = NarrationEngine::new(speech, event_tx);
    let mut last_state = engine.state();

    loop {
        match requests.recv_timeout(TICK_INTERVAL) {
            Ok(WorkerRequest::Generate(theme)) => {
                let _ = responses.send(WorkerResponse::Status(
                    "正在为你创作故事...".to_string(),
                ));

                match runtime.block_on(session.fetch_story(&theme)) {
                    Ok(mut story) => {
                        let _ = responses.send(WorkerResponse::Status(
                            "故事创作完成！正在生成精美插图...".to_string(),
                        ));
                        runtime.block_on(session.illustrate(&mut story));

                        let story = session.set_story(story).clone();
                        engine.load_story(&story);
                        let _ = responses.send(WorkerResponse::StoryReady(story));
                    }
                    Err(err) => {
                        let _ = responses.send(WorkerResponse::GenerationFailed(err.to_string()));
                    }
                }
            }
            Ok(WorkerRequest::TogglePlayback) => {
                if let Err(err) = engine.toggle() {
                    let _ = responses.send(WorkerResponse::ControlError(err.to_string()));
                }
            }
            Ok(WorkerRequest::StopPlayback) => engine.stop(),
            Ok(WorkerRequest::FocusLost) => engine.pause(),
            Ok(WorkerRequest::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                engine.stop();
                return;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        // Speech lifecycle, pacing deadline, and highlight events.
        for event in engine.speech_mut().poll_events() {
            engine.handle_speech_event(event);
        }
        engine.tick(Instant::now());

        while let Ok(event) = event_rx.try_recv() {
            let _ = responses.send(WorkerResponse::Narration(event));
        }

        if engine.state() != last_state {
            last_state = engine.state();
            let _ = responses.send(WorkerResponse::PlaybackState(last_state));
        }
    }
}
