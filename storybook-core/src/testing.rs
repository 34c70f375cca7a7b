//! Testing utilities for the storybook engine.
//!
//! This module provides deterministic stand-ins for every remote
//! collaborator:
//! - `MockStoryteller` returns a scripted story without API calls
//! - `MockImageApi` scripts the remote illustration tier per call
//! - `MockProber` controls stock-image liveness
//! - `MockSpeech` records utterances instead of producing audio
//! - `TestHarness` wires them into a ready-to-use session

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashscope::{ImageRequest, Submission, TaskStatus};

use crate::illustration::{IllustrationAcquirer, ImageApi, UrlProber};
use crate::narration::{SpeechError, SpeechSynthesizer, Utterance, UtteranceId};
use crate::retry::RetryPolicy;
use crate::session::StorySession;
use crate::story::Story;
use crate::storyteller::{StoryError, StoryGenerator};

/// A five-paragraph story used throughout the tests.
pub fn sample_story() -> Story {
    Story::new(
        "小兔子的森林冒险",
        vec![
            "小兔子住在森林边上。它每天都很开心。".to_string(),
            "有一天，小兔子决定去森林里冒险。它带上了小背包！".to_string(),
            "路上，小兔子遇到了一只小鸟。他们一起唱歌。".to_string(),
            "天空突然下起了小雨。小兔子躲在大树下面。".to_string(),
            "雨停了，小兔子开开心心回家了。这真是美好的一天！".to_string(),
        ],
    )
}

// ============================================================================
// Story generation
// ============================================================================

/// A storyteller that returns a scripted story, or always fails.
pub struct MockStoryteller {
    story: Option<Story>,
}

impl MockStoryteller {
    /// Return a clone of `story` for every theme.
    pub fn returning(story: Story) -> Self {
        Self { story: Some(story) }
    }

    /// Fail every generation with an empty-content error.
    pub fn failing() -> Self {
        Self { story: None }
    }
}

#[async_trait]
impl StoryGenerator for MockStoryteller {
    async fn generate(&self, _theme: &str) -> Result<Story, StoryError> {
        match &self.story {
            Some(story) => Ok(story.clone()),
            None => Err(StoryError::EmptyContent),
        }
    }
}

// ============================================================================
// Illustration tiers
// ============================================================================

enum MockImageBehavior {
    /// Synchronous result URL per submission.
    Sync,
    /// Async task, pending for N polls, then succeeded.
    Task { pending_polls: u32 },
    /// Async task that reports FAILED.
    TaskFails,
    /// Submission itself errors.
    SubmitFails,
}

/// A scripted remote image-generation backend.
pub struct MockImageApi {
    behavior: MockImageBehavior,
    submissions: Mutex<u64>,
    polls: Mutex<HashMap<String, u32>>,
}

impl MockImageApi {
    /// Every submission answers synchronously with a unique URL.
    pub fn succeeding() -> Self {
        Self::with_behavior(MockImageBehavior::Sync)
    }

    /// Every submission returns a task that succeeds after `pending_polls`
    /// pending status reports.
    pub fn async_task(pending_polls: u32) -> Self {
        Self::with_behavior(MockImageBehavior::Task { pending_polls })
    }

    /// Every submission returns a task that reports FAILED.
    pub fn task_failing() -> Self {
        Self::with_behavior(MockImageBehavior::TaskFails)
    }

    /// Every submission errors at the HTTP layer.
    pub fn failing() -> Self {
        Self::with_behavior(MockImageBehavior::SubmitFails)
    }

    fn with_behavior(behavior: MockImageBehavior) -> Self {
        Self {
            behavior,
            submissions: Mutex::new(0),
            polls: Mutex::new(HashMap::new()),
        }
    }

    /// Number of submissions seen so far.
    pub fn submission_count(&self) -> u64 {
        *self.submissions.lock().unwrap()
    }

    fn next_submission(&self) -> u64 {
        let mut count = self.submissions.lock().unwrap();
        *count += 1;
        *count
    }
}

#[async_trait]
impl ImageApi for MockImageApi {
    async fn submit(&self, _request: ImageRequest) -> Result<Submission, dashscope::Error> {
        let n = self.next_submission();
        match self.behavior {
            MockImageBehavior::Sync => Ok(Submission::Completed {
                urls: vec![format!("https://img.mock/{n}.png")],
            }),
            MockImageBehavior::Task { .. } | MockImageBehavior::TaskFails => {
                Ok(Submission::Accepted {
                    task_id: format!("task-{n}"),
                })
            }
            MockImageBehavior::SubmitFails => Err(dashscope::Error::Api {
                status: 503,
                message: "mock backend unavailable".to_string(),
            }),
        }
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, dashscope::Error> {
        match self.behavior {
            MockImageBehavior::Task { pending_polls } => {
                let mut polls = self.polls.lock().unwrap();
                let seen = polls.entry(task_id.to_string()).or_insert(0);
                *seen += 1;
                if *seen > pending_polls {
                    Ok(TaskStatus::Succeeded {
                        urls: vec![format!("https://img.mock/{task_id}.png")],
                    })
                } else {
                    Ok(TaskStatus::Pending)
                }
            }
            MockImageBehavior::TaskFails => Ok(TaskStatus::Failed {
                message: "mock task failure".to_string(),
            }),
            _ => Ok(TaskStatus::Pending),
        }
    }
}

/// A prober with fixed liveness.
pub struct MockProber {
    live: bool,
}

impl MockProber {
    pub fn all_live() -> Self {
        Self { live: true }
    }

    pub fn dead() -> Self {
        Self { live: false }
    }
}

#[async_trait]
impl UrlProber for MockProber {
    async fn probe(&self, _url: &str) -> bool {
        self.live
    }
}

// ============================================================================
// Speech
// ============================================================================

/// A speech backend that records what it was asked to say.
pub struct MockSpeech {
    /// Every utterance handed to the backend, in order.
    pub spoken: Vec<(UtteranceId, Utterance)>,
    /// Number of cancel calls.
    pub cancelled: usize,
    fail: bool,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self {
            spoken: Vec::new(),
            cancelled: 0,
            fail: false,
        }
    }

    /// A backend whose every `speak` call fails synchronously.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Texts spoken so far.
    pub fn texts(&self) -> Vec<&str> {
        self.spoken.iter().map(|(_, u)| u.text.as_str()).collect()
    }
}

impl Default for MockSpeech {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for MockSpeech {
    fn speak(&mut self, id: UtteranceId, utterance: &Utterance) -> Result<(), SpeechError> {
        self.spoken.push((id, utterance.clone()));
        if self.fail {
            Err(SpeechError("mock synthesis failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn cancel(&mut self) {
        self.cancelled += 1;
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Polling policy that keeps tests instant.
pub fn instant_poll_policy() -> RetryPolicy {
    RetryPolicy::new(Duration::ZERO, 3)
}

/// A session wired to deterministic mocks.
pub struct TestHarness {
    pub session: StorySession,
}

impl TestHarness {
    /// Happy path: scripted story, synchronous image URLs, live catalog.
    pub fn new() -> Self {
        Self::build(
            MockStoryteller::returning(sample_story()),
            MockImageApi::succeeding(),
            MockProber::all_live(),
        )
    }

    /// Story fetch always fails.
    pub fn failing_fetch() -> Self {
        Self::build(
            MockStoryteller::failing(),
            MockImageApi::succeeding(),
            MockProber::all_live(),
        )
    }

    /// Remote and catalog tiers both fail; only placeholders remain.
    pub fn failing_tiers() -> Self {
        Self::build(
            MockStoryteller::returning(sample_story()),
            MockImageApi::failing(),
            MockProber::dead(),
        )
    }

    /// Harness with explicit tier behavior.
    pub fn with_tiers(api: MockImageApi, prober: MockProber) -> Self {
        Self::build(MockStoryteller::returning(sample_story()), api, prober)
    }

    fn build(teller: MockStoryteller, api: MockImageApi, prober: MockProber) -> Self {
        let acquirer = IllustrationAcquirer::new(Box::new(api), Box::new(prober))
            .with_poll_policy(instant_poll_policy())
            .with_probe_timeout(Duration::from_millis(50));

        Self {
            session: StorySession::with_components(Box::new(teller), acquirer),
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert every paragraph of the story carries an image.
#[track_caller]
pub fn assert_fully_illustrated(story: &Story) {
    for (index, paragraph) in story.paragraphs.iter().enumerate() {
        assert!(
            paragraph.image.is_some(),
            "Expected paragraph {index} to have an image"
        );
    }
}

/// Assert paragraph tags in a narration script never decrease.
#[track_caller]
pub fn assert_script_ordered(script: &[crate::story::Sentence]) {
    for pair in script.windows(2) {
        assert!(
            pair[0].paragraph <= pair[1].paragraph,
            "Expected paragraph tags to be non-decreasing, got {} then {}",
            pair[0].paragraph,
            pair[1].paragraph
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::ImageSource;

    #[tokio::test]
    async fn test_harness_happy_path() {
        let mut harness = TestHarness::new();
        let story = harness.session.generate("小兔子的森林冒险").await.unwrap();

        assert_eq!(story.title, "小兔子的森林冒险");
        assert!(story.paragraphs.len() >= 5);
        assert_fully_illustrated(story);
    }

    #[tokio::test]
    async fn test_failing_tiers_land_on_placeholders() {
        let mut harness = TestHarness::failing_tiers();
        let story = harness.session.generate("小兔子").await.unwrap();

        assert_fully_illustrated(story);
        assert!(story
            .paragraphs
            .iter()
            .all(|p| matches!(p.image, Some(ImageSource::Vector(_)))));
    }

    #[tokio::test]
    async fn test_async_task_tier_polls_to_success() {
        let mut harness =
            TestHarness::with_tiers(MockImageApi::async_task(1), MockProber::all_live());
        let story = harness.session.generate("小兔子").await.unwrap();

        assert!(story
            .paragraphs
            .iter()
            .all(|p| matches!(p.image, Some(ImageSource::Url(_)))));
    }

    #[tokio::test]
    async fn test_failed_task_falls_back_to_catalog() {
        let mut harness =
            TestHarness::with_tiers(MockImageApi::task_failing(), MockProber::all_live());
        let story = harness.session.generate("小兔子").await.unwrap();

        for paragraph in &story.paragraphs {
            match &paragraph.image {
                Some(ImageSource::Url(url)) => {
                    assert!(url.contains("unsplash"), "expected a stock URL, got {url}");
                }
                other => panic!("expected stock URL, got {other:?}"),
            }
        }
    }
}
