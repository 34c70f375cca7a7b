//! Illustration acquisition pipeline.
//!
//! Every paragraph gets an image through a three-tier fallback chain:
//! remote generation, then a liveness-probed stock image, then a locally
//! generated vector placeholder. Tier failures are absorbed here and drive
//! the next tier; the final tier cannot fail, so the chain always
//! terminates with an image. Chains for different paragraphs run
//! concurrently and each writes only its own paragraph.

pub mod catalog;
pub mod placeholder;

use std::time::Duration;

use async_trait::async_trait;
use dashscope::{Dashscope, ImageRequest, Submission, TaskStatus};
use futures::future::join_all;
use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::retry::{PollOutcome, RetryError, RetryPolicy};
use crate::story::{ImageSource, Paragraph};

pub use catalog::{HttpProber, UrlProber};

/// Style preamble prepended to every generation prompt.
const STYLE_PREAMBLE: &str = "Children's book illustration, cartoon style, bright colors, \
     cute and friendly, watercolor painting style, safe and warm atmosphere";

/// Content the generator must avoid.
const NEGATIVE_PROMPT: &str =
    "scary, dark, violent, inappropriate for children, adult content";

const POLL_INTERVAL: Duration = Duration::from_millis(2000);
const MAX_POLL_ATTEMPTS: u32 = 10;
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A tier failure. Always absorbed by the chain, never surfaced.
#[derive(Debug, Error)]
pub enum TierError {
    #[error("image API error: {0}")]
    Api(#[from] dashscope::Error),

    #[error("generation task failed: {0}")]
    TaskFailed(String),

    #[error("generation task timed out")]
    PollTimeout,

    #[error("generation returned no image")]
    EmptyResult,

    #[error("stock image unreachable: {0}")]
    Unreachable(String),
}

impl From<RetryError> for TierError {
    fn from(err: RetryError) -> Self {
        match err {
            RetryError::Failed(message) => TierError::TaskFailed(message),
            RetryError::TimedOut(_) => TierError::PollTimeout,
        }
    }
}

/// Remote image-generation backend.
#[async_trait]
pub trait ImageApi: Send + Sync {
    async fn submit(&self, request: ImageRequest) -> Result<Submission, dashscope::Error>;
    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, dashscope::Error>;
}

#[async_trait]
impl ImageApi for Dashscope {
    async fn submit(&self, request: ImageRequest) -> Result<Submission, dashscope::Error> {
        Dashscope::submit(self, request).await
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, dashscope::Error> {
        Dashscope::task_status(self, task_id).await
    }
}

/// Derive the generation prompt for a paragraph.
pub fn image_prompt(text: &str) -> String {
    format!("{STYLE_PREAMBLE}, {}", scene_phrase(text))
}

/// Fixed keyword rules mapping paragraph text to a scene description.
fn scene_phrase(text: &str) -> &'static str {
    if text.contains("森林") || text.contains("树") {
        "magical forest with colorful trees and flowers"
    } else if text.contains("海") || text.contains("水") {
        "beautiful ocean scene with gentle waves"
    } else if text.contains("家") || text.contains("房") {
        "cozy home with warm lighting"
    } else if text.contains("动物") || text.contains("小兔") || text.contains("小猫") {
        "cute animals playing together in a garden"
    } else if text.contains("天空") || text.contains("云") {
        "beautiful sky with fluffy clouds"
    } else {
        "happy children's scene with bright sunshine"
    }
}

/// Runs the fallback chain for every paragraph of a story.
pub struct IllustrationAcquirer {
    api: Box<dyn ImageApi>,
    prober: Box<dyn UrlProber>,
    poll: RetryPolicy,
    probe_timeout: Duration,
}

impl IllustrationAcquirer {
    pub fn new(api: Box<dyn ImageApi>, prober: Box<dyn UrlProber>) -> Self {
        Self {
            api,
            prober,
            poll: RetryPolicy::new(POLL_INTERVAL, MAX_POLL_ATTEMPTS),
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    /// Override the task polling cadence.
    pub fn with_poll_policy(mut self, policy: RetryPolicy) -> Self {
        self.poll = policy;
        self
    }

    /// Override the stock-image probe deadline.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Acquire an illustration for every paragraph.
    ///
    /// Each paragraph first gets a synchronous color tile, then its chain
    /// runs to completion; chains run concurrently across paragraphs.
    /// Returns only after every chain has settled, leaving every
    /// paragraph's image set.
    pub async fn acquire_all(&self, paragraphs: &mut [Paragraph]) {
        for (index, paragraph) in paragraphs.iter_mut().enumerate() {
            paragraph.image = Some(placeholder::color_tile(index));
        }

        let chains = paragraphs
            .iter_mut()
            .enumerate()
            .map(|(index, paragraph)| async move {
                let image = self.acquire(&paragraph.text, index).await;
                paragraph.image = Some(image);
            });

        join_all(chains).await;
    }

    /// Run the fallback chain for one paragraph.
    async fn acquire(&self, text: &str, index: usize) -> ImageSource {
        match self.remote_tier(text).await {
            Ok(url) => return ImageSource::Url(url),
            Err(err) => {
                debug!(paragraph = index, error = %err, "remote generation failed, trying stock catalog");
            }
        }

        match self.catalog_tier(text, index).await {
            Ok(url) => return ImageSource::Url(url),
            Err(err) => {
                debug!(paragraph = index, error = %err, "stock catalog failed, using vector placeholder");
            }
        }

        placeholder::vector_art(text, index)
    }

    async fn remote_tier(&self, text: &str) -> Result<String, TierError> {
        let request = ImageRequest::new(image_prompt(text))
            .with_negative_prompt(NEGATIVE_PROMPT)
            .with_seed(rand::thread_rng().gen_range(0..1_000_000))
            .with_style("<cartoon>");

        let urls = match self.api.submit(request).await? {
            Submission::Completed { urls } => urls,
            Submission::Accepted { task_id } => {
                self.poll.run(|| self.check_task(&task_id)).await?
            }
        };

        urls.into_iter().next().ok_or(TierError::EmptyResult)
    }

    async fn check_task(&self, task_id: &str) -> PollOutcome<Vec<String>> {
        match self.api.task_status(task_id).await {
            Ok(TaskStatus::Succeeded { urls }) => PollOutcome::Ready(urls),
            Ok(TaskStatus::Failed { message }) => PollOutcome::Failed(message),
            Ok(TaskStatus::Pending) => PollOutcome::Pending,
            Err(err) => PollOutcome::Failed(err.to_string()),
        }
    }

    async fn catalog_tier(&self, text: &str, index: usize) -> Result<String, TierError> {
        let url = catalog::lookup(text, index);
        if catalog::probe_with_timeout(self.prober.as_ref(), url, self.probe_timeout).await {
            Ok(url.to_string())
        } else {
            Err(TierError::Unreachable(url.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_phrase_rules() {
        assert!(scene_phrase("森林里有很多树").contains("forest"));
        assert!(scene_phrase("大海和水").contains("ocean"));
        assert!(scene_phrase("回到家里").contains("home"));
        assert!(scene_phrase("小兔在玩").contains("animals"));
        assert!(scene_phrase("天空中的云").contains("sky"));
        assert!(scene_phrase("今天真开心").contains("sunshine"));
    }

    #[test]
    fn test_scene_rule_order() {
        // Forest wins over animals when both match, like the rule order says.
        assert!(scene_phrase("小兔走进森林").contains("forest"));
    }

    #[test]
    fn test_image_prompt_carries_style() {
        let prompt = image_prompt("小兔子");
        assert!(prompt.starts_with(STYLE_PREAMBLE));
        assert!(prompt.contains("cute animals"));
    }
}
