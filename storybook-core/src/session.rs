//! StorySession - the primary public API for story generation.
//!
//! A session owns the storyteller and the illustration acquirer and
//! sequences one generation cycle: validate the theme, fetch the story,
//! illustrate every paragraph, keep the result for display. Narration is
//! driven separately by the [`crate::narration::NarrationEngine`] over the
//! same story.

use thiserror::Error;

use crate::illustration::{HttpProber, IllustrationAcquirer};
use crate::story::{narration_script, Sentence, Story};
use crate::storyteller::{StoryError, StoryGenerator, Storyteller, StorytellerConfig};

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("please enter a story theme first")]
    EmptyTheme,

    #[error("story generation failed: {0}")]
    Story(#[from] StoryError),

    #[error("API key not configured - set the {0} environment variable")]
    NoApiKey(&'static str),
}

/// Configuration for creating a new story session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Story model override.
    pub model: Option<String>,

    /// Maximum tokens for story responses.
    pub max_tokens: usize,

    /// Temperature for story generation.
    pub temperature: Option<f32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 2000,
            temperature: Some(0.8),
        }
    }
}

impl SessionConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A storybook session.
pub struct StorySession {
    teller: Box<dyn StoryGenerator>,
    acquirer: IllustrationAcquirer,
    story: Option<Story>,
}

impl StorySession {
    /// Create a session from environment API keys.
    ///
    /// Requires `ARK_API_KEY` (story text) and `DASHSCOPE_API_KEY`
    /// (illustrations).
    pub fn from_env(config: SessionConfig) -> Result<Self, SessionError> {
        let teller = Storyteller::from_env()
            .map_err(|_| SessionError::NoApiKey("ARK_API_KEY"))?
            .with_config(StorytellerConfig {
                model: config.model,
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            });

        let image_api = dashscope::Dashscope::from_env()
            .map_err(|_| SessionError::NoApiKey("DASHSCOPE_API_KEY"))?;

        Ok(Self::with_components(
            Box::new(teller),
            IllustrationAcquirer::new(Box::new(image_api), Box::new(HttpProber::new())),
        ))
    }

    /// Create a session from injected collaborators.
    pub fn with_components(
        teller: Box<dyn StoryGenerator>,
        acquirer: IllustrationAcquirer,
    ) -> Self {
        Self {
            teller,
            acquirer,
            story: None,
        }
    }

    /// Run one full generation cycle and return the displayable story.
    ///
    /// On failure the previously displayed story (if any) is untouched.
    pub async fn generate(&mut self, theme: &str) -> Result<&Story, SessionError> {
        let mut story = self.fetch_story(theme).await?;
        self.illustrate(&mut story).await;
        Ok(self.story.insert(story))
    }

    /// Fetch story text for a theme without illustrating it.
    pub async fn fetch_story(&self, theme: &str) -> Result<Story, SessionError> {
        let theme = theme.trim();
        if theme.is_empty() {
            return Err(SessionError::EmptyTheme);
        }
        Ok(self.teller.generate(theme).await?)
    }

    /// Run the illustration pipeline over a story's paragraphs.
    pub async fn illustrate(&self, story: &mut Story) {
        self.acquirer.acquire_all(&mut story.paragraphs).await;
    }

    /// Adopt an externally prepared story as the displayed one.
    pub fn set_story(&mut self, story: Story) -> &Story {
        self.story.insert(story)
    }

    /// The currently displayed story.
    pub fn story(&self) -> Option<&Story> {
        self.story.as_ref()
    }

    /// Narration script for the currently displayed story.
    pub fn narration_script(&self) -> Vec<Sentence> {
        self.story.as_ref().map(narration_script).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_story, TestHarness};

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::default()
            .with_model("deepseek-v3")
            .with_max_tokens(1500)
            .with_temperature(0.5);

        assert_eq!(config.model.as_deref(), Some("deepseek-v3"));
        assert_eq!(config.max_tokens, 1500);
        assert_eq!(config.temperature, Some(0.5));
    }

    #[tokio::test]
    async fn test_empty_theme_rejected_before_any_work() {
        let mut harness = TestHarness::new();

        let result = harness.session.generate("   ").await;
        assert!(matches!(result, Err(SessionError::EmptyTheme)));
        assert!(harness.session.story().is_none());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_story() {
        let mut harness = TestHarness::new();
        harness.session.generate("小兔子").await.unwrap();
        let title = harness.session.story().unwrap().title.clone();

        let mut failing = TestHarness::failing_fetch();
        failing.session.set_story(sample_story());
        assert!(failing.session.generate("小猫").await.is_err());
        // The previously displayed story is still there.
        assert!(failing.session.story().is_some());

        // And the successful session still shows its story too.
        assert_eq!(harness.session.story().unwrap().title, title);
    }

    #[tokio::test]
    async fn test_narration_script_follows_story() {
        let mut harness = TestHarness::new();
        assert!(harness.session.narration_script().is_empty());

        harness.session.generate("小兔子").await.unwrap();
        let script = harness.session.narration_script();
        assert!(!script.is_empty());
    }
}
