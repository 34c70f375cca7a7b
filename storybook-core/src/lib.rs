//! Illustrated children's storybook engine.
//!
//! This crate provides:
//! - AI story generation with JSON/text fallback parsing
//! - A three-tier illustration pipeline (remote generation, curated stock
//!   images, deterministic vector placeholders)
//! - A sentence-driven narration engine with synchronized highlighting
//! - Session orchestration tying theme input to a displayable story
//!
//! # Quick Start
//!
//! ```ignore
//! use storybook_core::{SessionConfig, StorySession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = StorySession::from_env(SessionConfig::default())?;
//!
//!     let story = session.generate("小兔子的森林冒险").await?;
//!     println!("{}", story.title);
//!
//!     Ok(())
//! }
//! ```

pub mod category;
pub mod illustration;
pub mod narration;
pub mod retry;
pub mod session;
pub mod story;
pub mod storyteller;
pub mod testing;

// Primary public API
pub use category::Category;
pub use illustration::{IllustrationAcquirer, ImageApi, UrlProber};
pub use narration::{
    NarrationEngine, NarrationError, NarrationEvent, NarrationState, SpeechEvent,
    SpeechSynthesizer,
};
pub use session::{SessionConfig, SessionError, StorySession};
pub use story::{narration_script, ImageSource, Paragraph, Sentence, Story};
pub use storyteller::{StoryError, StoryGenerator, Storyteller};
pub use testing::TestHarness;
