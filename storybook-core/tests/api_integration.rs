//! Live API integration tests.
//!
//! These hit the real story and image services and are ignored by default.
//! Run with:
//! `ARK_API_KEY=... DASHSCOPE_API_KEY=... cargo test -p storybook-core --test api_integration -- --ignored --nocapture`

use storybook_core::{SessionConfig, StorySession};

fn setup() {
    let _ = dotenvy::dotenv();
}

fn has_keys() -> bool {
    std::env::var("ARK_API_KEY").is_ok() && std::env::var("DASHSCOPE_API_KEY").is_ok()
}

#[tokio::test]
#[ignore]
async fn test_generate_real_story() {
    setup();
    if !has_keys() {
        eprintln!("Skipping test: ARK_API_KEY / DASHSCOPE_API_KEY not set");
        return;
    }

    let mut session =
        StorySession::from_env(SessionConfig::default()).expect("session should build from env");

    let story = session
        .generate("小兔子的森林冒险")
        .await
        .expect("live generation should succeed");

    println!("title: {}", story.title);
    for (i, paragraph) in story.paragraphs.iter().enumerate() {
        println!(
            "  [{i}] {} -> {}",
            paragraph.text,
            paragraph
                .image
                .as_ref()
                .map(|img| img.describe())
                .unwrap_or("<none>")
        );
    }

    assert!(!story.title.is_empty());
    assert!(story.paragraphs.len() >= 5);
    assert!(story.paragraphs.iter().all(|p| p.image.is_some()));

    let script = session.narration_script();
    assert!(!script.is_empty());
}
