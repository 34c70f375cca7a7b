//! Headless mode for the storybook app.
//!
//! A simple line-oriented interface for running the storyteller without a
//! TUI: every input line is a story theme, `#` lines are commands. Designed
//! for scripted runs and automated testing.

use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};

use storybook_core::narration::NarrationConfig;
use storybook_core::{
    NarrationEngine, NarrationEvent, NarrationState, SessionConfig, SessionError, Story,
    StorySession,
};

use crate::speech::{EventedSpeech, PrintSpeech};

/// Configuration for a headless run.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Generate this theme immediately instead of reading stdin.
    pub theme: Option<String>,
    /// Narrate the story after generating it.
    pub narrate: bool,
}

/// Parse headless options from command line arguments.
pub fn parse_config_from_args(args: &[String]) -> HeadlessConfig {
    let mut config = HeadlessConfig::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--theme" => {
                if let Some(theme) = args.get(i + 1) {
                    config.theme = Some(theme.clone());
                    i += 1;
                }
            }
            "--narrate" => config.narrate = true,
            _ => {}
        }
        i += 1;
    }

    config
}

/// Run the app in headless mode.
pub async fn run_headless(config: HeadlessConfig) -> Result<(), SessionError> {
    let mut session = StorySession::from_env(SessionConfig::default())?;

    // One-shot mode: generate, optionally narrate, exit.
    if let Some(theme) = config.theme {
        let story = session.generate(&theme).await?.clone();
        print_story(&story);
        if config.narrate {
            narrate(&story);
        }
        return Ok(());
    }

    println!("=== AI 绘本故事 Headless Mode ===");
    println!();
    println!("Commands:");
    println!("  #quit     - Exit");
    println!("  #narrate  - Narrate the current story");
    println!("  #script   - Print the narration script");
    println!("  #help     - Show this help");
    println!();
    println!("Anything else is a story theme:");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('#') {
            match command.split_whitespace().next() {
                Some("quit") | Some("exit") => {
                    println!("再见！");
                    break;
                }
                Some("narrate") => match session.story() {
                    Some(story) => {
                        let story = story.clone();
                        narrate(&story);
                    }
                    None => println!("[ERROR] No story yet - enter a theme first"),
                },
                Some("script") => {
                    let script = session.narration_script();
                    if script.is_empty() {
                        println!("[ERROR] No story yet - enter a theme first");
                    }
                    for (i, sentence) in script.iter().enumerate() {
                        println!("[{i}] (paragraph {}) {}", sentence.paragraph, sentence.text);
                    }
                }
                Some("help") => {
                    println!("[HELP]");
                    println!("  #quit     - Exit");
                    println!("  #narrate  - Narrate the current story");
                    println!("  #script   - Print the narration script");
                    println!("  (anything else is a story theme)");
                }
                _ => println!("[ERROR] Unknown command. Type #help for help."),
            }
            stdout.flush().ok();
            continue;
        }

        print!("[GENERATING]");
        stdout.flush().ok();

        match session.generate(line).await {
            Ok(story) => {
                print!("\r            \r");
                stdout.flush().ok();
                print_story(story);
            }
            Err(e) => {
                print!("\r            \r");
                stdout.flush().ok();
                println!("[ERROR] {e}");
            }
        }
    }

    Ok(())
}

fn print_story(story: &Story) {
    println!("[TITLE] {}", story.title);
    for (i, paragraph) in story.paragraphs.iter().enumerate() {
        println!("[{}] {}", i + 1, paragraph.text);
        if let Some(image) = &paragraph.image {
            println!("    image: {}", image.describe());
        }
    }
    println!();
}

/// Drive the narration engine to the end of the story, printing the
/// synchronization events a renderer would consume.
fn narrate(story: &Story) {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let config = NarrationConfig {
        inter_sentence_pause: Duration::ZERO,
        ..NarrationConfig::default()
    };
    let mut engine = NarrationEngine::new(PrintSpeech::new(), tx).with_config(config);
    engine.load_story(story);

    if let Err(err) = engine.start() {
        println!("[ERROR] {err}");
        return;
    }

    while engine.state() == NarrationState::Playing {
        for event in engine.speech_mut().poll_events() {
            engine.handle_speech_event(event);
        }
        engine.tick(Instant::now());

        while let Ok(event) = rx.try_recv() {
            match event {
                NarrationEvent::ParagraphActive { paragraph } => {
                    println!("[PARAGRAPH] {paragraph}")
                }
                NarrationEvent::SentenceActive { text, .. } => println!("[SENTENCE] {text}"),
                NarrationEvent::Progress { index, total } => println!("[PROGRESS] {index}/{total}"),
                NarrationEvent::Finished => println!("[DONE]"),
                NarrationEvent::Cleared => {}
            }
        }
    }

    while let Ok(event) = rx.try_recv() {
        if matches!(event, NarrationEvent::Finished) {
            println!("[DONE]");
        }
    }
}
