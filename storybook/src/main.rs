//! AI picture-book storyteller TUI.
//!
//! Turns a theme into a short illustrated children's story, then reads it
//! aloud with synchronized paragraph and sentence highlighting.
//!
//! # Headless Mode
//!
//! Run with `--headless` for a line-oriented interface suitable for
//! automated use:
//!
//! ```bash
//! cargo run -p storybook -- --headless --theme "小兔子的森林冒险" --narrate
//! ```

mod app;
mod events;
mod headless;
mod speech;
mod ui;
mod worker;

use crossterm::{
    event::{self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, stdout};
use std::time::Duration;

use storybook_core::{SessionConfig, StorySession};

use app::App;
use events::{handle_event, EventResult};
use speech::WorkerSpeech;
use ui::render::render;
use worker::spawn_worker;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    // Check for API keys
    for key in ["ARK_API_KEY", "DASHSCOPE_API_KEY"] {
        if std::env::var(key).is_err() {
            eprintln!("Error: {key} environment variable not set.");
            eprintln!("Please set it in .env file or with: export {key}=your_key_here");
            std::process::exit(1);
        }
    }

    if args.iter().any(|a| a == "--headless") {
        tracing_subscriber::fmt::init();
        let config = headless::parse_config_from_args(&args);
        return headless::run_headless(config).await.map_err(|e| e.into());
    }

    let session = match StorySession::from_env(SessionConfig::default()) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Failed to create story session: {e}");
            std::process::exit(1);
        }
    };

    let (request_tx, response_rx) = spawn_worker(session, WorkerSpeech::detect);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, App::new(request_tx, response_rx)).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )?;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> io::Result<()> {
    loop {
        // Apply anything the worker produced since the last frame
        app.pump_responses();

        terminal.draw(|f| render(f, &app))?;

        if event::poll(Duration::from_millis(100))? {
            let ev = event::read()?;
            if handle_event(&mut app, ev) == EventResult::Quit {
                return Ok(());
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn print_help() {
    println!("storybook - AI picture-book storyteller");
    println!();
    println!("USAGE:");
    println!("  storybook [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help       Show this help message");
    println!("  --headless       Run in headless mode (text-only, no TUI)");
    println!();
    println!("HEADLESS OPTIONS (only with --headless):");
    println!("  --theme <THEME>  Generate this theme and exit");
    println!("  --narrate        Narrate the generated story to stdout");
    println!();
    println!("ENVIRONMENT:");
    println!("  ARK_API_KEY        Story text API key");
    println!("  DASHSCOPE_API_KEY  Illustration API key");
    println!();
    println!("EXAMPLES:");
    println!("  storybook                                          # Interactive TUI");
    println!("  storybook --headless                               # Headless, themes from stdin");
    println!("  storybook --headless --theme 小兔子的森林冒险 --narrate");
}
