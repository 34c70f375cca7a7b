//! Event handling for the storybook TUI.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, Screen};

/// Result of handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
    NeedsRedraw,
}

/// Handle a terminal event.
pub fn handle_event(app: &mut App, event: Event) -> EventResult {
    match event {
        Event::Key(key) => handle_key_event(app, key),
        Event::Mouse(mouse) => handle_mouse_event(app, mouse),
        // The terminal lost focus: the same contract as a hidden page,
        // narration must not keep talking into the void.
        Event::FocusLost => {
            app.focus_lost();
            EventResult::NeedsRedraw
        }
        Event::Resize(_, _) => EventResult::NeedsRedraw,
        _ => EventResult::Continue,
    }
}

fn handle_mouse_event(app: &mut App, mouse: MouseEvent) -> EventResult {
    match mouse.kind {
        MouseEventKind::ScrollUp => {
            app.scroll_up(1);
            EventResult::NeedsRedraw
        }
        MouseEventKind::ScrollDown => {
            app.scroll_down(1);
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}

fn handle_key_event(app: &mut App, key: KeyEvent) -> EventResult {
    if app.confirm_quit {
        return handle_confirm_quit(app, key);
    }

    // Global shortcut
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
        app.request_quit();
        return if app.should_quit {
            EventResult::Quit
        } else {
            EventResult::NeedsRedraw
        };
    }

    match app.screen {
        Screen::Creator => handle_creator_keys(app, key),
        Screen::Loading => handle_loading_keys(app, key),
        Screen::Story => handle_story_keys(app, key),
    }
}

/// Quit confirmation while narration is playing.
fn handle_confirm_quit(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
            app.quit();
            EventResult::Quit
        }
        KeyCode::Char('n') | KeyCode::Esc => {
            app.confirm_quit = false;
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}

/// Theme input screen: free text plus submit.
fn handle_creator_keys(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Enter => {
            app.submit_theme();
            EventResult::NeedsRedraw
        }
        KeyCode::Esc => {
            app.request_quit();
            if app.should_quit {
                EventResult::Quit
            } else {
                EventResult::NeedsRedraw
            }
        }
        KeyCode::Left => {
            app.cursor_left();
            EventResult::NeedsRedraw
        }
        KeyCode::Right => {
            app.cursor_right();
            EventResult::NeedsRedraw
        }
        KeyCode::Home => {
            app.cursor_home();
            EventResult::NeedsRedraw
        }
        KeyCode::End => {
            app.cursor_end();
            EventResult::NeedsRedraw
        }
        KeyCode::Backspace => {
            app.backspace();
            EventResult::NeedsRedraw
        }
        KeyCode::Char(c) => {
            app.type_char(c);
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}

/// Generation in progress: nothing to do but wait or leave.
fn handle_loading_keys(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => {
            app.request_quit();
            if app.should_quit {
                EventResult::Quit
            } else {
                EventResult::NeedsRedraw
            }
        }
        _ => EventResult::Continue,
    }
}

/// Story display: narration controls and scrolling.
fn handle_story_keys(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Char(' ') => {
            app.toggle_playback();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('s') => {
            app.stop_playback();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('r') => {
            app.regenerate();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('n') => {
            app.new_story();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.scroll_down(1);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.scroll_up(1);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('q') | KeyCode::Esc => {
            app.request_quit();
            if app.should_quit {
                EventResult::Quit
            } else {
                EventResult::NeedsRedraw
            }
        }
        _ => EventResult::Continue,
    }
}
