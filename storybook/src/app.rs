//! Main application state and logic.

use std::sync::mpsc::{Receiver, Sender};

use storybook_core::{NarrationEvent, NarrationState, Story};

use crate::ui::theme::StoryTheme;
use crate::worker::{WorkerRequest, WorkerResponse};

/// Which part of the UI is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    /// Theme input.
    #[default]
    Creator,
    /// Generation in progress.
    Loading,
    /// Story display with narration controls.
    Story,
}

/// Main application state.
pub struct App {
    // Channel communication with the worker
    pub request_tx: Sender<WorkerRequest>,
    pub response_rx: Receiver<WorkerResponse>,

    // UI state
    pub theme: StoryTheme,
    pub screen: Screen,
    status_message: Option<String>,
    pub loading_text: String,
    pub confirm_quit: bool,
    pub should_quit: bool,

    // Theme input
    input_buffer: String,
    cursor_position: usize,
    last_theme: Option<String>,

    // Story display
    pub story: Option<Story>,
    pub scroll: usize,

    // Narration view state
    pub playback: NarrationState,
    pub active_paragraph: Option<usize>,
    pub active_sentence: Option<String>,
    pub progress: (usize, usize),
}

impl App {
    pub fn new(request_tx: Sender<WorkerRequest>, response_rx: Receiver<WorkerResponse>) -> Self {
        Self {
            request_tx,
            response_rx,
            theme: StoryTheme::default(),
            screen: Screen::Creator,
            status_message: None,
            loading_text: String::new(),
            confirm_quit: false,
            should_quit: false,
            input_buffer: String::new(),
            cursor_position: 0,
            last_theme: None,
            story: None,
            scroll: 0,
            playback: NarrationState::Idle,
            active_paragraph: None,
            active_sentence: None,
            progress: (0, 0),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback == NarrationState::Playing
    }

    /// Submit the typed theme for generation.
    pub fn submit_theme(&mut self) {
        let theme = self.input_buffer.trim().to_string();
        if theme.is_empty() {
            self.set_status("请先输入故事主题哦~");
            return;
        }
        self.begin_generation(theme);
    }

    /// Regenerate using the last submitted theme.
    pub fn regenerate(&mut self) {
        if let Some(theme) = self.last_theme.clone() {
            self.send(WorkerRequest::StopPlayback);
            self.begin_generation(theme);
        }
    }

    fn begin_generation(&mut self, theme: String) {
        self.screen = Screen::Loading;
        self.loading_text = "正在为你创作故事...".to_string();
        self.last_theme = Some(theme.clone());
        self.send(WorkerRequest::Generate(theme));
    }

    /// Return to the theme input screen.
    pub fn new_story(&mut self) {
        self.send(WorkerRequest::StopPlayback);
        self.screen = Screen::Creator;
        self.clear_status();
    }

    pub fn toggle_playback(&mut self) {
        self.send(WorkerRequest::TogglePlayback);
    }

    pub fn stop_playback(&mut self) {
        self.send(WorkerRequest::StopPlayback);
    }

    pub fn focus_lost(&mut self) {
        if self.is_playing() {
            self.send(WorkerRequest::FocusLost);
            self.set_status("窗口隐藏，已暂停朗读");
        }
    }

    /// Ask to quit; playing narration needs confirmation first.
    pub fn request_quit(&mut self) {
        if self.is_playing() {
            self.confirm_quit = true;
        } else {
            self.quit();
        }
    }

    pub fn quit(&mut self) {
        self.send(WorkerRequest::Shutdown);
        self.should_quit = true;
    }

    /// Drain worker responses into UI state.
    pub fn pump_responses(&mut self) {
        while let Ok(response) = self.response_rx.try_recv() {
            match response {
                WorkerResponse::Status(text) => {
                    self.loading_text = text;
                }
                WorkerResponse::StoryReady(story) => {
                    self.progress = (0, 0);
                    self.active_paragraph = None;
                    self.active_sentence = None;
                    self.scroll = 0;
                    self.story = Some(story);
                    self.screen = Screen::Story;
                    self.set_status("故事准备好了，按空格开始朗读");
                }
                WorkerResponse::GenerationFailed(message) => {
                    self.screen = Screen::Creator;
                    self.set_status(format!("哎呀，创作故事时遇到了问题：{message}"));
                }
                WorkerResponse::Narration(event) => self.apply_narration_event(event),
                WorkerResponse::PlaybackState(state) => {
                    self.playback = state;
                }
                WorkerResponse::ControlError(message) => {
                    self.set_status(message);
                }
            }
        }
    }

    fn apply_narration_event(&mut self, event: NarrationEvent) {
        match event {
            NarrationEvent::ParagraphActive { paragraph } => {
                self.active_paragraph = Some(paragraph);
                self.active_sentence = None;
                self.scroll_to_paragraph(paragraph);
            }
            NarrationEvent::SentenceActive { text, .. } => {
                self.active_sentence = Some(text);
            }
            NarrationEvent::Progress { index, total } => {
                self.progress = (index, total);
            }
            NarrationEvent::Cleared => {
                self.active_paragraph = None;
                self.active_sentence = None;
            }
            NarrationEvent::Finished => {
                self.set_status("朗读完成！按空格再听一遍");
            }
        }
    }

    /// Keep the active paragraph in view.
    fn scroll_to_paragraph(&mut self, paragraph: usize) {
        self.scroll = paragraph;
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let max = self
            .story
            .as_ref()
            .map(|s| s.paragraphs.len().saturating_sub(1))
            .unwrap_or(0);
        self.scroll = (self.scroll + lines).min(max);
    }

    // =========================================================================
    // Theme input editing (unicode-safe)
    // =========================================================================

    pub fn input_buffer(&self) -> &str {
        &self.input_buffer
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    /// Handle a typed character.
    pub fn type_char(&mut self, c: char) {
        let byte_pos = self
            .input_buffer
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.input_buffer.len());
        self.input_buffer.insert(byte_pos, c);
        self.cursor_position += 1;
    }

    /// Handle backspace.
    pub fn backspace(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            if let Some((byte_pos, ch)) = self.input_buffer.char_indices().nth(self.cursor_position)
            {
                self.input_buffer
                    .replace_range(byte_pos..byte_pos + ch.len_utf8(), "");
            }
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input_buffer.chars().count();
        self.cursor_position = (self.cursor_position + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor_position = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor_position = self.input_buffer.chars().count();
    }

    // =========================================================================
    // Status line
    // =========================================================================

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    fn send(&mut self, request: WorkerRequest) {
        if self.request_tx.send(request).is_err() {
            self.set_status("后台任务已退出");
        }
    }
}
