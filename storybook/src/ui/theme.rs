//! Color theme and styling for the storybook TUI.

use ratatui::style::{Color, Modifier, Style};

/// Storybook UI color theme.
#[derive(Debug, Clone)]
pub struct StoryTheme {
    pub foreground: Color,
    pub border: Color,
    pub title: Color,

    pub paragraph_text: Color,
    pub active_paragraph: Color,
    pub sentence_highlight_bg: Color,
    pub image_caption: Color,

    pub status_text: Color,
    pub error_text: Color,
    pub progress_bar: Color,
}

impl Default for StoryTheme {
    fn default() -> Self {
        Self {
            foreground: Color::White,
            border: Color::DarkGray,
            title: Color::Magenta,

            paragraph_text: Color::White,
            active_paragraph: Color::Yellow,
            sentence_highlight_bg: Color::Blue,
            image_caption: Color::DarkGray,

            status_text: Color::Cyan,
            error_text: Color::Red,
            progress_bar: Color::Green,
        }
    }
}

impl StoryTheme {
    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.title)
            .add_modifier(Modifier::BOLD)
    }

    pub fn paragraph_style(&self) -> Style {
        Style::default().fg(self.paragraph_text)
    }

    pub fn active_paragraph_style(&self) -> Style {
        Style::default()
            .fg(self.active_paragraph)
            .add_modifier(Modifier::BOLD)
    }

    pub fn sentence_style(&self) -> Style {
        Style::default()
            .bg(self.sentence_highlight_bg)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    }

    pub fn caption_style(&self) -> Style {
        Style::default()
            .fg(self.image_caption)
            .add_modifier(Modifier::DIM)
    }

    pub fn status_style(&self) -> Style {
        Style::default().fg(self.status_text)
    }
}
