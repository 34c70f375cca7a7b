//! Widgets for the storybook TUI.

pub mod controls;
pub mod input;
pub mod story;
