//! Narration controls and progress display.

use ratatui::layout::Rect;
use ratatui::widgets::{Block, Borders, Gauge};
use ratatui::Frame;

use storybook_core::NarrationState;

use crate::app::App;

/// Render the playback state and sentence progress.
pub fn render_controls(f: &mut Frame, app: &App, area: Rect) {
    let state = match app.playback {
        NarrationState::Playing => "播放中",
        NarrationState::Paused => "已暂停",
        NarrationState::Stopped => "已停止",
        NarrationState::Idle => "待播放",
    };

    let (done, total) = app.progress;
    let ratio = if total > 0 {
        (done as f64 / total as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(format!(" {state} · 空格 播放/暂停 · s 停止 · r 重新生成 · n 新故事 "))
                .borders(Borders::ALL)
                .border_style(app.theme.status_style()),
        )
        .gauge_style(app.theme.status_style())
        .ratio(ratio)
        .label(format!("{done} / {total}"));

    f.render_widget(gauge, area);
}
