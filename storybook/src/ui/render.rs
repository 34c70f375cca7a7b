//! Top-level rendering for the storybook TUI.

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::{App, Screen};
use crate::ui::widgets::{controls::render_controls, input::render_input, story::render_story};

/// Render the whole UI.
pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);

    match app.screen {
        Screen::Creator => render_creator(f, app, chunks[1]),
        Screen::Loading => render_loading(f, app, chunks[1]),
        Screen::Story => render_story_screen(f, app, chunks[1]),
    }

    render_status(f, app, chunks[2]);

    if app.confirm_quit {
        render_quit_confirm(f, app);
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let header = Paragraph::new(Line::from("📖 AI 绘本故事"))
        .style(app.theme.title_style())
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_creator(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(area);

    let hint = Paragraph::new("输入一个故事主题，回车开始创作（例如：小兔子的森林冒险）")
        .style(app.theme.status_style())
        .alignment(Alignment::Center);
    f.render_widget(hint, chunks[0]);

    render_input(f, app, chunks[1]);
}

fn render_loading(f: &mut Frame, app: &App, area: Rect) {
    let loading = Paragraph::new(app.loading_text.clone())
        .style(app.theme.status_style())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" 创作中 "));
    f.render_widget(loading, area);
}

fn render_story_screen(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    render_story(f, app, chunks[0]);
    render_controls(f, app, chunks[1]);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let status = app.status_message().unwrap_or("Ctrl+C 退出");
    let line = Paragraph::new(status.to_string()).style(app.theme.status_style());
    f.render_widget(line, area);
}

fn render_quit_confirm(f: &mut Frame, app: &App) {
    let area = centered_rect(44, 5, f.area());
    f.render_widget(Clear, area);

    let dialog = Paragraph::new("故事正在播放中，确定要离开吗？\n\n[y] 离开    [n] 继续听")
        .style(app.theme.paragraph_style())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title(" 确认退出 ")
                .borders(Borders::ALL)
                .border_style(app.theme.title_style()),
        );
    f.render_widget(dialog, area);
}

/// A fixed-size rectangle centered in `area`.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}
