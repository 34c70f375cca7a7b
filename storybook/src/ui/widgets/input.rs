//! Theme input widget.

use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::App;

/// Render the theme input box with a visible cursor.
pub fn render_input(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" 故事主题 ")
        .borders(Borders::ALL)
        .border_style(app.theme.status_style());

    let inner = block.inner(area);
    let paragraph = Paragraph::new(Line::from(app.input_buffer().to_string()))
        .style(app.theme.paragraph_style())
        .block(block);
    f.render_widget(paragraph, area);

    // Cursor sits after the typed characters; CJK characters are two cells
    // wide in most terminals, so use a generous width estimate.
    let typed: u16 = app
        .input_buffer()
        .chars()
        .take(app.cursor_position())
        .map(|c| if c.is_ascii() { 1 } else { 2 })
        .sum();
    f.set_cursor_position((inner.x + typed.min(inner.width.saturating_sub(1)), inner.y));
}
