//! Story display widget with paragraph and sentence highlighting.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use storybook_core::ImageSource;

use crate::app::App;

/// Render the story paragraphs, highlighting the active paragraph and the
/// sentence currently being spoken.
pub fn render_story(f: &mut Frame, app: &App, area: Rect) {
    let Some(story) = app.story.as_ref() else {
        return;
    };

    let mut lines: Vec<Line> = Vec::new();

    for (index, paragraph) in story.paragraphs.iter().enumerate() {
        let active = app.active_paragraph == Some(index);
        let marker = if active { "▶ " } else { "  " };

        let mut spans = vec![Span::styled(
            marker.to_string(),
            app.theme.active_paragraph_style(),
        )];
        spans.extend(paragraph_spans(app, &paragraph.text, active));
        lines.push(Line::from(spans));

        lines.push(Line::from(Span::styled(
            format!("    {}", caption_for(index, paragraph.image.as_ref())),
            app.theme.caption_style(),
        )));
        lines.push(Line::default());
    }

    // Rough per-paragraph offset: text plus caption plus separator.
    let offset = (app.scroll * 3) as u16;

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .title(format!(" {} ", story.title))
                .title_style(app.theme.title_style())
                .borders(Borders::ALL)
                .border_style(app.theme.paragraph_style()),
        )
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));

    f.render_widget(widget, area);
}

/// Split paragraph text around the spoken sentence so it can be styled.
fn paragraph_spans<'a>(app: &App, text: &'a str, active: bool) -> Vec<Span<'a>> {
    let base = if active {
        app.theme.active_paragraph_style()
    } else {
        app.theme.paragraph_style()
    };

    if active {
        if let Some(sentence) = app.active_sentence.as_deref() {
            if let Some(start) = text.find(sentence.trim_end_matches('。')) {
                let matched = sentence.trim_end_matches('。');
                let end = start + matched.len();
                return vec![
                    Span::styled(&text[..start], base),
                    Span::styled(&text[start..end], app.theme.sentence_style()),
                    Span::styled(&text[end..], base),
                ];
            }
        }
    }

    vec![Span::styled(text, base)]
}

fn caption_for(index: usize, image: Option<&ImageSource>) -> String {
    match image {
        Some(ImageSource::Url(url)) => format!("🖼 插图 {}: {url}", index + 1),
        Some(ImageSource::Vector(_)) => format!("🎨 插图 {}: 本地绘制", index + 1),
        None => format!("🎨 插图 {}: 生成中...", index + 1),
    }
}
