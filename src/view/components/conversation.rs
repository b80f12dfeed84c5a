use ratatui::{
    layout::Rect,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;
use crate::data::CommentItem;
use crate::icons;

use super::popups::wrap_text;

/// Render the description and comments, scrolled
pub fn render_conversation(f: &mut Frame, app: &App, area: Rect) {
    let lines = conversation_lines(app, area.width as usize);
    let max_scroll = (lines.len() as u16).saturating_sub(area.height);
    let content = Paragraph::new(lines).scroll((app.scroll.min(max_scroll), 0));
    f.render_widget(content, area);
}

/// Build the conversation pre-wrapped to `width` columns.
pub fn conversation_lines(app: &App, width: usize) -> Vec<Line<'static>> {
    let text_width = width.saturating_sub(2);
    let mut lines: Vec<Line<'static>> = Vec::new();

    // The description is hidden while searching so matches stay in view
    if app.search_query.is_empty() {
        lines.push(Line::styled(" Description", Style::default().fg(Color::Cyan).bold()));
        lines.push(Line::raw(""));
        match app.vm.description() {
            Some(description) => push_body(&mut lines, &description, text_width),
            None => lines.push(Line::styled(
                "  No description",
                Style::default().fg(Color::DarkGray),
            )),
        }
    }

    let visible = app.visible_comments();
    if visible.is_empty() && !app.search_query.is_empty() {
        lines.push(Line::styled(
            " No matching comments",
            Style::default().fg(Color::DarkGray),
        ));
    }

    for comment in visible {
        if !lines.is_empty() {
            lines.push(Line::raw(""));
            lines.push(Line::styled(
                icons::SEPARATOR_CHAR.repeat(width.saturating_sub(1)),
                Style::default().fg(Color::DarkGray),
            ));
            lines.push(Line::raw(""));
        }
        push_comment(&mut lines, comment, text_width);
    }

    lines
}

fn push_comment(lines: &mut Vec<Line<'static>>, comment: &CommentItem, width: usize) {
    lines.push(Line::from(vec![
        Span::styled(format!(" {}", comment.author), Style::default().fg(Color::Green).bold()),
        Span::styled(
            format!("  {}", comment.created),
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    lines.push(Line::raw(""));
    push_body(lines, &comment.content, width);
}

/// Push rendered text, keeping short lines (and their indentation) as they are.
fn push_body(lines: &mut Vec<Line<'static>>, text: &str, width: usize) {
    for raw in text.lines() {
        if raw.chars().count() <= width {
            lines.push(Line::raw(format!("  {}", raw)));
        } else {
            for wrapped in wrap_text(raw, width) {
                lines.push(Line::raw(format!("  {}", wrapped)));
            }
        }
    }
}
