use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;
use crate::data::CommentItem;
use crate::icons;

use super::popups::truncate_string;

/// Render the comment filter: query, match count and who wrote the matches
pub fn render_search_bar(f: &mut Frame, app: &App, area: Rect) {
    let cursor = if app.search_mode { icons::CURSOR } else { "" };
    let mut spans = vec![
        Span::styled("/", Style::default().fg(Color::Yellow)),
        Span::styled(app.search_query.clone(), Style::default().fg(Color::White)),
        Span::styled(cursor, Style::default().fg(Color::Cyan)),
    ];

    if !app.search_query.is_empty() {
        let visible = app.visible_comments();
        if visible.is_empty() {
            spans.push(Span::styled(
                format!("  no comments match ({} total)", app.comments.len()),
                Style::default().fg(Color::Red),
            ));
        } else {
            spans.push(Span::styled(
                format!("  {}/{} comments", visible.len(), app.comments.len()),
                Style::default().fg(Color::DarkGray),
            ));
            let used: usize = spans.iter().map(|s| s.width()).sum::<usize>() + 4;
            let room = (area.width as usize).saturating_sub(used);
            let authors = matched_authors(&visible).join(", ");
            spans.push(Span::styled(" by ", Style::default().fg(Color::DarkGray)));
            spans.push(Span::styled(
                truncate_string(&authors, room),
                Style::default().fg(Color::Magenta),
            ));
        }
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Distinct authors of the matching comments, in conversation order.
fn matched_authors<'a>(comments: &[&'a CommentItem]) -> Vec<&'a str> {
    let mut authors: Vec<&str> = Vec::new();
    for comment in comments {
        if !authors.contains(&comment.author.as_str()) {
            authors.push(&comment.author);
        }
    }
    authors
}
