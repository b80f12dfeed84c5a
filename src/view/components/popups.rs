use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Confirm};
use crate::icons;

fn key_line(key: &'static str, label: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(key, Style::default().fg(Color::Yellow)),
        Span::raw(label),
    ])
}

fn popup_block(title: &str, color: Color) -> Block<'_> {
    Block::default()
        .title(title)
        .title_style(Style::default().fg(color).bold())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

/// Render the help popup
pub fn render_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_area = centered_rect(44, 22, area);

    f.render_widget(Clear, popup_area);

    let help_lines = vec![
        key_line("j/↓  ", "Scroll down"),
        key_line("k/↑  ", "Scroll up"),
        key_line("^d/^u", "Half page down/up"),
        key_line("g/G  ", "Go to top/bottom"),
        key_line("/    ", "Fuzzy search comments"),
        key_line("r    ", "Refresh"),
        key_line("a    ", "Approve / remove approval"),
        key_line("m    ", "Merge"),
        key_line("x    ", "Decline"),
        key_line("c    ", "Add comment"),
        key_line("o    ", "Open commits"),
        key_line("u    ", "Open author profile"),
        key_line("v    ", "Approvals"),
        key_line("⏎    ", "Actions menu"),
        key_line("?    ", "Toggle help"),
        key_line("q    ", "Quit"),
        Line::raw(""),
        Line::from("Press any key to close").centered(),
    ];

    let help = Paragraph::new(help_lines).block(popup_block(" Help ", Color::Cyan));
    f.render_widget(help, popup_area);
}

/// Render the merge/decline confirmation popup
pub fn render_confirm_popup(f: &mut Frame, app: &App, confirm: Confirm) {
    let area = f.area();
    let popup_area = centered_rect(52, 8, area);

    f.render_widget(Clear, popup_area);

    let (title, question, color) = match confirm {
        Confirm::Merge => (" Merge ", format!("Merge {}?", app.vm.title()), Color::Green),
        Confirm::Decline => (" Decline ", format!("Decline {}?", app.vm.title()), Color::Red),
    };

    let mut content = vec![Line::raw(""), Line::from(question).centered()];
    if confirm == Confirm::Merge {
        let mark = if app.close_source_branch { "[x]" } else { "[ ]" };
        content.push(
            Line::from(vec![
                Span::styled(mark, Style::default().fg(Color::Yellow)),
                Span::raw(" Close source branch "),
                Span::styled("(Tab)", Style::default().fg(Color::DarkGray)),
            ])
            .centered(),
        );
    } else {
        content.push(Line::raw(""));
    }
    content.push(Line::raw(""));
    content.push(
        Line::from(vec![
            Span::raw("Press "),
            Span::styled("y", Style::default().fg(Color::Green).bold()),
            Span::raw(" to confirm or "),
            Span::styled("n", Style::default().fg(Color::Red).bold()),
            Span::raw(" to cancel"),
        ])
        .centered(),
    );

    let popup = Paragraph::new(content).block(popup_block(title, color));
    f.render_widget(popup, popup_area);
}

/// Render the error popup
pub fn render_error_popup(f: &mut Frame, error: &str) {
    let area = f.area();
    let popup_width = (area.width * 60 / 100).max(40).min(area.width.saturating_sub(4));
    let popup_height = 7u16;
    let popup_area = centered_rect(popup_width, popup_height, area);

    f.render_widget(Clear, popup_area);

    let error_paragraph = Paragraph::new(error)
        .style(Style::default().fg(Color::White))
        .block(popup_block(" Error ", Color::Red))
        .wrap(Wrap { trim: true });

    f.render_widget(error_paragraph, popup_area);

    let hint_area = Rect {
        x: popup_area.x,
        y: popup_area.y + popup_area.height,
        width: popup_area.width,
        height: 1,
    };

    if hint_area.y < area.height {
        let hint = Line::from(vec![
            Span::raw("Press "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(" to dismiss"),
        ])
        .centered();
        f.render_widget(hint, hint_area);
    }
}

/// Render the comment composition popup
pub fn render_comment_popup(f: &mut Frame, app: &App) {
    let area = f.area();
    let popup_width = (area.width * 70 / 100).max(40).min(area.width.saturating_sub(4));
    let popup_area = centered_rect(popup_width, 10, area);

    f.render_widget(Clear, popup_area);

    let block = popup_block(" New comment ", Color::Cyan);
    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let layout = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(inner);

    let input = Paragraph::new(Line::from(vec![
        Span::styled(&app.comment_input, Style::default().fg(Color::White)),
        Span::styled(icons::CURSOR, Style::default().fg(Color::Cyan)),
    ]))
    .wrap(Wrap { trim: false });
    f.render_widget(input, layout[0]);

    let hint = Line::from(vec![
        Span::styled("⏎", Style::default().fg(Color::Yellow)),
        Span::raw(" post  "),
        Span::styled("Esc", Style::default().fg(Color::Yellow)),
        Span::raw(" cancel"),
    ])
    .style(Style::default().fg(Color::DarkGray));
    f.render_widget(hint, layout[1]);
}

/// Render the approvals popup
pub fn render_approvals_popup(f: &mut Frame, app: &App) {
    let area = f.area();
    let approvals = app.vm.approvals();
    let popup_height = (approvals.len() as u16 + 4).clamp(6, 16);
    let popup_area = centered_rect(44, popup_height, area);

    f.render_widget(Clear, popup_area);

    let mut lines: Vec<Line> = Vec::new();
    if approvals.is_empty() {
        lines.push(Line::styled(
            "No approvals yet",
            Style::default().fg(Color::DarkGray),
        ));
    }
    for (idx, user) in approvals.iter().enumerate() {
        let selected = idx == app.approvals_selected;
        let prefix = if selected { icons::SELECTOR } else { "  " };
        let style = if selected {
            Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(prefix, Style::default().fg(Color::Cyan)),
            Span::styled(format!("{} ", icons::APPROVED), Style::default().fg(Color::Green)),
            Span::styled(truncate_string(user.label(), 36), style),
        ]));
    }
    lines.push(Line::raw(""));
    lines.push(
        Line::from(vec![
            Span::styled("⏎", Style::default().fg(Color::Yellow)),
            Span::raw(" profile  "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(" close"),
        ])
        .centered(),
    );

    let popup = Paragraph::new(lines).block(popup_block(" Approvals ", Color::Green));
    f.render_widget(popup, popup_area);
}

/// Render the action menu
pub fn render_menu_popup(f: &mut Frame, app: &App) {
    let Some(menu) = app.menu.as_ref() else {
        return;
    };
    let area = f.area();
    let popup_height = menu.request.actions.len() as u16 + 4;
    let popup_area = centered_rect(40, popup_height, area);

    f.render_widget(Clear, popup_area);

    let mut lines: Vec<Line> = menu
        .request
        .actions
        .iter()
        .enumerate()
        .map(|(idx, action)| {
            if idx == menu.selected {
                Line::from(vec![
                    Span::styled(icons::SELECTOR, Style::default().fg(Color::Cyan)),
                    Span::styled(
                        action.label.clone(),
                        Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
                    ),
                ])
            } else {
                Line::from(format!("  {}", action.label))
            }
        })
        .collect();
    lines.push(Line::raw(""));
    lines.push(
        Line::from(vec![
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(" cancel"),
        ])
        .centered(),
    );

    let title = format!(" {} ", menu.request.title);
    let popup = Paragraph::new(lines).block(popup_block(&title, Color::Cyan));
    f.render_widget(popup, popup_area);
}

/// Render the bottom legend, or the latest status message
pub fn render_legend(f: &mut Frame, app: &App, area: Rect) {
    if let Some(status) = &app.status {
        let line = Line::styled(status.as_str(), Style::default().fg(Color::Yellow));
        f.render_widget(Paragraph::new(line), area);
        return;
    }

    let legend = Line::from(vec![
        Span::styled("j/k", Style::default().fg(Color::Yellow)),
        Span::raw(" scroll  "),
        Span::styled("a", Style::default().fg(Color::Yellow)),
        Span::raw(" approve  "),
        Span::styled("m", Style::default().fg(Color::Yellow)),
        Span::raw(" merge  "),
        Span::styled("c", Style::default().fg(Color::Yellow)),
        Span::raw(" comment  "),
        Span::styled("/", Style::default().fg(Color::Yellow)),
        Span::raw(" search  "),
        Span::styled("?", Style::default().fg(Color::Yellow)),
        Span::raw(" help  "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" quit"),
    ]);

    let paragraph = Paragraph::new(legend).style(Style::default().fg(Color::DarkGray));
    f.render_widget(paragraph, area);
}

/// Helper function to create a centered rect
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .split(area);

    Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .split(vertical[0])[0]
}

/// Truncate a string to a maximum length with ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

/// Wrap text to fit within a maximum width, breaking on word boundaries
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if !current_line.is_empty()
            && current_line.chars().count() + 1 + word.chars().count() <= max_width
        {
            current_line.push(' ');
            current_line.push_str(word);
            continue;
        }
        if !current_line.is_empty() {
            lines.push(std::mem::take(&mut current_line));
        }
        if word.chars().count() > max_width {
            // Word is longer than max width, split it
            let mut chars = word.chars().peekable();
            while chars.peek().is_some() {
                let chunk: String = chars.by_ref().take(max_width).collect();
                if chars.peek().is_some() {
                    lines.push(chunk);
                } else {
                    current_line = chunk;
                }
            }
        } else {
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("héllo wörld", 6), "héllo…");
    }

    #[test]
    fn wraps_on_words_and_splits_long_words() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("", 4), vec![String::new()]);
    }
}
