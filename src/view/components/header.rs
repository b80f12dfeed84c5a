use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    Frame,
};

use crate::app::App;
use crate::data::PullRequestState;
use crate::icons;

use super::popups::truncate_string;

/// Render the pull request header: title, state, author, branches and approvals
pub fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::vertical([
        Constraint::Length(1), // Title
        Constraint::Length(1), // Author and branches
        Constraint::Length(1), // Approvals
    ])
    .split(area);

    let pr = app.vm.pull_request();

    // Title row: state on the left, loading + repo on the right
    let (state_text, state_color) =
        PullRequestState::from_field(pr.as_ref().and_then(|p| p.state.as_deref())).display();
    let title = pr
        .as_ref()
        .map(|p| p.title.clone())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| app.vm.title().to_string());

    let loading_indicator = if app.is_loading() {
        format!("{} ", app.spinner())
    } else {
        String::new()
    };
    let right = Line::from(vec![
        Span::styled(loading_indicator, Style::default().fg(Color::Yellow)),
        Span::styled(
            format!("{} ", app.vm.key()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let title_chunks =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(right.width() as u16)])
            .split(rows[0]);
    let max_title = (title_chunks[0].width as usize).saturating_sub(state_text.chars().count() + 3);
    let left = Line::from(vec![
        Span::styled(format!(" {} ", state_text), Style::default().fg(state_color).bold()),
        Span::styled(truncate_string(&title, max_title), Style::default().fg(Color::White).bold()),
    ]);
    f.render_widget(left, title_chunks[0]);
    f.render_widget(right, title_chunks[1]);

    // Author and branches
    let author = pr
        .as_ref()
        .and_then(|p| p.author.as_ref())
        .map(|a| a.label().to_string());
    let source = pr.as_ref().and_then(|p| p.source_branch().map(str::to_string));
    let destination = pr.as_ref().and_then(|p| p.destination_branch().map(str::to_string));

    let mut meta = vec![Span::raw(" ")];
    if let Some(author) = author {
        meta.push(Span::styled(author, Style::default().fg(Color::Magenta)));
        meta.push(Span::raw("  "));
    }
    if let (Some(source), Some(destination)) = (source, destination) {
        meta.push(Span::styled(source, Style::default().fg(Color::Cyan)));
        meta.push(Span::styled(
            format!(" {} ", icons::BRANCH_ARROW),
            Style::default().fg(Color::DarkGray),
        ));
        meta.push(Span::styled(destination, Style::default().fg(Color::Cyan)));
    }
    f.render_widget(Line::from(meta), rows[1]);

    f.render_widget(approvals_line(app), rows[2]);
}

fn approvals_line(app: &App) -> Line<'static> {
    let summary = app.vm.approval_summary();
    let (Some(approved), Some(participants)) = (summary.approval_count, summary.participant_count)
    else {
        return Line::styled(" Loading…", Style::default().fg(Color::DarkGray));
    };

    let (mark, mark_color) = if summary.approved {
        (icons::APPROVED, Color::Green)
    } else {
        (icons::NOT_APPROVED, Color::DarkGray)
    };

    let names: Vec<String> = summary
        .approvals
        .iter()
        .map(|u| u.label().to_string())
        .collect();
    let names = if names.is_empty() {
        "no approvals".to_string()
    } else {
        names.join(", ")
    };

    Line::from(vec![
        Span::styled(format!(" {} ", mark), Style::default().fg(mark_color)),
        Span::styled(
            format!("{}/{} approved", approved, participants),
            Style::default().fg(Color::Green),
        ),
        Span::styled(format!("  {}", names), Style::default().fg(Color::DarkGray)),
    ])
}
