use std::rc::Rc;

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;
use crate::icons;

use super::components::{
    conversation_lines, render_approvals_popup, render_comment_popup, render_confirm_popup,
    render_conversation, render_error_popup, render_header, render_help_popup, render_legend,
    render_menu_popup, render_search_bar,
};

fn shows_search_bar(app: &App) -> bool {
    app.search_mode || !app.search_query.is_empty()
}

fn layout(app: &App, area: Rect) -> Rc<[Rect]> {
    // Calculate layout based on whether search is active
    if shows_search_bar(app) {
        Layout::vertical([
            Constraint::Length(3), // Header
            Constraint::Length(1), // Separator
            Constraint::Min(0),    // Conversation
            Constraint::Length(1), // Search bar
            Constraint::Length(1), // Legend
        ])
        .split(area)
    } else {
        Layout::vertical([
            Constraint::Length(3), // Header
            Constraint::Length(1), // Separator
            Constraint::Min(0),    // Conversation
            Constraint::Length(1), // Legend
        ])
        .split(area)
    }
}

/// Area the conversation occupies in the current viewport
pub fn conversation_area(app: &App) -> Rect {
    let area = Rect::new(0, 0, app.viewport.width, app.viewport.height);
    layout(app, area)[2]
}

/// Furthest the conversation can scroll in the current viewport
pub fn max_scroll(app: &App) -> u16 {
    let area = conversation_area(app);
    let total = conversation_lines(app, area.width as usize).len() as u16;
    total.saturating_sub(area.height)
}

/// Main UI rendering function
pub fn ui(f: &mut Frame, app: &App) {
    let chunks = layout(app, f.area());

    render_header(f, app, chunks[0]);

    // Separator line
    let separator = icons::SEPARATOR_CHAR.repeat(chunks[1].width as usize);
    f.render_widget(
        Paragraph::new(separator).style(Style::default().fg(Color::DarkGray)),
        chunks[1],
    );

    render_conversation(f, app, chunks[2]);

    if shows_search_bar(app) {
        render_search_bar(f, app, chunks[3]);
    }
    render_legend(f, app, chunks[chunks.len() - 1]);

    // Render popups (order matters for layering)
    if app.show_approvals_popup {
        render_approvals_popup(f, app);
    }

    if app.show_comment_popup {
        render_comment_popup(f, app);
    }

    if let Some(confirm) = app.confirm {
        render_confirm_popup(f, app, confirm);
    }

    if app.menu.is_some() {
        render_menu_popup(f, app);
    }

    if app.show_help_popup {
        render_help_popup(f);
    }

    if app.show_error_popup {
        if let Some(ref error) = app.error {
            render_error_popup(f, error);
        }
    }
}
