use crate::data::MergeOptions;
use crate::view::{max_scroll, ui::conversation_area};

use super::message::{Action, Command, CommandOutcome, Confirm, Message};
use super::model::{App, MenuState};

/// Update the application state based on a message.
/// Returns an optional command to be executed by the main loop.
pub fn update(app: &mut App, msg: Message) -> Option<Command> {
    match msg {
        // Scrolling
        Message::ScrollDown => {
            scroll_by(app, 1);
            None
        }
        Message::ScrollUp => {
            scroll_by(app, -1);
            None
        }
        Message::PageDown => {
            scroll_by(app, half_page(app));
            None
        }
        Message::PageUp => {
            scroll_by(app, -half_page(app));
            None
        }
        Message::GoToTop => {
            app.scroll = 0;
            None
        }
        Message::GoToBottom => {
            app.scroll = max_scroll(app);
            None
        }

        // Pull request actions
        Message::Refresh => Some(Command::Spawn(Action::Load)),
        Message::ToggleApprove => Some(Command::Spawn(Action::ToggleApprove)),
        Message::PromptConfirm(confirm) => {
            prompt_confirm(app, confirm);
            None
        }
        Message::ConfirmAction => confirm_action(app),
        Message::CancelConfirm => {
            app.confirm = None;
            None
        }
        Message::ToggleCloseSourceBranch => {
            app.close_source_branch = !app.close_source_branch;
            None
        }
        Message::OpenCommits => {
            if let Err(e) = app.vm.go_to_commits() {
                show_status(app, e.to_string());
            }
            None
        }
        Message::OpenAuthor => {
            open_author(app);
            None
        }
        Message::ShowMenu => Some(Command::Spawn(Action::ShowMenu)),

        // Comment composition
        Message::OpenCommentPopup => {
            app.show_comment_popup = true;
            app.comment_input.clear();
            None
        }
        Message::CloseCommentPopup => {
            app.show_comment_popup = false;
            app.comment_input.clear();
            None
        }
        Message::CommentInput(c) => {
            app.comment_input.push(c);
            None
        }
        Message::CommentBackspace => {
            app.comment_input.pop();
            None
        }
        Message::SubmitComment => submit_comment(app),

        // Search
        Message::EnterSearchMode => {
            app.search_mode = true;
            None
        }
        Message::ExitSearchMode { clear } => {
            exit_search_mode(app, clear);
            None
        }
        Message::SearchInput(c) => {
            app.search_query.push(c);
            refilter(app);
            None
        }
        Message::SearchBackspace => {
            app.search_query.pop();
            refilter(app);
            None
        }

        // Approvals
        Message::OpenApprovalsPopup => {
            app.show_approvals_popup = true;
            app.approvals_selected = 0;
            None
        }
        Message::CloseApprovalsPopup => {
            app.show_approvals_popup = false;
            None
        }
        Message::ApprovalsNext => {
            let len = app.vm.approvals().len();
            if len > 0 && app.approvals_selected < len - 1 {
                app.approvals_selected += 1;
            }
            None
        }
        Message::ApprovalsPrevious => {
            app.approvals_selected = app.approvals_selected.saturating_sub(1);
            None
        }
        Message::OpenSelectedApproval => {
            if let Some(user) = app.vm.approvals().get(app.approvals_selected) {
                if !user.go_to() {
                    show_status(app, format!("{} has no Bitbucket profile", user.label()));
                }
            }
            app.show_approvals_popup = false;
            None
        }

        // Action menu
        Message::MenuNext => {
            if let Some(menu) = app.menu.as_mut() {
                let len = menu.request.actions.len();
                if len > 0 && menu.selected < len - 1 {
                    menu.selected += 1;
                }
            }
            None
        }
        Message::MenuPrevious => {
            if let Some(menu) = app.menu.as_mut() {
                menu.selected = menu.selected.saturating_sub(1);
            }
            None
        }
        Message::MenuSelect => {
            close_menu(app, true);
            None
        }
        Message::MenuDismiss => {
            close_menu(app, false);
            None
        }

        // Popups
        Message::ToggleHelp => {
            app.show_help_popup = !app.show_help_popup;
            None
        }
        Message::DismissHelp => {
            app.show_help_popup = false;
            None
        }
        Message::DismissError => {
            app.show_error_popup = false;
            None
        }

        // Async results
        Message::CommandFinished(outcome) => {
            handle_outcome(app, outcome);
            None
        }
        Message::MenuRequested(request) => {
            // A newer menu replaces one still open; the old one counts as dismissed.
            close_menu(app, false);
            app.menu = Some(MenuState {
                request,
                selected: 0,
            });
            None
        }
        Message::Navigate(screen) => Some(Command::OpenUrl(screen.web_url(&app.web_url))),

        // System
        Message::Tick => {
            app.sync_comments();
            if app.is_loading() {
                app.update_spinner();
            }
            None
        }
        Message::Quit => Some(Command::Quit),
    }
}

// Helper functions

fn half_page(app: &App) -> i32 {
    (conversation_area(app).height / 2).max(1) as i32
}

fn scroll_by(app: &mut App, delta: i32) {
    let target = (app.scroll as i32 + delta).clamp(0, max_scroll(app) as i32);
    app.scroll = target as u16;
}

fn show_status(app: &mut App, status: String) {
    app.status = Some(status);
}

fn prompt_confirm(app: &mut App, confirm: Confirm) {
    let command = match confirm {
        Confirm::Merge => app.vm.merge_command(),
        Confirm::Decline => app.vm.reject_command(),
    };
    if !command.is_enabled() {
        show_status(app, "Pull request is not open".to_string());
        return;
    }
    app.close_source_branch = false;
    app.confirm = Some(confirm);
}

fn confirm_action(app: &mut App) -> Option<Command> {
    let action = match app.confirm.take()? {
        Confirm::Merge => Action::Merge(MergeOptions {
            close_source_branch: app.close_source_branch.then_some(true),
            ..MergeOptions::default()
        }),
        Confirm::Decline => Action::Decline,
    };
    Some(Command::Spawn(action))
}

fn open_author(app: &mut App) {
    let username = app
        .vm
        .pull_request()
        .and_then(|pr| pr.author)
        .and_then(|author| author.username);
    match username {
        Some(username) => {
            if let Err(e) = app.vm.go_to_user(&username) {
                show_status(app, e.to_string());
            }
        }
        None => show_status(app, "Author is unknown".to_string()),
    }
}

fn submit_comment(app: &mut App) -> Option<Command> {
    let text = app.comment_input.trim().to_string();
    if text.is_empty() {
        return None;
    }
    app.show_comment_popup = false;
    app.comment_input.clear();
    Some(Command::Spawn(Action::AddComment(text)))
}

fn exit_search_mode(app: &mut App, clear_query: bool) {
    app.search_mode = false;
    if clear_query {
        app.search_query.clear();
        refilter(app);
    }
}

fn refilter(app: &mut App) {
    app.update_filtered_indices();
    app.scroll = 0;
}

/// Close the open menu, running the highlighted action when `choose` is set.
fn close_menu(app: &mut App, choose: bool) {
    let Some(menu) = app.menu.take() else {
        return;
    };
    let MenuState { request, selected } = menu;
    if choose {
        if let Some(action) = request.actions.into_iter().nth(selected) {
            action.invoke();
        }
    }
    // The view-model may have given up waiting.
    let _ = request.dismissed.send(());
}

fn handle_outcome(app: &mut App, outcome: CommandOutcome) {
    match outcome.result {
        Ok(()) => {
            let status = match outcome.action {
                "approve" if app.vm.approved() => Some("Approved"),
                "approve" => Some("Approval removed"),
                "merge" => Some("Merged"),
                "decline" => Some("Declined"),
                "comment" => Some("Comment posted"),
                _ => None,
            };
            app.status = status.map(str::to_string);
        }
        Err(e) if e.is_precondition() => {
            tracing::debug!(action = outcome.action, error = %e, "command not run");
            show_status(app, e.to_string());
        }
        Err(e) => {
            tracing::warn!(action = outcome.action, error = %e, "command failed");
            app.error = Some(format!("{} failed: {}", outcome.action, e));
            app.show_error_popup = true;
        }
    }
}
