use crate::data::MergeOptions;
use crate::error::Result;
use crate::services::{MenuRequest, Screen};

/// A view-model command run in the background
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Load,
    ToggleApprove,
    Merge(MergeOptions),
    Decline,
    ShowMenu,
    AddComment(String),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Load => "load",
            Action::ToggleApprove => "approve",
            Action::Merge(_) => "merge",
            Action::Decline => "decline",
            Action::ShowMenu => "menu",
            Action::AddComment(_) => "comment",
        }
    }
}

/// Result of a background action
#[derive(Debug)]
pub struct CommandOutcome {
    pub action: &'static str,
    pub result: Result<()>,
}

/// Command to be executed after update
#[derive(Debug, PartialEq)]
pub enum Command {
    Quit,
    Spawn(Action),
    OpenUrl(String),
}

/// Pending yes/no confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    Merge,
    Decline,
}

/// All possible messages/events in the application
#[derive(Debug)]
pub enum Message {
    // Scrolling
    ScrollDown,
    ScrollUp,
    PageDown,
    PageUp,
    GoToTop,
    GoToBottom,

    // Pull request actions
    Refresh,
    ToggleApprove,
    PromptConfirm(Confirm),
    ConfirmAction,
    CancelConfirm,
    ToggleCloseSourceBranch,
    OpenCommits,
    OpenAuthor,
    ShowMenu,

    // Comment composition
    OpenCommentPopup,
    CloseCommentPopup,
    CommentInput(char),
    CommentBackspace,
    SubmitComment,

    // Search
    EnterSearchMode,
    ExitSearchMode { clear: bool },
    SearchInput(char),
    SearchBackspace,

    // Approvals
    OpenApprovalsPopup,
    CloseApprovalsPopup,
    ApprovalsNext,
    ApprovalsPrevious,
    OpenSelectedApproval,

    // Action menu
    MenuNext,
    MenuPrevious,
    MenuSelect,
    MenuDismiss,

    // Popups
    ToggleHelp,
    DismissHelp,
    DismissError,

    // Async results
    CommandFinished(CommandOutcome),
    MenuRequested(MenuRequest),
    Navigate(Screen),

    // System
    Tick,
    Quit,
}
