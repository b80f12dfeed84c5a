use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::layout::Size;
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::data::{CommentItem, SPINNER_FRAMES};
use crate::services::{filter_comments, MenuAnchor, MenuRequest, Screen};
use crate::viewmodels::PullRequestViewModel;

use super::message::{Action, CommandOutcome, Confirm};

/// An action menu being shown, with the highlighted entry.
pub struct MenuState {
    pub request: MenuRequest,
    pub selected: usize,
}

pub struct App {
    pub vm: Arc<PullRequestViewModel>,
    pub web_url: String,

    // Conversation snapshot
    pub comments: Vec<CommentItem>,
    pub filtered_indices: Vec<usize>,
    comment_changes: watch::Receiver<u64>,

    // Scroll state
    pub scroll: u16,
    pub viewport: Size,

    // Search state
    pub search_mode: bool,
    pub search_query: String,

    // Popup state
    pub show_help_popup: bool,
    pub show_error_popup: bool,
    pub show_comment_popup: bool,
    pub show_approvals_popup: bool,
    pub confirm: Option<Confirm>,
    pub menu: Option<MenuState>,

    // Error and feedback
    pub error: Option<String>,
    pub status: Option<String>,

    // Input state
    pub comment_input: String,
    pub close_source_branch: bool,
    pub approvals_selected: usize,

    // Async communication
    runtime: Handle,
    outcome_tx: Sender<CommandOutcome>,
    outcome_rx: Receiver<CommandOutcome>,
    menu_rx: Receiver<MenuRequest>,
    screen_rx: Receiver<Screen>,

    // Spinner state
    pub spinner_idx: usize,
    pub last_spinner_update: Instant,
}

impl App {
    pub fn new(
        vm: Arc<PullRequestViewModel>,
        web_url: impl Into<String>,
        runtime: Handle,
        menu_rx: Receiver<MenuRequest>,
        screen_rx: Receiver<Screen>,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel::<CommandOutcome>();
        let comment_changes = vm.comment_changes();

        let mut app = Self {
            vm,
            web_url: web_url.into(),
            comments: Vec::new(),
            filtered_indices: Vec::new(),
            comment_changes,
            scroll: 0,
            viewport: Size::new(80, 24),
            search_mode: false,
            search_query: String::new(),
            show_help_popup: false,
            show_error_popup: false,
            show_comment_popup: false,
            show_approvals_popup: false,
            confirm: None,
            menu: None,
            error: None,
            status: None,
            comment_input: String::new(),
            close_source_branch: false,
            approvals_selected: 0,
            runtime,
            outcome_tx,
            outcome_rx,
            menu_rx,
            screen_rx,
            spinner_idx: 0,
            last_spinner_update: Instant::now(),
        };
        app.refresh_comments();
        app
    }

    // Getters

    pub fn visible_comments(&self) -> Vec<&CommentItem> {
        self.filtered_indices
            .iter()
            .filter_map(|&idx| self.comments.get(idx))
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.vm.is_busy()
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner_idx]
    }

    // Spinner update

    pub fn update_spinner(&mut self) {
        if self.last_spinner_update.elapsed() >= Duration::from_millis(80) {
            self.spinner_idx = (self.spinner_idx + 1) % SPINNER_FRAMES.len();
            self.last_spinner_update = Instant::now();
        }
    }

    // Conversation snapshot

    /// Pull the comment list from the view-model if it changed since the last sync.
    pub fn sync_comments(&mut self) -> bool {
        if !self.comment_changes.has_changed().unwrap_or(false) {
            return false;
        }
        self.comment_changes.borrow_and_update();
        self.refresh_comments();
        true
    }

    pub fn update_filtered_indices(&mut self) {
        self.filtered_indices = filter_comments(&self.comments, &self.search_query);
    }

    fn refresh_comments(&mut self) {
        self.comments = self.vm.comments();
        self.update_filtered_indices();
    }

    // Background actions

    pub fn start_action(&mut self, action: Action) {
        self.error = None;
        self.show_error_popup = false;

        let name = action.name();
        let vm = Arc::clone(&self.vm);
        let tx = self.outcome_tx.clone();
        self.runtime.spawn(async move {
            let result = match action {
                Action::Load => vm.load().await,
                Action::ToggleApprove => vm.toggle_approve().await,
                Action::Merge(options) => vm.merge(options).await,
                Action::Decline => vm.reject().await,
                Action::ShowMenu => vm.show_menu(MenuAnchor::Screen).await,
                Action::AddComment(text) => vm.add_comment(&text).await,
            };
            // The UI loop may have exited already.
            let _ = tx.send(CommandOutcome { action: name, result });
        });
    }

    pub fn check_outcome(&mut self) -> Option<CommandOutcome> {
        self.outcome_rx.try_recv().ok()
    }

    pub fn check_menu_request(&mut self) -> Option<MenuRequest> {
        self.menu_rx.try_recv().ok()
    }

    pub fn check_navigation(&mut self) -> Option<Screen> {
        self.screen_rx.try_recv().ok()
    }
}
