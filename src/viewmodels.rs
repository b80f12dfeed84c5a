pub mod pull_request;

pub use pull_request::{ApprovalSummary, PullRequestViewModel};

use std::sync::Arc;

use crate::services::{AccountProvider, ActionMenu, BitbucketApi, MarkdownRenderer, Navigator};

/// Collaborators a view-model is constructed with.
#[derive(Clone)]
pub struct ViewModelServices {
    pub api: Arc<dyn BitbucketApi>,
    pub markdown: Arc<dyn MarkdownRenderer>,
    pub account: Arc<dyn AccountProvider>,
    pub navigator: Arc<dyn Navigator>,
    pub menu: Arc<dyn ActionMenu>,
}
