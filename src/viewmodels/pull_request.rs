use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;

use super::ViewModelServices;
use crate::data::{
    Avatar, Comment, CommentItem, MergeOptions, PullRequest, PullRequestKey, PullRequestState,
    UserItem,
};
use crate::error::{Error, Result};
use crate::reactive::{Derived, DerivedList, ReactiveCommand, RootCell};
use crate::services::{fetch_all_comments, MarkdownRenderer, MenuAction, MenuAnchor, Navigator, Screen};
use crate::utils::humanize;

/// Approval state of one pull request record.
#[derive(Clone)]
pub struct ApprovalSummary {
    pub approved: bool,
    pub approval_count: Option<usize>,
    pub participant_count: Option<usize>,
    pub approvals: Vec<UserItem>,
}

/// State and commands behind the pull request screen.
///
/// The pull request record is the single root; every derived property is
/// recomputed from it synchronously whenever it is replaced.
pub struct PullRequestViewModel {
    key: PullRequestKey,
    title: String,
    services: ViewModelServices,

    pull_request: RootCell<PullRequest>,
    comments: DerivedList<Comment, CommentItem>,

    is_open: Derived<bool>,
    approved: Derived<bool>,
    description: Derived<Option<String>>,
    approval_count: Derived<Option<usize>>,
    participant_count: Derived<Option<usize>>,
    approvals: Derived<Vec<UserItem>>,
    web_link: Derived<Option<String>>,
    has_source_repository: Derived<bool>,

    load_command: ReactiveCommand,
    merge_command: ReactiveCommand,
    reject_command: ReactiveCommand,
    toggle_approve_command: ReactiveCommand,
    go_to_commits_command: ReactiveCommand,
    go_to_user_command: ReactiveCommand,
    show_menu_command: ReactiveCommand,
    add_comment_command: ReactiveCommand,
}

impl PullRequestViewModel {
    pub fn new(key: PullRequestKey, services: ViewModelServices) -> Self {
        Self::build(key, None, services)
    }

    /// Start from a record fetched elsewhere, e.g. a pull request list.
    pub fn with_pull_request(
        owner: impl Into<String>,
        repo: impl Into<String>,
        pull_request: PullRequest,
        services: ViewModelServices,
    ) -> Self {
        let key = PullRequestKey::new(owner, repo, pull_request.id);
        Self::build(key, Some(pull_request), services)
    }

    fn build(key: PullRequestKey, initial: Option<PullRequest>, services: ViewModelServices) -> Self {
        let pull_request = RootCell::new(initial);

        let is_open = pull_request.derive("is_open", PullRequest::STATE, false, state_is_open);

        let account = Arc::clone(&services.account);
        let approved = pull_request.derive("approved", PullRequest::PARTICIPANTS, false, move |pr| {
            approved_by(pr, account.username().as_deref())
        });

        let participant_count =
            pull_request.derive("participant_count", PullRequest::PARTICIPANTS, None, |pr| {
                Some(pr.participants().len())
            });

        let approval_count =
            pull_request.derive("approval_count", PullRequest::PARTICIPANTS, None, |pr| {
                Some(pr.participants().iter().filter(|p| p.approved).count())
            });

        let markdown = Arc::clone(&services.markdown);
        let description = pull_request.derive("description", PullRequest::DESCRIPTION, None, move |pr| {
            render_description(pr, markdown.as_ref())
        });

        let navigator = Arc::clone(&services.navigator);
        let approvals = pull_request.derive("approvals", PullRequest::PARTICIPANTS, Vec::new(), move |pr| {
            approval_items(pr, &navigator)
        });

        let web_link = pull_request.derive("web_link", PullRequest::LINKS, None, |pr| {
            pr.html_url().map(str::to_string)
        });
        let has_source_repository =
            pull_request.derive("has_source_repository", PullRequest::SOURCE, false, |pr| {
                pr.source_repository().is_some()
            });

        let markdown = Arc::clone(&services.markdown);
        let comments = DerivedList::new(move |comment: &Comment| comment_item(comment, markdown.as_ref()));

        Self {
            title: format!("Pull Request #{}", key.id),
            key,
            services,
            merge_command: ReactiveCommand::with_condition("merge", is_open.clone()),
            reject_command: ReactiveCommand::with_condition("reject", is_open.clone()),
            pull_request,
            comments,
            is_open,
            approved,
            description,
            approval_count,
            participant_count,
            approvals,
            web_link,
            has_source_repository,
            load_command: ReactiveCommand::new("load"),
            toggle_approve_command: ReactiveCommand::new("toggle_approve"),
            go_to_commits_command: ReactiveCommand::new("go_to_commits"),
            go_to_user_command: ReactiveCommand::new("go_to_user"),
            show_menu_command: ReactiveCommand::new("show_menu"),
            add_comment_command: ReactiveCommand::new("add_comment"),
        }
    }

    // Getters

    pub fn key(&self) -> &PullRequestKey {
        &self.key
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn pull_request(&self) -> Option<PullRequest> {
        self.pull_request.get()
    }

    pub fn is_open(&self) -> bool {
        self.is_open.get()
    }

    pub fn approved(&self) -> bool {
        self.approved.get()
    }

    pub fn description(&self) -> Option<String> {
        self.description.get()
    }

    pub fn approval_count(&self) -> Option<usize> {
        self.approval_count.get()
    }

    pub fn participant_count(&self) -> Option<usize> {
        self.participant_count.get()
    }

    pub fn approvals(&self) -> Vec<UserItem> {
        self.approvals.get()
    }

    pub fn web_link(&self) -> Option<String> {
        self.web_link.get()
    }

    /// Approval state read in one step, so the values always describe the same record.
    pub fn approval_summary(&self) -> ApprovalSummary {
        let snapshot = self.pull_request.snapshot();
        ApprovalSummary {
            approved: snapshot.get(&self.approved),
            approval_count: snapshot.get(&self.approval_count),
            participant_count: snapshot.get(&self.participant_count),
            approvals: snapshot.get(&self.approvals),
        }
    }

    pub fn comments(&self) -> Vec<CommentItem> {
        self.comments.items()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.count().get()
    }

    /// Bumped after every pull request replacement, once derived properties are current.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.pull_request.subscribe()
    }

    pub fn comment_changes(&self) -> watch::Receiver<u64> {
        self.comments.subscribe()
    }

    pub fn load_command(&self) -> &ReactiveCommand {
        &self.load_command
    }

    pub fn merge_command(&self) -> &ReactiveCommand {
        &self.merge_command
    }

    pub fn reject_command(&self) -> &ReactiveCommand {
        &self.reject_command
    }

    pub fn toggle_approve_command(&self) -> &ReactiveCommand {
        &self.toggle_approve_command
    }

    pub fn add_comment_command(&self) -> &ReactiveCommand {
        &self.add_comment_command
    }

    /// True while any remote command is in flight.
    pub fn is_busy(&self) -> bool {
        [
            &self.load_command,
            &self.merge_command,
            &self.reject_command,
            &self.toggle_approve_command,
            &self.show_menu_command,
            &self.add_comment_command,
        ]
        .iter()
        .any(|c| c.is_executing())
    }

    // Commands

    /// Fetch the pull request, then rebuild the conversation from every comment page.
    pub async fn load(&self) -> Result<()> {
        self.load_command
            .execute(|| async move {
                let api = self.services.api.as_ref();
                let pull_request = api.get_pull_request(&self.key).await?;
                let mut visible: Vec<Comment> = fetch_all_comments(api, &self.key)
                    .await?
                    .into_iter()
                    .filter(Comment::is_visible)
                    .collect();
                visible.sort_by_key(|c| c.created_on);

                // Nothing is written until every fetch has succeeded.
                tracing::info!(key = %self.key, comments = visible.len(), "loaded pull request");
                self.pull_request.replace(pull_request);
                self.comments.replace_all(visible);
                Ok(())
            })
            .await
    }

    pub async fn merge(&self, options: MergeOptions) -> Result<()> {
        self.merge_command
            .execute(|| async move {
                let merged = self.services.api.merge(&self.key, &options).await?;
                self.pull_request.replace(merged);
                Ok(())
            })
            .await
    }

    /// Decline the pull request.
    pub async fn reject(&self) -> Result<()> {
        self.reject_command
            .execute(|| async move {
                let declined = self.services.api.decline(&self.key).await?;
                self.pull_request.replace(declined);
                Ok(())
            })
            .await
    }

    pub async fn toggle_approve(&self) -> Result<()> {
        self.toggle_approve_command
            .execute(|| async move {
                let api = self.services.api.as_ref();
                if self.approved.get() {
                    api.unapprove(&self.key).await?;
                } else {
                    api.approve(&self.key).await?;
                }
                let refreshed = api.get_pull_request(&self.key).await?;
                self.pull_request.replace(refreshed);
                Ok(())
            })
            .await
    }

    pub fn go_to_commits(&self) -> Result<()> {
        self.go_to_commits_command.run(|| {
            if !self.has_source_repository.get() {
                return Err(Error::SourceRepositoryDeleted);
            }
            self.services
                .navigator
                .navigate(Screen::PullRequestCommits(self.key.clone()));
            Ok(())
        })
    }

    pub fn go_to_user(&self, username: &str) -> Result<()> {
        self.go_to_user_command.run(|| {
            self.services.navigator.navigate(Screen::User {
                username: username.to_string(),
            });
            Ok(())
        })
    }

    /// Present the contextual menu and wait until it is dismissed.
    pub async fn show_menu(&self, anchor: MenuAnchor) -> Result<()> {
        self.show_menu_command
            .execute(|| async move {
                let url = self.web_link.get();
                let navigator = Arc::clone(&self.services.navigator);
                let open_in_browser = MenuAction::new("Show in Bitbucket", move || match url {
                    Some(url) => navigator.navigate(Screen::WebBrowser { url }),
                    None => tracing::warn!("pull request has no web link"),
                });
                self.services
                    .menu
                    .show(&self.title, anchor, vec![open_in_browser])
                    .await
            })
            .await
    }

    /// Post a comment and append the stored copy to the end of the conversation.
    pub async fn add_comment(&self, text: &str) -> Result<()> {
        self.add_comment_command
            .execute(|| async move {
                let api = self.services.api.as_ref();
                let comment_id = api.add_comment(&self.key, text).await?;
                let comment = api.get_comment(&self.key, comment_id).await?;
                self.comments.push(comment);
                Ok(())
            })
            .await
    }

    /// Detach from the screen. Later writes from in-flight commands are ignored.
    pub fn dispose(&self) {
        self.pull_request.dispose();
        self.comments.dispose();
    }
}

fn state_is_open(pr: &PullRequest) -> bool {
    PullRequestState::from_field(pr.state.as_deref()) == PullRequestState::Open
}

fn approved_by(pr: &PullRequest, username: Option<&str>) -> bool {
    let Some(username) = username else {
        return false;
    };
    let username = username.to_lowercase();
    pr.participants()
        .iter()
        .find(|p| p.username().is_some_and(|u| u.to_lowercase() == username))
        .is_some_and(|p| p.approved)
}

fn render_description(pr: &PullRequest, markdown: &dyn MarkdownRenderer) -> Option<String> {
    pr.description
        .as_deref()
        .filter(|d| !d.is_empty())
        .map(|d| markdown.render(d))
}

fn approval_items(pr: &PullRequest, navigator: &Arc<dyn Navigator>) -> Vec<UserItem> {
    pr.participants()
        .iter()
        .filter(|p| p.approved)
        .map(|p| {
            let user = p.user.clone().unwrap_or_default();
            UserItem::new(
                user.username.clone(),
                user.display_name.clone(),
                Avatar::new(user.avatar_url()),
                Arc::clone(navigator),
            )
        })
        .collect()
}

fn comment_item(comment: &Comment, markdown: &dyn MarkdownRenderer) -> CommentItem {
    let user = comment.user.clone().unwrap_or_default();
    let content = match comment.raw() {
        "" => comment.content.html.clone().unwrap_or_default(),
        raw => markdown.render(raw),
    };
    CommentItem {
        id: comment.id,
        author: user.label().to_string(),
        avatar: Avatar::new(user.avatar_url()),
        created: humanize(comment.created_on, Utc::now()),
        created_on: comment.created_on,
        content,
    }
}

#[cfg(test)]
#[path = "tests/pull_request_tests.rs"]
mod tests;
