use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::services::navigation::{Navigator, Screen};

/// Identifies a pull request: `owner/repo#id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PullRequestKey {
    pub owner: String,
    pub repo: String,
    pub id: u64,
}

impl PullRequestKey {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, id: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            id,
        }
    }
}

impl fmt::Display for PullRequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.id)
    }
}

// Pull request state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestState {
    Open,
    Merged,
    Declined,
    Superseded,
    Unknown,
}

impl PullRequestState {
    pub fn from_field(state: Option<&str>) -> Self {
        state.map_or(PullRequestState::Unknown, |s| s.parse().unwrap_or(PullRequestState::Unknown))
    }

    pub fn display(self) -> (&'static str, ratatui::style::Color) {
        use ratatui::style::Color;
        match self {
            PullRequestState::Open => (crate::icons::STATE_OPEN_DISPLAY, Color::Green),
            PullRequestState::Merged => (crate::icons::STATE_MERGED_DISPLAY, Color::Magenta),
            PullRequestState::Declined => (crate::icons::STATE_DECLINED_DISPLAY, Color::Red),
            PullRequestState::Superseded => ("Superseded", Color::DarkGray),
            PullRequestState::Unknown => ("Unknown", Color::DarkGray),
        }
    }
}

impl FromStr for PullRequestState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_uppercase().as_str() {
            "OPEN" => PullRequestState::Open,
            "MERGED" => PullRequestState::Merged,
            "DECLINED" => PullRequestState::Declined,
            "SUPERSEDED" => PullRequestState::Superseded,
            _ => PullRequestState::Unknown,
        })
    }
}

/// Avatar image reference; loading the image is up to the front-end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Avatar {
    pub url: Option<String>,
}

impl Avatar {
    pub fn new(url: Option<&str>) -> Self {
        Self {
            url: url.map(str::to_string),
        }
    }
}

/// A comment as displayed in the conversation list.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentItem {
    pub id: u64,
    pub author: String,
    pub avatar: Avatar,
    pub created: String,
    pub created_on: DateTime<Utc>,
    pub content: String,
}

/// A user as displayed in the approvals row. Selecting it opens the profile.
#[derive(Clone)]
pub struct UserItem {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar: Avatar,
    navigator: Arc<dyn Navigator>,
}

impl UserItem {
    pub fn new(
        username: Option<String>,
        display_name: Option<String>,
        avatar: Avatar,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            username,
            display_name,
            avatar,
            navigator,
        }
    }

    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("Unknown")
    }

    /// Navigate to this user's profile. Returns `false` when the user has no username.
    pub fn go_to(&self) -> bool {
        match &self.username {
            Some(username) => {
                self.navigator.navigate(Screen::User {
                    username: username.clone(),
                });
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for UserItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserItem")
            .field("username", &self.username)
            .field("display_name", &self.display_name)
            .field("avatar", &self.avatar)
            .finish()
    }
}

impl PartialEq for UserItem {
    fn eq(&self, other: &Self) -> bool {
        self.username == other.username
            && self.display_name == other.display_name
            && self.avatar == other.avatar
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    MergeCommit,
    Squash,
    FastForward,
}

/// Body of the Bitbucket `merge` call. Unset fields use the repository defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_source_branch: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_strategy: Option<MergeStrategy>,
}
