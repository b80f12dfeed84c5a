use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reactive::FieldSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserLinks {
    pub avatar: Option<Link>,
    pub html: Option<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub nickname: Option<String>,
    pub uuid: Option<String>,
    pub links: Option<UserLinks>,
}

impl User {
    pub fn named(username: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            ..Self::default()
        }
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.links.as_ref()?.avatar.as_ref()?.href.as_deref()
    }

    /// Display name, then username, then "Unknown".
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub user: Option<User>,
    pub role: Option<String>,
    #[serde(default)]
    pub approved: bool,
}

impl Participant {
    pub fn username(&self) -> Option<&str> {
        self.user.as_ref()?.username.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub full_name: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitRef {
    pub hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub branch: Option<Branch>,
    pub repository: Option<RepositoryRef>,
    pub commit: Option<CommitRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequestLinks {
    pub html: Option<Link>,
    #[serde(rename = "self")]
    pub api: Option<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub state: Option<String>,
    pub author: Option<User>,
    pub source: Option<Endpoint>,
    pub destination: Option<Endpoint>,
    pub participants: Option<Vec<Participant>>,
    pub links: Option<PullRequestLinks>,
    pub created_on: Option<DateTime<Utc>>,
    pub updated_on: Option<DateTime<Utc>>,
    pub comment_count: Option<u64>,
    pub close_source_branch: Option<bool>,
    pub merge_commit: Option<CommitRef>,
}

impl PullRequest {
    pub const STATE: FieldSet = FieldSet::field(0);
    pub const DESCRIPTION: FieldSet = FieldSet::field(1);
    pub const PARTICIPANTS: FieldSet = FieldSet::field(2);
    pub const LINKS: FieldSet = FieldSet::field(3);
    pub const SOURCE: FieldSet = FieldSet::field(4);

    pub fn html_url(&self) -> Option<&str> {
        self.links.as_ref()?.html.as_ref()?.href.as_deref()
    }

    pub fn source_repository(&self) -> Option<&RepositoryRef> {
        self.source.as_ref()?.repository.as_ref()
    }

    pub fn source_branch(&self) -> Option<&str> {
        Some(self.source.as_ref()?.branch.as_ref()?.name.as_str())
    }

    pub fn destination_branch(&self) -> Option<&str> {
        Some(self.destination.as_ref()?.branch.as_ref()?.name.as_str())
    }

    /// Participants, treating an absent collection as empty.
    pub fn participants(&self) -> &[Participant] {
        self.participants.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentContent {
    pub raw: Option<String>,
    pub markup: Option<String>,
    pub html: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineAnchor {
    pub path: String,
    pub from: Option<u64>,
    pub to: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub content: CommentContent,
    pub user: Option<User>,
    pub created_on: DateTime<Utc>,
    pub updated_on: Option<DateTime<Utc>>,
    pub inline: Option<InlineAnchor>,
    #[serde(default)]
    pub deleted: bool,
}

impl Comment {
    pub fn raw(&self) -> &str {
        self.content.raw.as_deref().unwrap_or_default()
    }

    /// Top-level comments with content are shown in the conversation.
    pub fn is_visible(&self) -> bool {
        self.inline.is_none() && !self.raw().is_empty()
    }
}

/// One page of a Bitbucket collection response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    pub next: Option<String>,
    pub page: Option<u32>,
    pub pagelen: Option<u32>,
    pub size: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_bitbucket_pull_request() {
        let json = r#"{
            "id": 42,
            "title": "Add parser",
            "description": "Fixes **everything**",
            "state": "OPEN",
            "author": {"username": "alice", "display_name": "Alice A",
                       "links": {"avatar": {"href": "https://a/alice.png"}}},
            "source": {"branch": {"name": "feature"}, "repository": {"full_name": "alice/app"}},
            "destination": {"branch": {"name": "main"}, "repository": {"full_name": "team/app"}},
            "participants": [{"user": {"username": "bob"}, "role": "REVIEWER", "approved": true}],
            "links": {"html": {"href": "https://bitbucket.org/team/app/pull-requests/42"},
                      "self": {"href": "https://api.bitbucket.org/2.0/repositories/team/app/pullrequests/42"}},
            "created_on": "2013-11-05T23:59:26.480984+00:00"
        }"#;

        let pr: PullRequest = serde_json::from_str(json).unwrap();
        assert_eq!(pr.id, 42);
        assert_eq!(pr.source_branch(), Some("feature"));
        assert_eq!(pr.destination_branch(), Some("main"));
        assert_eq!(pr.source_repository().unwrap().full_name, "alice/app");
        assert_eq!(
            pr.html_url(),
            Some("https://bitbucket.org/team/app/pull-requests/42")
        );
        assert_eq!(pr.author.as_ref().unwrap().avatar_url(), Some("https://a/alice.png"));
        assert!(pr.participants()[0].approved);
    }

    #[test]
    fn deleted_source_repository_decodes_as_none() {
        let pr: PullRequest =
            serde_json::from_str(r#"{"id": 1, "source": {"branch": {"name": "x"}, "repository": null}}"#)
                .unwrap();
        assert!(pr.source_repository().is_none());
        assert!(pr.participants().is_empty());
    }

    #[test]
    fn comment_visibility() {
        let json = r#"{"id": 7, "content": {"raw": "hi"}, "created_on": "2020-01-01T00:00:00Z",
                       "inline": {"path": "src/lib.rs", "to": 3}}"#;
        let inline: Comment = serde_json::from_str(json).unwrap();
        assert!(!inline.is_visible());

        let empty: Comment =
            serde_json::from_str(r#"{"id": 8, "content": {"raw": ""}, "created_on": "2020-01-01T00:00:00Z"}"#)
                .unwrap();
        assert!(!empty.is_visible());

        let plain: Comment =
            serde_json::from_str(r#"{"id": 9, "content": {"raw": "ok"}, "created_on": "2020-01-01T00:00:00Z"}"#)
                .unwrap();
        assert!(plain.is_visible());
    }

    #[test]
    fn user_label_falls_back() {
        let mut user = User::named("carol");
        assert_eq!(user.label(), "carol");
        user.display_name = Some("Carol C".into());
        assert_eq!(user.label(), "Carol C");
        assert_eq!(User::default().label(), "Unknown");
    }
}
