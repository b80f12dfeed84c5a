pub mod models;
pub mod types;

pub use models::{
    Branch, Comment, CommentContent, CommitRef, Endpoint, InlineAnchor, Link, Paged, Participant,
    PullRequest, PullRequestLinks, RepositoryRef, User, UserLinks,
};
pub use types::{
    Avatar, CommentItem, MergeOptions, MergeStrategy, PullRequestKey, PullRequestState, UserItem,
};

pub use crate::icons::SPINNER_FRAMES;
