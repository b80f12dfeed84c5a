pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod icons;
pub mod reactive;
pub mod services;
pub mod utils;
pub mod view;
pub mod viewmodels;

pub use app::{update, Action, App, Command, CommandOutcome, Confirm, Message};
pub use data::{CommentItem, MergeOptions, PullRequest, PullRequestKey, UserItem};
pub use error::{Error, Result};
pub use view::ui;
pub use viewmodels::{PullRequestViewModel, ViewModelServices};
