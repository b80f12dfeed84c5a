pub mod git;
pub mod humanize;

pub use git::{get_current_repo, parse_bitbucket_url};
pub use humanize::humanize;
