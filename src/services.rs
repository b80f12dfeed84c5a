pub mod bitbucket;
pub mod markdown;
pub mod menu;
pub mod navigation;
pub mod search;
pub mod session;

pub use bitbucket::{comment_pages, fetch_all_comments, BitbucketApi, HttpBitbucketClient};
pub use markdown::{HtmlMarkdown, MarkdownRenderer, TerminalMarkdown};
pub use menu::{ActionMenu, ChannelActionMenu, MenuAction, MenuAnchor, MenuRequest};
pub use navigation::{ChannelNavigator, Navigator, Screen};
pub use search::filter_comments;
pub use session::{AccountProvider, StaticAccount};
