use std::sync::mpsc::Sender;

use crate::data::PullRequestKey;

/// A destination the front-end can transition to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    PullRequestCommits(PullRequestKey),
    User { username: String },
    WebBrowser { url: String },
}

impl Screen {
    /// Web page showing the same content, for front-ends that hand off to a browser.
    pub fn web_url(&self, web_base: &str) -> String {
        let base = web_base.trim_end_matches('/');
        match self {
            Screen::PullRequestCommits(key) => format!(
                "{}/{}/{}/pull-requests/{}/commits",
                base,
                urlencoding::encode(&key.owner),
                urlencoding::encode(&key.repo),
                key.id
            ),
            Screen::User { username } => format!("{}/{}/", base, urlencoding::encode(username)),
            Screen::WebBrowser { url } => url.clone(),
        }
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, screen: Screen);
}

/// Forwards navigation requests to the UI loop.
pub struct ChannelNavigator {
    tx: Sender<Screen>,
}

impl ChannelNavigator {
    pub fn new(tx: Sender<Screen>) -> Self {
        Self { tx }
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, screen: Screen) {
        if self.tx.send(screen).is_err() {
            tracing::debug!("navigation dropped, UI loop has exited");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn web_urls() {
        let commits = Screen::PullRequestCommits(PullRequestKey::new("team", "my app", 3));
        assert_eq!(
            commits.web_url("https://bitbucket.org/"),
            "https://bitbucket.org/team/my%20app/pull-requests/3/commits"
        );
        let user = Screen::User {
            username: "alice".into(),
        };
        assert_eq!(user.web_url("https://bitbucket.org"), "https://bitbucket.org/alice/");
        let web = Screen::WebBrowser {
            url: "https://x/y".into(),
        };
        assert_eq!(web.web_url("https://bitbucket.org"), "https://x/y");
    }

    #[test]
    fn channel_navigator_forwards_screens() {
        let (tx, rx) = mpsc::channel();
        let navigator = ChannelNavigator::new(tx);
        navigator.navigate(Screen::User {
            username: "bob".into(),
        });
        assert_eq!(
            rx.try_recv().unwrap(),
            Screen::User {
                username: "bob".into()
            }
        );

        drop(rx);
        navigator.navigate(Screen::User {
            username: "ignored".into(),
        });
    }
}
