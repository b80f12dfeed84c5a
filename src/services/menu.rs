use async_trait::async_trait;
use std::fmt;
use std::sync::mpsc::Sender;
use tokio::sync::oneshot;

use crate::error::{Error, Result};

/// One entry of an action sheet.
pub struct MenuAction {
    pub label: String,
    action: Box<dyn FnOnce() + Send>,
}

impl MenuAction {
    pub fn new(label: impl Into<String>, action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label: label.into(),
            action: Box::new(action),
        }
    }

    pub fn invoke(self) {
        (self.action)()
    }
}

impl fmt::Debug for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuAction").field("label", &self.label).finish()
    }
}

/// Where the menu should be presented from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MenuAnchor {
    #[default]
    Screen,
    Element(String),
}

#[async_trait]
pub trait ActionMenu: Send + Sync {
    /// Present the actions and return once the menu is dismissed. The presenter
    /// invokes the chosen action, if any.
    async fn show(&self, title: &str, anchor: MenuAnchor, actions: Vec<MenuAction>) -> Result<()>;
}

/// A menu waiting to be shown by the UI loop.
#[derive(Debug)]
pub struct MenuRequest {
    pub title: String,
    pub anchor: MenuAnchor,
    pub actions: Vec<MenuAction>,
    pub dismissed: oneshot::Sender<()>,
}

/// Hands menus to the UI loop over a channel and waits for dismissal.
pub struct ChannelActionMenu {
    tx: Sender<MenuRequest>,
}

impl ChannelActionMenu {
    pub fn new(tx: Sender<MenuRequest>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ActionMenu for ChannelActionMenu {
    async fn show(&self, title: &str, anchor: MenuAnchor, actions: Vec<MenuAction>) -> Result<()> {
        let (dismissed, on_dismiss) = oneshot::channel();
        self.tx
            .send(MenuRequest {
                title: title.to_string(),
                anchor,
                actions,
                dismissed,
            })
            .map_err(|_| Error::Presenter("menu presenter has shut down".into()))?;
        // A dropped sender means the UI went away with the menu open; treat it as dismissed.
        let _ = on_dismiss.await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc};

    #[tokio::test]
    async fn channel_menu_waits_for_dismissal() {
        let (tx, rx) = mpsc::channel::<MenuRequest>();
        let menu = ChannelActionMenu::new(tx);
        let chosen = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&chosen);

        let presenter = std::thread::spawn(move || {
            let mut request = rx.recv().expect("no menu request");
            assert_eq!(request.title, "Pull Request");
            assert_eq!(request.anchor, MenuAnchor::Element("header".into()));
            request.actions.remove(0).invoke();
            let _ = request.dismissed.send(());
        });

        menu.show(
            "Pull Request",
            MenuAnchor::Element("header".into()),
            vec![MenuAction::new("Open", move || flag.store(true, Ordering::SeqCst))],
        )
        .await
        .expect("menu failed");

        presenter.join().expect("presenter panicked");
        assert!(chosen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn closed_presenter_is_an_error() {
        let (tx, rx) = mpsc::channel::<MenuRequest>();
        drop(rx);
        let menu = ChannelActionMenu::new(tx);
        let err = menu
            .show("Menu", MenuAnchor::Screen, Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Presenter(_)));
    }
}
