pub mod components;
pub mod ui;

pub use ui::{max_scroll, ui};
