pub mod message;
pub mod model;
pub mod update;

pub use message::{Action, Command, CommandOutcome, Confirm, Message};
pub use model::{App, MenuState};
pub use update::update;
