pub mod command;
pub mod list;
pub mod root;

pub use command::ReactiveCommand;
pub use list::DerivedList;
pub use root::{Derived, FieldSet, RootCell, Snapshot};

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
