use std::ops::BitOr;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;

use super::lock;

/// Publication gate shared by a cell and its derived values. Writers publish
/// a whole batch of derived values under the write side; readers take the
/// read side, so a batch is observed entirely or not at all.
type Gate = Arc<RwLock<()>>;

fn read_gate(gate: &RwLock<()>) -> RwLockReadGuard<'_, ()> {
    gate.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_gate(gate: &RwLock<()>) -> RwLockWriteGuard<'_, ()> {
    gate.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A set of root-record fields, used as the dependency set of a derived property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldSet(u64);

impl FieldSet {
    pub const EMPTY: FieldSet = FieldSet(0);
    pub const ALL: FieldSet = FieldSet(u64::MAX);

    pub const fn field(index: u32) -> Self {
        FieldSet(1 << index)
    }

    pub const fn union(self, other: FieldSet) -> Self {
        FieldSet(self.0 | other.0)
    }

    pub const fn intersects(self, other: FieldSet) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for FieldSet {
    type Output = FieldSet;

    fn bitor(self, rhs: FieldSet) -> FieldSet {
        self.union(rhs)
    }
}

/// Read handle over a value recomputed by a [`RootCell`] or [`super::DerivedList`].
pub struct Derived<T> {
    value: Arc<watch::Sender<T>>,
    gate: Gate,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<T: Clone> Derived<T> {
    pub(crate) fn new(initial: T) -> Self {
        Self::gated(initial, Gate::default())
    }

    fn gated(initial: T, gate: Gate) -> Self {
        let (value, _) = watch::channel(initial);
        Self {
            value: Arc::new(value),
            gate,
        }
    }

    pub(crate) fn set(&self, value: T) {
        let _publishing = write_gate(&self.gate);
        self.value.send_replace(value);
    }

    pub fn get(&self) -> T {
        let _reading = read_gate(&self.gate);
        self.value.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.value.subscribe()
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Derived").field(&*self.value.borrow()).finish()
    }
}

/// A recomputed value waiting to be published.
type Staged = Box<dyn FnOnce() + Send>;

type Recompute<R> = Box<dyn Fn(&R) -> Staged + Send + Sync>;

struct Slot<R> {
    name: &'static str,
    deps: FieldSet,
    recompute: Recompute<R>,
}

struct Inner<R> {
    value: Option<R>,
    slots: Vec<Slot<R>>,
    disposed: bool,
}

impl<R> Inner<R> {
    /// Run the projections depending on `changed` against `root` without
    /// publishing anything.
    fn stage(&self, root: &R, changed: FieldSet) -> Vec<Staged> {
        self.slots
            .iter()
            .filter(|s| s.deps.intersects(changed))
            .map(|slot| {
                tracing::trace!(property = slot.name, "recomputing derived property");
                (slot.recompute)(root)
            })
            .collect()
    }
}

/// Mutable root field with synchronously recomputed derived properties.
///
/// A write first computes every affected derived property against the new
/// root, then swaps the root and publishes all of them in one step. Readers
/// on other threads see either the old root with its old derived values or
/// the new root with its new ones. The change version is bumped afterwards,
/// so a subscriber woken by [`RootCell::subscribe`] always reads derived
/// values that match the root it was woken for.
pub struct RootCell<R> {
    inner: Mutex<Inner<R>>,
    gate: Gate,
    version: watch::Sender<u64>,
}

/// Consistent view over several derived values of one [`RootCell`].
pub struct Snapshot<'a> {
    gate: &'a Gate,
    _reading: RwLockReadGuard<'a, ()>,
}

impl Snapshot<'_> {
    /// Read a derived value registered on the same cell.
    pub fn get<T: Clone>(&self, derived: &Derived<T>) -> T {
        debug_assert!(Arc::ptr_eq(self.gate, &derived.gate));
        derived.value.borrow().clone()
    }
}

impl<R: Clone + Send + Sync + 'static> RootCell<R> {
    pub fn new(initial: Option<R>) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Mutex::new(Inner {
                value: initial,
                slots: Vec::new(),
                disposed: false,
            }),
            gate: Gate::default(),
            version,
        }
    }

    /// Register a derived property. It holds `default` until a root exists.
    pub fn derive<T, F>(
        &self,
        name: &'static str,
        deps: FieldSet,
        default: T,
        projection: F,
    ) -> Derived<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&R) -> T + Send + Sync + 'static,
    {
        let mut inner = lock(&self.inner);
        let initial = inner.value.as_ref().map(&projection).unwrap_or(default);
        let derived = Derived::gated(initial, Arc::clone(&self.gate));
        let target = derived.clone();
        inner.slots.push(Slot {
            name,
            deps,
            recompute: Box::new(move |root: &R| -> Staged {
                let value = projection(root);
                let target = target.clone();
                Box::new(move || {
                    target.value.send_replace(value);
                })
            }),
        });
        derived
    }

    pub fn get(&self) -> Option<R> {
        lock(&self.inner).value.clone()
    }

    /// Replace the whole snapshot. Returns `false` once disposed.
    pub fn replace(&self, value: R) -> bool {
        {
            let mut inner = lock(&self.inner);
            if inner.disposed {
                tracing::debug!("ignoring write to disposed root");
                return false;
            }
            let staged = inner.stage(&value, FieldSet::ALL);
            let _publishing = write_gate(&self.gate);
            inner.value = Some(value);
            staged.into_iter().for_each(|publish| publish());
        }
        self.version.send_modify(|v| *v += 1);
        true
    }

    /// Mutate fields of the current snapshot in place. Only derived properties
    /// depending on `fields` are recomputed.
    pub fn modify(&self, fields: FieldSet, f: impl FnOnce(&mut R)) -> bool {
        {
            let mut inner = lock(&self.inner);
            if inner.disposed {
                return false;
            }
            let Some(mut root) = inner.value.clone() else {
                return false;
            };
            f(&mut root);
            let staged = inner.stage(&root, fields);
            let _publishing = write_gate(&self.gate);
            inner.value = Some(root);
            staged.into_iter().for_each(|publish| publish());
        }
        self.version.send_modify(|v| *v += 1);
        true
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// Hold off writers while reading several derived values together.
    ///
    /// Do not call [`RootCell::get`] or [`Derived::get`] on the same cell
    /// while the snapshot is alive.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            gate: &self.gate,
            _reading: read_gate(&self.gate),
        }
    }

    pub fn dispose(&self) {
        lock(&self.inner).disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.inner).disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct Record {
        state: String,
        tags: Vec<String>,
    }

    const STATE: FieldSet = FieldSet::field(0);
    const TAGS: FieldSet = FieldSet::field(1);

    #[test]
    fn field_sets_combine() {
        let both = STATE | TAGS;
        assert!(both.intersects(STATE));
        assert!(both.intersects(TAGS));
        assert!(!STATE.intersects(TAGS));
        assert!(FieldSet::ALL.intersects(TAGS));
        assert!(!FieldSet::EMPTY.intersects(FieldSet::ALL));
    }

    #[test]
    fn derived_holds_default_until_root_is_set() {
        let cell: RootCell<Record> = RootCell::new(None);
        let count = cell.derive("tag_count", TAGS, None, |r| Some(r.tags.len()));
        assert_eq!(count.get(), None);

        cell.replace(Record {
            state: "open".into(),
            tags: vec!["a".into(), "b".into()],
        });
        assert_eq!(count.get(), Some(2));
    }

    #[test]
    fn derive_on_populated_root_computes_immediately() {
        let cell = RootCell::new(Some(Record {
            state: "merged".into(),
            tags: Vec::new(),
        }));
        let state = cell.derive("state", STATE, String::new(), |r| r.state.clone());
        assert_eq!(state.get(), "merged");
    }

    #[test]
    fn replace_recomputes_every_property_even_when_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cell: RootCell<Record> = RootCell::new(None);
        let counter = Arc::clone(&calls);
        let _state = cell.derive("state", STATE, String::new(), move |r| {
            counter.fetch_add(1, Ordering::SeqCst);
            r.state.clone()
        });

        let record = Record {
            state: "open".into(),
            tags: Vec::new(),
        };
        cell.replace(record.clone());
        cell.replace(record);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn modify_only_touches_dependent_properties() {
        let state_calls = Arc::new(AtomicUsize::new(0));
        let cell = RootCell::new(Some(Record::default()));
        let counter = Arc::clone(&state_calls);
        let _state = cell.derive("state", STATE, String::new(), move |r| {
            counter.fetch_add(1, Ordering::SeqCst);
            r.state.clone()
        });
        let tags = cell.derive("tags", TAGS, 0, |r| r.tags.len());
        let before = state_calls.load(Ordering::SeqCst);

        assert!(cell.modify(TAGS, |r| r.tags.push("x".into())));
        assert_eq!(tags.get(), 1);
        assert_eq!(state_calls.load(Ordering::SeqCst), before);
    }

    #[test]
    fn modify_without_root_is_a_no_op() {
        let cell: RootCell<Record> = RootCell::new(None);
        assert!(!cell.modify(TAGS, |r| r.tags.clear()));
        assert_eq!(*cell.subscribe().borrow(), 0);
    }

    #[test]
    fn writes_after_dispose_are_ignored() {
        let cell: RootCell<Record> = RootCell::new(None);
        let state = cell.derive("state", STATE, String::from("none"), |r| r.state.clone());
        cell.dispose();

        assert!(!cell.replace(Record {
            state: "open".into(),
            tags: Vec::new(),
        }));
        assert!(cell.is_disposed());
        assert!(cell.get().is_none());
        assert_eq!(state.get(), "none");
    }

    #[test]
    fn replacement_stays_hidden_until_every_projection_finishes() {
        use std::sync::mpsc;

        let (entered_tx, entered_rx) = mpsc::channel::<()>();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let hold = Mutex::new(Some((entered_tx, release_rx)));

        let cell = Arc::new(RootCell::new(Some(Record {
            state: "declined".into(),
            tags: vec!["a".into()],
        })));
        let state = cell.derive("state", STATE, String::new(), |r: &Record| r.state.clone());
        let tags = cell.derive("tags", TAGS, 0, move |r: &Record| {
            if r.state == "open" {
                if let Some((entered, release)) = hold.lock().unwrap().take() {
                    entered.send(()).unwrap();
                    release.recv().unwrap();
                }
            }
            r.tags.len()
        });

        let writer = {
            let cell = Arc::clone(&cell);
            std::thread::spawn(move || {
                cell.replace(Record {
                    state: "open".into(),
                    tags: vec!["a".into(), "b".into(), "c".into()],
                })
            })
        };
        entered_rx.recv().unwrap();

        assert_eq!(state.get(), "declined");
        assert_eq!(tags.get(), 1);
        {
            let snapshot = cell.snapshot();
            assert_eq!(snapshot.get(&state), "declined");
            assert_eq!(snapshot.get(&tags), 1);
        }

        release_tx.send(()).unwrap();
        assert!(writer.join().unwrap());
        assert_eq!(state.get(), "open");
        assert_eq!(tags.get(), 3);
        assert_eq!(*cell.subscribe().borrow(), 1);
    }

    #[tokio::test]
    async fn subscribers_observe_consistent_derived_values() {
        let cell = Arc::new(RootCell::new(None));
        let state = cell.derive("state", STATE, String::new(), |r: &Record| r.state.clone());
        let mut rx = cell.subscribe();

        let writer = Arc::clone(&cell);
        tokio::spawn(async move {
            writer.replace(Record {
                state: "declined".into(),
                tags: Vec::new(),
            });
        });

        rx.changed().await.expect("cell dropped");
        assert_eq!(*rx.borrow(), 1);
        assert_eq!(state.get(), "declined");
    }
}
