use std::sync::Mutex;

use tokio::sync::watch;

use super::{lock, Derived};

type Mapper<S, D> = Box<dyn Fn(&S) -> D + Send + Sync>;

struct ListInner<D> {
    items: Vec<D>,
    disposed: bool,
}

/// Read-only, auto-updating projection of an ordered collection.
///
/// Items are mapped once, when they enter the list; later mutations never
/// remap existing entries.
pub struct DerivedList<S, D> {
    inner: Mutex<ListInner<D>>,
    map: Mapper<S, D>,
    count: Derived<usize>,
    version: watch::Sender<u64>,
}

impl<S, D> DerivedList<S, D>
where
    D: Clone + Send + Sync + 'static,
{
    pub fn new(map: impl Fn(&S) -> D + Send + Sync + 'static) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Mutex::new(ListInner {
                items: Vec::new(),
                disposed: false,
            }),
            map: Box::new(map),
            count: Derived::new(0),
            version,
        }
    }

    pub fn replace_all(&self, items: impl IntoIterator<Item = S>) {
        let mapped: Vec<D> = items.into_iter().map(|s| (self.map)(&s)).collect();
        self.mutate(|list| *list = mapped);
    }

    pub fn push(&self, item: S) {
        let mapped = (self.map)(&item);
        self.mutate(|list| list.push(mapped));
    }

    pub fn clear(&self) {
        self.mutate(Vec::clear);
    }

    pub fn items(&self) -> Vec<D> {
        lock(&self.inner).items.clone()
    }

    pub fn get(&self, index: usize) -> Option<D> {
        lock(&self.inner).items.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self) -> Derived<usize> {
        self.count.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn dispose(&self) {
        lock(&self.inner).disposed = true;
    }

    fn mutate(&self, f: impl FnOnce(&mut Vec<D>)) {
        {
            let mut inner = lock(&self.inner);
            if inner.disposed {
                return;
            }
            f(&mut inner.items);
            self.count.set(inner.items.len());
        }
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn doubled() -> (DerivedList<u32, u32>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let list = DerivedList::new(move |n: &u32| {
            counter.fetch_add(1, Ordering::SeqCst);
            n * 2
        });
        (list, calls)
    }

    #[test]
    fn replace_all_discards_previous_items() {
        let (list, _) = doubled();
        list.replace_all([1, 2, 3]);
        list.replace_all([5]);
        assert_eq!(list.items(), vec![10]);
        assert_eq!(list.count().get(), 1);
    }

    #[test]
    fn push_appends_and_updates_count() {
        let (list, _) = doubled();
        let count = list.count();
        list.replace_all([3, 1]);
        assert_eq!(count.get(), 2);

        list.push(2);
        assert_eq!(list.items(), vec![6, 2, 4]);
        assert_eq!(count.get(), 3);
        assert_eq!(list.get(2), Some(4));
    }

    #[test]
    fn existing_items_are_not_remapped() {
        let (list, calls) = doubled();
        list.replace_all([1, 2]);
        list.push(3);
        list.push(4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn clear_empties_the_list() {
        let (list, _) = doubled();
        list.replace_all([1, 2]);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.count().get(), 0);
    }

    #[test]
    fn disposed_list_ignores_mutations() {
        let (list, _) = doubled();
        list.push(1);
        list.dispose();
        list.push(2);
        list.replace_all([7, 8, 9]);
        assert_eq!(list.items(), vec![2]);
        assert_eq!(list.count().get(), 1);
    }

    #[tokio::test]
    async fn subscribers_are_notified_per_mutation() {
        let (list, _) = doubled();
        let mut rx = list.subscribe();
        list.push(1);
        rx.changed().await.expect("list dropped");
        assert_eq!(*rx.borrow_and_update(), 1);
        list.clear();
        rx.changed().await.expect("list dropped");
        assert_eq!(*rx.borrow(), 2);
    }
}
