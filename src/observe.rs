//! Observable ordered collections backing the in-memory mirrors.
//!
//! An [`ObservableList`] is an ordered container of cloneable entries
//! with explicit publish/subscribe: [`subscribe`](ObservableList::subscribe)
//! registers a listener and returns a [`Subscription`] handle whose
//! [`unsubscribe`](Subscription::unsubscribe) removes it. Every committed
//! structural mutation notifies all listeners synchronously with a
//! snapshot of the new contents -- one mutation, one notification, no
//! batching.
//!
//! Listeners are invoked after the internal lock is released, so a
//! listener may re-enter the list for reads. Mutation from inside a
//! listener is not supported and may deadlock; all writes must be routed
//! through the owning domain store anyway.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Listener invoked with a snapshot after each committed mutation.
type Listener<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

struct Inner<T> {
    items: Vec<T>,
    listeners: Vec<(u64, Listener<T>)>,
    next_listener_id: u64,
}

/// An ordered, observable collection of cloneable entries.
///
/// `Clone` is cheap -- clones share the same underlying list, which is
/// how a domain store and its subscribers see one consistent mirror.
pub struct ObservableList<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Recover the guard from a poisoned lock. A poisoned mirror only means
/// some listener panicked mid-notification; the data itself is intact.
fn lock<T>(inner: &Mutex<Inner<T>>) -> MutexGuard<'_, Inner<T>> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

impl<T: Clone + Send + Sync + 'static> ObservableList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                items: Vec::new(),
                listeners: Vec::new(),
                next_listener_id: 0,
            })),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        lock(&self.inner).items.len()
    }

    /// Returns `true` if the list holds no entries.
    pub fn is_empty(&self) -> bool {
        lock(&self.inner).items.is_empty()
    }

    /// Clone out the current contents.
    pub fn snapshot(&self) -> Vec<T> {
        lock(&self.inner).items.clone()
    }

    /// First entry, if any.
    pub fn first(&self) -> Option<T> {
        lock(&self.inner).items.first().cloned()
    }

    /// Synchronous lookup over the in-memory contents only.
    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<T> {
        lock(&self.inner).items.iter().find(|t| predicate(t)).cloned()
    }

    /// Register a listener. Returns a handle that removes the listener
    /// when [`unsubscribe`](Subscription::unsubscribe) is called;
    /// dropping the handle leaves the listener registered.
    pub fn subscribe(&self, listener: impl Fn(&[T]) + Send + Sync + 'static) -> Subscription<T> {
        let mut inner = lock(&self.inner);
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.listeners.push((id, Arc::new(listener)));
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Replace the entire contents. Always notifies, even when the new
    /// contents equal the old -- a refresh is a structural event.
    pub fn replace_all(&self, items: Vec<T>) {
        let (snapshot, listeners) = {
            let mut inner = lock(&self.inner);
            inner.items = items;
            (inner.items.clone(), inner.active_listeners())
        };
        notify(&snapshot, &listeners);
    }

    /// Append an entry and notify.
    pub fn push(&self, item: T) {
        let (snapshot, listeners) = {
            let mut inner = lock(&self.inner);
            inner.items.push(item);
            (inner.items.clone(), inner.active_listeners())
        };
        notify(&snapshot, &listeners);
    }

    /// Remove the first entry matching the predicate. Returns the removed
    /// entry; notifies only if something was removed.
    pub fn remove_where(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<T> {
        let (removed, snapshot, listeners) = {
            let mut inner = lock(&self.inner);
            let pos = inner.items.iter().position(|t| predicate(t))?;
            let removed = inner.items.remove(pos);
            (removed, inner.items.clone(), inner.active_listeners())
        };
        notify(&snapshot, &listeners);
        Some(removed)
    }

    /// Mutate the first entry matching the predicate in place. Returns a
    /// clone of the updated entry; notifies only if a match was found.
    pub fn update_where(
        &self,
        mut predicate: impl FnMut(&T) -> bool,
        mutate: impl FnOnce(&mut T),
    ) -> Option<T> {
        let (updated, snapshot, listeners) = {
            let mut inner = lock(&self.inner);
            let pos = inner.items.iter().position(|t| predicate(t))?;
            mutate(&mut inner.items[pos]);
            let updated = inner.items[pos].clone();
            (updated, inner.items.clone(), inner.active_listeners())
        };
        notify(&snapshot, &listeners);
        Some(updated)
    }

    /// Remove all entries and notify.
    pub fn clear(&self) {
        let (snapshot, listeners) = {
            let mut inner = lock(&self.inner);
            inner.items.clear();
            (inner.items.clone(), inner.active_listeners())
        };
        notify(&snapshot, &listeners);
    }
}

impl<T> Inner<T> {
    fn active_listeners(&self) -> Vec<Listener<T>> {
        self.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
    }
}

fn notify<T>(snapshot: &[T], listeners: &[Listener<T>]) {
    for listener in listeners {
        listener(snapshot);
    }
}

/// Handle returned by [`ObservableList::subscribe`].
///
/// Calling [`unsubscribe`](Subscription::unsubscribe) removes the
/// listener. Dropping the handle without calling it leaves the listener
/// active for the lifetime of the list.
pub struct Subscription<T> {
    id: u64,
    inner: Weak<Mutex<Inner<T>>>,
}

impl<T> Subscription<T> {
    /// Remove the listener this handle refers to. Safe to call after the
    /// list itself has been dropped.
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            lock(&inner).listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
