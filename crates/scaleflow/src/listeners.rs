//! Subscriber list with copy-on-write snapshots.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use uuid::Uuid;

use crate::action::Action;

/// Callback notified with every action that reaches the base dispatch.
pub type Listener = Arc<dyn Fn(&Action) + Send + Sync>;

/// Box a closure as a [`Listener`], e.g. to register it as a capability.
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&Action) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Clone)]
struct Entry {
    id: Uuid,
    listener: Listener,
}

/// The live list is an `Arc<Vec<_>>`. A notification pass clones the `Arc`
/// once and iterates that snapshot; mutations go through `Arc::make_mut`,
/// which copies the vector only while a snapshot is still alive.
#[derive(Default)]
pub(crate) struct ListenerList {
    next: Mutex<Arc<Vec<Entry>>>,
}

impl ListenerList {
    fn live(&self) -> MutexGuard<'_, Arc<Vec<Entry>>> {
        self.next.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Arc<Vec<Entry>> {
        Arc::clone(&self.live())
    }

    /// Invoke every listener registered when the pass starts, in order.
    /// Returns how many were notified.
    pub(crate) fn notify(&self, action: &Action) -> usize {
        let snapshot = self.snapshot();
        for entry in snapshot.iter() {
            (entry.listener)(action);
        }
        snapshot.len()
    }

    pub(crate) fn add(self: &Arc<Self>, listener: Listener) -> Unsubscribe {
        let id = Uuid::new_v4();
        Arc::make_mut(&mut self.live()).push(Entry { id, listener });
        tracing::debug!(subscription = %id, "listener subscribed");

        Unsubscribe {
            id,
            list: Arc::downgrade(self),
            subscribed: Arc::new(AtomicBool::new(true)),
        }
    }

    fn remove(&self, id: Uuid) {
        let mut live = self.live();
        if let Some(index) = live.iter().position(|entry| entry.id == id) {
            Arc::make_mut(&mut live).remove(index);
            tracing::debug!(subscription = %id, "listener unsubscribed");
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.live().len()
    }
}

impl fmt::Debug for ListenerList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerList").field("len", &self.len()).finish()
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping it does not unsubscribe. Clones share state, so the listener is
/// removed once no matter how many clones call [`unsubscribe`](Self::unsubscribe).
#[derive(Clone)]
pub struct Unsubscribe {
    id: Uuid,
    list: Weak<ListenerList>,
    subscribed: Arc<AtomicBool>,
}

impl Unsubscribe {
    /// Remove this subscription. Later calls are no-ops.
    pub fn unsubscribe(&self) {
        if !self.subscribed.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(list) = self.list.upgrade() {
            list.remove(self.id);
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::Acquire)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("id", &self.id)
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}
