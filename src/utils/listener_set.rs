//! Weakly held listener registry.
//!
//! [`ListenerSet<V>`] keeps every listener as a [`Weak`] reference, so it never
//! extends a listener's lifetime. Once the last `Arc` of a listener is dropped
//! the registration is skipped on dispatch and pruned lazily.
//!
//! # Ordering
//!
//! `add_listener` and `notify_listeners` are serialized by a dispatch lock:
//! a listener added while a notification is in flight observes the value that
//! is current once its registration completes, and every listener sees the
//! published values in publication order.
//!
//! # Failure Modes
//!
//! - **Re-entrant dispatch**: calling `add_listener` or `notify_listeners` on
//!   the same set from inside a listener callback deadlocks. `remove_listener`
//!   is safe to call from a callback.
//! - **Panicking listener**: the panic propagates to the caller; the set stays
//!   usable afterward.

use crate::errors::RegistryError;
use crate::utils::{Observable, Observer, lock};
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Registration<V> {
    id: ListenerId,
    observer: Weak<dyn Observer<V>>,
    /// Cleared by `remove_listener`, checked right before every invocation.
    active: Arc<AtomicBool>,
}

struct Inner<V> {
    current: V,
    registrations: Vec<Registration<V>>,
    next_id: u64,
}

impl<V> Inner<V> {
    fn prune(&mut self) -> usize {
        let before = self.registrations.len();
        self.registrations.retain(|it| it.observer.strong_count() > 0);
        before - self.registrations.len()
    }
}

pub struct ListenerSet<V> {
    dispatch: Mutex<()>,
    inner: Mutex<Inner<V>>,
}

impl<V: Default> Default for ListenerSet<V> {
    fn default() -> Self {
        Self::with_value(V::default())
    }
}

impl<V: Default> ListenerSet<V> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<V> ListenerSet<V> {
    pub fn with_value(value: V) -> Self {
        Self {
            dispatch: Mutex::new(()),
            inner: Mutex::new(Inner {
                current: value,
                registrations: Vec::new(),
                next_id: 0,
            }),
        }
    }

    /// Number of registered listeners that are still alive.
    pub fn len(&self) -> usize {
        lock(&self.inner)
            .registrations
            .iter()
            .filter(|it| it.observer.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unregisters a listener. Once this returns no new invocation of the
    /// listener starts, including the pending deliveries of a notification
    /// already running on another thread. An invocation that has already
    /// started runs to completion.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut inner = lock(&self.inner);
        match inner.registrations.iter().position(|it| it.id == id) {
            Some(index) => {
                let registration = inner.registrations.remove(index);
                registration.active.store(false, Ordering::Release);
                tracing::trace!(listener = ?id, "listener removed");
                true
            }
            None => false,
        }
    }
}

impl<V: Clone + 'static> ListenerSet<V> {
    /// Returns a clone of the current value.
    pub fn current(&self) -> V {
        lock(&self.inner).current.clone()
    }

    /// Registers `listener` and notifies it right away with the current value.
    ///
    /// A `Weak` that can no longer be upgraded (for example `Weak::new()`) is
    /// an absent listener and is rejected without touching the set.
    pub fn add_listener(
        &self,
        listener: Weak<dyn Observer<V>>,
    ) -> Result<ListenerId, RegistryError> {
        let _dispatch = lock(&self.dispatch);
        let Some(strong) = listener.upgrade() else {
            return Err(RegistryError::InvalidArgument(
                "listener is absent or has already been dropped",
            ));
        };
        let (id, value) = {
            let mut inner = lock(&self.inner);
            let pruned = inner.prune();
            if pruned > 0 {
                tracing::trace!(pruned, "pruned reclaimed listeners");
            }
            let id = ListenerId(inner.next_id);
            inner.next_id += 1;
            inner.registrations.push(Registration {
                id,
                observer: listener,
                active: Arc::new(AtomicBool::new(true)),
            });
            (id, inner.current.clone())
        };
        tracing::trace!(listener = ?id, "listener added");
        strong.notify(value);
        Ok(id)
    }

    /// Downgrades `listener` and registers it, see [`ListenerSet::add_listener`].
    pub fn add<L>(&self, listener: &Arc<L>) -> Result<ListenerId, RegistryError>
    where
        L: Observer<V> + 'static,
    {
        let weak = Arc::downgrade(listener);
        self.add_listener(weak)
    }

    /// Publishes `value` as the current value and invokes every live listener
    /// with it, in registration order. Reclaimed listeners are skipped.
    pub fn notify_listeners(&self, value: V) {
        let _dispatch = lock(&self.dispatch);
        let targets = {
            let mut inner = lock(&self.inner);
            inner.current = value.clone();
            let pruned = inner.prune();
            if pruned > 0 {
                tracing::trace!(pruned, "pruned reclaimed listeners");
            }
            inner
                .registrations
                .iter()
                .filter_map(|it| it.observer.upgrade().map(|o| (it.active.clone(), o)))
                .collect::<Vec<_>>()
        };
        tracing::trace!(listeners = targets.len(), "notifying listeners");
        for (active, observer) in targets {
            if active.load(Ordering::Acquire) {
                observer.notify(value.clone());
            }
        }
    }
}

impl<V: Clone + 'static> Observable<V> for ListenerSet<V> {
    fn register(
        &self,
        observer: Weak<dyn Observer<V> + 'static>,
    ) -> Result<ListenerId, RegistryError> {
        self.add_listener(observer)
    }

    fn unregister(&self, id: ListenerId) -> bool {
        self.remove_listener(id)
    }
}

impl<V: Debug> Debug for ListenerSet<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("ListenerSet")
            .field("current", &inner.current)
            .field("registrations", &inner.registrations.len())
            .finish()
    }
}
