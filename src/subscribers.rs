//! Listener registry used by both sync services.
//!
//! Listeners always receive the full latest state, never diffs. A
//! [`Subscription`] detaches its listener when dropped or when
//! [`Subscription::unsubscribe`] is called.

use std::sync::{Arc, Mutex, Weak};

trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

struct Registry<F: ?Sized> {
    next_id: u64,
    listeners: Vec<(u64, Arc<F>)>,
}

impl<F: ?Sized + Send + Sync> Detach for Mutex<Registry<F>> {
    fn detach(&self, id: u64) {
        if let Ok(mut reg) = self.lock() {
            reg.listeners.retain(|(lid, _)| *lid != id);
        }
    }
}

/// A set of listeners of type `F` (usually a `dyn Fn(..)` trait object).
pub struct Subscribers<F: ?Sized> {
    inner: Arc<Mutex<Registry<F>>>,
}

impl<F: ?Sized + Send + Sync + 'static> Subscribers<F> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register a listener. It stays registered for as long as the returned
    /// [`Subscription`] is alive.
    pub fn subscribe(&self, listener: Arc<F>) -> Subscription {
        let id = match self.inner.lock() {
            Ok(mut reg) => {
                let id = reg.next_id;
                reg.next_id += 1;
                reg.listeners.push((id, listener));
                id
            }
            Err(_) => return Subscription::detached(),
        };
        let registry: Arc<dyn Detach> = self.inner.clone();
        Subscription {
            id,
            registry: Some(Arc::downgrade(&registry)),
        }
    }

    /// Invoke `call` once per listener, in registration order.
    ///
    /// The registry lock is released before any listener runs, so listeners
    /// may subscribe or unsubscribe from inside the callback.
    pub fn notify(&self, call: impl Fn(&F)) {
        let listeners: Vec<Arc<F>> = match self.inner.lock() {
            Ok(reg) => reg.listeners.iter().map(|(_, l)| l.clone()).collect(),
            Err(_) => return,
        };
        for listener in &listeners {
            call(listener);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|r| r.listeners.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<F: ?Sized + Send + Sync + 'static> Default for Subscribers<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by `subscribe`. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    registry: Option<Weak<dyn Detach>>,
}

impl Subscription {
    fn detached() -> Self {
        Self {
            id: 0,
            registry: None,
        }
    }

    /// Detach the listener now.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|w| w.upgrade()) {
            registry.detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.registry.is_some())
            .finish()
    }
}
