use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

type Callback<S> = Box<dyn Fn(&S) + Send>;

/// Subscriber registry keyed by subscriber id.
///
/// Subscribing twice with the same id replaces the earlier callback.
pub struct Subscribers<S> {
    callbacks: HashMap<String, Callback<S>>,
}

impl<S> Default for Subscribers<S> {
    fn default() -> Self {
        Self {
            callbacks: HashMap::new(),
        }
    }
}

impl<S> Subscribers<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under `id`. Returns true if it replaced one.
    pub fn subscribe(&mut self, id: impl Into<String>, callback: impl Fn(&S) + Send + 'static) -> bool {
        self.callbacks.insert(id.into(), Box::new(callback)).is_some()
    }

    /// Returns true if a subscriber was registered under `id`.
    pub fn unsubscribe(&mut self, id: &str) -> bool {
        self.callbacks.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Call every subscriber with `state`.
    ///
    /// Each callback is isolated: a panic is logged and the rest still run.
    /// Returns how many callbacks panicked.
    pub fn notify(&self, state: &S) -> usize {
        let mut failed = 0;
        for (id, callback) in &self.callbacks {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(state))) {
                failed += 1;
                error!(subscriber = %id, panic = panic_message(payload.as_ref()), "Subscriber panicked during notification");
            }
        }
        failed
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
