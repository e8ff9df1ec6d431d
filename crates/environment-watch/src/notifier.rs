//! Change-notification subscriptions

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Callback invoked for every change notification
pub type Handler<T> = Box<dyn FnMut(T) + Send>;

/// Source of platform change notifications
pub trait ChangeNotifier<T>: Send + Sync {
    /// Attach a handler; it stays attached until the subscription is dropped
    fn register(&self, handler: Handler<T>) -> Subscription;
}

/// Registration handle. Dropping it detaches the handler.
#[must_use = "dropping a subscription detaches its handler"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// Detach now
    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

struct Registry<T> {
    next_id: u64,
    handlers: BTreeMap<u64, Handler<T>>,
}

/// In-process notifier; hosts forward platform events into [`SyntheticNotifier::emit`].
///
/// Handlers run synchronously inside `emit` and must not register or emit on
/// the same notifier.
pub struct SyntheticNotifier<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for SyntheticNotifier<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T: Clone + Send + 'static> SyntheticNotifier<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                handlers: BTreeMap::new(),
            })),
        }
    }

    /// Deliver `value` to every attached handler, in registration order
    pub fn emit(&self, value: T) {
        if let Ok(mut registry) = self.registry.lock() {
            for handler in registry.handlers.values_mut() {
                handler(value.clone());
            }
        }
    }

    pub fn handler_count(&self) -> usize {
        self.registry.lock().map(|r| r.handlers.len()).unwrap_or(0)
    }
}

impl<T: Clone + Send + 'static> Default for SyntheticNotifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> ChangeNotifier<T> for SyntheticNotifier<T> {
    fn register(&self, handler: Handler<T>) -> Subscription {
        let id = match self.registry.lock() {
            Ok(mut registry) => {
                let id = registry.next_id;
                registry.next_id += 1;
                registry.handlers.insert(id, handler);
                id
            }
            Err(_) => return Subscription { detach: None },
        };

        let registry = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                if let Ok(mut registry) = registry.lock() {
                    registry.handlers.remove(&id);
                    debug!("Handler {} detached", id);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_reaches_handlers() {
        let notifier = SyntheticNotifier::<u32>::new();
        let sum = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&sum);
        let _sub = notifier.register(Box::new(move |v: u32| {
            s.fetch_add(v as usize, Ordering::SeqCst);
        }));

        notifier.emit(2);
        notifier.emit(3);
        assert_eq!(sum.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_unsubscribe_detaches() {
        let notifier = SyntheticNotifier::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let sub = notifier.register(Box::new(move |_: u32| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        notifier.emit(1);
        sub.unsubscribe();
        notifier.emit(1);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.handler_count(), 0);
    }

    #[test]
    fn test_drop_detaches() {
        let notifier = SyntheticNotifier::<u32>::new();
        {
            let _sub = notifier.register(Box::new(|_: u32| {}));
            assert_eq!(notifier.handler_count(), 1);
        }
        assert_eq!(notifier.handler_count(), 0);
    }

    #[test]
    fn test_subscription_outliving_notifier() {
        let notifier = SyntheticNotifier::<u32>::new();
        let sub = notifier.register(Box::new(|_: u32| {}));
        drop(notifier);
        sub.unsubscribe();
    }
}
