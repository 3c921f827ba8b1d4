//! Loading indicator and the set of requests still waiting for their data.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::ws::MaybeSendSync;

/// Whatever the front-end shows while the server is busy.
pub trait LoadingIndicator: MaybeSendSync {
    fn show(&self);
    fn hide(&self);
}

/// Indicator that only logs; used when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogIndicator;

impl LoadingIndicator for LogIndicator {
    fn show(&self) {
        crate::log_debug!("Loading...");
    }

    fn hide(&self) {
        crate::log_debug!("Loading finished");
    }
}

/// Called with the identifier of a load once the server reports it complete.
pub trait Completion: Fn(&str) + MaybeSendSync {}
impl<F: Fn(&str) + MaybeSendSync> Completion for F {}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Message identifiers of requests whose data has not finished arriving.
///
/// The indicator is shown whenever an identifier is added and hidden once the
/// set drains. Entries without a matching `transfer_complete` stay forever.
pub struct PendingLoads {
    ids: Mutex<Vec<String>>,
    completions: Mutex<HashMap<String, Box<dyn Completion>>>,
    indicator: Arc<dyn LoadingIndicator>,
}

impl PendingLoads {
    pub fn new(indicator: Arc<dyn LoadingIndicator>) -> Self {
        Self {
            ids: Mutex::new(Vec::new()),
            completions: Mutex::new(HashMap::new()),
            indicator,
        }
    }

    pub fn push(&self, id: impl Into<String>) {
        let id = id.into();
        {
            let mut ids = lock(&self.ids);
            if ids.contains(&id) {
                crate::log_warn!("Message id {} is already pending; ids have collided", id);
                return;
            }
            ids.push(id);
        }
        self.indicator.show();
    }

    /// Run `callback` when `id` completes. Replaces an earlier callback for the same id.
    pub fn on_complete(&self, id: impl Into<String>, callback: impl Completion + 'static) {
        lock(&self.completions).insert(id.into(), Box::new(callback));
    }

    /// Remove `id`, run its completion callback and hide the indicator if
    /// nothing else is pending. Returns `false` if `id` was not pending.
    pub fn complete(&self, id: &str) -> bool {
        let remaining = {
            let mut ids = lock(&self.ids);
            let Some(position) = ids.iter().position(|pending| pending == id) else {
                crate::log_debug!("Completed load {} was not pending", id);
                return false;
            };
            ids.remove(position);
            ids.len()
        };

        let callback = lock(&self.completions).remove(id);
        if let Some(callback) = callback {
            callback(id);
        }

        if remaining == 0 {
            self.indicator.hide();
        }
        true
    }

    /// Drop `id` without running its callback, e.g. when its request was never sent.
    pub fn discard(&self, id: &str) -> bool {
        let remaining = {
            let mut ids = lock(&self.ids);
            let before = ids.len();
            ids.retain(|pending| pending != id);
            if ids.len() == before {
                return false;
            }
            ids.len()
        };
        lock(&self.completions).remove(id);
        if remaining == 0 {
            self.indicator.hide();
        }
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        lock(&self.ids).iter().any(|pending| pending == id)
    }

    pub fn len(&self) -> usize {
        lock(&self.ids).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.ids).is_empty()
    }

    /// Pending identifiers, oldest first.
    pub fn ids(&self) -> Vec<String> {
        lock(&self.ids).clone()
    }
}

impl Default for PendingLoads {
    fn default() -> Self {
        Self::new(Arc::new(LogIndicator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingIndicator {
        shown: AtomicUsize,
        hidden: AtomicUsize,
    }

    impl LoadingIndicator for CountingIndicator {
        fn show(&self) {
            self.shown.fetch_add(1, Ordering::SeqCst);
        }

        fn hide(&self) {
            self.hidden.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn indicator_hides_when_last_load_completes() {
        let indicator = Arc::new(CountingIndicator::default());
        let pending = PendingLoads::new(indicator.clone());

        pending.push("A1");
        pending.push("B2");
        assert_eq!(indicator.shown.load(Ordering::SeqCst), 2);

        assert!(pending.complete("A1"));
        assert_eq!(indicator.hidden.load(Ordering::SeqCst), 0);
        assert_eq!(pending.ids(), vec!["B2".to_string()]);

        assert!(pending.complete("B2"));
        assert_eq!(indicator.hidden.load(Ordering::SeqCst), 1);
        assert!(pending.is_empty());
    }

    #[test]
    fn completion_callback_runs_once() {
        let pending = PendingLoads::default();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();

        pending.push("C3");
        pending.on_complete("C3", move |id: &str| seen.lock().unwrap().push(id.to_string()));

        assert!(pending.complete("C3"));
        assert!(!pending.complete("C3"));
        assert_eq!(*calls.lock().unwrap(), vec!["C3".to_string()]);
    }

    #[test]
    fn duplicate_push_is_only_reported() {
        let indicator = Arc::new(CountingIndicator::default());
        let pending = PendingLoads::new(indicator.clone());

        pending.push("D4");
        pending.push("D4");

        assert_eq!(pending.len(), 1);
        assert_eq!(indicator.shown.load(Ordering::SeqCst), 1);
        assert!(pending.contains("D4"));
    }

    #[test]
    fn discard_skips_callback() {
        let pending = PendingLoads::default();
        let called = Arc::new(AtomicUsize::new(0));
        let counter = called.clone();

        pending.push("F6");
        pending.on_complete("F6", move |_: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(pending.discard("F6"));
        assert!(!pending.complete("F6"));
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_completion_leaves_indicator_alone() {
        let indicator = Arc::new(CountingIndicator::default());
        let pending = PendingLoads::new(indicator.clone());

        assert!(!pending.complete("E5"));
        assert_eq!(indicator.hidden.load(Ordering::SeqCst), 0);
    }
}
