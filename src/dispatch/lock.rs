use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One mutex per request identifier, created on demand
///
/// Entries are dropped again once nobody holds or waits for them.
#[derive(Default)]
pub struct IdentifierLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IdentifierLocks {
    pub fn with_lock<T>(&self, identifier: &str, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(identifier.to_string()).or_default().clone()
        };

        let result = {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f()
        };

        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // one reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(identifier);
        }
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn same_identifier_is_exclusive() {
        let locks = Arc::new(IdentifierLocks::default());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8).map(|_| {
            let (locks, inside, max_inside) = (locks.clone(), inside.clone(), max_inside.clone());
            thread::spawn(move || {
                locks.with_lock("job-1", || {
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(std::time::Duration::from_millis(5));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
        }).collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 0);
    }

    #[test]
    fn returns_closure_value() {
        let locks = IdentifierLocks::default();
        assert_eq!(locks.with_lock("a", || 7), 7);
        assert_eq!(locks.len(), 0);
    }
}
