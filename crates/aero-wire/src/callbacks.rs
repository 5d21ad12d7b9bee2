use std::collections::BTreeMap;

use crate::error::{WireError, WireResult};

pub type Continuation<R> = Box<dyn FnOnce(R) + Send>;

/// Pending requests of one requesting object, keyed by serial.
///
/// Serials start at 1 and only grow. Every registered continuation is called
/// exactly once: by [`CallbackMap::resolve`] when its result arrives, or by
/// [`CallbackMap::cancel_all`] on teardown.
pub struct CallbackMap<R> {
    next_serial: u64,
    pending: BTreeMap<u64, Continuation<R>>,
}

impl<R> Default for CallbackMap<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> core::fmt::Debug for CallbackMap<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CallbackMap")
            .field("next_serial", &self.next_serial)
            .field("pending", &self.pending.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<R> CallbackMap<R> {
    pub fn new() -> Self {
        Self {
            next_serial: 1,
            pending: BTreeMap::new(),
        }
    }

    pub fn next_serial(&mut self) -> u64 {
        let serial = self.next_serial;
        self.next_serial += 1;
        serial
    }

    pub fn register<F>(&mut self, serial: u64, continuation: F) -> WireResult<()>
    where
        F: FnOnce(R) + Send + 'static,
    {
        use std::collections::btree_map::Entry;

        match self.pending.entry(serial) {
            Entry::Occupied(_) => Err(WireError::DuplicateSerial(serial)),
            Entry::Vacant(slot) => {
                slot.insert(Box::new(continuation));
                Ok(())
            }
        }
    }

    /// Remove a registration without calling it.
    pub fn unregister(&mut self, serial: u64) -> Option<Continuation<R>> {
        self.pending.remove(&serial)
    }

    /// Call the continuation registered for `serial`.
    ///
    /// Returns `false` when nothing is registered, e.g. because teardown
    /// already cancelled it.
    pub fn resolve(&mut self, serial: u64, result: R) -> bool {
        match self.pending.remove(&serial) {
            Some(continuation) => {
                continuation(result);
                true
            }
            None => {
                tracing::debug!(serial, "ignoring result for unknown request serial");
                false
            }
        }
    }

    /// Resolve every pending request in ascending serial order.
    pub fn cancel_all(&mut self, mut result: impl FnMut(u64) -> R) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let count = pending.len();
        for (serial, continuation) in pending {
            continuation(result(serial));
        }
        count
    }

    pub fn contains(&self, serial: u64) -> bool {
        self.pending.contains_key(&serial)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn serials_are_monotonic_from_one() {
        let mut map = CallbackMap::<()>::new();
        assert_eq!(map.next_serial(), 1);
        assert_eq!(map.next_serial(), 2);
        assert_eq!(map.next_serial(), 3);
    }

    #[test]
    fn resolve_calls_once_and_tolerates_unknown_serials() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut map = CallbackMap::new();
        let s = seen.clone();
        map.register(1, move |v: u32| s.lock().unwrap().push(v)).unwrap();

        assert_eq!(
            map.register(1, |_: u32| {}).unwrap_err(),
            WireError::DuplicateSerial(1)
        );
        assert!(map.resolve(1, 10));
        assert!(!map.resolve(1, 11));
        assert!(!map.resolve(42, 12));
        assert_eq!(*seen.lock().unwrap(), vec![10]);
    }

    #[test]
    fn cancel_all_resolves_in_ascending_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut map = CallbackMap::new();
        for serial in [3u64, 1, 2] {
            let s = seen.clone();
            map.register(serial, move |v: (u64, &'static str)| s.lock().unwrap().push(v))
                .unwrap();
        }

        assert_eq!(map.cancel_all(|serial| (serial, "lost")), 3);
        assert!(map.is_empty());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(1, "lost"), (2, "lost"), (3, "lost")]
        );
    }
}
