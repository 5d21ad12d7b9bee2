mod harness;

use std::sync::{Arc, Mutex};

use aero_wire::callbacks::CallbackMap;
use aero_wire::WireError;
use proptest::prelude::*;

type Log = Arc<Mutex<Vec<(u64, &'static str)>>>;

fn register(map: &mut CallbackMap<&'static str>, log: &Log) -> u64 {
    let serial = map.next_serial();
    let log = Arc::clone(log);
    map.register(serial, move |result| log.lock().unwrap().push((serial, result)))
        .unwrap();
    serial
}

#[test]
fn serials_start_at_one_and_duplicates_are_refused() {
    harness::init_tracing();
    let mut map = CallbackMap::<&'static str>::new();
    let log = Log::default();
    assert_eq!(register(&mut map, &log), 1);
    assert_eq!(register(&mut map, &log), 2);
    assert_eq!(
        map.register(2, |_| {}),
        Err(WireError::DuplicateSerial(2))
    );
    assert_eq!(map.len(), 2);
}

#[test]
fn unknown_serials_are_ignored() {
    let mut map = CallbackMap::<&'static str>::new();
    let log = Log::default();
    let serial = register(&mut map, &log);
    assert!(!map.resolve(serial + 1, "stray"));
    assert!(map.resolve(serial, "done"));
    assert!(!map.resolve(serial, "again"));
    assert_eq!(*log.lock().unwrap(), vec![(serial, "done")]);
}

#[test]
fn unregistered_continuations_are_never_called() {
    let mut map = CallbackMap::<&'static str>::new();
    let log = Log::default();
    let serial = register(&mut map, &log);
    assert!(map.unregister(serial).is_some());
    assert_eq!(map.cancel_all(|_| "cancelled"), 0);
    assert!(log.lock().unwrap().is_empty());
}

proptest! {
    #[test]
    fn every_continuation_runs_exactly_once(
        count in 1usize..40,
        resolve_order in proptest::collection::vec(any::<usize>(), 0..60),
    ) {
        let mut map = CallbackMap::<&'static str>::new();
        let log = Log::default();
        let serials: Vec<u64> = (0..count).map(|_| register(&mut map, &log)).collect();

        for pick in resolve_order {
            map.resolve(serials[pick % serials.len()], "resolved");
        }
        let resolved = log.lock().unwrap().len();
        prop_assert_eq!(map.cancel_all(|_| "cancelled"), count - resolved);
        prop_assert!(map.is_empty());

        let log = log.lock().unwrap();
        prop_assert_eq!(log.len(), count);
        let mut seen: Vec<u64> = log.iter().map(|(serial, _)| *serial).collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, serials);

        let cancelled: Vec<u64> = log
            .iter()
            .filter(|(_, result)| *result == "cancelled")
            .map(|(serial, _)| *serial)
            .collect();
        prop_assert!(cancelled.windows(2).all(|w| w[0] < w[1]));
    }
}
