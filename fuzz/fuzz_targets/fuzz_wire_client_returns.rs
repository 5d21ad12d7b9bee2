#![no_main]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arbitrary::Unstructured;
use libfuzzer_sys::fuzz_target;

use aero_wire::types::MapMode;
use aero_wire::{Client, Outcome, WireConfig};

const MAX_INPUT_LEN: usize = 64 * 1024;

fuzz_target!(|data: &[u8]| {
    let data = &data[..data.len().min(MAX_INPUT_LEN)];
    let mut u = Unstructured::new(data);

    let mut client = Client::new(WireConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registered = 0;

    // A few outstanding requests so return commands have something to hit.
    let buffer = client.create_buffer("");
    for _ in 0..u.arbitrary::<u8>().unwrap_or(0) % 8 {
        let calls = Arc::clone(&calls);
        let continuation = move |_: Outcome| {
            calls.fetch_add(1, Ordering::Relaxed);
        };
        let sent = match (&buffer, u.arbitrary::<bool>().unwrap_or(false)) {
            (Ok(buffer), true) => {
                client.buffer_map_async(*buffer, MapMode::READ, 0, 16, continuation)
            }
            _ => client.queue_on_submitted_work_done(continuation),
        };
        registered += 1;
        assert!(sent.is_ok());
    }

    while !u.is_empty() {
        let len = u.arbitrary::<u8>().unwrap_or(0) as usize + 1;
        let chunk = u.bytes(len.min(u.len())).unwrap_or(&[]);
        if client.handle_commands(chunk).is_err() {
            assert!(!client.is_connected());
            break;
        }
    }

    client.disconnect();
    assert_eq!(client.pending_requests(), 0);
    // Every continuation ran exactly once, by reply or by cancellation.
    assert_eq!(calls.load(Ordering::Relaxed), registered);
});
