#![no_main]

use arbitrary::Unstructured;
use libfuzzer_sys::fuzz_target;

use aero_wire::test_utils::RecordingNative;
use aero_wire::{Server, WireConfig};

const MAX_INPUT_LEN: usize = 64 * 1024;

fuzz_target!(|data: &[u8]| {
    let data = &data[..data.len().min(MAX_INPUT_LEN)];
    let mut u = Unstructured::new(data);

    let auto_complete: bool = u.arbitrary().unwrap_or(false);
    // Small limits so the fuzzer reaches the id and allocation bounds.
    let config = WireConfig {
        max_command_size: 1 + (u.arbitrary::<u16>().unwrap_or(u16::MAX) as usize),
        max_decode_allocation: 1 + (u.arbitrary::<u16>().unwrap_or(u16::MAX) as usize),
        max_object_id: 1 + u32::from(u.arbitrary::<u8>().unwrap_or(u8::MAX)),
        ..WireConfig::default()
    };
    let native = if auto_complete {
        RecordingNative::auto_completing()
    } else {
        RecordingNative::new()
    };
    let mut server = Server::new(native, config);

    // Split the rest of the input at fuzzer-chosen points.
    while !u.is_empty() {
        let len = u.arbitrary::<u8>().unwrap_or(0) as usize + 1;
        let chunk = u.bytes(len.min(u.len())).unwrap_or(&[]);
        if server.handle_commands(chunk).is_err() {
            assert!(!server.is_connected());
            break;
        }
        // Late completions must be harmless in either order.
        if u.arbitrary().unwrap_or(false) {
            let native = server.native_mut();
            native.pending_maps.pop();
            native.pending_pipelines.pop();
            native.pending_work_done.pop();
            native.grant_requests();
        }
        let _ = server.take_outgoing();
    }

    server.disconnect();
    assert_eq!(server.live_objects(), 0);
});
