mod harness;

use aero_wire::config::DEFAULT_MAX_DECODE_ALLOCATION;
use aero_wire::schema::{
    decode, CommandKind, DeserializeAllocator, HandleIds, NoObjects, ReturnKind,
};
use aero_wire::test_utils::{Loopback, RecordingNative};
use aero_wire::{Client, Server, WireConfig, WireError};
use proptest::prelude::*;

use harness::{encode_forward, encode_return, forward_command, return_command};

/// Rewrite the header so the command claims exactly `len` bytes.
fn truncated(bytes: &[u8], len: usize) -> Vec<u8> {
    let mut out = bytes[..len].to_vec();
    let word = (len as u32 & 0x00FF_FFFF) | (u32::from(bytes[3]) << 24);
    out[..4].copy_from_slice(&word.to_le_bytes());
    out
}

#[test]
fn a_truncated_stream_waits_for_more_input() {
    harness::init_tracing();
    let mut lo = Loopback::new(RecordingNative::new());
    lo.client.create_buffer("pending").unwrap();
    let bytes = lo.client.take_outgoing();

    lo.server.handle_commands(&bytes[..bytes.len() - 1]).unwrap();
    assert!(lo.server.is_connected());
    assert!(lo.native().calls.is_empty());

    lo.server.handle_commands(&bytes[bytes.len() - 1..]).unwrap();
    assert_eq!(lo.native().methods(), ["create_buffer"]);
}

#[test]
fn header_shorter_than_itself_is_fatal() {
    let mut server = Server::new(RecordingNative::new(), WireConfig::default());
    assert!(matches!(
        server.handle_commands(&[3, 0, 0, CommandKind::DeviceTick as u8]),
        Err(WireError::InvalidCommandSize { size: 3, .. })
    ));
    assert!(!server.is_connected());
    assert_eq!(server.handle_commands(&[]), Err(WireError::Disconnected));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn every_short_forward_command_is_rejected(cmd in forward_command()) {
        let bytes = encode_forward(&cmd);
        for len in 4..bytes.len() {
            let short = truncated(&bytes, len);
            let mut allocator = DeserializeAllocator::new(DEFAULT_MAX_DECODE_ALLOCATION);
            prop_assert!(
                decode::<CommandKind, _>(&short, &mut allocator, &HandleIds).is_err(),
                "{} accepted at {len} of {} bytes",
                cmd.kind.name(),
                bytes.len()
            );
        }
    }

    #[test]
    fn every_short_return_command_is_rejected(cmd in return_command()) {
        let bytes = encode_return(&cmd);
        for len in 4..bytes.len() {
            let mut allocator = DeserializeAllocator::new(DEFAULT_MAX_DECODE_ALLOCATION);
            prop_assert!(
                decode::<ReturnKind, _>(&truncated(&bytes, len), &mut allocator, &NoObjects)
                    .is_err()
            );
        }
    }

    #[test]
    fn arbitrary_bytes_never_panic_the_server(
        chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 0..8),
    ) {
        let mut server = Server::new(RecordingNative::auto_completing(), WireConfig::default());
        for chunk in &chunks {
            if server.handle_commands(chunk).is_err() {
                prop_assert!(!server.is_connected());
                break;
            }
        }
        server.disconnect();
        prop_assert_eq!(server.live_objects(), 0);
    }

    #[test]
    fn arbitrary_bytes_never_panic_the_client(
        chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 0..8),
    ) {
        let mut client = Client::new(WireConfig::default());
        client.queue_on_submitted_work_done(|_| {}).unwrap();
        for chunk in &chunks {
            if client.handle_commands(chunk).is_err() {
                prop_assert!(!client.is_connected());
                prop_assert_eq!(client.pending_requests(), 0);
                break;
            }
        }
    }
}
