mod harness;

use aero_wire::chunked::ChunkedCommandHandler;
use aero_wire::config::DEFAULT_MAX_COMMAND_SIZE;
use aero_wire::schema::{CommandKind, ForwardCommand, Value};
use aero_wire::test_utils::{Call, RecordingNative};
use aero_wire::types::MapMode;
use aero_wire::{Client, ObjectType, Server, WireConfig};
use proptest::prelude::*;

use harness::{create_all_objects, encode_forward, forward_command, split_at_cuts};

/// A forward stream touching every object type plus writes, labels,
/// requests and releases.
fn workload() -> Vec<u8> {
    let mut client = Client::new(WireConfig::default());
    let live = create_all_objects(&mut client);
    let buffer = live[&ObjectType::Buffer];
    client
        .send(&ForwardCommand::new(
            CommandKind::BufferStorage,
            vec![
                Value::Object(Some(buffer)),
                Value::U64(64),
                Value::U32(0),
                Value::Bool(false),
            ],
        ))
        .unwrap();
    client
        .send(&ForwardCommand::new(
            CommandKind::QueueWriteBuffer,
            vec![
                Value::Object(Some(buffer)),
                Value::U64(8),
                Value::Bytes((0u8..48).collect()),
            ],
        ))
        .unwrap();
    client
        .set_label(ObjectType::Texture, live[&ObjectType::Texture], "albedo")
        .unwrap();
    client
        .buffer_map_async(buffer, MapMode::READ, 0, 64, |_| {})
        .unwrap();
    client.queue_on_submitted_work_done(|_| {}).unwrap();
    client
        .release(ObjectType::Sampler, live[&ObjectType::Sampler])
        .unwrap();
    client.take_outgoing()
}

fn replay(chunks: &[&[u8]]) -> Vec<Call> {
    let mut server = Server::new(RecordingNative::auto_completing(), WireConfig::default());
    for chunk in chunks {
        server.handle_commands(chunk).unwrap();
    }
    assert!(server.is_connected());
    server.native().calls.clone()
}

#[test]
fn byte_at_a_time_delivery_matches_one_chunk() {
    harness::init_tracing();
    let stream = workload();
    let whole = replay(&[stream.as_slice()]);
    let bytes: Vec<&[u8]> = stream.chunks(1).collect();
    assert_eq!(replay(&bytes), whole);
    assert!(whole.iter().any(|call| call.method == "queue_write_buffer"));
}

#[test]
fn partial_header_is_carried_over() {
    let cmd = ForwardCommand::new(CommandKind::DeviceTick, Vec::new());
    let bytes = encode_forward(&cmd);
    let mut handler = ChunkedCommandHandler::new(DEFAULT_MAX_COMMAND_SIZE);
    let mut seen = Vec::new();
    handler
        .handle_chunk(&bytes[..2], |c| {
            seen.push(c.to_vec());
            Ok(())
        })
        .unwrap();
    assert!(!handler.is_idle());
    assert_eq!(handler.buffered_len(), 2);
    handler
        .handle_chunk(&bytes[2..], |c| {
            seen.push(c.to_vec());
            Ok(())
        })
        .unwrap();
    assert!(handler.is_idle());
    assert_eq!(seen, vec![bytes]);
}

#[test]
fn oversized_declaration_is_refused_before_buffering() {
    let mut handler = ChunkedCommandHandler::new(64);
    let header = (65u32 | (2 << 24)).to_le_bytes();
    assert!(handler.handle_chunk(&header, |_| Ok(())).is_err());
    assert!(handler.is_poisoned());
    assert_eq!(handler.buffered_len(), 0);
    assert!(handler.handle_chunk(&[], |_| Ok(())).is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn server_behaviour_is_independent_of_chunking(
        cuts in proptest::collection::vec(any::<usize>(), 0..64),
    ) {
        let stream = workload();
        let whole = replay(&[stream.as_slice()]);
        prop_assert_eq!(replay(&split_at_cuts(&stream, &cuts)), whole);
    }

    #[test]
    fn reassembly_yields_the_original_commands(
        cmds in proptest::collection::vec(forward_command(), 1..8),
        cuts in proptest::collection::vec(any::<usize>(), 0..32),
    ) {
        let encoded: Vec<Vec<u8>> = cmds.iter().map(encode_forward).collect();
        let stream = encoded.concat();
        let mut handler = ChunkedCommandHandler::new(DEFAULT_MAX_COMMAND_SIZE);
        let mut seen = Vec::new();
        for chunk in split_at_cuts(&stream, &cuts) {
            handler
                .handle_chunk(chunk, |c| {
                    seen.push(c.to_vec());
                    Ok(())
                })
                .unwrap();
        }
        prop_assert!(handler.is_idle());
        prop_assert_eq!(seen, encoded);
    }
}
