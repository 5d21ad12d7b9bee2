mod harness;

use std::sync::{Arc, Mutex};
use std::thread;

use aero_wire::ring::{ChunkRing, PopError};
use aero_wire::schema::{CommandKind, ForwardCommand, Value};
use aero_wire::test_utils::RecordingNative;
use aero_wire::types::{MapMode, RequestStatus};
use aero_wire::{Client, Outcome, Reply, Server, WireConfig};

/// Push all of `bytes`, yielding while the consumer catches up.
fn push_all(ring: &ChunkRing, mut bytes: &[u8], max_chunk: usize) {
    while !bytes.is_empty() {
        let pushed = ring.push_chunks(bytes, max_chunk);
        bytes = &bytes[pushed..];
        if pushed == 0 {
            thread::yield_now();
        }
    }
}

#[test]
fn client_and_server_talk_over_rings_on_separate_threads() {
    harness::init_tracing();
    let forward = Arc::new(ChunkRing::new(256));
    let returns = Arc::new(ChunkRing::new(1 << 16));

    let mut client = Client::new(WireConfig::default());
    let buffer = client.create_buffer("ring").unwrap();
    client
        .send(&ForwardCommand::new(
            CommandKind::BufferStorage,
            vec![
                Value::Object(Some(buffer)),
                Value::U64(512),
                Value::U32(0),
                Value::Bool(false),
            ],
        ))
        .unwrap();
    let payload: Vec<u8> = (0..512).map(|i| (i * 7) as u8).collect();
    client
        .send(&ForwardCommand::new(
            CommandKind::QueueWriteBuffer,
            vec![
                Value::Object(Some(buffer)),
                Value::U64(0),
                Value::Bytes(payload.clone()),
            ],
        ))
        .unwrap();
    let mapped = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&mapped);
    client
        .buffer_map_async(buffer, MapMode::READ, 0, 512, move |outcome| {
            *slot.lock().unwrap() = Some(outcome);
        })
        .unwrap();
    let stream = client.take_outgoing();
    let total = stream.len();

    let server = {
        let forward = Arc::clone(&forward);
        let returns = Arc::clone(&returns);
        thread::spawn(move || {
            let mut server =
                Server::new(RecordingNative::auto_completing(), WireConfig::default());
            let mut consumed = 0;
            while consumed < total {
                match forward.try_pop() {
                    Ok(chunk) => {
                        consumed += chunk.len();
                        server.handle_commands(&chunk).unwrap();
                    }
                    Err(PopError::Empty) => thread::yield_now(),
                    Err(PopError::Corrupt) => panic!("corrupt forward ring"),
                }
            }
            push_all(&returns, &server.take_outgoing(), 100);
            server
        })
    };

    push_all(&forward, &stream, 61);
    let server = server.join().unwrap();
    assert_eq!(server.live_objects(), 1);

    loop {
        match returns.try_pop() {
            Ok(chunk) => client.handle_commands(&chunk).unwrap(),
            Err(PopError::Empty) => break,
            Err(PopError::Corrupt) => panic!("corrupt return ring"),
        }
    }
    assert_eq!(
        mapped.lock().unwrap().take(),
        Some(Outcome::Completed(Reply::MapAsync {
            status: RequestStatus::Success,
            data: payload,
        }))
    );
}
