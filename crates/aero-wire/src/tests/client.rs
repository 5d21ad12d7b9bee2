use std::sync::{Arc, Mutex};

use super::init_tracing;
use crate::client::{CancelReason, Client, DeviceEvent, Outcome, Reply};
use crate::config::{WireConfig, DEFAULT_MAX_COMMAND_SIZE};
use crate::error::WireError;
use crate::handle::{Handle, ObjectType};
use crate::schema::{
    encode, CommandHeader, CommandKind, CommandSchema, ForwardCommand, NoObjects, Record,
    ReturnCommand, ReturnKind, Value,
};
use crate::types::{
    DeviceLostReason, FeatureName, LoggingLevel, MapMode, RequestAdapterOptions, RequestStatus,
};

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<(&'static str, Outcome)>>>);

impl Recorder {
    fn continuation(&self, tag: &'static str) -> impl FnOnce(Outcome) + Send + 'static {
        let log = Arc::clone(&self.0);
        move |outcome| log.lock().unwrap().push((tag, outcome))
    }

    fn take(&self) -> Vec<(&'static str, Outcome)> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

fn client() -> Client {
    init_tracing();
    Client::new(WireConfig::default())
}

fn ret(kind: ReturnKind, values: Vec<Value<Handle>>) -> Vec<u8> {
    encode(
        &ReturnCommand::new(kind, values),
        &NoObjects,
        DEFAULT_MAX_COMMAND_SIZE,
    )
    .unwrap()
}

fn work_done(serial: u64, status: RequestStatus) -> Vec<u8> {
    ret(
        ReturnKind::QueueWorkDoneCallback,
        vec![Value::U64(serial), Value::U32(status.as_u32())],
    )
}

fn map_callback(buffer: Handle, serial: u64, data: Vec<u8>) -> Vec<u8> {
    ret(
        ReturnKind::BufferMapAsyncCallback,
        vec![
            Value::Handle(buffer),
            Value::U64(serial),
            Value::U32(RequestStatus::Success.as_u32()),
            Value::Bytes(data),
        ],
    )
}

#[test]
fn sync_send_rejects_async_and_destroy_commands() {
    let mut client = client();
    let work_done = ForwardCommand::new(CommandKind::QueueOnSubmittedWorkDone, vec![Value::U64(0)]);
    assert!(matches!(
        client.send(&work_done),
        Err(WireError::SchemaMismatch { .. })
    ));
    let destroy = ForwardCommand::new(
        CommandKind::DestroyObject,
        vec![
            Value::U32(ObjectType::Buffer.as_u32()),
            Value::Handle(Handle::new(1, 0)),
        ],
    );
    assert!(client.send(&destroy).is_err());
    assert!(client.take_outgoing().is_empty());
}

#[test]
fn create_buffer_encodes_sixteen_bytes_with_handle_one() {
    let mut client = client();
    let handle = client.create_buffer("").unwrap();
    assert_eq!(handle, Handle::new(1, 0));
    assert!(client.is_live(ObjectType::Buffer, handle));

    let bytes = client.take_outgoing();
    assert_eq!(bytes.len(), 16);
    assert_eq!(bytes[..4], [16, 0, 0, CommandKind::CreateBuffer as u8]);
    assert_eq!(bytes[4..12], [1, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(bytes[12..], [0, 0, 0, 0]);
}

#[test]
fn continuation_runs_exactly_once() {
    let mut client = client();
    let recorder = Recorder::default();
    let serial = client
        .queue_on_submitted_work_done(recorder.continuation("done"))
        .unwrap();
    assert_eq!(serial, 1);
    assert_eq!(client.pending_requests(), 1);

    client
        .handle_commands(&work_done(serial, RequestStatus::Success))
        .unwrap();
    client
        .handle_commands(&work_done(serial, RequestStatus::Success))
        .unwrap();

    assert_eq!(
        recorder.take(),
        vec![(
            "done",
            Outcome::Completed(Reply::WorkDone {
                status: RequestStatus::Success
            })
        )]
    );
    assert_eq!(client.pending_requests(), 0);
    assert!(client.is_connected());
}

#[test]
fn unknown_status_values_degrade_to_unknown() {
    let mut client = client();
    let recorder = Recorder::default();
    let serial = client
        .queue_on_submitted_work_done(recorder.continuation("done"))
        .unwrap();
    let raw = ret(
        ReturnKind::QueueWorkDoneCallback,
        vec![Value::U64(serial), Value::U32(77)],
    );
    client.handle_commands(&raw).unwrap();
    assert_eq!(
        recorder.take()[0].1,
        Outcome::Completed(Reply::WorkDone {
            status: RequestStatus::Unknown
        })
    );
}

#[test]
fn releasing_an_object_cancels_its_requests_and_drops_late_callbacks() {
    let mut client = client();
    let recorder = Recorder::default();
    let buffer = client.create_buffer("staging").unwrap();
    let serial = client
        .buffer_map_async(buffer, MapMode::READ, 0, 4, recorder.continuation("map"))
        .unwrap();
    let device = client
        .queue_on_submitted_work_done(recorder.continuation("device"))
        .unwrap();

    client.release(ObjectType::Buffer, buffer).unwrap();
    assert_eq!(
        recorder.take(),
        vec![("map", Outcome::Cancelled(CancelReason::ObjectReleased))]
    );
    assert!(!client.is_live(ObjectType::Buffer, buffer));
    assert_eq!(
        client.release(ObjectType::Buffer, buffer),
        Err(WireError::UnknownObject {
            ty: ObjectType::Buffer,
            id: 1
        })
    );

    client
        .handle_commands(&map_callback(buffer, serial, vec![1, 2, 3, 4]))
        .unwrap();
    assert!(recorder.take().is_empty());
    assert!(client.is_connected());

    client
        .handle_commands(&work_done(device, RequestStatus::Success))
        .unwrap();
    assert_eq!(recorder.take().len(), 1);
}

#[test]
fn requests_on_dead_objects_fail_immediately() {
    let mut client = client();
    let recorder = Recorder::default();
    let result = client.buffer_map_async(
        Handle::new(3, 0),
        MapMode::WRITE,
        0,
        4,
        recorder.continuation("map"),
    );
    assert_eq!(
        result,
        Err(WireError::UnknownObject {
            ty: ObjectType::Buffer,
            id: 3
        })
    );
    assert_eq!(
        recorder.take(),
        vec![("map", Outcome::Cancelled(CancelReason::SendFailed))]
    );
    assert_eq!(client.pending_requests(), 0);
}

#[test]
fn disconnect_cancels_everything_once_in_serial_order() {
    let mut client = client();
    let recorder = Recorder::default();
    let buffer = client.create_buffer("").unwrap();
    client
        .buffer_map_async(buffer, MapMode::READ, 0, 4, recorder.continuation("map"))
        .unwrap();
    for tag in ["first", "second", "third"] {
        client
            .queue_on_submitted_work_done(recorder.continuation(tag))
            .unwrap();
    }

    client.disconnect();
    client.disconnect();

    let outcomes = recorder.take();
    let tags: Vec<_> = outcomes.iter().map(|(tag, _)| *tag).collect();
    assert_eq!(tags, ["first", "second", "third", "map"]);
    assert!(outcomes
        .iter()
        .all(|(_, o)| *o == Outcome::Cancelled(CancelReason::ConnectionLost)));
    assert_eq!(
        client.drain_events(),
        vec![DeviceEvent::Lost {
            reason: DeviceLostReason::ConnectionLost,
            message: "wire connection lost".into()
        }]
    );

    let late = client.queue_on_submitted_work_done(recorder.continuation("late"));
    assert_eq!(late, Err(WireError::Disconnected));
    assert_eq!(
        recorder.take(),
        vec![("late", Outcome::Cancelled(CancelReason::ConnectionLost))]
    );
    assert_eq!(client.create_buffer(""), Err(WireError::Disconnected));
}

#[test]
fn malformed_return_stream_disconnects_the_client() {
    let mut client = client();
    let recorder = Recorder::default();
    client
        .queue_on_submitted_work_done(recorder.continuation("pending"))
        .unwrap();

    assert!(matches!(
        client.handle_commands(&[0xFF; 8]),
        Err(WireError::InvalidCommandSize { .. })
    ));
    assert!(!client.is_connected());
    assert_eq!(
        recorder.take(),
        vec![("pending", Outcome::Cancelled(CancelReason::ConnectionLost))]
    );
    assert_eq!(client.handle_commands(&[]), Err(WireError::Disconnected));
}

fn shader_module(client: &mut Client) -> Handle {
    client
        .create(CommandKind::CreateShaderModule, |handle| {
            vec![
                Value::NewObject(handle),
                Value::String(String::new()),
                Value::String("code".into()),
            ]
        })
        .unwrap()
}

fn compute_pipeline_async(module: Handle, pipeline: Handle) -> ForwardCommand<Handle> {
    ForwardCommand::new(
        CommandKind::CreateComputePipelineAsync,
        vec![
            Value::U64(0),
            Value::NewObject(pipeline),
            Value::String("cp".into()),
            Value::Object(None),
            Value::Object(Some(module)),
            Value::String("main".into()),
            Value::Array(Vec::new()),
        ],
    )
}

#[test]
fn async_pipeline_outcome_decides_whether_the_handle_survives() {
    let mut client = client();
    let recorder = Recorder::default();
    let module = shader_module(&mut client);

    let good = client.allocate(ObjectType::ComputePipeline).unwrap();
    let good_serial = client
        .send_request(compute_pipeline_async(module, good), recorder.continuation("good"))
        .unwrap();
    let bad = client.allocate(ObjectType::ComputePipeline).unwrap();
    let bad_serial = client
        .send_request(compute_pipeline_async(module, bad), recorder.continuation("bad"))
        .unwrap();

    let reply = |serial: u64, status: RequestStatus, message: &str| {
        ret(
            ReturnKind::CreateComputePipelineAsyncCallback,
            vec![
                Value::U64(serial),
                Value::U32(status.as_u32()),
                Value::String(message.into()),
            ],
        )
    };
    let mut stream = reply(good_serial, RequestStatus::Success, "");
    stream.extend(reply(bad_serial, RequestStatus::Error, "no entry point"));
    client.handle_commands(&stream).unwrap();

    assert_eq!(
        recorder.take(),
        vec![
            (
                "good",
                Outcome::Completed(Reply::CreatePipeline {
                    status: RequestStatus::Success,
                    pipeline: Some(good),
                    message: String::new(),
                })
            ),
            (
                "bad",
                Outcome::Completed(Reply::CreatePipeline {
                    status: RequestStatus::Error,
                    pipeline: None,
                    message: "no entry point".into(),
                })
            ),
        ]
    );
    assert!(client.is_live(ObjectType::ComputePipeline, good));
    assert!(!client.is_live(ObjectType::ComputePipeline, bad));
}

#[test]
fn releasing_an_in_flight_creation_defers_the_destroy() {
    let mut client = client();
    let recorder = Recorder::default();
    let module = shader_module(&mut client);
    let pipeline = client.allocate(ObjectType::ComputePipeline).unwrap();
    let serial = client
        .send_request(compute_pipeline_async(module, pipeline), recorder.continuation("cp"))
        .unwrap();
    client.take_outgoing();

    client.release(ObjectType::ComputePipeline, pipeline).unwrap();
    assert!(client.take_outgoing().is_empty());
    assert!(recorder.take().is_empty());

    client
        .handle_commands(&ret(
            ReturnKind::CreateComputePipelineAsyncCallback,
            vec![
                Value::U64(serial),
                Value::U32(RequestStatus::Success.as_u32()),
                Value::String(String::new()),
            ],
        ))
        .unwrap();
    assert_eq!(
        recorder.take(),
        vec![(
            "cp",
            Outcome::Completed(Reply::CreatePipeline {
                status: RequestStatus::Success,
                pipeline: None,
                message: String::new(),
            })
        )]
    );
    let sent = client.take_outgoing();
    let header = CommandHeader::peek(&sent).unwrap();
    assert_eq!(header.size, sent.len());
    assert_eq!(
        CommandKind::from_tag(header.tag),
        Some(CommandKind::DestroyObject)
    );
    assert_eq!(
        client.allocate(ObjectType::ComputePipeline).unwrap(),
        Handle::new(pipeline.id, 1)
    );
}

#[test]
fn disconnect_frees_handles_of_unanswered_creations() {
    let mut client = client();
    let recorder = Recorder::default();
    let module = shader_module(&mut client);
    let pipeline = client.allocate(ObjectType::ComputePipeline).unwrap();
    client
        .send_request(compute_pipeline_async(module, pipeline), recorder.continuation("cp"))
        .unwrap();
    assert!(client.is_live(ObjectType::ComputePipeline, pipeline));

    client.disconnect();
    assert!(!client.is_live(ObjectType::ComputePipeline, pipeline));
    assert!(client.is_live(ObjectType::ShaderModule, module));
    assert_eq!(
        recorder.take(),
        vec![("cp", Outcome::Cancelled(CancelReason::ConnectionLost))]
    );
}

#[test]
fn adapter_reply_keeps_only_known_features() {
    let mut client = client();
    let recorder = Recorder::default();
    let adapter = client
        .request_adapter(RequestAdapterOptions::default(), recorder.continuation("adapter"))
        .unwrap();
    let features = vec![
        Record::new(vec![Value::U32(FeatureName::ShaderF16.as_u32())]),
        Record::new(vec![Value::U32(0x7000)]),
    ];
    client
        .handle_commands(&ret(
            ReturnKind::InstanceRequestAdapterCallback,
            vec![
                Value::U64(1),
                Value::U32(RequestStatus::Success.as_u32()),
                Value::String(String::new()),
                Value::Struct(None),
                Value::Struct(None),
                Value::Array(features),
            ],
        ))
        .unwrap();
    assert_eq!(
        recorder.take(),
        vec![(
            "adapter",
            Outcome::Completed(Reply::RequestAdapter {
                status: RequestStatus::Success,
                adapter: Some(adapter),
                message: String::new(),
                properties: None,
                limits: None,
                features: vec![FeatureName::ShaderF16],
            })
        )]
    );
    assert!(client.is_live(ObjectType::Adapter, adapter));
}

#[test]
fn failed_requests_give_their_handles_back() {
    let mut client = client();
    let recorder = Recorder::default();
    client.disconnect();
    assert_eq!(
        client.request_adapter(RequestAdapterOptions::default(), recorder.continuation("late")),
        Err(WireError::Disconnected)
    );
    assert_eq!(
        recorder.take(),
        vec![("late", Outcome::Cancelled(CancelReason::ConnectionLost))]
    );

    let mut client = self::client();
    let result = client.request_device(
        Handle::new(2, 0),
        "",
        &[],
        recorder.continuation("orphan"),
    );
    assert_eq!(
        result,
        Err(WireError::UnknownObject {
            ty: ObjectType::Adapter,
            id: 2
        })
    );
    assert_eq!(
        recorder.take(),
        vec![("orphan", Outcome::Cancelled(CancelReason::SendFailed))]
    );
    assert_eq!(
        client.allocate(ObjectType::Device).unwrap(),
        Handle::new(1, 1)
    );
}

#[test]
fn device_notifications_are_queued_as_events() {
    let mut client = client();
    let stream = [
        ret(
            ReturnKind::DeviceLogging,
            vec![
                Value::U32(LoggingLevel::Info.as_u32()),
                Value::String("hello".into()),
            ],
        ),
        ret(
            ReturnKind::DeviceLost,
            vec![
                Value::U32(DeviceLostReason::Destroyed.as_u32()),
                Value::String("gone".into()),
            ],
        ),
    ]
    .concat();
    client.handle_commands(&stream).unwrap();

    assert_eq!(
        client.drain_events(),
        vec![
            DeviceEvent::Log {
                level: LoggingLevel::Info,
                message: "hello".into()
            },
            DeviceEvent::Lost {
                reason: DeviceLostReason::Destroyed,
                message: "gone".into()
            },
        ]
    );
    assert!(client.drain_events().is_empty());
}
