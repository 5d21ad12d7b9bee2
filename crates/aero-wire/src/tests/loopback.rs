use std::sync::{Arc, Mutex};

use super::{create_buffer, init_tracing};
use crate::client::{CancelReason, Outcome, Reply};
use crate::error::WireError;
use crate::handle::{Handle, ObjectType};
use crate::schema::{CommandKind, ForwardCommand, Value};
use crate::test_utils::{Loopback, RecordingNative, MOCK_FEATURES, MOCK_LIMITS};
use crate::types::{
    AdapterType, CompilationMessageType, FeatureName, MapMode, RequestAdapterOptions,
    RequestStatus,
};

fn loopback(native: RecordingNative) -> Loopback {
    init_tracing();
    Loopback::new(native)
}

fn capture() -> (Arc<Mutex<Vec<Outcome>>>, impl FnOnce(Outcome) + Send + 'static) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    (log, move |outcome| sink.lock().unwrap().push(outcome))
}

#[test]
fn create_buffer_survives_three_byte_chunks() {
    let mut lo = loopback(RecordingNative::new()).chunked(3);
    let buffer = lo.client.create_buffer("").unwrap();
    assert_eq!(buffer, Handle::new(1, 0));
    lo.flush().unwrap();

    let table = lo.server.objects().table(ObjectType::Buffer);
    assert!(table.contains(Handle::new(1, 0)));
    assert_eq!(table.len(), 1);

    lo.client.release(ObjectType::Buffer, buffer).unwrap();
    lo.flush().unwrap();
    assert_eq!(lo.server.live_objects(), 0);
    assert_eq!(lo.native().released.len(), 1);

    let again = lo.client.create_buffer("").unwrap();
    assert_eq!(again, Handle::new(1, 1));
    lo.flush().unwrap();
    assert!(lo
        .server
        .objects()
        .table(ObjectType::Buffer)
        .contains(again));

    lo.client.release(ObjectType::Buffer, again).unwrap();
    lo.flush().unwrap();
    assert!(matches!(
        lo.server.handle_commands(&create_buffer(Handle::new(1, 0), "")),
        Err(WireError::GenerationRegression { id: 1, .. })
    ));
}

#[test]
fn write_then_map_read_round_trips_through_both_endpoints() {
    let mut lo = loopback(RecordingNative::auto_completing()).chunked(5);
    let buffer = lo.client.create_buffer("readback").unwrap();
    lo.client
        .send(&ForwardCommand::new(
            CommandKind::BufferStorage,
            vec![
                Value::Object(Some(buffer)),
                Value::U64(4),
                Value::U32(0),
                Value::Bool(false),
            ],
        ))
        .unwrap();
    lo.client
        .send(&ForwardCommand::new(
            CommandKind::QueueWriteBuffer,
            vec![
                Value::Object(Some(buffer)),
                Value::U64(0),
                Value::Bytes(vec![9, 8, 7, 6]),
            ],
        ))
        .unwrap();
    let (log, continuation) = capture();
    lo.client
        .buffer_map_async(buffer, MapMode::READ, 1, 2, continuation)
        .unwrap();
    lo.flush().unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![Outcome::Completed(Reply::MapAsync {
            status: RequestStatus::Success,
            data: vec![8, 7],
        })]
    );
    assert_eq!(lo.client.pending_requests(), 0);
}

#[test]
fn held_completions_resolve_out_of_order() {
    let mut lo = loopback(RecordingNative::new());
    let (first_log, first) = capture();
    let (second_log, second) = capture();
    lo.client.queue_on_submitted_work_done(first).unwrap();
    lo.client.queue_on_submitted_work_done(second).unwrap();
    lo.flush().unwrap();
    assert_eq!(lo.client.pending_requests(), 2);

    let later = lo.native_mut().pending_work_done.remove(0);
    let sooner = lo.native_mut().pending_work_done.remove(0);
    sooner.complete(RequestStatus::Success);
    lo.flush().unwrap();
    assert!(first_log.lock().unwrap().is_empty());
    assert_eq!(second_log.lock().unwrap().len(), 1);

    drop(later);
    lo.flush().unwrap();
    assert_eq!(
        *first_log.lock().unwrap(),
        vec![Outcome::Completed(Reply::WorkDone {
            status: RequestStatus::Unknown
        })]
    );
}

#[test]
fn compilation_info_reports_backend_messages() {
    let mut lo = loopback(RecordingNative::auto_completing());
    let module = lo
        .client
        .create(CommandKind::CreateShaderModule, |handle| {
            vec![
                Value::NewObject(handle),
                Value::String("broken".into()),
                Value::String("fn main() {}\nlet x = error;".into()),
            ]
        })
        .unwrap();
    let (log, continuation) = capture();
    lo.client
        .send_request(
            ForwardCommand::new(
                CommandKind::ShaderModuleGetCompilationInfo,
                vec![Value::Object(Some(module)), Value::U64(0)],
            ),
            continuation,
        )
        .unwrap();
    lo.flush().unwrap();

    let log = log.lock().unwrap();
    let Some(Reply::CompilationInfo { status, messages }) = log[0].reply() else {
        panic!("unexpected outcome {:?}", log[0]);
    };
    assert_eq!(*status, RequestStatus::Success);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].kind, CompilationMessageType::Error);
    assert_eq!(messages[0].line_num, 2);
    assert_eq!(messages[0].line_pos, 9);
}

#[test]
fn server_failure_cancels_client_requests_on_disconnect() {
    let mut lo = loopback(RecordingNative::new());
    let (log, continuation) = capture();
    lo.client.queue_on_submitted_work_done(continuation).unwrap();
    lo.flush().unwrap();

    lo.server
        .handle_commands(&[0, 0, 0, 0])
        .unwrap_err();
    assert!(!lo.server.is_connected());
    lo.client.disconnect();
    assert_eq!(
        *log.lock().unwrap(),
        vec![Outcome::Cancelled(CancelReason::ConnectionLost)]
    );
}

fn shader_module(lo: &mut Loopback) -> Handle {
    lo.client
        .create(CommandKind::CreateShaderModule, |handle| {
            vec![
                Value::NewObject(handle),
                Value::String(String::new()),
                Value::String("@compute fn main() {}".into()),
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

/// A pipeline released while the server is still building it.
fn released_in_flight_pipeline(lo: &mut Loopback) -> (Handle, Arc<Mutex<Vec<Outcome>>>) {
    let module = shader_module(lo);
    let pipeline = lo.client.allocate(ObjectType::ComputePipeline).unwrap();
    let (log, continuation) = capture();
    lo.client
        .send_request(compute_pipeline_async(module, pipeline), continuation)
        .unwrap();
    lo.flush().unwrap();
    assert!(lo
        .server
        .objects()
        .table(ObjectType::ComputePipeline)
        .is_reserved(pipeline));

    lo.client
        .release(ObjectType::ComputePipeline, pipeline)
        .unwrap();
    assert!(!lo.client.is_live(ObjectType::ComputePipeline, pipeline));
    assert_eq!(
        lo.client.release(ObjectType::ComputePipeline, pipeline),
        Err(WireError::UnknownObject {
            ty: ObjectType::ComputePipeline,
            id: pipeline.id
        })
    );
    lo.flush().unwrap();
    assert!(lo.server.is_connected());
    (pipeline, log)
}

#[test]
fn pipeline_released_during_creation_is_destroyed_after_the_reply() {
    let mut lo = loopback(RecordingNative::new());
    let (pipeline, log) = released_in_flight_pipeline(&mut lo);

    let (object, completion) = lo.native_mut().pending_pipelines.pop().unwrap();
    assert_eq!(completion.complete(Ok(object)), Ok(()));
    lo.flush().unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec![Outcome::Completed(Reply::CreatePipeline {
            status: RequestStatus::Success,
            pipeline: None,
            message: String::new(),
        })]
    );

    // The deferred destroy goes out with the next flush.
    lo.flush().unwrap();
    assert!(lo.server.is_connected());
    assert!(!lo
        .server
        .objects()
        .table(ObjectType::ComputePipeline)
        .contains(pipeline));
    assert_eq!(lo.server.live_objects(), 1);
    let released: Vec<_> = lo.native().released.iter().map(|(ty, _)| *ty).collect();
    assert_eq!(released, [ObjectType::ComputePipeline]);

    let reused = lo.client.allocate(ObjectType::ComputePipeline).unwrap();
    assert_eq!(reused, Handle::new(pipeline.id, pipeline.generation + 1));
}

#[test]
fn pipeline_released_during_failed_creation_only_frees_the_id() {
    let mut lo = loopback(RecordingNative::new());
    let (pipeline, log) = released_in_flight_pipeline(&mut lo);

    let (_object, completion) = lo.native_mut().pending_pipelines.pop().unwrap();
    assert_eq!(completion.complete(Err("bad entry point".into())), Ok(()));
    lo.flush().unwrap();
    lo.flush().unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![Outcome::Completed(Reply::CreatePipeline {
            status: RequestStatus::Error,
            pipeline: None,
            message: "bad entry point".into(),
        })]
    );
    assert!(lo.server.is_connected());
    assert!(lo.native().released.is_empty());
    assert_eq!(
        lo.client.allocate(ObjectType::ComputePipeline).unwrap(),
        Handle::new(pipeline.id, pipeline.generation + 1)
    );
}

#[test]
fn adapter_and_device_requests_hand_out_usable_handles() {
    let mut lo = loopback(RecordingNative::auto_completing());
    let (adapter_log, continuation) = capture();
    let adapter = lo
        .client
        .request_adapter(
            RequestAdapterOptions {
                force_fallback_adapter: true,
                ..RequestAdapterOptions::default()
            },
            continuation,
        )
        .unwrap();
    lo.flush().unwrap();

    let adapter_log = adapter_log.lock().unwrap();
    let Some(Reply::RequestAdapter {
        status,
        adapter: granted,
        properties: Some(properties),
        limits,
        features,
        ..
    }) = adapter_log[0].reply()
    else {
        panic!("unexpected outcome {:?}", adapter_log[0]);
    };
    assert!(status.is_success());
    assert_eq!(*granted, Some(adapter));
    assert_eq!(properties.adapter_type, AdapterType::Cpu);
    assert_eq!(*limits, Some(MOCK_LIMITS));
    assert_eq!(features.as_slice(), MOCK_FEATURES);

    let (device_log, continuation) = capture();
    let device = lo
        .client
        .request_device(adapter, "main", &[FeatureName::TimestampQuery], continuation)
        .unwrap();
    lo.flush().unwrap();
    assert_eq!(
        *device_log.lock().unwrap(),
        vec![Outcome::Completed(Reply::RequestDevice {
            status: RequestStatus::Success,
            device: Some(device),
            message: String::new(),
            limits: Some(MOCK_LIMITS),
            features: vec![FeatureName::TimestampQuery],
        })]
    );
    assert!(lo.server.objects().table(ObjectType::Device).contains(device));
    assert!(lo.client.is_live(ObjectType::Device, device));
}

#[test]
fn releasing_an_adapter_abandons_its_device_request() {
    let mut lo = loopback(RecordingNative::new());
    let adapter = lo
        .client
        .request_adapter(RequestAdapterOptions::default(), |_| {})
        .unwrap();
    lo.grant().unwrap();

    let (log, continuation) = capture();
    let device = lo
        .client
        .request_device(adapter, "", &[], continuation)
        .unwrap();
    lo.flush().unwrap();
    lo.client.release(ObjectType::Adapter, adapter).unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec![Outcome::Cancelled(CancelReason::ObjectReleased)]
    );
    assert!(!lo.client.is_live(ObjectType::Device, device));

    lo.grant().unwrap();
    lo.flush().unwrap();
    assert!(lo.server.is_connected());
    assert_eq!(lo.server.live_objects(), 0);
    let released: Vec<_> = lo.native().released.iter().map(|(ty, _)| *ty).collect();
    assert_eq!(released, [ObjectType::Adapter, ObjectType::Device]);
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn unsupported_device_features_fail_the_request() {
    let mut lo = loopback(RecordingNative::auto_completing());
    let adapter = lo
        .client
        .request_adapter(RequestAdapterOptions::default(), |_| {})
        .unwrap();
    lo.flush().unwrap();

    let (log, continuation) = capture();
    let device = lo
        .client
        .request_device(
            adapter,
            "",
            &[FeatureName::TextureCompressionBc],
            continuation,
        )
        .unwrap();
    lo.flush().unwrap();

    let log = log.lock().unwrap();
    let Some(Reply::RequestDevice {
        status,
        device: None,
        limits: None,
        ..
    }) = log[0].reply()
    else {
        panic!("unexpected outcome {:?}", log[0]);
    };
    assert_eq!(*status, RequestStatus::Error);
    assert!(!lo.client.is_live(ObjectType::Device, device));
    assert!(!lo.server.objects().table(ObjectType::Device).is_reserved(device));
}

#[test]
fn texture_copies_reach_the_backend_with_their_layouts() {
    let mut lo = loopback(RecordingNative::new());
    let live = lo.populate().unwrap();
    lo.client
        .send(&ForwardCommand::new(
            CommandKind::CommandEncoderCopyBufferToTexture,
            vec![
                Value::Object(Some(live[&ObjectType::CommandEncoder])),
                Value::Object(Some(live[&ObjectType::Buffer])),
                Value::U64(512),
                Value::U32(256),
                Value::U32(4),
                Value::Object(Some(live[&ObjectType::Texture])),
                Value::U32(1),
                Value::U32(0),
                Value::U32(0),
                Value::U32(0),
                Value::U32(0),
                Value::U32(16),
                Value::U32(4),
                Value::U32(1),
            ],
        ))
        .unwrap();
    lo.client
        .send(&ForwardCommand::new(
            CommandKind::RenderPassDrawIndirect,
            vec![
                Value::Object(Some(live[&ObjectType::RenderPassEncoder])),
                Value::Object(Some(live[&ObjectType::Buffer])),
                Value::U64(64),
            ],
        ))
        .unwrap();
    lo.flush().unwrap();

    let copies = lo.native().calls_to("command_encoder_copy_buffer_to_texture");
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].objects.len(), 3);
    assert!(copies[0].detail.contains("offset: 512, bytes_per_row: 256"));
    assert!(copies[0].detail.contains("mip=1"));
    let draws = lo.native().calls_to("render_pass_draw_indirect");
    assert_eq!(draws[0].detail, "offset=64");
}
