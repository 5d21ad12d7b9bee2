//! Return commands produced outside the dispatch loop.
//!
//! Asynchronous native work finishes whenever the backend decides, possibly
//! on another thread. Every completion shares one [`ReturnSink`] and writes
//! its whole return command while holding the sink's lock, so return commands
//! never interleave on the wire.

use core::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::buffer::Producer;
use crate::config::WireConfig;
use crate::handle::{Handle, ObjectType};
use crate::schema::{serialize, NoObjects, Record, ReturnCommand, ReturnKind, Value};
use crate::types::{
    AdapterProperties, CompilationMessage, DeviceLostReason, ErrorType, FeatureName,
    LoggingLevel, RequestStatus, SupportedLimits,
};

/// Object-table change that has to wait for the dispatch loop.
#[derive(Debug)]
pub(crate) enum TableOp<T> {
    Fill {
        ty: ObjectType,
        handle: Handle,
        object: T,
    },
    Unreserve {
        ty: ObjectType,
        handle: Handle,
    },
}

#[derive(Debug)]
struct SinkState<T> {
    producer: Producer,
    table_ops: Vec<TableOp<T>>,
    closed: bool,
}

/// Shared, lock-protected output stream for return commands.
pub struct ReturnSink<T> {
    inner: Arc<Mutex<SinkState<T>>>,
}

impl<T> Clone for ReturnSink<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for ReturnSink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ReturnSink")
            .field("pending_bytes", &state.producer.len())
            .field("table_ops", &state.table_ops.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl<T> ReturnSink<T> {
    pub(crate) fn new(config: &WireConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SinkState {
                producer: Producer::with_config(config),
                table_ops: Vec::new(),
                closed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SinkState<T>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Serialize `cmd`, or `fallback()` when `cmd` cannot be encoded (for
    /// example because its payload exceeds the command size limit). `op` is
    /// queued under the same lock, or handed back if the sink is closed.
    fn send(
        &self,
        cmd: ReturnCommand,
        fallback: impl FnOnce() -> ReturnCommand,
        op: Option<TableOp<T>>,
    ) -> Option<TableOp<T>> {
        let mut state = self.lock();
        if state.closed {
            tracing::debug!(command = cmd.kind.name(), "dropping return command after teardown");
            return op;
        }
        if let Err(err) = serialize(&cmd, &mut state.producer, &NoObjects) {
            tracing::warn!(command = cmd.kind.name(), error = %err, "return command does not fit; sending error status");
            let fallback = fallback();
            if let Err(err) = serialize(&fallback, &mut state.producer, &NoObjects) {
                tracing::error!(command = fallback.kind.name(), error = %err, "failed to encode return command");
            }
        }
        if let Some(op) = op {
            state.table_ops.push(op);
        }
        None
    }

    pub(crate) fn take_outgoing(&self) -> Vec<u8> {
        self.lock().producer.take()
    }

    pub(crate) fn take_table_ops(&self) -> Vec<TableOp<T>> {
        std::mem::take(&mut self.lock().table_ops)
    }

    /// Stop accepting return commands. Returns the table operations that were
    /// still queued so their objects can be released.
    pub(crate) fn close(&self) -> Vec<TableOp<T>> {
        let mut state = self.lock();
        state.closed = true;
        state.producer.take();
        std::mem::take(&mut state.table_ops)
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

fn command(kind: ReturnKind, values: Vec<Value<Handle>>) -> ReturnCommand {
    ReturnCommand::new(kind, values)
}

/// A slot the dispatcher reserved for an object the backend creates later.
#[derive(Debug, Clone, Copy)]
struct Reservation {
    ty: ObjectType,
    handle: Handle,
}

impl Reservation {
    /// Send the reply and fill the slot with `object`, or free it when there
    /// is none. `object` comes back as `Err` if the channel is already gone.
    fn settle<T>(
        self,
        sink: &ReturnSink<T>,
        cmd: ReturnCommand,
        fallback: impl FnOnce() -> ReturnCommand,
        object: Option<T>,
    ) -> Result<(), T> {
        let Reservation { ty, handle } = self;
        let op = match object {
            Some(object) => TableOp::Fill { ty, handle, object },
            None => TableOp::Unreserve { ty, handle },
        };
        match sink.send(cmd, fallback, Some(op)) {
            Some(TableOp::Fill { object, .. }) => Err(object),
            _ => Ok(()),
        }
    }
}

fn limits_record(limits: &SupportedLimits) -> Record<Handle> {
    Record::new(vec![
        Value::U32(limits.max_texture_dimension_1d),
        Value::U32(limits.max_texture_dimension_2d),
        Value::U32(limits.max_texture_dimension_3d),
        Value::U32(limits.max_bind_groups),
        Value::U64(limits.max_buffer_size),
        Value::U32(limits.max_compute_workgroups_per_dimension),
    ])
}

fn feature_records(features: &[FeatureName]) -> Vec<Record<Handle>> {
    features
        .iter()
        .map(|feature| Record::new(vec![Value::U32(feature.as_u32())]))
        .collect()
}

/// Device-level notifications a backend can raise at any time.
pub struct DeviceEvents<T> {
    sink: ReturnSink<T>,
}

impl<T> Clone for DeviceEvents<T> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
        }
    }
}

impl<T> fmt::Debug for DeviceEvents<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceEvents").field("sink", &self.sink).finish()
    }
}

impl<T> DeviceEvents<T> {
    pub(crate) fn new(sink: ReturnSink<T>) -> Self {
        Self { sink }
    }

    pub fn device_lost(&self, reason: DeviceLostReason, message: &str) {
        self.message(ReturnKind::DeviceLost, reason.as_u32(), message);
    }

    pub fn uncaptured_error(&self, error_type: ErrorType, message: &str) {
        self.message(ReturnKind::DeviceUncapturedError, error_type.as_u32(), message);
    }

    pub fn log(&self, level: LoggingLevel, message: &str) {
        self.message(ReturnKind::DeviceLogging, level.as_u32(), message);
    }

    fn message(&self, kind: ReturnKind, code: u32, message: &str) {
        self.sink.send(
            command(kind, vec![Value::U32(code), Value::String(message.to_owned())]),
            || command(kind, vec![Value::U32(code), Value::String(String::new())]),
            None,
        );
    }
}

/// Result of `BufferMapAsync`.
///
/// For read mappings `data` carries the mapped range back to the client.
#[derive(Debug)]
pub struct MapAsyncCompletion<T> {
    sink: Option<ReturnSink<T>>,
    buffer: Handle,
    request_serial: u64,
}

impl<T> MapAsyncCompletion<T> {
    pub(crate) fn new(sink: ReturnSink<T>, buffer: Handle, request_serial: u64) -> Self {
        Self {
            sink: Some(sink),
            buffer,
            request_serial,
        }
    }

    pub fn request_serial(&self) -> u64 {
        self.request_serial
    }

    pub fn complete(mut self, status: RequestStatus, data: Vec<u8>) {
        self.finish(status, data);
    }

    fn finish(&mut self, status: RequestStatus, data: Vec<u8>) {
        let Some(sink) = self.sink.take() else {
            return;
        };
        let buffer = self.buffer;
        let serial = self.request_serial;
        let build = |status: RequestStatus, data: Vec<u8>| {
            command(
                ReturnKind::BufferMapAsyncCallback,
                vec![
                    Value::Handle(buffer),
                    Value::U64(serial),
                    Value::U32(status.as_u32()),
                    Value::Bytes(data),
                ],
            )
        };
        sink.send(
            build(status, data),
            || build(RequestStatus::Error, Vec::new()),
            None,
        );
    }
}

impl<T> Drop for MapAsyncCompletion<T> {
    fn drop(&mut self) {
        self.finish(RequestStatus::Unknown, Vec::new());
    }
}

/// Result of `ShaderModuleGetCompilationInfo`.
#[derive(Debug)]
pub struct CompilationInfoCompletion<T> {
    sink: Option<ReturnSink<T>>,
    module: Handle,
    request_serial: u64,
}

impl<T> CompilationInfoCompletion<T> {
    pub(crate) fn new(sink: ReturnSink<T>, module: Handle, request_serial: u64) -> Self {
        Self {
            sink: Some(sink),
            module,
            request_serial,
        }
    }

    pub fn complete(mut self, status: RequestStatus, messages: &[CompilationMessage]) {
        self.finish(status, messages);
    }

    fn finish(&mut self, status: RequestStatus, messages: &[CompilationMessage]) {
        let Some(sink) = self.sink.take() else {
            return;
        };
        let module = self.module;
        let serial = self.request_serial;
        let build = |status: RequestStatus, messages: &[CompilationMessage]| {
            let records = messages
                .iter()
                .map(|m| {
                    Record::new(vec![
                        Value::String(m.message.clone()),
                        Value::U32(m.kind.as_u32()),
                        Value::U64(m.line_num),
                        Value::U64(m.line_pos),
                        Value::U64(m.offset),
                        Value::U64(m.length),
                    ])
                })
                .collect();
            command(
                ReturnKind::ShaderModuleGetCompilationInfoCallback,
                vec![
                    Value::Handle(module),
                    Value::U64(serial),
                    Value::U32(status.as_u32()),
                    Value::Array(records),
                ],
            )
        };
        sink.send(
            build(status, messages),
            || build(RequestStatus::Error, &[]),
            None,
        );
    }
}

impl<T> Drop for CompilationInfoCompletion<T> {
    fn drop(&mut self) {
        self.finish(RequestStatus::Unknown, &[]);
    }
}

/// Result of `CreateComputePipelineAsync` / `CreateRenderPipelineAsync`.
///
/// The handle was reserved when the command was dispatched. Completing with
/// an object fills that slot; failing, or dropping the completion, frees it.
#[derive(Debug)]
pub struct PipelineCompletion<T> {
    sink: Option<ReturnSink<T>>,
    kind: ReturnKind,
    reservation: Reservation,
    request_serial: u64,
}

impl<T> PipelineCompletion<T> {
    pub(crate) fn new(
        sink: ReturnSink<T>,
        ty: ObjectType,
        handle: Handle,
        request_serial: u64,
    ) -> Self {
        let kind = match ty {
            ObjectType::RenderPipeline => ReturnKind::CreateRenderPipelineAsyncCallback,
            _ => ReturnKind::CreateComputePipelineAsyncCallback,
        };
        Self {
            sink: Some(sink),
            kind,
            reservation: Reservation { ty, handle },
            request_serial,
        }
    }

    pub fn object_type(&self) -> ObjectType {
        self.reservation.ty
    }

    /// `Err` carries the message reported to the client.
    ///
    /// If the channel was torn down first, the pipeline is handed back and
    /// the backend must release it itself.
    pub fn complete(mut self, result: Result<T, String>) -> Result<(), T> {
        match result {
            Ok(object) => self.finish(RequestStatus::Success, String::new(), Some(object)),
            Err(message) => self.finish(RequestStatus::Error, message, None),
        }
    }

    fn finish(&mut self, status: RequestStatus, message: String, object: Option<T>) -> Result<(), T> {
        let Some(sink) = self.sink.take() else {
            return object.map_or(Ok(()), Err);
        };
        let kind = self.kind;
        let serial = self.request_serial;
        let build = |message: String| {
            command(
                kind,
                vec![
                    Value::U64(serial),
                    Value::U32(status.as_u32()),
                    Value::String(message),
                ],
            )
        };
        self.reservation
            .settle(&sink, build(message), || build(String::new()), object)
    }
}

impl<T> Drop for PipelineCompletion<T> {
    fn drop(&mut self) {
        let _ = self.finish(RequestStatus::Unknown, String::new(), None);
    }
}

/// What a backend reports about an adapter it grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    pub properties: AdapterProperties,
    pub limits: SupportedLimits,
    pub features: Vec<FeatureName>,
}

/// Result of `InstanceRequestAdapter`. Fills or frees the reserved adapter
/// slot the same way [`PipelineCompletion`] does.
#[derive(Debug)]
pub struct AdapterCompletion<T> {
    sink: Option<ReturnSink<T>>,
    reservation: Reservation,
    request_serial: u64,
}

impl<T> AdapterCompletion<T> {
    pub(crate) fn new(sink: ReturnSink<T>, handle: Handle, request_serial: u64) -> Self {
        Self {
            sink: Some(sink),
            reservation: Reservation {
                ty: ObjectType::Adapter,
                handle,
            },
            request_serial,
        }
    }

    /// Hands the adapter back if the channel is already gone.
    pub fn complete(mut self, result: Result<(T, AdapterInfo), String>) -> Result<(), T> {
        match result {
            Ok((object, info)) => {
                self.finish(RequestStatus::Success, "", Some(&info), Some(object))
            }
            Err(message) => self.finish(RequestStatus::Error, &message, None, None),
        }
    }

    fn finish(
        &mut self,
        status: RequestStatus,
        message: &str,
        info: Option<&AdapterInfo>,
        object: Option<T>,
    ) -> Result<(), T> {
        let Some(sink) = self.sink.take() else {
            return object.map_or(Ok(()), Err);
        };
        let serial = self.request_serial;
        let build = |message: &str| {
            let properties = info.map(|info| {
                let p = &info.properties;
                Record::new(vec![
                    Value::U32(p.vendor_id),
                    Value::U32(p.device_id),
                    Value::String(p.name.clone()),
                    Value::String(p.driver_description.clone()),
                    Value::U32(p.adapter_type.as_u32()),
                    Value::U32(p.backend_type),
                ])
            });
            command(
                ReturnKind::InstanceRequestAdapterCallback,
                vec![
                    Value::U64(serial),
                    Value::U32(status.as_u32()),
                    Value::String(message.to_owned()),
                    Value::Struct(properties),
                    Value::Struct(info.map(|info| limits_record(&info.limits))),
                    Value::Array(info.map_or_else(Vec::new, |info| feature_records(&info.features))),
                ],
            )
        };
        self.reservation
            .settle(&sink, build(message), || build(""), object)
    }
}

impl<T> Drop for AdapterCompletion<T> {
    fn drop(&mut self) {
        let _ = self.finish(RequestStatus::Unknown, "", None, None);
    }
}

/// What a backend reports about a device it creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub limits: SupportedLimits,
    pub features: Vec<FeatureName>,
}

/// Result of `AdapterRequestDevice`.
#[derive(Debug)]
pub struct DeviceCompletion<T> {
    sink: Option<ReturnSink<T>>,
    adapter: Handle,
    reservation: Reservation,
    request_serial: u64,
}

impl<T> DeviceCompletion<T> {
    pub(crate) fn new(
        sink: ReturnSink<T>,
        adapter: Handle,
        handle: Handle,
        request_serial: u64,
    ) -> Self {
        Self {
            sink: Some(sink),
            adapter,
            reservation: Reservation {
                ty: ObjectType::Device,
                handle,
            },
            request_serial,
        }
    }

    /// Hands the device back if the channel is already gone.
    pub fn complete(mut self, result: Result<(T, DeviceInfo), String>) -> Result<(), T> {
        match result {
            Ok((object, info)) => {
                self.finish(RequestStatus::Success, "", Some(&info), Some(object))
            }
            Err(message) => self.finish(RequestStatus::Error, &message, None, None),
        }
    }

    fn finish(
        &mut self,
        status: RequestStatus,
        message: &str,
        info: Option<&DeviceInfo>,
        object: Option<T>,
    ) -> Result<(), T> {
        let Some(sink) = self.sink.take() else {
            return object.map_or(Ok(()), Err);
        };
        let adapter = self.adapter;
        let serial = self.request_serial;
        let build = |message: &str| {
            command(
                ReturnKind::AdapterRequestDeviceCallback,
                vec![
                    Value::Handle(adapter),
                    Value::U64(serial),
                    Value::U32(status.as_u32()),
                    Value::String(message.to_owned()),
                    Value::Struct(info.map(|info| limits_record(&info.limits))),
                    Value::Array(info.map_or_else(Vec::new, |info| feature_records(&info.features))),
                ],
            )
        };
        self.reservation
            .settle(&sink, build(message), || build(""), object)
    }
}

impl<T> Drop for DeviceCompletion<T> {
    fn drop(&mut self) {
        let _ = self.finish(RequestStatus::Unknown, "", None, None);
    }
}

/// Result of `QueueOnSubmittedWorkDone`.
#[derive(Debug)]
pub struct WorkDoneCompletion<T> {
    sink: Option<ReturnSink<T>>,
    request_serial: u64,
}

impl<T> WorkDoneCompletion<T> {
    pub(crate) fn new(sink: ReturnSink<T>, request_serial: u64) -> Self {
        Self {
            sink: Some(sink),
            request_serial,
        }
    }

    pub fn complete(mut self, status: RequestStatus) {
        self.finish(status);
    }

    fn finish(&mut self, status: RequestStatus) {
        let Some(sink) = self.sink.take() else {
            return;
        };
        let build = || {
            command(
                ReturnKind::QueueWorkDoneCallback,
                vec![Value::U64(self.request_serial), Value::U32(status.as_u32())],
            )
        };
        sink.send(build(), build, None);
    }
}

impl<T> Drop for WorkDoneCompletion<T> {
    fn drop(&mut self) {
        self.finish(RequestStatus::Unknown);
    }
}

/// Result of `DevicePopErrorScope`.
#[derive(Debug)]
pub struct PopErrorScopeCompletion<T> {
    sink: Option<ReturnSink<T>>,
    request_serial: u64,
}

impl<T> PopErrorScopeCompletion<T> {
    pub(crate) fn new(sink: ReturnSink<T>, request_serial: u64) -> Self {
        Self {
            sink: Some(sink),
            request_serial,
        }
    }

    pub fn complete(mut self, status: RequestStatus, error_type: ErrorType, message: &str) {
        self.finish(status, error_type, message);
    }

    fn finish(&mut self, status: RequestStatus, error_type: ErrorType, message: &str) {
        let Some(sink) = self.sink.take() else {
            return;
        };
        let serial = self.request_serial;
        let build = |message: &str| {
            command(
                ReturnKind::PopErrorScopeCallback,
                vec![
                    Value::U64(serial),
                    Value::U32(status.as_u32()),
                    Value::U32(error_type.as_u32()),
                    Value::String(message.to_owned()),
                ],
            )
        };
        sink.send(build(message), || build(""), None);
    }
}

impl<T> Drop for PopErrorScopeCompletion<T> {
    fn drop(&mut self) {
        self.finish(RequestStatus::Unknown, ErrorType::Unknown, "");
    }
}
