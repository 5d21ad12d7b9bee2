//! Client endpoint: allocates handles, encodes forward commands, and routes
//! return commands to the continuations waiting for them.

mod allocator;
mod outcome;

pub use allocator::ObjectAllocator;
pub use outcome::{CancelReason, DeviceEvent, Outcome, Reply};

use std::collections::BTreeMap;

use crate::buffer::Producer;
use crate::callbacks::CallbackMap;
use crate::chunked::ChunkedCommandHandler;
use crate::config::WireConfig;
use crate::error::{WireError, WireResult};
use crate::handle::{Handle, ObjectType};
use crate::schema::{
    decode, serialize, Args, CommandKind, CommandSchema, DeserializeAllocator, FieldKind,
    ForwardCommand, HandleIds, NoObjects, Record, ReturnCommand, ReturnKind, Value,
};
use crate::types::{
    AdapterProperties, AdapterType, CompilationMessage, CompilationMessageType, DeviceLostReason,
    ErrorType, FeatureName, LoggingLevel, MapMode, RequestAdapterOptions, RequestStatus,
    SupportedLimits,
};

/// Which object a pending request belongs to.
///
/// Serials are allocated per scope; releasing an object cancels every request
/// in its scope. Requests that name no object (queue, error scopes, adapter
/// requests, async pipeline creation) share the `Channel` scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestScope {
    Channel,
    Object(ObjectType, Handle),
}

#[derive(Debug, Default)]
struct ScopeRequests {
    callbacks: CallbackMap<Outcome>,
}

/// An object the server creates asynchronously and has not answered for yet.
///
/// The server holds only a reserved slot for it, so destroying it has to wait
/// until the reply arrives.
#[derive(Debug, Clone, Copy)]
struct PendingCreate {
    ty: ObjectType,
    handle: Handle,
    /// Released by the application while in flight.
    released: bool,
}

type PendingCreates = BTreeMap<(RequestScope, u64), PendingCreate>;

/// The untrusted side of a wire channel.
///
/// Commands are buffered until [`Client::take_outgoing`]; return commands are
/// fed to [`Client::handle_commands`] in whatever chunks the transport
/// delivers. Continuations run on the thread that calls `handle_commands` (or
/// `disconnect`).
#[derive(Debug)]
pub struct Client {
    allocators: Vec<ObjectAllocator>,
    producer: Producer,
    handler: ChunkedCommandHandler,
    decode_allocator: DeserializeAllocator,
    scopes: BTreeMap<RequestScope, ScopeRequests>,
    pending_creates: PendingCreates,
    events: Vec<DeviceEvent>,
    connected: bool,
}

impl Client {
    pub fn new(config: WireConfig) -> Self {
        let config = config.sanitized();
        Self {
            allocators: ObjectType::ALL
                .iter()
                .map(|&ty| ObjectAllocator::new(ty, config.max_object_id))
                .collect(),
            producer: Producer::with_config(&config),
            handler: ChunkedCommandHandler::with_config(&config),
            decode_allocator: DeserializeAllocator::new(config.max_decode_allocation),
            scopes: BTreeMap::new(),
            pending_creates: BTreeMap::new(),
            events: Vec::new(),
            connected: true,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn ensure_connected(&self) -> WireResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(WireError::Disconnected)
        }
    }

    /// Reserve a handle for an object this client is about to create.
    pub fn allocate(&mut self, ty: ObjectType) -> WireResult<Handle> {
        self.ensure_connected()?;
        self.allocators[ty.index()].allocate()
    }

    /// False once the application released `handle`, even while the id is
    /// still held for an in-flight creation.
    pub fn is_live(&self, ty: ObjectType, handle: Handle) -> bool {
        self.allocators[ty.index()].is_live(handle)
            && !self
                .pending_creates
                .values()
                .any(|p| p.released && p.ty == ty && p.handle == handle)
    }

    /// Encode a synchronous command.
    pub fn send(&mut self, cmd: &ForwardCommand<Handle>) -> WireResult<()> {
        self.ensure_connected()?;
        if cmd.kind.is_async() || cmd.kind == CommandKind::DestroyObject {
            return Err(WireError::SchemaMismatch {
                layout: cmd.kind.layout().name,
                field: cmd.kind.layout().fields.first().map_or("<end>", |f| f.name),
            });
        }
        serialize(cmd, &mut self.producer, &HandleIds)
    }

    /// Allocate the handle for `kind`'s result, build the command around it,
    /// and send it. The handle is freed again if sending fails.
    pub fn create(
        &mut self,
        kind: CommandKind,
        build: impl FnOnce(Handle) -> Vec<Value<Handle>>,
    ) -> WireResult<Handle> {
        let layout = kind.layout();
        let ty = layout
            .fields
            .iter()
            .find_map(|field| match field.kind {
                FieldKind::NewObject(ty) => Some(ty),
                _ => None,
            })
            .ok_or(WireError::SchemaMismatch {
                layout: layout.name,
                field: "result",
            })?;
        let handle = self.allocate(ty)?;
        let cmd = ForwardCommand::new(kind, build(handle));
        if let Err(err) = self.send(&cmd) {
            self.allocators[ty.index()].release(handle)?;
            return Err(err);
        }
        Ok(handle)
    }

    pub fn create_buffer(&mut self, label: &str) -> WireResult<Handle> {
        self.create(CommandKind::CreateBuffer, |handle| {
            vec![Value::NewObject(handle), Value::String(label.to_owned())]
        })
    }

    pub fn set_label(&mut self, ty: ObjectType, handle: Handle, label: &str) -> WireResult<()> {
        self.send(&ForwardCommand::new(
            CommandKind::SetLabel,
            vec![
                Value::U32(ty.as_u32()),
                Value::Handle(handle),
                Value::String(label.to_owned()),
            ],
        ))
    }

    /// Destroy an object: tell the server, free the id, and cancel the
    /// object's pending requests.
    ///
    /// An object whose asynchronous creation has not been answered yet is
    /// only marked released; it is destroyed and its id freed when the reply
    /// arrives.
    pub fn release(&mut self, ty: ObjectType, handle: Handle) -> WireResult<()> {
        self.ensure_connected()?;
        if !self.is_live(ty, handle) {
            return Err(WireError::UnknownObject { ty, id: handle.id });
        }
        let in_flight = self
            .pending_creates
            .values_mut()
            .find(|p| p.ty == ty && p.handle == handle);
        if let Some(pending) = in_flight {
            pending.released = true;
            tracing::debug!(%handle, ty = ty.name(), "deferring release until creation completes");
        } else {
            serialize(&destroy_command(ty, handle), &mut self.producer, &HandleIds)?;
            self.allocators[ty.index()].release(handle)?;
        }

        let scope = RequestScope::Object(ty, handle);
        if let Some(mut requests) = self.scopes.remove(&scope) {
            let cancelled = requests
                .callbacks
                .cancel_all(|_| Outcome::Cancelled(CancelReason::ObjectReleased));
            tracing::debug!(%handle, ty = ty.name(), cancelled, "released object with pending requests");
        }
        // Objects this one was creating have no one left to hand them to.
        for (_, pending) in self
            .pending_creates
            .iter_mut()
            .filter(|((owner, _), _)| *owner == scope)
        {
            pending.released = true;
        }
        Ok(())
    }

    /// Object-scoped requests name their object in the first field.
    fn scope_of(cmd: &ForwardCommand<Handle>) -> RequestScope {
        let first_field = cmd.kind.layout().fields.first().map(|field| field.kind);
        match (first_field, cmd.args.values.first()) {
            (Some(FieldKind::Object { ty, .. }), Some(Value::Object(Some(handle)))) => {
                RequestScope::Object(ty, *handle)
            }
            _ => RequestScope::Channel,
        }
    }

    /// Encode an asynchronous command and register `continuation` for its
    /// reply. Returns the request serial.
    ///
    /// `continuation` is called exactly once: with the reply, or with
    /// [`Outcome::Cancelled`] if the request fails to send, its object is
    /// released, or the channel goes away.
    pub fn send_request<F>(
        &mut self,
        mut cmd: ForwardCommand<Handle>,
        continuation: F,
    ) -> WireResult<u64>
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        if !self.connected {
            continuation(Outcome::Cancelled(CancelReason::ConnectionLost));
            return Err(WireError::Disconnected);
        }
        let layout = cmd.kind.layout();
        if !cmd.kind.is_async() {
            continuation(Outcome::Cancelled(CancelReason::SendFailed));
            return Err(WireError::SchemaMismatch {
                layout: layout.name,
                field: "request_serial",
            });
        }
        let scope = Self::scope_of(&cmd);
        if let RequestScope::Object(ty, handle) = scope {
            if !self.is_live(ty, handle) {
                continuation(Outcome::Cancelled(CancelReason::SendFailed));
                return Err(WireError::UnknownObject { ty, id: handle.id });
            }
        }

        let requests = self.scopes.entry(scope).or_default();
        let serial = requests.callbacks.next_serial();
        if let Err(err) = cmd.args.set(layout, "request_serial", Value::U64(serial)) {
            continuation(Outcome::Cancelled(CancelReason::SendFailed));
            return Err(err);
        }
        requests.callbacks.register(serial, continuation)?;

        if let Err(err) = serialize(&cmd, &mut self.producer, &HandleIds) {
            if let Some(continuation) = requests.callbacks.unregister(serial) {
                continuation(Outcome::Cancelled(CancelReason::SendFailed));
            }
            return Err(err);
        }

        let created = layout
            .fields
            .iter()
            .zip(&cmd.args.values)
            .find_map(|(field, value)| match (field.kind, value) {
                (FieldKind::NewObject(ty), Value::NewObject(handle)) => Some((ty, *handle)),
                _ => None,
            });
        if let Some((ty, handle)) = created {
            self.pending_creates.insert(
                (scope, serial),
                PendingCreate {
                    ty,
                    handle,
                    released: false,
                },
            );
        }
        Ok(serial)
    }

    /// Allocate the result handle of an asynchronous creation and send it.
    /// The handle is freed again if sending fails.
    fn request_create<F>(
        &mut self,
        kind: CommandKind,
        ty: ObjectType,
        build: impl FnOnce(Handle) -> Vec<Value<Handle>>,
        continuation: F,
    ) -> WireResult<Handle>
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let handle = match self.allocate(ty) {
            Ok(handle) => handle,
            Err(err) => {
                let reason = if self.connected {
                    CancelReason::SendFailed
                } else {
                    CancelReason::ConnectionLost
                };
                continuation(Outcome::Cancelled(reason));
                return Err(err);
            }
        };
        let cmd = ForwardCommand::new(kind, build(handle));
        if let Err(err) = self.send_request(cmd, continuation) {
            if let Err(release_err) = self.allocators[ty.index()].release(handle) {
                tracing::debug!(error = %release_err, "unsent request handle already released");
            }
            return Err(err);
        }
        Ok(handle)
    }

    /// Ask the server for an adapter. The returned handle is usable once the
    /// reply reports success.
    pub fn request_adapter<F>(
        &mut self,
        options: RequestAdapterOptions,
        continuation: F,
    ) -> WireResult<Handle>
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        self.request_create(
            CommandKind::InstanceRequestAdapter,
            ObjectType::Adapter,
            |handle| {
                vec![
                    Value::U64(0),
                    Value::NewObject(handle),
                    Value::U32(options.power_preference.as_u32()),
                    Value::Bool(options.force_fallback_adapter),
                ]
            },
            continuation,
        )
    }

    /// Ask `adapter` for a device with `required_features`.
    pub fn request_device<F>(
        &mut self,
        adapter: Handle,
        label: &str,
        required_features: &[FeatureName],
        continuation: F,
    ) -> WireResult<Handle>
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let features = required_features
            .iter()
            .map(|f| Record::new(vec![Value::U32(f.as_u32())]))
            .collect();
        self.request_create(
            CommandKind::AdapterRequestDevice,
            ObjectType::Device,
            |handle| {
                vec![
                    Value::Object(Some(adapter)),
                    Value::U64(0),
                    Value::NewObject(handle),
                    Value::String(label.to_owned()),
                    Value::Array(features),
                ]
            },
            continuation,
        )
    }

    pub fn buffer_map_async<F>(
        &mut self,
        buffer: Handle,
        mode: MapMode,
        offset: u64,
        size: u64,
        continuation: F,
    ) -> WireResult<u64>
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let cmd = ForwardCommand::new(
            CommandKind::BufferMapAsync,
            vec![
                Value::Object(Some(buffer)),
                Value::U64(0),
                Value::U32(mode.bits()),
                Value::U64(offset),
                Value::U64(size),
            ],
        );
        self.send_request(cmd, continuation)
    }

    pub fn queue_on_submitted_work_done<F>(&mut self, continuation: F) -> WireResult<u64>
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let cmd = ForwardCommand::new(CommandKind::QueueOnSubmittedWorkDone, vec![Value::U64(0)]);
        self.send_request(cmd, continuation)
    }

    /// Requests still waiting for a reply.
    pub fn pending_requests(&self) -> usize {
        self.scopes.values().map(|s| s.callbacks.len()).sum()
    }

    /// Encoded forward commands not yet handed to the transport.
    pub fn take_outgoing(&mut self) -> Vec<u8> {
        self.producer.take()
    }

    pub fn drain_events(&mut self) -> Vec<DeviceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Feed one transport chunk of return commands.
    pub fn handle_commands(&mut self, chunk: &[u8]) -> WireResult<()> {
        self.ensure_connected()?;
        let Self {
            handler,
            decode_allocator,
            scopes,
            pending_creates,
            allocators,
            producer,
            events,
            ..
        } = self;
        let mut state = ReturnState {
            scopes,
            pending_creates,
            allocators,
            producer,
            events,
        };
        let result = handler.handle_chunk(chunk, |bytes| {
            decode_allocator.reset();
            let cmd: ReturnCommand = decode(bytes, decode_allocator, &NoObjects)?;
            tracing::trace!(command = cmd.kind.name(), size = bytes.len(), "return command");
            state.handle_return(&cmd)
        });
        if let Err(err) = &result {
            tracing::error!(error = %err, "wire client channel lost");
            self.disconnect();
        }
        result
    }

    /// Tear the channel down. Idempotent.
    ///
    /// Every pending request is cancelled with
    /// [`CancelReason::ConnectionLost`], scope by scope in ascending serial
    /// order, and a [`DeviceEvent::Lost`] is queued.
    pub fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        self.handler.poison();
        self.producer.take();
        for (_scope, mut requests) in std::mem::take(&mut self.scopes) {
            requests
                .callbacks
                .cancel_all(|_| Outcome::Cancelled(CancelReason::ConnectionLost));
        }
        for PendingCreate { ty, handle, .. } in std::mem::take(&mut self.pending_creates).into_values()
        {
            if let Err(err) = self.allocators[ty.index()].release(handle) {
                tracing::debug!(%handle, ty = ty.name(), error = %err, "in-flight handle already released");
            }
        }
        self.events.push(DeviceEvent::Lost {
            reason: DeviceLostReason::ConnectionLost,
            message: "wire connection lost".to_owned(),
        });
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn destroy_command(ty: ObjectType, handle: Handle) -> ForwardCommand<Handle> {
    ForwardCommand::new(
        CommandKind::DestroyObject,
        vec![Value::U32(ty.as_u32()), Value::Handle(handle)],
    )
}

fn read_limits(args: &mut Args<'_, Handle>) -> WireResult<Option<SupportedLimits>> {
    let Some(mut l) = args.optional_struct()? else {
        return Ok(None);
    };
    Ok(Some(SupportedLimits {
        max_texture_dimension_1d: l.u32()?,
        max_texture_dimension_2d: l.u32()?,
        max_texture_dimension_3d: l.u32()?,
        max_bind_groups: l.u32()?,
        max_buffer_size: l.u64()?,
        max_compute_workgroups_per_dimension: l.u32()?,
    }))
}

/// Known features only; the application cannot act on the others.
fn read_features(args: &mut Args<'_, Handle>) -> WireResult<Vec<FeatureName>> {
    let mut features = args.collect(|f| Ok(FeatureName::from_u32(f.u32()?)))?;
    features.retain(|&f| f != FeatureName::Unknown);
    Ok(features)
}

/// The parts of a [`Client`] that return commands update.
struct ReturnState<'a> {
    scopes: &'a mut BTreeMap<RequestScope, ScopeRequests>,
    pending_creates: &'a mut PendingCreates,
    allocators: &'a mut [ObjectAllocator],
    producer: &'a mut Producer,
    events: &'a mut Vec<DeviceEvent>,
}

impl ReturnState<'_> {
    fn resolve(&mut self, scope: RequestScope, serial: u64, reply: Reply) {
        match self.scopes.get_mut(&scope) {
            Some(requests) => {
                requests.callbacks.resolve(serial, Outcome::Completed(reply));
            }
            None => tracing::debug!(?scope, serial, "dropping callback for an untracked object"),
        }
    }

    /// Settle the object an asynchronous creation named. Returns the handle
    /// the application may use, if any.
    ///
    /// A failed creation left nothing on the server, so only the id is freed.
    /// A successful one the application already released is destroyed now.
    fn settle_create(&mut self, scope: RequestScope, serial: u64, success: bool) -> Option<Handle> {
        let PendingCreate {
            ty,
            handle,
            released,
        } = self.pending_creates.remove(&(scope, serial))?;
        if success && !released {
            return Some(handle);
        }
        if success {
            tracing::debug!(%handle, ty = ty.name(), "destroying object released during creation");
            if let Err(err) = serialize(&destroy_command(ty, handle), self.producer, &HandleIds) {
                tracing::warn!(%handle, ty = ty.name(), error = %err, "failed to encode deferred destroy");
            }
        }
        if let Err(err) = self.allocators[ty.index()].release(handle) {
            tracing::debug!(%handle, ty = ty.name(), error = %err, "settled handle already released");
        }
        None
    }

    fn handle_return(&mut self, cmd: &ReturnCommand) -> WireResult<()> {
        let mut args = cmd.args();
        match cmd.kind {
            ReturnKind::DeviceLost => self.events.push(DeviceEvent::Lost {
                reason: DeviceLostReason::from_u32(args.u32()?),
                message: args.string()?.to_owned(),
            }),
            ReturnKind::DeviceUncapturedError => self.events.push(DeviceEvent::UncapturedError {
                error_type: ErrorType::from_u32(args.u32()?),
                message: args.string()?.to_owned(),
            }),
            ReturnKind::DeviceLogging => self.events.push(DeviceEvent::Log {
                level: LoggingLevel::from_u32(args.u32()?),
                message: args.string()?.to_owned(),
            }),
            ReturnKind::BufferMapAsyncCallback => {
                let buffer = args.handle()?;
                let serial = args.u64()?;
                let status = RequestStatus::from_u32(args.u32()?);
                let data = args.bytes()?.to_vec();
                self.resolve(
                    RequestScope::Object(ObjectType::Buffer, buffer),
                    serial,
                    Reply::MapAsync { status, data },
                );
            }
            ReturnKind::QueueWorkDoneCallback => {
                let serial = args.u64()?;
                let status = RequestStatus::from_u32(args.u32()?);
                self.resolve(RequestScope::Channel, serial, Reply::WorkDone { status });
            }
            ReturnKind::CreateComputePipelineAsyncCallback
            | ReturnKind::CreateRenderPipelineAsyncCallback => {
                let serial = args.u64()?;
                let status = RequestStatus::from_u32(args.u32()?);
                let message = args.string()?.to_owned();
                let pipeline = self.settle_create(RequestScope::Channel, serial, status.is_success());
                self.resolve(
                    RequestScope::Channel,
                    serial,
                    Reply::CreatePipeline {
                        status,
                        pipeline,
                        message,
                    },
                );
            }
            ReturnKind::PopErrorScopeCallback => {
                let serial = args.u64()?;
                let status = RequestStatus::from_u32(args.u32()?);
                let error_type = ErrorType::from_u32(args.u32()?);
                let message = args.string()?.to_owned();
                self.resolve(
                    RequestScope::Channel,
                    serial,
                    Reply::PopErrorScope {
                        status,
                        error_type,
                        message,
                    },
                );
            }
            ReturnKind::ShaderModuleGetCompilationInfoCallback => {
                let module = args.handle()?;
                let serial = args.u64()?;
                let status = RequestStatus::from_u32(args.u32()?);
                let messages = args.collect(|m| {
                    Ok(CompilationMessage {
                        message: m.string()?.to_owned(),
                        kind: CompilationMessageType::from_u32(m.u32()?),
                        line_num: m.u64()?,
                        line_pos: m.u64()?,
                        offset: m.u64()?,
                        length: m.u64()?,
                    })
                })?;
                self.resolve(
                    RequestScope::Object(ObjectType::ShaderModule, module),
                    serial,
                    Reply::CompilationInfo { status, messages },
                );
            }
            ReturnKind::InstanceRequestAdapterCallback => {
                let serial = args.u64()?;
                let status = RequestStatus::from_u32(args.u32()?);
                let message = args.string()?.to_owned();
                let properties = match args.optional_struct()? {
                    Some(mut p) => Some(AdapterProperties {
                        vendor_id: p.u32()?,
                        device_id: p.u32()?,
                        name: p.string()?.to_owned(),
                        driver_description: p.string()?.to_owned(),
                        adapter_type: AdapterType::from_u32(p.u32()?),
                        backend_type: p.u32()?,
                    }),
                    None => None,
                };
                let limits = read_limits(&mut args)?;
                let features = read_features(&mut args)?;
                let adapter = self.settle_create(RequestScope::Channel, serial, status.is_success());
                self.resolve(
                    RequestScope::Channel,
                    serial,
                    Reply::RequestAdapter {
                        status,
                        adapter,
                        message,
                        properties,
                        limits,
                        features,
                    },
                );
            }
            ReturnKind::AdapterRequestDeviceCallback => {
                let adapter = args.handle()?;
                let serial = args.u64()?;
                let status = RequestStatus::from_u32(args.u32()?);
                let message = args.string()?.to_owned();
                let limits = read_limits(&mut args)?;
                let features = read_features(&mut args)?;
                let scope = RequestScope::Object(ObjectType::Adapter, adapter);
                let device = self.settle_create(scope, serial, status.is_success());
                self.resolve(
                    scope,
                    serial,
                    Reply::RequestDevice {
                        status,
                        device,
                        message,
                        limits,
                        features,
                    },
                );
            }
        }
        Ok(())
    }
}
