//! Server endpoint: reassembles forward commands, dispatches them to a
//! [`NativeApi`], and produces return commands.

mod completion;
mod dispatch;
mod known;
mod native;

pub use completion::{
    AdapterCompletion, AdapterInfo, CompilationInfoCompletion, DeviceCompletion, DeviceEvents,
    DeviceInfo, MapAsyncCompletion, PipelineCompletion, PopErrorScopeCompletion, ReturnSink,
    WorkDoneCompletion,
};
pub use known::{KnownObjects, ObjectRef, ObjectTables};
pub use native::*;

use crate::chunked::ChunkedCommandHandler;
use crate::config::WireConfig;
use crate::error::{WireError, WireResult};
use crate::schema::DeserializeAllocator;

use completion::TableOp;

/// One server side of a wire channel.
///
/// Feed transport chunks to [`Server::handle_commands`] and send whatever
/// [`Server::take_outgoing`] returns back to the client. The first protocol
/// error tears the channel down: every live object is released and later
/// calls fail with [`WireError::Disconnected`].
pub struct Server<N: NativeApi> {
    native: N,
    objects: ObjectTables<N::Object>,
    allocator: DeserializeAllocator,
    handler: ChunkedCommandHandler,
    sink: ReturnSink<N::Object>,
    connected: bool,
}

impl<N: NativeApi> Server<N> {
    pub fn new(mut native: N, config: WireConfig) -> Self {
        let config = config.sanitized();
        let sink = ReturnSink::new(&config);
        native.connect(DeviceEvents::new(sink.clone()));
        Self {
            native,
            objects: ObjectTables::new(config.max_object_id),
            allocator: DeserializeAllocator::new(config.max_decode_allocation),
            handler: ChunkedCommandHandler::with_config(&config),
            sink,
            connected: true,
        }
    }

    /// Feed one transport chunk; whole commands in it are executed in order.
    pub fn handle_commands(&mut self, chunk: &[u8]) -> WireResult<()> {
        if !self.connected {
            return Err(WireError::Disconnected);
        }
        let Self {
            native,
            objects,
            allocator,
            handler,
            sink,
            ..
        } = self;
        let result = handler.handle_chunk(chunk, |command| {
            apply_table_ops(sink.take_table_ops(), objects, native);
            dispatch::dispatch(command, allocator, objects, native, sink)
        });
        if let Err(err) = &result {
            tracing::error!(error = %err, "wire server channel lost");
            self.disconnect();
        }
        result
    }

    /// Apply object-table changes queued by asynchronous completions.
    pub fn flush_completions(&mut self) {
        if self.connected {
            apply_table_ops(self.sink.take_table_ops(), &mut self.objects, &mut self.native);
        }
    }

    /// Return commands produced so far.
    pub fn take_outgoing(&mut self) -> Vec<u8> {
        self.flush_completions();
        self.sink.take_outgoing()
    }

    /// Tear the channel down. Idempotent.
    ///
    /// Completions still held by the backend become no-ops, the backend is
    /// told the connection is gone, and then every live object is released
    /// type by type, ids ascending.
    pub fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        self.handler.poison();
        let pending = self.sink.close();
        self.native.connection_lost();
        apply_table_ops(pending, &mut self.objects, &mut self.native);
        let live = self.objects.drain_all();
        tracing::debug!(objects = live.len(), "releasing objects on teardown");
        for (ty, _handle, object) in live {
            self.native.release(ty, object);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn native(&self) -> &N {
        &self.native
    }

    pub fn native_mut(&mut self) -> &mut N {
        &mut self.native
    }

    pub fn objects(&self) -> &ObjectTables<N::Object> {
        &self.objects
    }

    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }
}

impl<N: NativeApi> Drop for Server<N> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn apply_table_ops<N: NativeApi>(
    ops: Vec<TableOp<N::Object>>,
    objects: &mut ObjectTables<N::Object>,
    native: &mut N,
) {
    for op in ops {
        match op {
            TableOp::Fill { ty, handle, object } => {
                let table = objects.table_mut(ty);
                if !table.is_reserved(handle) {
                    tracing::debug!(%handle, ty = ty.name(), "releasing async object with no reserved slot");
                    native.release(ty, object);
                    continue;
                }
                if let Err(err) = table.fill(handle, object) {
                    tracing::debug!(error = %err, "failed to fill reserved slot");
                }
            }
            TableOp::Unreserve { ty, handle } => {
                if let Err(err) = objects.table_mut(ty).unreserve(handle) {
                    tracing::debug!(error = %err, "ignoring unreserve of a vacant slot");
                }
            }
        }
    }
}
