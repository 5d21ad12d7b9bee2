mod client;
mod loopback;

use crate::config::DEFAULT_MAX_COMMAND_SIZE;
use crate::handle::Handle;
use crate::schema::{encode, CommandKind, ForwardCommand, HandleIds, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Encode one forward command the way a client would.
fn forward(kind: CommandKind, values: Vec<Value<Handle>>) -> Vec<u8> {
    encode(
        &ForwardCommand::new(kind, values),
        &HandleIds,
        DEFAULT_MAX_COMMAND_SIZE,
    )
    .expect("test command should encode")
}

fn create_buffer(handle: Handle, label: &str) -> Vec<u8> {
    forward(
        CommandKind::CreateBuffer,
        vec![Value::NewObject(handle), Value::String(label.into())],
    )
}

fn destroy(ty: crate::handle::ObjectType, handle: Handle) -> Vec<u8> {
    forward(
        CommandKind::DestroyObject,
        vec![Value::U32(ty.as_u32()), Value::Handle(handle)],
    )
}
