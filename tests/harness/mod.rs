#![allow(dead_code)]

use std::collections::BTreeMap;

use aero_wire::config::DEFAULT_MAX_COMMAND_SIZE;
use aero_wire::schema::{
    encode, CommandKind, CommandSchema, FieldKind, ForwardCommand, HandleIds, NoObjects, Record,
    ReturnCommand, ReturnKind, ScalarKind, StructLayout, Value,
};
use aero_wire::test_utils::{created_type, fill_handle, required_objects, sample_record};
use aero_wire::{Client, Handle, ObjectType};
use proptest::prelude::*;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn handle() -> impl Strategy<Value = Handle> {
    (1u32..512, 0u32..4).prop_map(|(id, generation)| Handle::new(id, generation))
}

fn scalar(kind: ScalarKind) -> BoxedStrategy<Value<Handle>> {
    match kind {
        ScalarKind::Bool => any::<bool>().prop_map(Value::Bool).boxed(),
        ScalarKind::U16 => any::<u16>().prop_map(Value::U16).boxed(),
        ScalarKind::U32 => any::<u32>().prop_map(Value::U32).boxed(),
        ScalarKind::I32 => any::<i32>().prop_map(Value::I32).boxed(),
        ScalarKind::U64 => any::<u64>().prop_map(Value::U64).boxed(),
        // Finite values only; NaN never compares equal after a round trip.
        ScalarKind::F32 => (-1.0e6f32..1.0e6).prop_map(Value::F32).boxed(),
        ScalarKind::F64 => (-1.0e9f64..1.0e9).prop_map(Value::F64).boxed(),
    }
}

fn field(kind: FieldKind) -> BoxedStrategy<Value<Handle>> {
    match kind {
        FieldKind::Scalar(kind) => scalar(kind),
        FieldKind::Object {
            optional: false, ..
        } => handle().prop_map(|h| Value::Object(Some(h))).boxed(),
        FieldKind::Object { optional: true, .. } => proptest::option::of(handle())
            .prop_map(Value::Object)
            .boxed(),
        FieldKind::NewObject(_) => handle().prop_map(Value::NewObject).boxed(),
        FieldKind::Handle => prop_oneof![Just(Handle::NULL), handle()]
            .prop_map(Value::Handle)
            .boxed(),
        FieldKind::Bytes => proptest::collection::vec(any::<u8>(), 0..24)
            .prop_map(Value::Bytes)
            .boxed(),
        FieldKind::String => "[a-z0-9 ]{0,12}".prop_map(Value::String).boxed(),
        FieldKind::Array(inner) => proptest::collection::vec(record(inner), 0..3)
            .prop_map(Value::Array)
            .boxed(),
        FieldKind::OptionalStruct(inner) => proptest::option::of(record(inner))
            .prop_map(Value::Struct)
            .boxed(),
    }
}

/// Arbitrary field values for `layout`, nested structs included.
pub fn record(layout: &'static StructLayout) -> BoxedStrategy<Record<Handle>> {
    layout
        .fields
        .iter()
        .map(|f| field(f.kind))
        .collect::<Vec<_>>()
        .prop_map(Record::new)
        .boxed()
}

pub fn forward_command() -> impl Strategy<Value = ForwardCommand<Handle>> {
    proptest::sample::select(CommandKind::ALL).prop_flat_map(|kind| {
        record(kind.layout()).prop_map(move |args| ForwardCommand { kind, args })
    })
}

pub fn return_command() -> impl Strategy<Value = ReturnCommand> {
    proptest::sample::select(ReturnKind::ALL).prop_flat_map(|kind| {
        record(kind.layout()).prop_map(move |args| ReturnCommand { kind, args })
    })
}

pub fn encode_forward(cmd: &ForwardCommand<Handle>) -> Vec<u8> {
    encode(cmd, &HandleIds, DEFAULT_MAX_COMMAND_SIZE).expect("encode forward command")
}

pub fn encode_return(cmd: &ReturnCommand) -> Vec<u8> {
    encode(cmd, &NoObjects, DEFAULT_MAX_COMMAND_SIZE).expect("encode return command")
}

/// Split `bytes` at the given cut points (taken modulo the length).
pub fn split_at_cuts<'a>(bytes: &'a [u8], cuts: &[usize]) -> Vec<&'a [u8]> {
    if bytes.is_empty() {
        return vec![bytes];
    }
    let mut points: Vec<usize> = cuts.iter().map(|c| c % bytes.len()).collect();
    points.push(0);
    points.push(bytes.len());
    points.sort_unstable();
    points.dedup();
    points.windows(2).map(|w| &bytes[w[0]..w[1]]).collect()
}

/// Queue create commands for one object of every type on `client`, without
/// a server, and return the handles.
pub fn create_all_objects(client: &mut Client) -> BTreeMap<ObjectType, Handle> {
    let mut live = BTreeMap::new();
    let mut progress = true;
    while progress {
        progress = false;
        for &kind in CommandKind::ALL {
            let Some(ty) = created_type(kind.layout()) else {
                continue;
            };
            if kind.is_async() || live.contains_key(&ty) || !required_objects(kind.layout(), &live)
            {
                continue;
            }
            let objects = live.clone();
            let handle = client
                .create(kind, |result| {
                    sample_record(kind.layout(), 1, &mut |field| {
                        fill_handle(field, &objects, result)
                    })
                    .values
                })
                .expect("create object");
            live.insert(ty, handle);
            progress = true;
        }
    }
    live
}
