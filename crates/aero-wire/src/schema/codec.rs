use core::mem;

use crate::buffer::{Consumer, Producer};
use crate::config::HEADER_SIZE;
use crate::error::{WireError, WireResult};
use crate::handle::{Handle, ObjectType};

use super::{
    Command, CommandHeader, CommandSchema, FieldKind, Record, ScalarKind, StructLayout, Value,
};

/// Maps the objects named in an outgoing command to their handles.
pub trait ObjectIdProvider<O> {
    fn get_id(&self, ty: ObjectType, object: &O) -> WireResult<Handle>;

    /// An absent object is encoded as the null handle.
    fn get_optional_id(&self, ty: ObjectType, object: Option<&O>) -> WireResult<Handle> {
        match object {
            Some(object) => self.get_id(ty, object),
            None => Ok(Handle::NULL),
        }
    }
}

/// Maps handles in an incoming command back to objects.
pub trait ObjectIdResolver {
    type Ref;

    fn get_from_id(&self, ty: ObjectType, handle: Handle) -> WireResult<Self::Ref>;

    /// Id `0` resolves to `None` without a lookup.
    fn get_optional_from_id(&self, ty: ObjectType, handle: Handle) -> WireResult<Option<Self::Ref>> {
        if handle.is_null() {
            Ok(None)
        } else {
            self.get_from_id(ty, handle).map(Some)
        }
    }
}

/// Objects are their own handles (the client side).
#[derive(Debug, Clone, Copy, Default)]
pub struct HandleIds;

impl ObjectIdProvider<Handle> for HandleIds {
    fn get_id(&self, ty: ObjectType, object: &Handle) -> WireResult<Handle> {
        if object.is_null() {
            return Err(WireError::NullObject { ty });
        }
        Ok(*object)
    }
}

impl ObjectIdResolver for HandleIds {
    type Ref = Handle;

    fn get_from_id(&self, ty: ObjectType, handle: Handle) -> WireResult<Handle> {
        self.get_id(ty, &handle)
    }
}

/// For command families without object fields (return commands).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObjects;

impl<O> ObjectIdProvider<O> for NoObjects {
    fn get_id(&self, ty: ObjectType, _object: &O) -> WireResult<Handle> {
        Err(WireError::SchemaMismatch {
            layout: "<no objects>",
            field: ty.name(),
        })
    }
}

impl ObjectIdResolver for NoObjects {
    type Ref = Handle;

    fn get_from_id(&self, ty: ObjectType, _handle: Handle) -> WireResult<Handle> {
        Err(WireError::SchemaMismatch {
            layout: "<no objects>",
            field: ty.name(),
        })
    }
}

/// Bounds the heap memory one decoded command may claim.
///
/// Strings, byte payloads and decoded array elements are all charged here, so
/// a small command cannot amplify into a large allocation. Reset between
/// commands.
#[derive(Debug, Clone)]
pub struct DeserializeAllocator {
    used: usize,
    limit: usize,
}

impl DeserializeAllocator {
    pub fn new(limit: usize) -> Self {
        Self { used: 0, limit }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }

    pub fn claim(&mut self, bytes: usize) -> WireResult<()> {
        let err = WireError::AllocationLimit {
            requested: bytes,
            limit: self.limit,
        };
        let used = self.used.checked_add(bytes).ok_or(err.clone())?;
        if used > self.limit {
            return Err(err);
        }
        self.used = used;
        Ok(())
    }

    fn claim_records<R>(&mut self, layout: &StructLayout, count: usize) -> WireResult<()> {
        let per_record =
            mem::size_of::<Record<R>>() + layout.fields.len() * mem::size_of::<Value<R>>();
        let bytes = per_record
            .checked_mul(count)
            .ok_or(WireError::AllocationLimit {
                requested: usize::MAX,
                limit: self.limit,
            })?;
        self.claim(bytes)
    }
}

fn mismatch(layout: &StructLayout, field: &super::Field) -> WireError {
    WireError::SchemaMismatch {
        layout: layout.name,
        field: field.name,
    }
}

fn wire_len(len: usize, max: usize) -> WireResult<u32> {
    u32::try_from(len).map_err(|_| WireError::CommandTooLarge { size: len, max })
}

/// Encoded size of `cmd`, header included.
///
/// Also checks every value against its field kind, so a command that passes
/// here serializes without schema errors.
pub fn required_size<K: CommandSchema, O>(cmd: &Command<K, O>) -> WireResult<usize> {
    let body = struct_size(cmd.kind.layout(), &cmd.args.values)?;
    Ok(HEADER_SIZE.saturating_add(body))
}

fn struct_size<O>(layout: &StructLayout, values: &[Value<O>]) -> WireResult<usize> {
    if values.len() != layout.fields.len() {
        return Err(WireError::SchemaMismatch {
            layout: layout.name,
            field: layout
                .fields
                .get(values.len().min(layout.fields.len()))
                .map_or("<end>", |field| field.name),
        });
    }
    let mut size = layout.fixed_size();
    for (field, value) in layout.fields.iter().zip(values) {
        size = size.saturating_add(variable_size(layout, field, value)?);
    }
    Ok(size)
}

fn variable_size<O>(layout: &StructLayout, field: &super::Field, value: &Value<O>) -> WireResult<usize> {
    let size = match (field.kind, value) {
        (FieldKind::Scalar(scalar), value) if scalar_matches(scalar, value) => 0,
        (FieldKind::Object { optional, .. }, Value::Object(object))
            if optional || object.is_some() =>
        {
            0
        }
        (FieldKind::NewObject(_), Value::NewObject(_)) | (FieldKind::Handle, Value::Handle(_)) => 0,
        (FieldKind::Bytes, Value::Bytes(bytes)) => bytes.len(),
        (FieldKind::String, Value::String(s)) => s.len(),
        (FieldKind::Array(element), Value::Array(items)) => {
            let mut size = element.fixed_size().saturating_mul(items.len());
            for item in items {
                let item_size = struct_size(element, &item.values)?;
                size = size.saturating_add(item_size - element.fixed_size());
            }
            size
        }
        (FieldKind::OptionalStruct(inner), Value::Struct(record)) => match record {
            Some(record) => struct_size(inner, &record.values)?,
            None => 0,
        },
        _ => return Err(mismatch(layout, field)),
    };
    Ok(size)
}

fn scalar_matches<O>(scalar: ScalarKind, value: &Value<O>) -> bool {
    matches!(
        (scalar, value),
        (ScalarKind::Bool, Value::Bool(_))
            | (ScalarKind::U16, Value::U16(_))
            | (ScalarKind::U32, Value::U32(_))
            | (ScalarKind::I32, Value::I32(_))
            | (ScalarKind::U64, Value::U64(_))
            | (ScalarKind::F32, Value::F32(_))
            | (ScalarKind::F64, Value::F64(_))
    )
}

/// Append one command to `producer`.
///
/// On error nothing is left in the producer.
pub fn serialize<K, O, P>(cmd: &Command<K, O>, producer: &mut Producer, ids: &P) -> WireResult<()>
where
    K: CommandSchema,
    P: ObjectIdProvider<O> + ?Sized,
{
    let size = required_size(cmd)?;
    producer.begin_command(size)?;
    let header = CommandHeader {
        size,
        tag: cmd.kind.tag(),
    };
    let written = producer
        .put_u32(header.encode())
        .and_then(|()| write_struct(cmd.kind.layout(), &cmd.args.values, producer, ids));
    match written {
        Ok(()) => producer.end_command(),
        Err(err) => {
            producer.abort_command();
            Err(err)
        }
    }
}

/// Serialize a single command into its own buffer.
pub fn encode<K, O, P>(cmd: &Command<K, O>, ids: &P, max_command_size: usize) -> WireResult<Vec<u8>>
where
    K: CommandSchema,
    P: ObjectIdProvider<O> + ?Sized,
{
    let mut producer = Producer::new(0, max_command_size);
    serialize(cmd, &mut producer, ids)?;
    Ok(producer.take())
}

fn write_struct<O, P>(
    layout: &StructLayout,
    values: &[Value<O>],
    producer: &mut Producer,
    ids: &P,
) -> WireResult<()>
where
    P: ObjectIdProvider<O> + ?Sized,
{
    write_fixed(layout, values, producer, ids)?;
    write_variable(layout, values, producer, ids)
}

fn write_fixed<O, P>(
    layout: &StructLayout,
    values: &[Value<O>],
    producer: &mut Producer,
    ids: &P,
) -> WireResult<()>
where
    P: ObjectIdProvider<O> + ?Sized,
{
    for (field, value) in layout.fields.iter().zip(values) {
        match (field.kind, value) {
            (_, Value::Bool(v)) => producer.put_bool(*v)?,
            (_, Value::U16(v)) => producer.put_u16(*v)?,
            (_, Value::U32(v)) => producer.put_u32(*v)?,
            (_, Value::I32(v)) => producer.put_i32(*v)?,
            (_, Value::U64(v)) => producer.put_u64(*v)?,
            (_, Value::F32(v)) => producer.put_f32(*v)?,
            (_, Value::F64(v)) => producer.put_f64(*v)?,
            (FieldKind::Object { ty, optional }, Value::Object(object)) => {
                let handle = match (optional, object) {
                    (true, object) => ids.get_optional_id(ty, object.as_ref())?,
                    (false, Some(object)) => ids.get_id(ty, object)?,
                    (false, None) => return Err(WireError::NullObject { ty }),
                };
                producer.put_handle(handle)?;
            }
            (FieldKind::NewObject(ty), Value::NewObject(handle)) => {
                if handle.is_null() {
                    return Err(WireError::NullObject { ty });
                }
                producer.put_handle(*handle)?;
            }
            (_, Value::Handle(handle)) => producer.put_handle(*handle)?,
            (_, Value::Bytes(bytes)) => {
                producer.put_u32(wire_len(bytes.len(), producer.max_command_size())?)?
            }
            (_, Value::String(s)) => {
                producer.put_u32(wire_len(s.len(), producer.max_command_size())?)?
            }
            (_, Value::Array(items)) => {
                producer.put_u32(wire_len(items.len(), producer.max_command_size())?)?
            }
            (_, Value::Struct(record)) => producer.put_bool(record.is_some())?,
            _ => return Err(mismatch(layout, field)),
        }
    }
    Ok(())
}

fn write_variable<O, P>(
    layout: &StructLayout,
    values: &[Value<O>],
    producer: &mut Producer,
    ids: &P,
) -> WireResult<()>
where
    P: ObjectIdProvider<O> + ?Sized,
{
    for (field, value) in layout.fields.iter().zip(values) {
        match (field.kind, value) {
            (FieldKind::Bytes, Value::Bytes(bytes)) => producer.put_bytes(bytes)?,
            (FieldKind::String, Value::String(s)) => producer.put_bytes(s.as_bytes())?,
            (FieldKind::Array(element), Value::Array(items)) => {
                for item in items {
                    write_fixed(element, &item.values, producer, ids)?;
                }
                for item in items {
                    write_variable(element, &item.values, producer, ids)?;
                }
            }
            (FieldKind::OptionalStruct(inner), Value::Struct(Some(record))) => {
                write_struct(inner, &record.values, producer, ids)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Fixed-section value, with variable payloads still to be read.
enum Pending<R> {
    Done(Value<R>),
    Bytes(u32),
    String(u32),
    Array(&'static StructLayout, u32),
    Struct(&'static StructLayout, bool),
}

/// Decode the fields of `layout` from `consumer`; the header has already been
/// read.
///
/// Every handle is resolved as it is read and the first unresolved one fails
/// the whole command.
pub fn deserialize_args<R>(
    layout: &StructLayout,
    consumer: &mut Consumer<'_>,
    allocator: &mut DeserializeAllocator,
    ids: &R,
) -> WireResult<Record<R::Ref>>
where
    R: ObjectIdResolver + ?Sized,
{
    allocator.claim_records::<R::Ref>(layout, 1)?;
    read_struct(layout, consumer, allocator, ids)
}

/// Decode one whole command, header included.
pub fn decode<K, R>(
    bytes: &[u8],
    allocator: &mut DeserializeAllocator,
    ids: &R,
) -> WireResult<Command<K, R::Ref>>
where
    K: CommandSchema,
    R: ObjectIdResolver + ?Sized,
{
    let mut consumer = Consumer::new(bytes);
    let header = CommandHeader::read(&mut consumer)?;
    if header.size != bytes.len() {
        return Err(WireError::InvalidCommandSize {
            size: header.size,
            min: bytes.len(),
            max: bytes.len(),
        });
    }
    let kind = K::from_tag(header.tag).ok_or(WireError::UnknownCommand { tag: header.tag })?;
    let args = deserialize_args(kind.layout(), &mut consumer, allocator, ids)?;
    consumer.expect_empty()?;
    Ok(Command { kind, args })
}

fn read_struct<R>(
    layout: &StructLayout,
    consumer: &mut Consumer<'_>,
    allocator: &mut DeserializeAllocator,
    ids: &R,
) -> WireResult<Record<R::Ref>>
where
    R: ObjectIdResolver + ?Sized,
{
    let mut fixed = Consumer::new(consumer.read(layout.fixed_size())?);
    let pending = read_fixed(layout, &mut fixed, ids)?;
    read_variable(pending, consumer, allocator, ids)
}

fn read_fixed<R>(
    layout: &StructLayout,
    consumer: &mut Consumer<'_>,
    ids: &R,
) -> WireResult<Vec<Pending<R::Ref>>>
where
    R: ObjectIdResolver + ?Sized,
{
    let mut pending = Vec::with_capacity(layout.fields.len());
    for field in layout.fields {
        let slot = match field.kind {
            FieldKind::Scalar(ScalarKind::Bool) => Pending::Done(Value::Bool(consumer.read_bool()?)),
            FieldKind::Scalar(ScalarKind::U16) => Pending::Done(Value::U16(consumer.read_u16()?)),
            FieldKind::Scalar(ScalarKind::U32) => Pending::Done(Value::U32(consumer.read_u32()?)),
            FieldKind::Scalar(ScalarKind::I32) => Pending::Done(Value::I32(consumer.read_i32()?)),
            FieldKind::Scalar(ScalarKind::U64) => Pending::Done(Value::U64(consumer.read_u64()?)),
            FieldKind::Scalar(ScalarKind::F32) => Pending::Done(Value::F32(consumer.read_f32()?)),
            FieldKind::Scalar(ScalarKind::F64) => Pending::Done(Value::F64(consumer.read_f64()?)),
            FieldKind::Object { ty, optional } => {
                let handle = consumer.read_handle()?;
                let object = if optional {
                    ids.get_optional_from_id(ty, handle)?
                } else {
                    Some(ids.get_from_id(ty, handle)?)
                };
                Pending::Done(Value::Object(object))
            }
            FieldKind::NewObject(ty) => {
                let handle = consumer.read_handle()?;
                if handle.is_null() {
                    return Err(WireError::NullObject { ty });
                }
                Pending::Done(Value::NewObject(handle))
            }
            FieldKind::Handle => Pending::Done(Value::Handle(consumer.read_handle()?)),
            FieldKind::Bytes => Pending::Bytes(consumer.read_u32()?),
            FieldKind::String => Pending::String(consumer.read_u32()?),
            FieldKind::Array(element) => Pending::Array(element, consumer.read_u32()?),
            FieldKind::OptionalStruct(inner) => Pending::Struct(inner, consumer.read_bool()?),
        };
        pending.push(slot);
    }
    Ok(pending)
}

fn read_variable<R>(
    pending: Vec<Pending<R::Ref>>,
    consumer: &mut Consumer<'_>,
    allocator: &mut DeserializeAllocator,
    ids: &R,
) -> WireResult<Record<R::Ref>>
where
    R: ObjectIdResolver + ?Sized,
{
    let mut values = Vec::with_capacity(pending.len());
    for slot in pending {
        let value = match slot {
            Pending::Done(value) => value,
            Pending::Bytes(len) => {
                let bytes = consumer.read_array(len, 1)?;
                allocator.claim(bytes.len())?;
                Value::Bytes(bytes.to_vec())
            }
            Pending::String(len) => {
                let bytes = consumer.read_array(len, 1)?;
                allocator.claim(bytes.len())?;
                let s = core::str::from_utf8(bytes).map_err(|_| WireError::InvalidUtf8)?;
                Value::String(s.to_owned())
            }
            Pending::Array(element, count) => {
                let fixed = consumer.read_array(count, element.fixed_size())?;
                allocator.claim_records::<R::Ref>(element, count as usize)?;
                let mut fixed = Consumer::new(fixed);
                let mut heads = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    heads.push(read_fixed(element, &mut fixed, ids)?);
                }
                let mut items = Vec::with_capacity(heads.len());
                for head in heads {
                    items.push(read_variable(head, consumer, allocator, ids)?);
                }
                Value::Array(items)
            }
            Pending::Struct(_, false) => Value::Struct(None),
            Pending::Struct(inner, true) => {
                allocator.claim_records::<R::Ref>(inner, 1)?;
                Value::Struct(Some(read_struct(inner, consumer, allocator, ids)?))
            }
        };
        values.push(value);
    }
    Ok(Record::new(values))
}
