use thiserror::Error;

use crate::handle::ObjectType;

pub type WireResult<T> = std::result::Result<T, WireError>;

/// Errors raised while encoding, decoding or dispatching wire commands.
///
/// Every variant is fatal for the channel it was raised on: the peer is
/// untrusted, so once a stream fails to parse the cursor position can no longer
/// be trusted and the channel is torn down instead of skipping a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("buffer overflow: requested {requested} bytes, {remaining} remaining")]
    BufferOverflow { requested: usize, remaining: usize },

    #[error("element count {count} x {element_size} bytes overflows the address space")]
    CountOverflow { count: u64, element_size: usize },

    #[error("unknown command tag {tag}")]
    UnknownCommand { tag: u8 },

    #[error("invalid command size {size} (expected {min}..={max})")]
    InvalidCommandSize { size: usize, min: usize, max: usize },

    #[error("command of {size} bytes exceeds the {max} byte limit")]
    CommandTooLarge { size: usize, max: usize },

    #[error("unknown object type {0}")]
    UnknownObjectType(u32),

    #[error("null {ty} handle where an object is required")]
    NullObject { ty: ObjectType },

    #[error("unknown {ty} id {id}")]
    UnknownObject { ty: ObjectType, id: u32 },

    #[error("stale {ty} id {id}: generation {found}, live generation {expected}")]
    StaleObject {
        ty: ObjectType,
        id: u32,
        expected: u32,
        found: u32,
    },

    #[error("{ty} id {id} is already in use")]
    SlotOccupied { ty: ObjectType, id: u32 },

    #[error("{ty} id {id} reused with generation {generation} (last used {last})")]
    GenerationRegression {
        ty: ObjectType,
        id: u32,
        generation: u32,
        last: u32,
    },

    #[error("{ty} id {id} exceeds the maximum id {max}")]
    ObjectIdOutOfRange { ty: ObjectType, id: u32, max: u32 },

    #[error("invalid bool byte {0:#04x}")]
    InvalidBool(u8),

    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("{remaining} trailing bytes after command")]
    TrailingBytes { remaining: usize },

    #[error("decode allocation of {requested} bytes exceeds the {limit} byte budget")]
    AllocationLimit { requested: usize, limit: usize },

    #[error("value does not match field `{field}` of `{layout}`")]
    SchemaMismatch {
        layout: &'static str,
        field: &'static str,
    },

    #[error("command wrote {written} bytes but declared {predicted}")]
    SizeMismatch { predicted: usize, written: usize },

    #[error("write of {requested} bytes outside the current command")]
    ProducerOverflow { requested: usize },

    #[error("request serial {0} is already registered")]
    DuplicateSerial(u64),

    #[error("wire channel is disconnected")]
    Disconnected,
}
