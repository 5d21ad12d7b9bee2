//! The wire schema: per-command field layouts and the generic engine that
//! encodes and decodes them.
//!
//! Every command is a [`StructLayout`] listing its fields in wire order. One
//! codec in [`codec`] walks those layouts for all command kinds, so adding a
//! command only means adding a table entry.
//!
//! Layout of an encoded command:
//!
//! ```text
//! +--------------------------+--------------------+----------------------+
//! | header: u32              | fixed section      | variable section     |
//! | size (24 bits) | tag (8) | scalars, handles,  | payloads, in field   |
//! |                          | lengths, counts    | order                |
//! +--------------------------+--------------------+----------------------+
//! ```
//!
//! Nested structs (array elements, optional structs) use the same two-part
//! layout recursively. For arrays, the fixed parts of all elements are written
//! back to back, followed by the variable parts of each element in turn.

use core::fmt;

use crate::buffer::Consumer;
use crate::config::{HEADER_SIZE, MAX_ENCODABLE_COMMAND_SIZE};
use crate::error::WireResult;
use crate::handle::{Handle, ObjectType};

/// Defines a command kind enum together with its tag and layout tables.
macro_rules! command_table {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $variant:ident = $tag:literal => $layout:ident, )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        $vis enum $name {
            $( $variant = $tag, )*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$( $name::$variant, )*];

            pub const fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => stringify!($variant), )*
                }
            }
        }

        impl $crate::schema::CommandSchema for $name {
            fn tag(self) -> u8 {
                self as u8
            }

            fn from_tag(tag: u8) -> Option<Self> {
                match tag {
                    $( $tag => Some($name::$variant), )*
                    _ => None,
                }
            }

            fn layout(self) -> &'static $crate::schema::StructLayout {
                match self {
                    $( $name::$variant => &$layout, )*
                }
            }
        }
    };
}

macro_rules! field_kind {
    (bool) => { $crate::schema::FieldKind::Scalar($crate::schema::ScalarKind::Bool) };
    (u16) => { $crate::schema::FieldKind::Scalar($crate::schema::ScalarKind::U16) };
    (u32) => { $crate::schema::FieldKind::Scalar($crate::schema::ScalarKind::U32) };
    (i32) => { $crate::schema::FieldKind::Scalar($crate::schema::ScalarKind::I32) };
    (u64) => { $crate::schema::FieldKind::Scalar($crate::schema::ScalarKind::U64) };
    (f32) => { $crate::schema::FieldKind::Scalar($crate::schema::ScalarKind::F32) };
    (f64) => { $crate::schema::FieldKind::Scalar($crate::schema::ScalarKind::F64) };
    (handle) => { $crate::schema::FieldKind::Handle };
    (bytes) => { $crate::schema::FieldKind::Bytes };
    (string) => { $crate::schema::FieldKind::String };
    (new($ty:ident)) => {
        $crate::schema::FieldKind::NewObject($crate::handle::ObjectType::$ty)
    };
    (object($ty:ident)) => {
        $crate::schema::FieldKind::Object {
            ty: $crate::handle::ObjectType::$ty,
            optional: false,
        }
    };
    (optional($ty:ident)) => {
        $crate::schema::FieldKind::Object {
            ty: $crate::handle::ObjectType::$ty,
            optional: true,
        }
    };
    (array($layout:ident)) => { $crate::schema::FieldKind::Array(&$layout) };
    (optional_struct($layout:ident)) => {
        $crate::schema::FieldKind::OptionalStruct(&$layout)
    };
}

/// `layout!("Name" { field: kind, other: array(ELEMENT) })`
macro_rules! layout {
    ($name:literal { $( $field:ident : $kind:ident $( ( $arg:ident ) )? ),* $(,)? }) => {
        $crate::schema::StructLayout {
            name: $name,
            fields: &[
                $(
                    $crate::schema::Field {
                        name: stringify!($field),
                        kind: field_kind!($kind $( ( $arg ) )?),
                    },
                )*
            ],
        }
    };
}

mod codec;
mod commands;
mod returns;
mod value;

pub use codec::{
    decode, deserialize_args, encode, required_size, serialize, DeserializeAllocator, HandleIds,
    NoObjects, ObjectIdProvider, ObjectIdResolver,
};
pub use commands::CommandKind;
pub use returns::ReturnKind;
pub use value::{ArrayArgs, Args, Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    U16,
    U32,
    I32,
    U64,
    F32,
    F64,
}

impl ScalarKind {
    pub const fn size(self) -> usize {
        match self {
            ScalarKind::Bool => 1,
            ScalarKind::U16 => 2,
            ScalarKind::U32 | ScalarKind::I32 | ScalarKind::F32 => 4,
            ScalarKind::U64 | ScalarKind::F64 => 8,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Scalar(ScalarKind),
    /// Reference to an object the client created earlier.
    Object { ty: ObjectType, optional: bool },
    /// Handle the command creates; the server fills this slot.
    NewObject(ObjectType),
    /// Raw handle, not resolved against the object tables.
    Handle,
    /// `u32` length, then the bytes.
    Bytes,
    /// `u32` length, then UTF-8 bytes.
    String,
    /// `u32` count, then the elements.
    Array(&'static StructLayout),
    /// `u8` presence flag, then the struct when present.
    OptionalStruct(&'static StructLayout),
}

impl FieldKind {
    /// Bytes this field occupies in the fixed section.
    pub const fn fixed_size(self) -> usize {
        match self {
            FieldKind::Scalar(scalar) => scalar.size(),
            FieldKind::Object { .. } | FieldKind::NewObject(_) | FieldKind::Handle => {
                Handle::WIRE_SIZE
            }
            FieldKind::Bytes | FieldKind::String | FieldKind::Array(_) => 4,
            FieldKind::OptionalStruct(_) => 1,
        }
    }
}

#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

#[derive(Debug)]
pub struct StructLayout {
    pub name: &'static str,
    pub fields: &'static [Field],
}

impl StructLayout {
    pub fn fixed_size(&self) -> usize {
        self.fields.iter().map(|field| field.kind.fixed_size()).sum()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }
}

/// A family of commands sharing one tag space.
pub trait CommandSchema: Copy + Eq + fmt::Debug + 'static {
    fn tag(self) -> u8;
    fn from_tag(tag: u8) -> Option<Self>;
    fn layout(self) -> &'static StructLayout;
}

/// A command and its field values; `O` is how object fields are represented
/// (a [`Handle`] before encoding, a resolved reference after decoding).
#[derive(Debug, Clone, PartialEq)]
pub struct Command<K, O> {
    pub kind: K,
    pub args: Record<O>,
}

impl<K: CommandSchema, O> Command<K, O> {
    pub fn new(kind: K, values: Vec<Value<O>>) -> Self {
        Self {
            kind,
            args: Record::new(values),
        }
    }

    pub fn args(&self) -> Args<'_, O> {
        self.args.args(self.kind.layout())
    }
}

pub type ForwardCommand<O> = Command<CommandKind, O>;
pub type ReturnCommand = Command<ReturnKind, Handle>;

/// The packed header at the start of every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    /// Total command size in bytes, header included.
    pub size: usize,
    pub tag: u8,
}

impl CommandHeader {
    pub fn encode(self) -> u32 {
        debug_assert!(self.size <= MAX_ENCODABLE_COMMAND_SIZE);
        (self.size as u32 & 0x00FF_FFFF) | (u32::from(self.tag) << 24)
    }

    pub fn decode(word: u32) -> Self {
        Self {
            size: (word & 0x00FF_FFFF) as usize,
            tag: (word >> 24) as u8,
        }
    }

    /// Parse a header from the first [`HEADER_SIZE`] bytes of `bytes`.
    pub fn peek(bytes: &[u8]) -> Option<Self> {
        let word: [u8; HEADER_SIZE] = bytes.get(..HEADER_SIZE)?.try_into().ok()?;
        Some(Self::decode(u32::from_le_bytes(word)))
    }

    pub fn read(consumer: &mut Consumer<'_>) -> WireResult<Self> {
        consumer.read_u32().map(Self::decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_packs_size_and_tag() {
        let header = CommandHeader { size: 16, tag: 2 };
        assert_eq!(header.encode(), 0x0200_0010);
        assert_eq!(CommandHeader::decode(0x0200_0010), header);
        assert_eq!(
            CommandHeader::peek(&0x0200_0010u32.to_le_bytes()),
            Some(header)
        );
        assert_eq!(CommandHeader::peek(&[0x10, 0, 0]), None);
    }

    #[test]
    fn command_tables_are_dense_and_consistent() {
        for (index, kind) in CommandKind::ALL.iter().enumerate() {
            assert_eq!(kind.tag() as usize, index);
            assert_eq!(CommandKind::from_tag(kind.tag()), Some(*kind));
            assert_eq!(kind.layout().name, kind.name());
        }
        for (index, kind) in ReturnKind::ALL.iter().enumerate() {
            assert_eq!(kind.tag() as usize, index);
            assert_eq!(ReturnKind::from_tag(kind.tag()), Some(*kind));
            assert_eq!(kind.layout().name, kind.name());
        }
        assert_eq!(CommandKind::from_tag(CommandKind::ALL.len() as u8), None);
    }

    #[test]
    fn create_buffer_has_a_twelve_byte_fixed_prefix() {
        let layout = CommandKind::CreateBuffer.layout();
        // header + result handle + label length
        assert_eq!(HEADER_SIZE + layout.fixed_size(), 16);
        assert_eq!(layout.field_index("label"), Some(1));
    }
}
