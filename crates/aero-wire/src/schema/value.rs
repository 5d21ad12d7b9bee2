use crate::error::{WireError, WireResult};
use crate::handle::Handle;

use super::{FieldKind, StructLayout};

/// A field value, mirroring [`FieldKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value<O> {
    Bool(bool),
    U16(u16),
    U32(u32),
    I32(i32),
    U64(u64),
    F32(f32),
    F64(f64),
    /// `None` is only valid for optional object fields.
    Object(Option<O>),
    NewObject(Handle),
    Handle(Handle),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<Record<O>>),
    Struct(Option<Record<O>>),
}

/// Field values of one struct, in layout order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<O> {
    pub values: Vec<Value<O>>,
}

impl<O> Default for Record<O> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<O> Record<O> {
    pub fn new(values: Vec<Value<O>>) -> Self {
        Self { values }
    }

    /// Typed, in-order access to the values of `layout`.
    pub fn args<'r>(&'r self, layout: &'static StructLayout) -> Args<'r, O> {
        Args {
            layout,
            values: &self.values,
            index: 0,
        }
    }

    /// Replace the value of a named field.
    pub fn set(
        &mut self,
        layout: &'static StructLayout,
        field: &'static str,
        value: Value<O>,
    ) -> WireResult<()> {
        let slot = layout
            .field_index(field)
            .and_then(|index| self.values.get_mut(index))
            .ok_or(WireError::SchemaMismatch {
                layout: layout.name,
                field,
            })?;
        *slot = value;
        Ok(())
    }
}

/// Cursor handing out the values of a [`Record`] in layout order.
///
/// Each getter checks that the next field has the expected kind, so a caller
/// that walks a layout out of order gets a [`WireError::SchemaMismatch`]
/// instead of misreading a value.
#[derive(Debug)]
pub struct Args<'r, O> {
    layout: &'static StructLayout,
    values: &'r [Value<O>],
    index: usize,
}

impl<'r, O: Copy> Args<'r, O> {
    fn mismatch(&self) -> WireError {
        WireError::SchemaMismatch {
            layout: self.layout.name,
            field: self
                .layout
                .fields
                .get(self.index)
                .map_or("<end>", |field| field.name),
        }
    }

    fn next(&mut self) -> WireResult<(FieldKind, &'r Value<O>)> {
        let field = self.layout.fields.get(self.index);
        let value = self.values.get(self.index);
        match (field, value) {
            (Some(field), Some(value)) => {
                self.index += 1;
                Ok((field.kind, value))
            }
            _ => Err(self.mismatch()),
        }
    }

    pub fn layout(&self) -> &'static StructLayout {
        self.layout
    }

    /// Skip the next field without checking its kind.
    pub fn skip(&mut self) -> WireResult<()> {
        self.next().map(|_| ())
    }

    pub fn bool(&mut self) -> WireResult<bool> {
        match self.next()? {
            (_, Value::Bool(v)) => Ok(*v),
            _ => Err(self.step_back_mismatch()),
        }
    }

    pub fn u16(&mut self) -> WireResult<u16> {
        match self.next()? {
            (_, Value::U16(v)) => Ok(*v),
            _ => Err(self.step_back_mismatch()),
        }
    }

    pub fn u32(&mut self) -> WireResult<u32> {
        match self.next()? {
            (_, Value::U32(v)) => Ok(*v),
            _ => Err(self.step_back_mismatch()),
        }
    }

    pub fn i32(&mut self) -> WireResult<i32> {
        match self.next()? {
            (_, Value::I32(v)) => Ok(*v),
            _ => Err(self.step_back_mismatch()),
        }
    }

    pub fn u64(&mut self) -> WireResult<u64> {
        match self.next()? {
            (_, Value::U64(v)) => Ok(*v),
            _ => Err(self.step_back_mismatch()),
        }
    }

    pub fn f32(&mut self) -> WireResult<f32> {
        match self.next()? {
            (_, Value::F32(v)) => Ok(*v),
            _ => Err(self.step_back_mismatch()),
        }
    }

    pub fn f64(&mut self) -> WireResult<f64> {
        match self.next()? {
            (_, Value::F64(v)) => Ok(*v),
            _ => Err(self.step_back_mismatch()),
        }
    }

    /// A required object reference.
    pub fn object(&mut self) -> WireResult<O> {
        match self.next()? {
            (FieldKind::Object { optional: false, .. }, Value::Object(Some(object))) => {
                Ok(*object)
            }
            _ => Err(self.step_back_mismatch()),
        }
    }

    pub fn optional_object(&mut self) -> WireResult<Option<O>> {
        match self.next()? {
            (FieldKind::Object { optional: true, .. }, Value::Object(object)) => Ok(*object),
            _ => Err(self.step_back_mismatch()),
        }
    }

    pub fn new_object(&mut self) -> WireResult<Handle> {
        match self.next()? {
            (FieldKind::NewObject(_), Value::NewObject(handle)) => Ok(*handle),
            _ => Err(self.step_back_mismatch()),
        }
    }

    pub fn handle(&mut self) -> WireResult<Handle> {
        match self.next()? {
            (FieldKind::Handle, Value::Handle(handle)) => Ok(*handle),
            _ => Err(self.step_back_mismatch()),
        }
    }

    pub fn bytes(&mut self) -> WireResult<&'r [u8]> {
        match self.next()? {
            (_, Value::Bytes(bytes)) => Ok(bytes),
            _ => Err(self.step_back_mismatch()),
        }
    }

    pub fn string(&mut self) -> WireResult<&'r str> {
        match self.next()? {
            (_, Value::String(s)) => Ok(s),
            _ => Err(self.step_back_mismatch()),
        }
    }

    pub fn array(&mut self) -> WireResult<ArrayArgs<'r, O>> {
        match self.next()? {
            (FieldKind::Array(layout), Value::Array(items)) => Ok(ArrayArgs {
                layout,
                items: items.iter(),
            }),
            _ => Err(self.step_back_mismatch()),
        }
    }

    pub fn optional_struct(&mut self) -> WireResult<Option<Args<'r, O>>> {
        match self.next()? {
            (FieldKind::OptionalStruct(layout), Value::Struct(record)) => {
                Ok(record.as_ref().map(|record| record.args(layout)))
            }
            _ => Err(self.step_back_mismatch()),
        }
    }

    /// Collect an array of structs through `f`.
    pub fn collect<T>(
        &mut self,
        mut f: impl FnMut(&mut Args<'r, O>) -> WireResult<T>,
    ) -> WireResult<Vec<T>> {
        self.array()?.map(|mut item| f(&mut item)).collect()
    }

    fn step_back_mismatch(&mut self) -> WireError {
        self.index -= 1;
        self.mismatch()
    }
}

/// Iterator over the elements of an array field.
#[derive(Debug)]
pub struct ArrayArgs<'r, O> {
    layout: &'static StructLayout,
    items: core::slice::Iter<'r, Record<O>>,
}

impl<'r, O> Iterator for ArrayArgs<'r, O> {
    type Item = Args<'r, O>;

    fn next(&mut self) -> Option<Self::Item> {
        let layout = self.layout;
        self.items.next().map(|record| Args {
            layout,
            values: &record.values,
            index: 0,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl<O> ExactSizeIterator for ArrayArgs<'_, O> {}
