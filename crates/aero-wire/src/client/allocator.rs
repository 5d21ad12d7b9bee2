use crate::error::{WireError, WireResult};
use crate::handle::{Handle, ObjectType};

#[derive(Debug, Clone, Copy)]
struct Entry {
    generation: u32,
    live: bool,
}

/// Client-side handle allocator for one object type.
///
/// Ids start at 1 (0 is the null handle). Released ids are reused in LIFO
/// order with their generation bumped, so a stale handle held anywhere never
/// names the new object. An id whose generation would overflow is retired.
#[derive(Debug)]
pub struct ObjectAllocator {
    ty: ObjectType,
    entries: Vec<Entry>,
    free: Vec<u32>,
    max_id: u32,
    live: usize,
}

impl ObjectAllocator {
    pub fn new(ty: ObjectType, max_id: u32) -> Self {
        Self {
            ty,
            entries: Vec::new(),
            free: Vec::new(),
            max_id,
            live: 0,
        }
    }

    pub fn object_type(&self) -> ObjectType {
        self.ty
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn entry_mut(&mut self, id: u32) -> Option<&mut Entry> {
        let index = (id as usize).checked_sub(1)?;
        self.entries.get_mut(index)
    }

    pub fn allocate(&mut self) -> WireResult<Handle> {
        if let Some(id) = self.free.pop() {
            if let Some(entry) = self.entry_mut(id) {
                entry.live = true;
                let generation = entry.generation;
                self.live += 1;
                return Ok(Handle::new(id, generation));
            }
        }
        let id = self.entries.len() as u32 + 1;
        if id > self.max_id {
            return Err(WireError::ObjectIdOutOfRange {
                ty: self.ty,
                id,
                max: self.max_id,
            });
        }
        self.entries.push(Entry {
            generation: 0,
            live: true,
        });
        self.live += 1;
        Ok(Handle::new(id, 0))
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        (handle.id as usize)
            .checked_sub(1)
            .and_then(|index| self.entries.get(index))
            .is_some_and(|entry| entry.live && entry.generation == handle.generation)
    }

    /// Free `handle` for reuse under the next generation.
    pub fn release(&mut self, handle: Handle) -> WireResult<()> {
        if !self.is_live(handle) {
            return Err(WireError::UnknownObject {
                ty: self.ty,
                id: handle.id,
            });
        }
        let ty = self.ty;
        let Some(entry) = self.entry_mut(handle.id) else {
            return Err(WireError::UnknownObject { ty, id: handle.id });
        };
        entry.live = false;
        let next = entry.generation.checked_add(1);
        if let Some(next) = next {
            entry.generation = next;
        }
        self.live -= 1;
        match next {
            Some(_) => self.free.push(handle.id),
            None => tracing::debug!(id = handle.id, ty = ty.name(), "retiring exhausted object id"),
        }
        Ok(())
    }
}
