use crate::error::{WireError, WireResult};
use crate::handle::{Handle, ObjectType};
use crate::schema::ObjectIdResolver;

#[derive(Debug)]
enum Slot<T> {
    Vacant { last_generation: Option<u32> },
    /// Async creation in flight; not resolvable until filled.
    Reserved { generation: u32 },
    Live { generation: u32, object: T },
}

impl<T> Slot<T> {
    const EMPTY: Self = Slot::Vacant {
        last_generation: None,
    };
}

/// Server-side map from handle to native object for one object type.
///
/// Slots are indexed by id. Entries only appear through the server's own
/// create handling and only leave through [`KnownObjects::remove`] or
/// [`KnownObjects::drain`], so a client can only ever name objects it asked
/// the server to create.
#[derive(Debug)]
pub struct KnownObjects<T> {
    ty: ObjectType,
    slots: Vec<Slot<T>>,
    max_id: u32,
    live: usize,
}

impl<T> KnownObjects<T> {
    pub fn new(ty: ObjectType, max_id: u32) -> Self {
        Self {
            ty,
            slots: Vec::new(),
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

    fn non_null(&self, handle: Handle) -> WireResult<usize> {
        if handle.is_null() {
            return Err(WireError::NullObject { ty: self.ty });
        }
        Ok(handle.id as usize)
    }

    fn unknown(&self, handle: Handle) -> WireError {
        WireError::UnknownObject {
            ty: self.ty,
            id: handle.id,
        }
    }

    pub fn get(&self, handle: Handle) -> WireResult<&T> {
        let index = self.non_null(handle)?;
        match self.slots.get(index) {
            Some(Slot::Live { generation, object }) if *generation == handle.generation => {
                Ok(object)
            }
            Some(Slot::Live { generation, .. }) => Err(WireError::StaleObject {
                ty: self.ty,
                id: handle.id,
                expected: *generation,
                found: handle.generation,
            }),
            _ => Err(self.unknown(handle)),
        }
    }

    /// Id `0` resolves to `None`.
    pub fn get_optional(&self, handle: Handle) -> WireResult<Option<&T>> {
        if handle.is_null() {
            return Ok(None);
        }
        self.get(handle).map(Some)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_ok()
    }

    /// Check that `handle` may be bound to a new object.
    pub fn check_vacant(&self, handle: Handle) -> WireResult<()> {
        self.non_null(handle)?;
        if handle.id > self.max_id {
            return Err(WireError::ObjectIdOutOfRange {
                ty: self.ty,
                id: handle.id,
                max: self.max_id,
            });
        }
        match self.slots.get(handle.id as usize) {
            None
            | Some(Slot::Vacant {
                last_generation: None,
            }) => Ok(()),
            Some(Slot::Vacant {
                last_generation: Some(last),
            }) if handle.generation > *last => Ok(()),
            Some(Slot::Vacant {
                last_generation: Some(last),
            }) => Err(WireError::GenerationRegression {
                ty: self.ty,
                id: handle.id,
                generation: handle.generation,
                last: *last,
            }),
            Some(Slot::Reserved { .. } | Slot::Live { .. }) => Err(WireError::SlotOccupied {
                ty: self.ty,
                id: handle.id,
            }),
        }
    }

    fn slot_mut(&mut self, handle: Handle) -> WireResult<&mut Slot<T>> {
        self.check_vacant(handle)?;
        let index = handle.id as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || Slot::EMPTY);
        }
        Ok(&mut self.slots[index])
    }

    pub fn insert(&mut self, handle: Handle, object: T) -> WireResult<()> {
        *self.slot_mut(handle)? = Slot::Live {
            generation: handle.generation,
            object,
        };
        self.live += 1;
        Ok(())
    }

    /// Claim `handle` for an object that will be created asynchronously.
    pub fn reserve(&mut self, handle: Handle) -> WireResult<()> {
        *self.slot_mut(handle)? = Slot::Reserved {
            generation: handle.generation,
        };
        Ok(())
    }

    /// True while an async creation for `handle` is in flight.
    pub fn is_reserved(&self, handle: Handle) -> bool {
        matches!(
            self.slots.get(handle.id as usize),
            Some(Slot::Reserved { generation }) if *generation == handle.generation
        )
    }

    fn reserved_slot(&mut self, handle: Handle) -> WireResult<&mut Slot<T>> {
        if !self.is_reserved(handle) {
            return Err(self.unknown(handle));
        }
        Ok(&mut self.slots[handle.id as usize])
    }

    /// Complete a reservation made with [`KnownObjects::reserve`].
    pub fn fill(&mut self, handle: Handle, object: T) -> WireResult<()> {
        *self.reserved_slot(handle)? = Slot::Live {
            generation: handle.generation,
            object,
        };
        self.live += 1;
        Ok(())
    }

    /// Drop a reservation whose creation failed.
    pub fn unreserve(&mut self, handle: Handle) -> WireResult<()> {
        *self.reserved_slot(handle)? = Slot::Vacant {
            last_generation: Some(handle.generation),
        };
        Ok(())
    }

    /// Take the object out of the table so it can be released.
    pub fn remove(&mut self, handle: Handle) -> WireResult<T> {
        self.get(handle)?;
        let index = handle.id as usize;
        let vacant = Slot::Vacant {
            last_generation: Some(handle.generation),
        };
        match std::mem::replace(&mut self.slots[index], vacant) {
            Slot::Live { object, .. } => {
                self.live -= 1;
                Ok(object)
            }
            other => {
                self.slots[index] = other;
                Err(self.unknown(handle))
            }
        }
    }

    /// Remove every live object, in ascending id order.
    pub fn drain(&mut self) -> Vec<(Handle, T)> {
        let mut out = Vec::with_capacity(self.live);
        for (id, slot) in self.slots.iter_mut().enumerate() {
            let last_generation = match slot {
                Slot::Vacant { .. } => continue,
                Slot::Reserved { generation } | Slot::Live { generation, .. } => *generation,
            };
            let previous = std::mem::replace(
                slot,
                Slot::Vacant {
                    last_generation: Some(last_generation),
                },
            );
            if let Slot::Live { generation, object } = previous {
                out.push((Handle::new(id as u32, generation), object));
            }
        }
        self.live = 0;
        out
    }
}

/// One [`KnownObjects`] table per object type.
#[derive(Debug)]
pub struct ObjectTables<T> {
    tables: Vec<KnownObjects<T>>,
}

impl<T> ObjectTables<T> {
    pub fn new(max_id: u32) -> Self {
        Self {
            tables: ObjectType::ALL
                .iter()
                .map(|&ty| KnownObjects::new(ty, max_id))
                .collect(),
        }
    }

    pub fn table(&self, ty: ObjectType) -> &KnownObjects<T> {
        &self.tables[ty.index()]
    }

    pub fn table_mut(&mut self, ty: ObjectType) -> &mut KnownObjects<T> {
        &mut self.tables[ty.index()]
    }

    pub fn len(&self) -> usize {
        self.tables.iter().map(KnownObjects::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every live object: type by type, ids ascending within a type.
    pub fn drain_all(&mut self) -> Vec<(ObjectType, Handle, T)> {
        let mut out = Vec::new();
        for table in &mut self.tables {
            let ty = table.object_type();
            out.extend(
                table
                    .drain()
                    .into_iter()
                    .map(|(handle, object)| (ty, handle, object)),
            );
        }
        out
    }
}

/// A decoded object field: the native object plus the handle that named it.
#[derive(Debug)]
pub struct ObjectRef<'a, T> {
    pub handle: Handle,
    pub object: &'a T,
}

impl<T> Clone for ObjectRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ObjectRef<'_, T> {}

impl<'a, T> ObjectIdResolver for &'a ObjectTables<T> {
    type Ref = ObjectRef<'a, T>;

    fn get_from_id(&self, ty: ObjectType, handle: Handle) -> WireResult<ObjectRef<'a, T>> {
        let tables: &'a ObjectTables<T> = *self;
        let object = tables.table(ty).get(handle)?;
        Ok(ObjectRef { handle, object })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_check_generation_and_null() {
        let mut table = KnownObjects::new(ObjectType::Buffer, 8);
        table.insert(Handle::new(2, 3), "vb").unwrap();

        assert_eq!(table.get(Handle::new(2, 3)), Ok(&"vb"));
        assert_eq!(
            table.get(Handle::new(2, 4)),
            Err(WireError::StaleObject {
                ty: ObjectType::Buffer,
                id: 2,
                expected: 3,
                found: 4
            })
        );
        assert_eq!(
            table.get(Handle::NULL),
            Err(WireError::NullObject {
                ty: ObjectType::Buffer
            })
        );
        assert_eq!(table.get_optional(Handle::NULL), Ok(None));
        assert!(!table.contains(Handle::new(1, 0)));
    }

    #[test]
    fn reuse_requires_a_newer_generation() {
        let mut table = KnownObjects::new(ObjectType::Texture, 8);
        table.insert(Handle::new(1, 0), 10).unwrap();
        assert_eq!(
            table.insert(Handle::new(1, 1), 11),
            Err(WireError::SlotOccupied {
                ty: ObjectType::Texture,
                id: 1
            })
        );

        assert_eq!(table.remove(Handle::new(1, 0)), Ok(10));
        assert!(matches!(
            table.check_vacant(Handle::new(1, 0)),
            Err(WireError::GenerationRegression { last: 0, .. })
        ));
        table.insert(Handle::new(1, 1), 11).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn reserved_slots_are_not_resolvable_until_filled() {
        let mut table = KnownObjects::new(ObjectType::RenderPipeline, 8);
        let handle = Handle::new(4, 0);
        table.reserve(handle).unwrap();
        assert!(table.is_reserved(handle));
        assert!(table.get(handle).is_err());
        assert!(table.remove(handle).is_err());
        assert!(table.is_reserved(handle));

        table.fill(handle, 1).unwrap();
        assert_eq!(table.get(handle), Ok(&1));
        assert!(table.fill(handle, 2).is_err());

        let other = Handle::new(5, 0);
        table.reserve(other).unwrap();
        table.unreserve(other).unwrap();
        assert!(table.check_vacant(other).is_err());
        assert!(table.check_vacant(Handle::new(5, 1)).is_ok());
    }

    #[test]
    fn ids_past_the_limit_are_rejected() {
        let mut table = KnownObjects::new(ObjectType::Sampler, 4);
        assert!(matches!(
            table.insert(Handle::new(5, 0), ()),
            Err(WireError::ObjectIdOutOfRange { id: 5, max: 4, .. })
        ));
        table.insert(Handle::new(4, 0), ()).unwrap();
    }

    #[test]
    fn drain_is_id_ascending_and_skips_reservations() {
        let mut tables = ObjectTables::new(16);
        tables
            .table_mut(ObjectType::Buffer)
            .insert(Handle::new(3, 0), 'c')
            .unwrap();
        tables
            .table_mut(ObjectType::Buffer)
            .insert(Handle::new(1, 2), 'a')
            .unwrap();
        tables
            .table_mut(ObjectType::ComputePipeline)
            .reserve(Handle::new(1, 0))
            .unwrap();
        tables
            .table_mut(ObjectType::Sampler)
            .insert(Handle::new(2, 0), 's')
            .unwrap();

        let drained = tables.drain_all();
        assert_eq!(
            drained,
            vec![
                (ObjectType::Buffer, Handle::new(1, 2), 'a'),
                (ObjectType::Buffer, Handle::new(3, 0), 'c'),
                (ObjectType::Sampler, Handle::new(2, 0), 's'),
            ]
        );
        assert!(tables.is_empty());
        assert!(tables
            .table(ObjectType::ComputePipeline)
            .check_vacant(Handle::new(1, 0))
            .is_err());
    }

    #[test]
    fn resolver_yields_object_refs() {
        let mut tables = ObjectTables::new(16);
        tables
            .table_mut(ObjectType::ShaderModule)
            .insert(Handle::new(1, 0), "module")
            .unwrap();
        let resolver = &tables;
        let found = resolver
            .get_from_id(ObjectType::ShaderModule, Handle::new(1, 0))
            .unwrap();
        assert_eq!(found.handle, Handle::new(1, 0));
        assert_eq!(*found.object, "module");
        assert!(resolver
            .get_optional_from_id(ObjectType::ShaderModule, Handle::NULL)
            .unwrap()
            .is_none());
        assert!(resolver
            .get_from_id(ObjectType::Buffer, Handle::new(1, 0))
            .is_err());
    }
}
