//! Generational arena holding the runtime's objects.

use std::any::Any;
use std::fmt;

use rustc_hash::FxHashMap;

use dynbridge_core::{DelegateTarget, ForeignValue, ObjectRef, TypeHash};

/// Payload of a heap object.
pub enum ObjectData {
    /// Instance fields keyed by field id.
    Fields(FxHashMap<TypeHash, ForeignValue>),
    Array(Vec<ForeignValue>),
    List(Vec<ForeignValue>),
    /// Insertion-ordered entries.
    Dict(Vec<(ForeignValue, ForeignValue)>),
    Pair(ForeignValue, ForeignValue),
    Delegate(DelegateTarget),
    /// Arbitrary state owned by native methods.
    Native(Box<dyn Any + Send + Sync>),
}

impl ObjectData {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ObjectData::Fields(_) => "fields",
            ObjectData::Array(_) => "array",
            ObjectData::List(_) => "list",
            ObjectData::Dict(_) => "dict",
            ObjectData::Pair(..) => "pair",
            ObjectData::Delegate(_) => "delegate",
            ObjectData::Native(_) => "native",
        }
    }
}

impl fmt::Debug for ObjectData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind_name())
    }
}

/// One live object.
#[derive(Debug)]
pub struct HeapObject {
    pub type_hash: TypeHash,
    pub data: ObjectData,
    pub disposed: bool,
}

struct HeapSlot {
    generation: u32,
    object: Option<HeapObject>,
}

/// Heap storage with generational indices.
///
/// Releasing an object bumps its slot's generation, so references taken
/// before the release are detected as stale instead of reaching whatever
/// reuses the slot.
#[derive(Default)]
pub struct ObjectHeap {
    slots: Vec<HeapSlot>,
    free_list: Vec<u32>,
}

impl ObjectHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, type_hash: TypeHash, data: ObjectData) -> ObjectRef {
        let object = HeapObject {
            type_hash,
            data,
            disposed: false,
        };
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            ObjectRef::new(index, slot.generation, type_hash)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(HeapSlot {
                generation: 0,
                object: Some(object),
            });
            ObjectRef::new(index, 0, type_hash)
        }
    }

    /// Returns `None` if the reference is stale.
    pub fn get(&self, obj: ObjectRef) -> Option<&HeapObject> {
        let slot = self.slots.get(obj.index as usize)?;
        if slot.generation != obj.generation {
            return None;
        }
        slot.object.as_ref()
    }

    pub fn get_mut(&mut self, obj: ObjectRef) -> Option<&mut HeapObject> {
        let slot = self.slots.get_mut(obj.index as usize)?;
        if slot.generation != obj.generation {
            return None;
        }
        slot.object.as_mut()
    }

    /// Free the object. Returns false for stale references.
    pub fn free(&mut self, obj: ObjectRef) -> bool {
        if let Some(slot) = self.slots.get_mut(obj.index as usize)
            && slot.generation == obj.generation
            && slot.object.is_some()
        {
            slot.object = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(obj.index);
            return true;
        }
        false
    }

    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Resolve a value to its object, if it is one.
    pub fn object_of(&self, value: &ForeignValue) -> Option<&HeapObject> {
        value.as_object().and_then(|obj| self.get(obj))
    }
}

impl fmt::Debug for ObjectHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHeap")
            .field("slot_count", &self.slots.len())
            .field("free_count", &self.free_list.len())
            .finish()
    }
}
