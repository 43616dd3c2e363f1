use std::{collections::HashMap, sync::Arc};

use crate::{HeapCell, HeapObject, Message, RexxString, Value};

/// Relocatable reference to an entry of a [`FlatImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlatRef(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatValue {
    Integer(i64),
    String(RexxString),
    Ref(FlatRef),
    /// host receivers are opaque, only their name survives
    Native(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatObject {
    Array {
        dimensions: Vec<usize>,
        slots: Vec<Option<FlatValue>>,
    },
    List(Vec<FlatValue>),
    Queue(Vec<FlatValue>),
    Supplier {
        items: Vec<Option<FlatValue>>,
        indexes: Vec<Option<FlatValue>>,
    },
    Buffer(Vec<u8>),
    Table(Vec<(RexxString, FlatValue)>),
    /// `None` when the referent is not part of the image
    WeakReference(Option<FlatRef>),
    Message {
        target: FlatValue,
        selector: String,
        arguments: Vec<FlatValue>,
    },
}

/// Snapshot of everything reachable from one root. Shared objects appear
/// once and cycles are kept as back references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatImage {
    pub root: FlatValue,
    pub entries: Vec<FlatObject>,
}

impl FlatImage {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, reference: FlatRef) -> Option<&FlatObject> {
        self.entries.get(reference.0)
    }
}

#[derive(Default)]
pub struct Flattener {
    cells: HashMap<*const HeapCell, FlatRef, ahash::RandomState>,
    messages: HashMap<*const Message, FlatRef, ahash::RandomState>,
    entries: Vec<FlatObject>,
    pending: Vec<(FlatRef, Value)>,
    weak: Vec<(FlatRef, *const HeapCell)>,
}

impl Flattener {
    pub fn flatten(root: &Value) -> FlatImage {
        let mut flattener = Flattener::default();
        let root = flattener.reference(root);
        while let Some((at, value)) = flattener.pending.pop() {
            let entry = flattener.flatten_value(&value);
            flattener.entries[at.0] = entry;
        }
        // weak referents only count when something else brought them in
        for (at, target) in std::mem::take(&mut flattener.weak) {
            let resolved = flattener.cells.get(&target).copied();
            flattener.entries[at.0] = FlatObject::WeakReference(resolved);
        }
        log::debug!("flattened {} entries", flattener.entries.len());
        FlatImage {
            root,
            entries: flattener.entries,
        }
    }

    fn reserve(&mut self, value: Value) -> FlatRef {
        let at = FlatRef(self.entries.len());
        self.entries.push(FlatObject::WeakReference(None));
        self.pending.push((at, value));
        at
    }

    fn reference(&mut self, value: &Value) -> FlatValue {
        match value {
            Value::Integer(value) => FlatValue::Integer(*value),
            Value::String(value) => FlatValue::String(value.clone()),
            Value::Native(receiver) => FlatValue::Native(receiver.type_name().to_owned()),
            Value::Object(handle) => {
                let key = handle.as_ptr();
                let at = match self.cells.get(&key) {
                    Some(&at) => at,
                    None => {
                        let at = self.reserve(value.clone());
                        self.cells.insert(key, at);
                        at
                    }
                };
                FlatValue::Ref(at)
            }
            Value::Message(message) => {
                let key = Arc::as_ptr(message);
                let at = match self.messages.get(&key) {
                    Some(&at) => at,
                    None => {
                        let at = self.reserve(value.clone());
                        self.messages.insert(key, at);
                        at
                    }
                };
                FlatValue::Ref(at)
            }
        }
    }

    fn slots(&mut self, slots: &[Option<Value>]) -> Vec<Option<FlatValue>> {
        slots
            .iter()
            .map(|slot| slot.as_ref().map(|value| self.reference(value)))
            .collect()
    }

    fn flatten_value(&mut self, value: &Value) -> FlatObject {
        match value {
            Value::Message(message) => FlatObject::Message {
                target: self.reference(message.target()),
                selector: message.selector().name().to_owned(),
                arguments: message
                    .arguments()
                    .iter()
                    .map(|arg| self.reference(arg))
                    .collect(),
            },
            Value::Object(handle) => {
                let object = handle.read();
                match &*object {
                    HeapObject::Array(array) => FlatObject::Array {
                        dimensions: array.dimensions(),
                        slots: self.slots(array.slots()),
                    },
                    HeapObject::List(list) => {
                        FlatObject::List(list.iter().map(|(_, v)| self.reference(v)).collect())
                    }
                    HeapObject::Queue(queue) => FlatObject::Queue(
                        queue
                            .as_array()
                            .storage()
                            .iter_occupied()
                            .map(|(_, v)| self.reference(v))
                            .collect(),
                    ),
                    HeapObject::Supplier(supplier) => FlatObject::Supplier {
                        items: self.slots(supplier.all_items().slots()),
                        indexes: self.slots(supplier.all_indexes().slots()),
                    },
                    HeapObject::Buffer(buffer) => FlatObject::Buffer(buffer.as_bytes().to_vec()),
                    HeapObject::Table(table) => FlatObject::Table(
                        table
                            .iter()
                            .map(|(name, v)| (name.clone(), self.reference(v)))
                            .collect(),
                    ),
                    HeapObject::WeakReference(weak) => {
                        let at = self.cells.get(&handle.as_ptr()).copied();
                        if let Some(at) = at {
                            self.weak.push((at, weak.target_ptr()));
                        }
                        FlatObject::WeakReference(None)
                    }
                }
            }
            // immediates never get an entry
            _ => FlatObject::WeakReference(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Array, List, MutableBuffer, Selector, TailTable};

    #[test]
    fn shared_objects_are_flattened_once() {
        let shared = Value::object(MutableBuffer::new(b"data"));
        let root = Value::object(Array::of(vec![shared.clone(), shared.clone(), 7i64.into()]).unwrap());
        let image = Flattener::flatten(&root);
        assert_eq!(image.len(), 2);
        let Some(FlatObject::Array { slots, .. }) = image.entry(FlatRef(0)) else {
            panic!("root should be an array");
        };
        assert_eq!(slots[0], slots[1]);
        assert_eq!(slots[2], Some(FlatValue::Integer(7)));
        assert_eq!(image.entry(FlatRef(1)), Some(&FlatObject::Buffer(b"data".to_vec())));
    }

    #[test]
    fn cycles_become_back_references() {
        let list = Value::object(List::new());
        let handle = list.as_handle().cloned().unwrap();
        if let HeapObject::List(l) = &mut *handle.write() {
            l.add_last(list.clone());
        }
        let image = Flattener::flatten(&list);
        assert_eq!(image.root, FlatValue::Ref(FlatRef(0)));
        assert_eq!(image.entries, vec![FlatObject::List(vec![FlatValue::Ref(FlatRef(0))])]);
        if let HeapObject::List(l) = &mut *handle.write() {
            l.empty();
        }
    }

    #[test]
    fn weak_references_resolve_only_inside_the_image() {
        let inside = Value::object(TailTable::new());
        let outside = Value::object(TailTable::new());
        let root = Value::object(Array::of(vec![
            inside.clone(),
            Value::object(inside.as_handle().unwrap().downgrade()),
            Value::object(outside.as_handle().unwrap().downgrade()),
        ]).unwrap());
        let image = Flattener::flatten(&root);
        let weak: Vec<Option<FlatRef>> = image
            .entries
            .iter()
            .filter_map(|entry| match entry {
                FlatObject::WeakReference(target) => Some(*target),
                _ => None,
            })
            .collect();
        assert_eq!(weak.len(), 2);
        assert!(weak.contains(&None));
        assert!(weak.iter().flatten().any(|at| matches!(image.entry(*at), Some(FlatObject::Table(_)))));
    }

    #[test]
    fn messages_flatten_target_and_arguments() {
        let target = Value::object(Array::of(vec![]).unwrap());
        let message = Message::new(target, Selector::new("put"), vec!["x".into(), 1i64.into()]);
        let image = Flattener::flatten(&Value::Message(message));
        let Some(FlatObject::Message { selector, arguments, target }) = image.entry(FlatRef(0)) else {
            panic!("root should be a message");
        };
        assert_eq!(selector, "PUT");
        assert_eq!(arguments.len(), 2);
        assert_eq!(*target, FlatValue::Ref(FlatRef(1)));
    }
}
