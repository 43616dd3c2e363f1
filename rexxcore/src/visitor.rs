use std::collections::HashSet;

use crate::{Message, Value};

/// Live-marking contract: an object reports every reference it holds.
pub trait Visitable {
    fn visit_edges(&self, visitor: &mut impl Visitor);
}

pub trait Visitor: Sized {
    fn visit(&mut self, value: &Value);
}

// Idea:
// visiting an object means we visit only its direct edges.
// the marker keeps a worklist so deep structures do not recurse on the
// native stack.

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MarkStats {
    /// heap cells newly marked
    pub cells: usize,
    /// distinct messages traversed
    pub messages: usize,
    /// references looked at, including immediates
    pub values: usize,
}

#[derive(Default)]
pub struct Marker {
    worklist: Vec<Value>,
    messages: HashSet<*const Message, ahash::RandomState>,
    stats: MarkStats,
}

impl Marker {
    /// Mark everything reachable from `roots`. Weak references are not
    /// followed and host receivers are opaque.
    pub fn mark<'a>(roots: impl IntoIterator<Item = &'a Value>) -> MarkStats {
        let mut marker = Marker::default();
        for root in roots {
            marker.visit(root);
        }
        marker.drain();
        marker.stats
    }

    fn drain(&mut self) {
        while let Some(value) = self.worklist.pop() {
            match &value {
                Value::Object(handle) => {
                    let object = handle.read();
                    object.visit_edges(self);
                }
                Value::Message(message) => message.visit_edges(self),
                _ => (),
            }
        }
    }
}

impl Visitor for Marker {
    fn visit(&mut self, value: &Value) {
        self.stats.values += 1;
        match value {
            Value::Object(handle) => {
                if handle.header.mark() {
                    self.stats.cells += 1;
                    self.worklist.push(value.clone());
                }
            }
            Value::Message(message) => {
                if self.messages.insert(std::sync::Arc::as_ptr(message)) {
                    self.stats.messages += 1;
                    self.worklist.push(value.clone());
                }
            }
            _ => (),
        }
    }
}

/// Reset the marks left by [`Marker::mark`] on everything reachable
/// from `roots`.
pub fn clear_marks<'a>(roots: impl IntoIterator<Item = &'a Value>) {
    struct Unmarker {
        worklist: Vec<Value>,
        messages: HashSet<*const Message, ahash::RandomState>,
    }

    impl Visitor for Unmarker {
        fn visit(&mut self, value: &Value) {
            match value {
                Value::Object(handle) if handle.header.is_marked() => {
                    handle.header.unmark();
                    self.worklist.push(value.clone());
                }
                Value::Message(message) => {
                    if self.messages.insert(std::sync::Arc::as_ptr(message)) {
                        self.worklist.push(value.clone());
                    }
                }
                _ => (),
            }
        }
    }

    let mut unmarker = Unmarker {
        worklist: Vec::new(),
        messages: HashSet::default(),
    };
    for root in roots {
        unmarker.visit(root);
    }
    while let Some(value) = unmarker.worklist.pop() {
        match &value {
            Value::Object(handle) => {
                let object = handle.read();
                object.visit_edges(&mut unmarker);
            }
            Value::Message(message) => message.visit_edges(&mut unmarker),
            _ => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Array, List, ListPosition, Selector};

    fn array_of(values: Vec<Value>) -> Value {
        Value::object(Array::of(values).unwrap())
    }

    #[test]
    fn marks_nested_collections_once() {
        let inner = array_of(vec![1i64.into(), "x".into()]);
        let outer = array_of(vec![inner.clone(), inner.clone(), 3i64.into()]);

        let stats = Marker::mark([&outer]);
        assert_eq!(stats.cells, 2);
        assert!(inner.as_handle().is_some_and(|h| h.header.is_marked()));

        clear_marks([&outer]);
        assert!(!inner.as_handle().is_some_and(|h| h.header.is_marked()));
        assert!(!outer.as_handle().is_some_and(|h| h.header.is_marked()));
    }

    #[test]
    fn cycles_terminate() {
        let list = Value::object(List::new());
        let handle = list.as_handle().cloned().unwrap();
        if let crate::HeapObject::List(l) = &mut *handle.write() {
            l.insert(list.clone(), ListPosition::AfterLast).unwrap();
        }
        let stats = Marker::mark([&list]);
        assert_eq!(stats.cells, 1);
        clear_marks([&list]);
        // break the cycle so the test does not leak
        if let crate::HeapObject::List(l) = &mut *handle.write() {
            l.empty();
        }
    }

    #[test]
    fn weak_references_are_not_followed() {
        let target = array_of(vec![]);
        let weak = Value::object(target.as_handle().unwrap().downgrade());
        let holder = array_of(vec![weak]);

        let stats = Marker::mark([&holder]);
        assert_eq!(stats.cells, 2);
        assert!(!target.as_handle().unwrap().header.is_marked());
        clear_marks([&holder]);
    }

    #[test]
    fn messages_mark_target_and_arguments() {
        let target = array_of(vec![]);
        let argument = array_of(vec![]);
        let message = crate::Message::new(target.clone(), Selector::new("items"), vec![argument.clone()]);
        let root = Value::Message(message);

        let stats = Marker::mark([&root]);
        assert_eq!(stats.messages, 1);
        assert_eq!(stats.cells, 2);
        clear_marks([&root]);
        assert!(!argument.as_handle().unwrap().header.is_marked());
    }
}
