use std::cmp::Ordering;

use crate::{
    Array, Handle, HeapObject, Result, RexxError, Selector, Value,
    primitives::{PrimitiveContext, PrimitiveMessage, VARIADIC, boolean},
    value::ordering_of,
};

receiver_access!(Array, Array);

pub const PRIMITIVES: &[PrimitiveMessage<Handle>] = &[
    PrimitiveMessage::new("AT", 1, VARIADIC, at),
    PrimitiveMessage::new("[]", 1, VARIADIC, at),
    PrimitiveMessage::new("PUT", 2, VARIADIC, put),
    PrimitiveMessage::new("[]=", 2, VARIADIC, put),
    PrimitiveMessage::new("REMOVE", 1, VARIADIC, remove),
    PrimitiveMessage::new("HASINDEX", 1, VARIADIC, has_index),
    PrimitiveMessage::new("INSERT", 1, 2, insert),
    PrimitiveMessage::new("APPEND", 1, 1, append),
    PrimitiveMessage::new("DELETE", 1, 1, delete),
    PrimitiveMessage::new("SECTION", 1, 2, section),
    PrimitiveMessage::new("SIZE", 0, 0, size),
    PrimitiveMessage::new("ITEMS", 0, 0, items),
    PrimitiveMessage::new("ISEMPTY", 0, 0, is_empty),
    PrimitiveMessage::new("DIMENSION", 0, 1, dimension),
    PrimitiveMessage::new("FIRST", 0, 0, first),
    PrimitiveMessage::new("LAST", 0, 0, last),
    PrimitiveMessage::new("NEXT", 1, VARIADIC, next),
    PrimitiveMessage::new("PREVIOUS", 1, VARIADIC, previous),
    PrimitiveMessage::new("FIRSTITEM", 0, 0, first_item),
    PrimitiveMessage::new("LASTITEM", 0, 0, last_item),
    PrimitiveMessage::new("INDEX", 1, 1, index),
    PrimitiveMessage::new("HASITEM", 1, 1, has_item),
    PrimitiveMessage::new("REMOVEITEM", 1, 1, remove_item),
    PrimitiveMessage::new("ALLITEMS", 0, 0, all_items),
    PrimitiveMessage::new("ALLINDEXES", 0, 0, all_indexes),
    PrimitiveMessage::new("FILL", 1, 1, fill),
    PrimitiveMessage::new("EMPTY", 0, 0, empty),
    PrimitiveMessage::new("MAKESTRING", 0, 1, make_string),
    PrimitiveMessage::new("SUPPLIER", 0, 0, supplier),
    PrimitiveMessage::new("UNION", 1, 1, union),
    PrimitiveMessage::new("SORT", 0, 0, stable_sort),
    PrimitiveMessage::new("STABLESORT", 0, 0, stable_sort),
    PrimitiveMessage::new("SORTWITH", 1, 1, stable_sort_with),
    PrimitiveMessage::new("STABLESORTWITH", 1, 1, stable_sort_with),
];

/// Index value for a flat position: an integer, or an array of
/// subscripts for multi-dimensional arrays.
fn index_value(array: &Array, position: usize) -> Result<Value> {
    match array.convert_index(position) {
        Some(subscripts) if array.is_multi_dimensional() => {
            Ok(Value::object(Array::of(subscripts.into_iter().map(Value::from))?))
        }
        _ => Ok(Value::from(position)),
    }
}

/// Subscripts given either as separate arguments or as one array.
fn subscripts(ctx: &PrimitiveContext<Handle>, from: usize) -> Result<Vec<usize>> {
    if ctx.arguments.len() == from {
        if let Some(handle) = ctx.arg(from)?.as_handle() {
            if let HeapObject::Array(subscripts) = &*handle.read() {
                return subscripts
                    .slots()
                    .iter()
                    .map(|slot| match slot {
                        Some(value) => value.as_index(from),
                        None => Err(RexxError::invalid_index(from, "")),
                    })
                    .collect();
            }
        }
    }
    ctx.subscripts(from)
}

fn position_of(array: &Array, subscripts: &[usize]) -> Option<usize> {
    match subscripts {
        [single] if !array.is_multi_dimensional() => Some(*single),
        _ => array.flatten_index(subscripts),
    }
}

fn at(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let subscripts = subscripts(ctx, 1)?;
    read(ctx, |array| Ok(array.get(&subscripts)?.item().cloned()))
}

fn put(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let value = ctx.arg(1)?.clone();
    let subscripts = subscripts(ctx, 2)?;
    write(ctx, |array| array.put(Some(value), &subscripts))?;
    Ok(None)
}

fn remove(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let subscripts = subscripts(ctx, 1)?;
    write(ctx, |array| array.remove(&subscripts))
}

fn has_index(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let subscripts = subscripts(ctx, 1)?;
    read(ctx, |array| Ok(boolean(array.has_index(&subscripts)?)))
}

// insert(item, index?): placed at `index`, appended after the last
// slot when the index is omitted
fn insert(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let value = ctx.arg(1)?.clone();
    let index = ctx.opt_index(2)?;
    write(ctx, |array| {
        let index = index.unwrap_or(array.size() + 1);
        array.insert(Some(value), index).map(|at| Some(Value::from(at)))
    })
}

fn append(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let value = ctx.arg(1)?.clone();
    write(ctx, |array| array.append(value).map(|at| Some(Value::from(at))))
}

fn delete(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let index = ctx.index(1)?;
    write(ctx, |array| array.delete(index))
}

fn section(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let start = ctx.index(1)?;
    let count = ctx.opt_length(2)?;
    let section = read(ctx, |array| array.section(start, count))?;
    Ok(Some(Value::object(section)))
}

fn size(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |array| Ok(Some(Value::from(array.size()))))
}

fn items(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |array| Ok(Some(Value::from(array.items()))))
}

fn is_empty(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |array| Ok(boolean(array.is_empty())))
}

// dimension() is the count of dimensions, dimension(n) the size of one
fn dimension(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let n = ctx.opt_index(1)?;
    read(ctx, |array| {
        Ok(Some(match n {
            Some(n) => Value::from(array.dimension(n)),
            None => Value::from(array.dimensions().len()),
        }))
    })
}

fn first(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |array| array.first().map(|at| index_value(array, at)).transpose())
}

fn last(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |array| array.last().map(|at| index_value(array, at)).transpose())
}

fn next(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let subscripts = subscripts(ctx, 1)?;
    read(ctx, |array| {
        position_of(array, &subscripts)
            .and_then(|at| array.next(at))
            .map(|at| index_value(array, at))
            .transpose()
    })
}

fn previous(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let subscripts = subscripts(ctx, 1)?;
    read(ctx, |array| {
        position_of(array, &subscripts)
            .and_then(|at| array.previous(at))
            .map(|at| index_value(array, at))
            .transpose()
    })
}

fn first_item(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |array| Ok(array.first().and_then(|at| array.at(at)).cloned()))
}

fn last_item(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |array| Ok(array.last().and_then(|at| array.at(at)).cloned()))
}

fn index(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let item = ctx.arg(1)?;
    read(ctx, |array| array.index_of(item).map(|at| index_value(array, at)).transpose())
}

fn has_item(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let item = ctx.arg(1)?;
    read(ctx, |array| Ok(boolean(array.has_item(item))))
}

fn remove_item(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let item = ctx.arg(1)?;
    write(ctx, |array| Ok(array.remove_item(item)))
}

fn all_items(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |array| Ok(Some(Value::object(array.all_items()?))))
}

fn all_indexes(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |array| Ok(Some(Value::object(array.all_indexes()?))))
}

fn fill(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let value = ctx.arg(1)?;
    write(ctx, |array| {
        array.fill(value);
        Ok(None)
    })
}

fn empty(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    write(ctx, |array| {
        array.empty();
        Ok(None)
    })
}

// items are joined with a line feed unless a separator is given
fn make_string(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let separator = match ctx.opt(1) {
        Some(separator) => separator.to_rexx_string(),
        None => "\n".into(),
    };
    read(ctx, |array| {
        Ok(Some(Value::String(array.make_string(separator.as_bytes()))))
    })
}

fn supplier(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |array| Ok(Some(Value::object(array.supplier()?))))
}

fn union(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let other = ctx.arg(1)?;
    let other = match other.as_handle().map(|handle| handle.read().clone()) {
        Some(HeapObject::Array(other)) => other,
        _ => {
            return Err(RexxError::InvalidArgument {
                position: 1,
                expected: "an array",
                value: other.to_string(),
            });
        }
    };
    let joined = read(ctx, |array| array.join(&other))?;
    Ok(Some(Value::object(joined)))
}

/// Sort a copy outside the lock, since comparisons may send messages
/// back to the receiver, then store the ordered slots. A receiver changed
/// while the comparator ran is left alone and the sort fails.
fn sort_detached(
    ctx: &PrimitiveContext<Handle>,
    compare: impl FnMut(&Value, &Value) -> Result<Ordering>,
) -> Result<Option<Value>> {
    let before = read(ctx, |array| Ok(array.clone()))?;
    let mut sorted = before.clone();
    sorted.stable_sort_with(compare)?;
    write(ctx, |array| {
        if !array.same_contents(&before) {
            log::debug!("{} changed its receiver, sort discarded", ctx.selector.name());
            return Err(RexxError::ModifiedDuringSort { method: "SORT" });
        }
        *array = sorted;
        Ok(None)
    })
}

fn stable_sort(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    sort_detached(ctx, |a, b| a.compare(b))
}

fn stable_sort_with(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let comparator = ctx.arg(1)?.clone();
    let selector = Selector::new("COMPARE");
    sort_detached(ctx, |a, b| {
        ordering_of(comparator.send(&selector, &[a.clone(), b.clone()])?)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{Array, Receiver, Result, RexxError, Selector, Value, value::ordering_of};

    fn send(target: &Value, name: &str, arguments: &[Value]) -> Result<Option<Value>> {
        target.send(&Selector::new(name), arguments)
    }

    fn integers(value: &Value) -> Vec<i64> {
        let items = send(value, "allItems", &[]).unwrap().unwrap();
        let size = send(&items, "size", &[]).unwrap().unwrap().as_integer().unwrap();
        (1..=size)
            .map(|n| send(&items, "at", &[n.into()]).unwrap().unwrap().as_integer().unwrap())
            .collect()
    }

    struct Descending;

    impl Receiver for Descending {
        fn invoke(&self, selector: &Selector, arguments: &[Value]) -> Result<Option<Value>> {
            assert!(selector.is("COMPARE"));
            let ordering = arguments[1].compare(&arguments[0])?;
            Ok(Some(Value::Integer(ordering as i64)))
        }
    }

    #[test]
    fn put_and_at_through_messages() {
        let array = Value::object(Array::new(3).unwrap());
        send(&array, "put", &["a".into(), 1i64.into()]).unwrap();
        send(&array, "[]=", &["c".into(), 3i64.into()]).unwrap();
        assert_eq!(send(&array, "items", &[]).unwrap().unwrap().as_integer(), Some(2));
        assert!(send(&array, "at", &[2i64.into()]).unwrap().is_none());
        let c = send(&array, "[]", &[3i64.into()]).unwrap().unwrap();
        assert_eq!(c.to_string(), "c");
        let err = send(&array, "at", &[0i64.into()]).unwrap_err();
        assert_eq!(err.name(), "invalid index");
    }

    #[test]
    fn multi_dimensional_indexes_come_back_as_arrays() {
        let array = Value::object(Array::with_dimensions(&[2, 3]).unwrap());
        send(&array, "put", &["x".into(), 2i64.into(), 3i64.into()]).unwrap();
        let first = send(&array, "first", &[]).unwrap().unwrap();
        assert_eq!(send(&first, "makeString", &[",".into()]).unwrap().unwrap().to_string(), "2,3");
        let via_array = send(&array, "at", &[first]).unwrap().unwrap();
        assert_eq!(via_array.to_string(), "x");
        assert_eq!(send(&array, "dimension", &[]).unwrap().unwrap().as_integer(), Some(2));
        assert_eq!(send(&array, "dimension", &[2i64.into()]).unwrap().unwrap().as_integer(), Some(3));
    }

    #[test]
    fn sort_with_a_comparator_object() {
        let array = Value::object(Array::of([3i64, 1, 2].map(Value::from)).unwrap());
        send(&array, "sortWith", &[Value::Native(Arc::new(Descending))]).unwrap();
        assert_eq!(integers(&array), vec![3, 2, 1]);
        send(&array, "sort", &[]).unwrap();
        assert_eq!(integers(&array), vec![1, 2, 3]);
    }

    #[test]
    fn comparator_may_message_the_array_being_sorted() {
        struct BySize(Value);
        impl Receiver for BySize {
            fn invoke(&self, _: &Selector, arguments: &[Value]) -> Result<Option<Value>> {
                // reentrant call into the receiver under sort
                self.0.send(&Selector::new("items"), &[])?;
                let ordering = arguments[0].compare(&arguments[1])?;
                Ok(Some(Value::Integer(ordering as i64)))
            }
        }
        let array = Value::object(Array::of([2i64, 1].map(Value::from)).unwrap());
        let comparator = Value::Native(Arc::new(BySize(array.clone())));
        send(&array, "sortWith", &[comparator]).unwrap();
        assert_eq!(integers(&array), vec![1, 2]);
    }

    #[test]
    fn comparator_changes_to_the_array_are_not_lost() {
        struct Appender {
            array: Value,
            done: std::sync::atomic::AtomicBool,
        }
        impl Receiver for Appender {
            fn invoke(&self, _: &Selector, arguments: &[Value]) -> Result<Option<Value>> {
                if !self.done.swap(true, std::sync::atomic::Ordering::SeqCst) {
                    self.array.send(&Selector::new("append"), &[99i64.into()])?;
                }
                let ordering = arguments[0].compare(&arguments[1])?;
                Ok(Some(Value::Integer(ordering as i64)))
            }
        }
        let array = Value::object(Array::of([2i64, 1].map(Value::from)).unwrap());
        let comparator = Value::Native(Arc::new(Appender {
            array: array.clone(),
            done: Default::default(),
        }));
        let err = send(&array, "sortWith", &[comparator]).unwrap_err();
        assert_eq!(err, RexxError::ModifiedDuringSort { method: "SORT" });
        assert_eq!(send(&array, "items", &[]).unwrap().unwrap().as_integer(), Some(3));
        assert_eq!(integers(&array), vec![2, 1, 99]);
    }

    #[test]
    fn sparse_arrays_refuse_to_sort() {
        let array = Value::object(Array::new(3).unwrap());
        send(&array, "put", &[1i64.into(), 1i64.into()]).unwrap();
        send(&array, "put", &[2i64.into(), 3i64.into()]).unwrap();
        assert_eq!(
            send(&array, "sort", &[]).unwrap_err(),
            RexxError::SparseArray { index: 2 }
        );
    }

    #[test]
    fn bad_comparator_results_are_invalid_arguments() {
        assert!(ordering_of(None).is_err());
        struct Silent;
        impl Receiver for Silent {
            fn invoke(&self, _: &Selector, _: &[Value]) -> Result<Option<Value>> {
                Ok(None)
            }
        }
        let array = Value::object(Array::of([2i64, 1].map(Value::from)).unwrap());
        let err = send(&array, "sortWith", &[Value::Native(Arc::new(Silent))]).unwrap_err();
        assert_eq!(err.name(), "invalid argument");
        assert_eq!(integers(&array), vec![2, 1]);
    }

    #[test]
    fn insert_delete_and_section() {
        let array = Value::object(Array::of(["a", "c"].map(Value::from)).unwrap());
        let at = send(&array, "insert", &["b".into(), 2i64.into()]).unwrap().unwrap();
        assert_eq!(at.as_integer(), Some(2));
        send(&array, "insert", &["d".into()]).unwrap();
        assert_eq!(send(&array, "makeString", &["".into()]).unwrap().unwrap().to_string(), "abcd");
        let removed = send(&array, "delete", &[1i64.into()]).unwrap().unwrap();
        assert_eq!(removed.to_string(), "a");
        let section = send(&array, "section", &[2i64.into(), 5i64.into()]).unwrap().unwrap();
        assert_eq!(send(&section, "makeString", &["".into()]).unwrap().unwrap().to_string(), "cd");
    }
}
