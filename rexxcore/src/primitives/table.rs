use crate::{
    Array, CompoundTail, Handle, Result, Supplier, TailTable, Value,
    primitives::{PrimitiveContext, PrimitiveMessage, VARIADIC, boolean},
};

receiver_access!(Table, TailTable);

pub const PRIMITIVES: &[PrimitiveMessage<Handle>] = &[
    PrimitiveMessage::new("AT", 1, VARIADIC, at),
    PrimitiveMessage::new("[]", 1, VARIADIC, at),
    PrimitiveMessage::new("PUT", 2, VARIADIC, put),
    PrimitiveMessage::new("[]=", 2, VARIADIC, put),
    PrimitiveMessage::new("REMOVE", 1, VARIADIC, remove),
    PrimitiveMessage::new("DROP", 1, VARIADIC, remove),
    PrimitiveMessage::new("HASINDEX", 1, VARIADIC, has_index),
    PrimitiveMessage::new("ITEMS", 0, 0, items),
    PrimitiveMessage::new("ISEMPTY", 0, 0, is_empty),
    PrimitiveMessage::new("EMPTY", 0, 0, empty),
    PrimitiveMessage::new("ALLINDEXES", 0, 0, all_indexes),
    PrimitiveMessage::new("ALLITEMS", 0, 0, all_items),
    PrimitiveMessage::new("SUPPLIER", 0, 0, supplier),
];

fn tail(ctx: &PrimitiveContext<Handle>, from: usize) -> CompoundTail {
    CompoundTail::from_values(ctx.arguments.get(from - 1..).unwrap_or_default())
}

fn at(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let tail = tail(ctx, 1);
    read(ctx, |table| Ok(table.get(tail.as_bytes()).cloned()))
}

fn put(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let value = ctx.arg(1)?.clone();
    let tail = tail(ctx, 2);
    write(ctx, |table| {
        table.set(tail.as_bytes(), value);
        Ok(None)
    })
}

fn remove(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let tail = tail(ctx, 1);
    write(ctx, |table| Ok(table.drop_tail(tail.as_bytes())))
}

fn has_index(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let tail = tail(ctx, 1);
    read(ctx, |table| Ok(boolean(table.get(tail.as_bytes()).is_some())))
}

fn items(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |table| Ok(Some(Value::from(table.len()))))
}

fn is_empty(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |table| Ok(boolean(table.is_empty())))
}

fn empty(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    write(ctx, |table| {
        table.clear();
        Ok(None)
    })
}

fn names(table: &TailTable) -> Result<Array> {
    Array::of(table.iter().map(|(name, _)| Value::String(name.clone())))
}

fn values(table: &TailTable) -> Result<Array> {
    Array::of(table.iter().map(|(_, value)| value.clone()))
}

fn all_indexes(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |table| Ok(Some(Value::object(names(table)?))))
}

fn all_items(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |table| Ok(Some(Value::object(values(table)?))))
}

fn supplier(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |table| {
        Ok(Some(Value::object(Supplier::new(values(table)?, names(table)?))))
    })
}
