use crate::{
    Handle, Queue, Result, Value,
    primitives::{PrimitiveContext, PrimitiveMessage, VARIADIC, boolean},
};

receiver_access!(Queue, Queue);

pub const PRIMITIVES: &[PrimitiveMessage<Handle>] = &[
    PrimitiveMessage::new("PUSH", 1, 1, push),
    PrimitiveMessage::new("QUEUE", 1, 1, queue),
    PrimitiveMessage::new("APPEND", 1, 1, queue),
    PrimitiveMessage::new("PULL", 0, 0, pull),
    PrimitiveMessage::new("PEEK", 0, 0, peek),
    PrimitiveMessage::new("AT", 1, VARIADIC, at),
    PrimitiveMessage::new("[]", 1, VARIADIC, at),
    PrimitiveMessage::new("PUT", 2, VARIADIC, put),
    PrimitiveMessage::new("[]=", 2, VARIADIC, put),
    PrimitiveMessage::new("INSERT", 1, 2, insert),
    PrimitiveMessage::new("REMOVE", 1, VARIADIC, remove),
    PrimitiveMessage::new("HASINDEX", 1, VARIADIC, has_index),
    PrimitiveMessage::new("ITEMS", 0, 0, items),
    PrimitiveMessage::new("SIZE", 0, 0, items),
    PrimitiveMessage::new("ISEMPTY", 0, 0, is_empty),
    PrimitiveMessage::new("EMPTY", 0, 0, empty),
    PrimitiveMessage::new("FIRST", 0, 0, first),
    PrimitiveMessage::new("LAST", 0, 0, last),
    PrimitiveMessage::new("INDEX", 1, 1, index),
    PrimitiveMessage::new("HASITEM", 1, 1, has_item),
    PrimitiveMessage::new("REMOVEITEM", 1, 1, remove_item),
    PrimitiveMessage::new("ALLITEMS", 0, 0, all_items),
    PrimitiveMessage::new("ALLINDEXES", 0, 0, all_indexes),
    PrimitiveMessage::new("SUPPLIER", 0, 0, supplier),
];

fn single_index(ctx: &PrimitiveContext<Handle>, from: usize) -> Result<usize> {
    Queue::single_index(&ctx.subscripts(from)?)
}

fn push(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let value = ctx.arg(1)?.clone();
    write(ctx, |queue| queue.push(value))?;
    Ok(None)
}

fn queue(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let value = ctx.arg(1)?.clone();
    write(ctx, |queue| queue.queue(value).map(|at| Some(Value::from(at))))
}

fn pull(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    write(ctx, |queue| queue.pull())
}

fn peek(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |queue| Ok(queue.peek().cloned()))
}

fn at(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let index = single_index(ctx, 1)?;
    read(ctx, |queue| Ok(queue.at(index).cloned()))
}

fn put(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let value = ctx.arg(1)?.clone();
    let index = single_index(ctx, 2)?;
    write(ctx, |queue| queue.put(value, index))?;
    Ok(None)
}

// insert(item, index?): at the back when the index is omitted
fn insert(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let value = ctx.arg(1)?.clone();
    let index = ctx.opt_index(2)?;
    write(ctx, |queue| {
        let index = index.unwrap_or(queue.items() + 1);
        queue.insert(value, index).map(|at| Some(Value::from(at)))
    })
}

fn remove(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let index = single_index(ctx, 1)?;
    write(ctx, |queue| queue.remove(index))
}

fn has_index(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let index = single_index(ctx, 1)?;
    read(ctx, |queue| Ok(boolean(queue.has_index(index))))
}

fn items(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |queue| Ok(Some(Value::from(queue.items()))))
}

fn is_empty(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |queue| Ok(boolean(queue.is_empty())))
}

fn empty(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    write(ctx, |queue| {
        queue.empty();
        Ok(None)
    })
}

fn first(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |queue| Ok(queue.first().map(Value::from)))
}

fn last(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |queue| Ok(queue.last().map(Value::from)))
}

fn index(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let item = ctx.arg(1)?;
    read(ctx, |queue| Ok(queue.index_of(item).map(Value::from)))
}

fn has_item(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let item = ctx.arg(1)?;
    read(ctx, |queue| Ok(boolean(queue.has_item(item))))
}

fn remove_item(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let item = ctx.arg(1)?;
    write(ctx, |queue| queue.remove_item(item))
}

fn all_items(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |queue| Ok(Some(Value::object(queue.all_items()?))))
}

fn all_indexes(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |queue| Ok(Some(Value::object(queue.all_indexes()?))))
}

fn supplier(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |queue| Ok(Some(Value::object(queue.supplier()?))))
}
