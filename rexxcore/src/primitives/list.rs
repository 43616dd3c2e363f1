use crate::{
    Handle, List, ListPosition, ListToken, Result, RexxError, Value,
    primitives::{PrimitiveContext, PrimitiveMessage, boolean},
};

receiver_access!(List, List);

pub const PRIMITIVES: &[PrimitiveMessage<Handle>] = &[
    PrimitiveMessage::new("AT", 1, 1, at),
    PrimitiveMessage::new("[]", 1, 1, at),
    PrimitiveMessage::new("PUT", 2, 2, put),
    PrimitiveMessage::new("[]=", 2, 2, put),
    PrimitiveMessage::new("INSERT", 1, 2, insert),
    PrimitiveMessage::new("APPEND", 1, 1, append),
    PrimitiveMessage::new("REMOVE", 1, 1, remove),
    PrimitiveMessage::new("HASINDEX", 1, 1, has_index),
    PrimitiveMessage::new("FIRST", 0, 0, first),
    PrimitiveMessage::new("LAST", 0, 0, last),
    PrimitiveMessage::new("NEXT", 1, 1, next),
    PrimitiveMessage::new("PREVIOUS", 1, 1, previous),
    PrimitiveMessage::new("FIRSTITEM", 0, 0, first_item),
    PrimitiveMessage::new("LASTITEM", 0, 0, last_item),
    PrimitiveMessage::new("ITEMS", 0, 0, items),
    PrimitiveMessage::new("ISEMPTY", 0, 0, is_empty),
    PrimitiveMessage::new("EMPTY", 0, 0, empty),
    PrimitiveMessage::new("INDEX", 1, 1, index),
    PrimitiveMessage::new("HASITEM", 1, 1, has_item),
    PrimitiveMessage::new("REMOVEITEM", 1, 1, remove_item),
    PrimitiveMessage::new("SECTION", 1, 2, section),
    PrimitiveMessage::new("ALLITEMS", 0, 0, all_items),
    PrimitiveMessage::new("ALLINDEXES", 0, 0, all_indexes),
    PrimitiveMessage::new("SUPPLIER", 0, 0, supplier),
];

/// Lookups with a malformed token simply find nothing.
fn lookup_token(ctx: &PrimitiveContext<Handle>, position: usize) -> Result<Option<ListToken>> {
    Ok(ListToken::from_value(ctx.arg(position)?))
}

fn required_token(ctx: &PrimitiveContext<Handle>, position: usize) -> Result<ListToken> {
    let value = ctx.arg(position)?;
    ListToken::from_value(value).ok_or_else(|| RexxError::IndexNotFound {
        index: value.to_string(),
    })
}

fn at(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let Some(token) = lookup_token(ctx, 1)? else {
        return Ok(None);
    };
    read(ctx, |list| Ok(list.at(token).cloned()))
}

fn put(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let value = ctx.arg(1)?.clone();
    let token = required_token(ctx, 2)?;
    write(ctx, |list| list.put(value, token))?;
    Ok(None)
}

// insert(item, index?): after the last entry by default, before the
// first when the index is 0
fn insert(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let value = ctx.arg(1)?.clone();
    let position = match ctx.opt(2) {
        None => ListPosition::AfterLast,
        Some(index) if index.as_integer() == Some(0) => ListPosition::BeforeFirst,
        Some(_) => ListPosition::After(required_token(ctx, 2)?),
    };
    let token = write(ctx, |list| list.insert(value, position))?;
    Ok(Some(token.into()))
}

fn append(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let value = ctx.arg(1)?.clone();
    write(ctx, |list| Ok(Some(list.append(value).into())))
}

fn remove(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let Some(token) = lookup_token(ctx, 1)? else {
        return Ok(None);
    };
    write(ctx, |list| Ok(list.remove(token)))
}

fn has_index(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let Some(token) = lookup_token(ctx, 1)? else {
        return Ok(boolean(false));
    };
    read(ctx, |list| Ok(boolean(list.has_index(token))))
}

fn first(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |list| Ok(list.first_token().map(Value::from)))
}

fn last(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |list| Ok(list.last_token().map(Value::from)))
}

fn next(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let Some(token) = lookup_token(ctx, 1)? else {
        return Ok(None);
    };
    read(ctx, |list| Ok(list.next_token(token).map(Value::from)))
}

fn previous(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let Some(token) = lookup_token(ctx, 1)? else {
        return Ok(None);
    };
    read(ctx, |list| Ok(list.previous_token(token).map(Value::from)))
}

fn first_item(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |list| Ok(list.first_item().cloned()))
}

fn last_item(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |list| Ok(list.last_item().cloned()))
}

fn items(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |list| Ok(Some(Value::from(list.items()))))
}

fn is_empty(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |list| Ok(boolean(list.is_empty())))
}

fn empty(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    write(ctx, |list| {
        list.empty();
        Ok(None)
    })
}

fn index(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let item = ctx.arg(1)?;
    read(ctx, |list| Ok(list.index_of(item).map(Value::from)))
}

fn has_item(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let item = ctx.arg(1)?;
    read(ctx, |list| Ok(boolean(list.has_item(item))))
}

fn remove_item(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let item = ctx.arg(1)?;
    write(ctx, |list| Ok(list.remove_item(item)))
}

fn section(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let token = required_token(ctx, 1)?;
    let count = ctx.opt_length(2)?;
    let section: List = read(ctx, |list| list.section(token, count))?;
    Ok(Some(Value::object(section)))
}

fn all_items(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |list| Ok(Some(Value::object(list.all_items()?))))
}

fn all_indexes(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |list| Ok(Some(Value::object(list.all_indexes()?))))
}

fn supplier(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |list| Ok(Some(Value::object(list.supplier()?))))
}
