use crate::{
    Handle, Result, Value,
    primitives::{PrimitiveContext, PrimitiveMessage, boolean},
};

receiver_access!(Supplier, crate::Supplier);

pub const PRIMITIVES: &[PrimitiveMessage<Handle>] = &[
    PrimitiveMessage::new("AVAILABLE", 0, 0, available),
    PrimitiveMessage::new("ITEM", 0, 0, item),
    PrimitiveMessage::new("INDEX", 0, 0, index),
    PrimitiveMessage::new("NEXT", 0, 0, next),
    PrimitiveMessage::new("ALLITEMS", 0, 0, all_items),
    PrimitiveMessage::new("ALLINDEXES", 0, 0, all_indexes),
];

fn available(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |supplier| Ok(boolean(supplier.available())))
}

fn item(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |supplier| Ok(supplier.item()?.cloned()))
}

fn index(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |supplier| Ok(supplier.index()?.cloned()))
}

fn next(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    write(ctx, |supplier| supplier.advance())?;
    Ok(None)
}

fn all_items(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |supplier| Ok(Some(Value::object(supplier.all_items().clone()))))
}

fn all_indexes(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |supplier| Ok(Some(Value::object(supplier.all_indexes().clone()))))
}
