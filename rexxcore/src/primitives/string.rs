use crate::{
    Result, Selector, Value,
    primitives::{PrimitiveContext, PrimitiveMessage, boolean, invoke},
};

/// The small protocol integers and strings answer when they sit inside
/// a collection.
pub const PRIMITIVES: &[PrimitiveMessage<Value>] = &[
    PrimitiveMessage::new("STRING", 0, 0, string),
    PrimitiveMessage::new("MAKESTRING", 0, 0, string),
    PrimitiveMessage::new("LENGTH", 0, 0, length),
    PrimitiveMessage::new("COMPARETO", 1, 1, compare_to),
    PrimitiveMessage::new("==", 1, 1, strict_equal),
    PrimitiveMessage::new("\\==", 1, 1, strict_not_equal),
];

pub fn dispatch(value: &Value, selector: &Selector, arguments: &[Value]) -> Result<Option<Value>> {
    invoke(PRIMITIVES, value, selector, arguments)
}

fn string(ctx: &mut PrimitiveContext<Value>) -> Result<Option<Value>> {
    Ok(Some(Value::String(ctx.receiver.to_rexx_string())))
}

fn length(ctx: &mut PrimitiveContext<Value>) -> Result<Option<Value>> {
    Ok(Some(Value::from(ctx.receiver.to_rexx_string().len())))
}

fn compare_to(ctx: &mut PrimitiveContext<Value>) -> Result<Option<Value>> {
    let ordering = ctx.receiver.compare(ctx.arg(1)?)?;
    Ok(Some(Value::Integer(ordering as i64)))
}

fn strict_equal(ctx: &mut PrimitiveContext<Value>) -> Result<Option<Value>> {
    Ok(boolean(ctx.receiver.equals(ctx.arg(1)?)))
}

fn strict_not_equal(ctx: &mut PrimitiveContext<Value>) -> Result<Option<Value>> {
    Ok(boolean(!ctx.receiver.equals(ctx.arg(1)?)))
}
