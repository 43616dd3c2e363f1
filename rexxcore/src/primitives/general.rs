use crate::{
    Handle, HeapObject, Result, Value,
    primitives::{PrimitiveContext, PrimitiveMessage, boolean},
};

receiver_access!(WeakReference, crate::WeakReference);

/// Methods every collection object answers.
pub const PRIMITIVES: &[PrimitiveMessage<Handle>] = &[
    PrimitiveMessage::new("OBJECTNAME", 0, 0, object_name),
    PrimitiveMessage::new("STRING", 0, 0, object_name),
    PrimitiveMessage::new("==", 1, 1, identical),
    PrimitiveMessage::new("\\==", 1, 1, not_identical),
    PrimitiveMessage::new("COPY", 0, 0, copy),
    PrimitiveMessage::new("IDENTITYHASH", 0, 0, identity_hash),
];

pub const WEAK_REFERENCE_PRIMITIVES: &[PrimitiveMessage<Handle>] =
    &[PrimitiveMessage::new("VALUE", 0, 0, value)];

fn object_name(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    Ok(Some(Value::from(ctx.receiver.type_name())))
}

fn is_receiver(ctx: &PrimitiveContext<Handle>) -> Result<bool> {
    Ok(ctx
        .arg(1)?
        .as_handle()
        .is_some_and(|other| other.ptr_eq(ctx.receiver)))
}

fn identical(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    Ok(boolean(is_receiver(ctx)?))
}

fn not_identical(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    Ok(boolean(!is_receiver(ctx)?))
}

// shallow: the copy shares the referenced items
fn copy(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let object: HeapObject = ctx.receiver.read().clone();
    Ok(Some(Value::Object(Handle::new(object))))
}

fn identity_hash(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    Ok(Some(Value::Integer(ctx.receiver.as_ptr() as usize as i64)))
}

fn value(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |weak| Ok(weak.value().map(Value::Object)))
}
