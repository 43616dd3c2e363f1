use std::sync::Arc;

use crate::{
    Array, Message, Result, Selector, Value,
    primitives::{PrimitiveContext, PrimitiveMessage, boolean, invoke},
};

pub const PRIMITIVES: &[PrimitiveMessage<Arc<Message>>] = &[
    PrimitiveMessage::new("SEND", 0, 0, send),
    PrimitiveMessage::new("START", 0, 0, start),
    PrimitiveMessage::new("REPLY", 0, 0, reply),
    PrimitiveMessage::new("WAIT", 0, 0, wait),
    PrimitiveMessage::new("RESULT", 0, 0, result),
    PrimitiveMessage::new("COMPLETED", 0, 0, completed),
    PrimitiveMessage::new("HASRESULT", 0, 0, has_result),
    PrimitiveMessage::new("HASERROR", 0, 0, has_error),
    PrimitiveMessage::new("ERRORCONDITION", 0, 0, error_condition),
    PrimitiveMessage::new("NOTIFY", 1, 1, notify),
    PrimitiveMessage::new("HALT", 0, 1, halt),
    PrimitiveMessage::new("TARGET", 0, 0, target),
    PrimitiveMessage::new("MESSAGENAME", 0, 0, message_name),
    PrimitiveMessage::new("ARGUMENTS", 0, 0, arguments),
];

pub fn dispatch(message: &Arc<Message>, selector: &Selector, arguments: &[Value]) -> Result<Option<Value>> {
    invoke(PRIMITIVES, message, selector, arguments)
}

fn send(ctx: &mut PrimitiveContext<Arc<Message>>) -> Result<Option<Value>> {
    ctx.receiver.send()
}

fn start(ctx: &mut PrimitiveContext<Arc<Message>>) -> Result<Option<Value>> {
    ctx.receiver.start()?;
    Ok(None)
}

fn reply(ctx: &mut PrimitiveContext<Arc<Message>>) -> Result<Option<Value>> {
    Ok(Some(Value::Message(ctx.receiver.reply()?)))
}

fn wait(ctx: &mut PrimitiveContext<Arc<Message>>) -> Result<Option<Value>> {
    ctx.receiver.wait()?;
    Ok(None)
}

fn result(ctx: &mut PrimitiveContext<Arc<Message>>) -> Result<Option<Value>> {
    ctx.receiver.result()
}

fn completed(ctx: &mut PrimitiveContext<Arc<Message>>) -> Result<Option<Value>> {
    Ok(boolean(ctx.receiver.completed()))
}

fn has_result(ctx: &mut PrimitiveContext<Arc<Message>>) -> Result<Option<Value>> {
    Ok(boolean(ctx.receiver.has_result()))
}

fn has_error(ctx: &mut PrimitiveContext<Arc<Message>>) -> Result<Option<Value>> {
    Ok(boolean(ctx.receiver.has_error()))
}

// condition name and description, or nothing
fn error_condition(ctx: &mut PrimitiveContext<Arc<Message>>) -> Result<Option<Value>> {
    ctx.receiver
        .error_condition()
        .map(|error| {
            let condition = Array::of([Value::from(error.name()), Value::from(error.to_string())])?;
            Ok(Value::object(condition))
        })
        .transpose()
}

fn notify(ctx: &mut PrimitiveContext<Arc<Message>>) -> Result<Option<Value>> {
    ctx.receiver.notify(ctx.arg(1)?.clone());
    Ok(None)
}

fn halt(ctx: &mut PrimitiveContext<Arc<Message>>) -> Result<Option<Value>> {
    let reason = ctx.opt(1).map(Value::to_string);
    Ok(boolean(ctx.receiver.halt(reason.as_deref())))
}

fn target(ctx: &mut PrimitiveContext<Arc<Message>>) -> Result<Option<Value>> {
    Ok(Some(ctx.receiver.target().clone()))
}

fn message_name(ctx: &mut PrimitiveContext<Arc<Message>>) -> Result<Option<Value>> {
    Ok(Some(Value::from(ctx.receiver.selector().name())))
}

fn arguments(ctx: &mut PrimitiveContext<Arc<Message>>) -> Result<Option<Value>> {
    Ok(Some(Value::object(Array::of(ctx.receiver.arguments().iter().cloned())?)))
}
