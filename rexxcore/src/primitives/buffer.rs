use crate::{
    Handle, MutableBuffer, Result, Value,
    primitives::{PrimitiveContext, PrimitiveMessage, VARIADIC},
};

receiver_access!(Buffer, MutableBuffer);

pub const PRIMITIVES: &[PrimitiveMessage<Handle>] = &[
    PrimitiveMessage::new("APPEND", 1, VARIADIC, append),
    PrimitiveMessage::new("INSERT", 1, 4, insert),
    PrimitiveMessage::new("OVERLAY", 1, 4, overlay),
    PrimitiveMessage::new("REPLACEAT", 2, 4, replace_at),
    PrimitiveMessage::new("DELETE", 1, 2, delete),
    PrimitiveMessage::new("CHANGESTR", 2, 3, change_str),
    PrimitiveMessage::new("CASELESSCHANGESTR", 2, 3, caseless_change_str),
    PrimitiveMessage::new("DELWORD", 1, 2, del_word),
    PrimitiveMessage::new("SUBSTR", 1, 3, sub_str),
    PrimitiveMessage::new("SUBCHAR", 1, 1, sub_char),
    PrimitiveMessage::new("POS", 1, 2, pos),
    PrimitiveMessage::new("CASELESSPOS", 1, 2, caseless_pos),
    PrimitiveMessage::new("LASTPOS", 1, 2, last_pos),
    PrimitiveMessage::new("CASELESSLASTPOS", 1, 2, caseless_last_pos),
    PrimitiveMessage::new("COUNTSTR", 1, 1, count_str),
    PrimitiveMessage::new("CASELESSCOUNTSTR", 1, 1, caseless_count_str),
    PrimitiveMessage::new("UPPER", 0, 2, upper),
    PrimitiveMessage::new("LOWER", 0, 2, lower),
    PrimitiveMessage::new("WORDS", 0, 0, words),
    PrimitiveMessage::new("WORD", 1, 1, word),
    PrimitiveMessage::new("WORDINDEX", 1, 1, word_index),
    PrimitiveMessage::new("WORDLENGTH", 1, 1, word_length),
    PrimitiveMessage::new("LENGTH", 0, 0, length),
    PrimitiveMessage::new("GETBUFFERSIZE", 0, 0, get_buffer_size),
    PrimitiveMessage::new("SETBUFFERSIZE", 1, 1, set_buffer_size),
    PrimitiveMessage::new("STRING", 0, 0, make_string),
    PrimitiveMessage::new("MAKESTRING", 0, 0, make_string),
];

/// Run an edit and answer the receiver, so edits can be chained.
fn edit(
    ctx: &PrimitiveContext<Handle>,
    f: impl FnOnce(&mut MutableBuffer) -> Result<()>,
) -> Result<Option<Value>> {
    write(ctx, f)?;
    Ok(Some(Value::Object(ctx.receiver.clone())))
}

fn position(ctx: &PrimitiveContext<Handle>, at: usize) -> Result<usize> {
    Ok(ctx.opt_length(at)?.unwrap_or(1))
}

fn append(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let pieces: Vec<_> = ctx.arguments.iter().map(Value::to_rexx_string).collect();
    edit(ctx, |buffer| {
        pieces
            .iter()
            .try_for_each(|piece| buffer.append(piece.as_bytes()))
    })
}

fn insert(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let data = ctx.string(1)?;
    let at = position(ctx, 2)?;
    let length = ctx.opt_length(3)?;
    let pad = ctx.pad(4)?;
    edit(ctx, |buffer| buffer.insert(data.as_bytes(), at, length, pad))
}

fn overlay(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let data = ctx.string(1)?;
    let at = position(ctx, 2)?;
    let length = ctx.opt_length(3)?;
    let pad = ctx.pad(4)?;
    edit(ctx, |buffer| buffer.overlay(data.as_bytes(), at, length, pad))
}

fn replace_at(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let data = ctx.string(1)?;
    let at = ctx.length(2)?;
    let length = ctx.opt_length(3)?;
    let pad = ctx.pad(4)?;
    edit(ctx, |buffer| buffer.replace_at(data.as_bytes(), at, length, pad))
}

fn delete(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let at = ctx.length(1)?;
    let length = ctx.opt_length(2)?;
    edit(ctx, |buffer| buffer.delete(at, length))
}

fn change(ctx: &PrimitiveContext<Handle>, caseless: bool) -> Result<Option<Value>> {
    let needle = ctx.string(1)?;
    let replacement = ctx.string(2)?;
    let count = ctx.opt_length(3)?;
    edit(ctx, |buffer| {
        let changed = if caseless {
            buffer.caseless_change_str(needle.as_bytes(), replacement.as_bytes(), count)?
        } else {
            buffer.change_str(needle.as_bytes(), replacement.as_bytes(), count)?
        };
        log::trace!("changed {changed} occurrences");
        Ok(())
    })
}

fn change_str(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    change(ctx, false)
}

fn caseless_change_str(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    change(ctx, true)
}

fn del_word(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let n = ctx.length(1)?;
    let count = ctx.opt_length(2)?;
    edit(ctx, |buffer| buffer.del_word(n, count))
}

fn sub_str(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let at = ctx.length(1)?;
    let length = ctx.opt_length(2)?;
    let pad = ctx.pad(3)?;
    read(ctx, |buffer| Ok(Some(buffer.sub_str(at, length, pad)?.into())))
}

fn sub_char(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let at = ctx.length(1)?;
    read(ctx, |buffer| Ok(Some(buffer.sub_char(at).into())))
}

fn search(
    ctx: &PrimitiveContext<Handle>,
    f: impl FnOnce(&MutableBuffer, &[u8], Option<usize>) -> Result<usize>,
) -> Result<Option<Value>> {
    let needle = ctx.string(1)?;
    let start = ctx.opt_length(2)?;
    read(ctx, |buffer| {
        f(buffer, needle.as_bytes(), start).map(|at| Some(Value::from(at)))
    })
}

fn pos(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    search(ctx, |buffer, needle, start| buffer.pos(needle, start.unwrap_or(1)))
}

fn caseless_pos(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    search(ctx, |buffer, needle, start| {
        buffer.caseless_pos(needle, start.unwrap_or(1))
    })
}

fn last_pos(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    search(ctx, |buffer, needle, start| buffer.last_pos(needle, start))
}

fn caseless_last_pos(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    search(ctx, |buffer, needle, start| {
        buffer.caseless_last_pos(needle, start)
    })
}

fn count_str(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    search(ctx, |buffer, needle, _| Ok(buffer.count_str(needle)))
}

fn caseless_count_str(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    search(ctx, |buffer, needle, _| Ok(buffer.caseless_count_str(needle)))
}

fn upper(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let start = position(ctx, 1)?;
    let length = ctx.opt_length(2)?;
    edit(ctx, |buffer| buffer.upper(start, length))
}

fn lower(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let start = position(ctx, 1)?;
    let length = ctx.opt_length(2)?;
    edit(ctx, |buffer| buffer.lower(start, length))
}

fn words(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |buffer| Ok(Some(Value::from(buffer.words()))))
}

fn word(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let n = ctx.length(1)?;
    read(ctx, |buffer| Ok(Some(buffer.word(n).into())))
}

fn word_index(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let n = ctx.length(1)?;
    read(ctx, |buffer| Ok(Some(Value::from(buffer.word_index(n)))))
}

fn word_length(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let n = ctx.length(1)?;
    read(ctx, |buffer| Ok(Some(Value::from(buffer.word_length(n)))))
}

fn length(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |buffer| Ok(Some(Value::from(buffer.length()))))
}

fn get_buffer_size(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |buffer| Ok(Some(Value::from(buffer.buffer_size()))))
}

fn set_buffer_size(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    let size = ctx.length(1)?;
    edit(ctx, |buffer| buffer.set_buffer_size(size))
}

fn make_string(ctx: &mut PrimitiveContext<Handle>) -> Result<Option<Value>> {
    read(ctx, |buffer| Ok(Some(buffer.make_string().into())))
}
