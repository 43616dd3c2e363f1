use crate::{Handle, ObjectType, Result, RexxError, RexxString, Selector, Value};

/// Read and write access to the receiver's object under its lock.
/// Expands to `read` and `write` helpers for one `HeapObject` variant.
macro_rules! receiver_access {
    ($variant:ident, $ty:ty) => {
        #[allow(dead_code)]
        fn read<T>(
            ctx: &$crate::primitives::PrimitiveContext<'_, $crate::Handle>,
            f: impl FnOnce(&$ty) -> $crate::Result<T>,
        ) -> $crate::Result<T> {
            match &*ctx.receiver.read() {
                $crate::HeapObject::$variant(object) => f(object),
                _ => Err($crate::primitives::wrong_receiver(ctx.selector)),
            }
        }

        #[allow(dead_code)]
        fn write<T>(
            ctx: &$crate::primitives::PrimitiveContext<'_, $crate::Handle>,
            f: impl FnOnce(&mut $ty) -> $crate::Result<T>,
        ) -> $crate::Result<T> {
            match &mut *ctx.receiver.write() {
                $crate::HeapObject::$variant(object) => f(object),
                _ => Err($crate::primitives::wrong_receiver(ctx.selector)),
            }
        }
    };
}

pub mod array;
pub mod buffer;
pub mod general;
pub mod list;
pub mod message;
pub mod queue;
pub mod string;
pub mod supplier;
pub mod table;

pub type PrimitiveFunction<R> = fn(&mut PrimitiveContext<'_, R>) -> Result<Option<Value>>;

// the receiver does not count as an argument
// e.g. `a~put(x, 1, 2)` has three arguments
pub struct PrimitiveMessage<R: ?Sized> {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub ptr: PrimitiveFunction<R>,
}

impl<R: ?Sized> PrimitiveMessage<R> {
    pub const fn new(
        name: &'static str,
        min_args: usize,
        max_args: usize,
        ptr: PrimitiveFunction<R>,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            ptr,
        }
    }
}

/// Any number of trailing arguments, used by subscript lists.
pub const VARIADIC: usize = usize::MAX;

pub struct PrimitiveContext<'a, R: ?Sized> {
    pub receiver: &'a R,
    pub selector: &'a Selector,
    pub arguments: &'a [Value],
}

impl<'a, R: ?Sized> PrimitiveContext<'a, R> {
    /// Argument at 1-based `position`.
    pub fn arg(&self, position: usize) -> Result<&'a Value> {
        self.opt(position)
            .ok_or(RexxError::MissingArgument { position })
    }

    #[inline]
    pub fn opt(&self, position: usize) -> Option<&'a Value> {
        self.arguments.get(position.wrapping_sub(1))
    }

    pub fn index(&self, position: usize) -> Result<usize> {
        self.arg(position)?.as_index(position)
    }

    pub fn opt_index(&self, position: usize) -> Result<Option<usize>> {
        self.opt(position)
            .map(|value| value.as_index(position))
            .transpose()
    }

    /// Non-negative whole number, used for lengths and counts.
    pub fn length(&self, position: usize) -> Result<usize> {
        let value = self.arg(position)?;
        match value.as_integer() {
            Some(length) if length >= 0 => Ok(length as usize),
            _ => Err(RexxError::InvalidArgument {
                position,
                expected: "a non-negative whole number",
                value: value.to_string(),
            }),
        }
    }

    pub fn opt_length(&self, position: usize) -> Result<Option<usize>> {
        match self.opt(position) {
            Some(_) => self.length(position).map(Some),
            None => Ok(None),
        }
    }

    pub fn string(&self, position: usize) -> Result<RexxString> {
        Ok(self.arg(position)?.to_rexx_string())
    }

    /// Pad character, a blank when omitted.
    pub fn pad(&self, position: usize) -> Result<u8> {
        let Some(value) = self.opt(position) else {
            return Ok(b' ');
        };
        match value.to_rexx_string().as_bytes() {
            [pad] => Ok(*pad),
            _ => Err(RexxError::InvalidArgument {
                position,
                expected: "a single character",
                value: value.to_string(),
            }),
        }
    }

    /// Every argument from `from` on, validated as subscripts.
    pub fn subscripts(&self, from: usize) -> Result<Vec<usize>> {
        let rest = self.arguments.get(from.wrapping_sub(1)..).unwrap_or_default();
        if rest.is_empty() {
            return Err(RexxError::MissingArgument { position: from });
        }
        rest.iter()
            .enumerate()
            .map(|(n, value)| value.as_index(from + n))
            .collect()
    }
}

pub(crate) fn wrong_receiver(selector: &Selector) -> RexxError {
    RexxError::NoMethod {
        selector: selector.name().to_owned(),
    }
}

#[inline]
pub(crate) fn boolean(value: bool) -> Option<Value> {
    Some(Value::Integer(value as i64))
}

pub fn find<'t, R: ?Sized>(
    table: &'t [PrimitiveMessage<R>],
    selector: &Selector,
) -> Option<&'t PrimitiveMessage<R>> {
    table.iter().find(|primitive| selector.is(primitive.name))
}

/// Check the argument count and run `primitive`.
pub fn call<R: ?Sized>(
    primitive: &PrimitiveMessage<R>,
    receiver: &R,
    selector: &Selector,
    arguments: &[Value],
) -> Result<Option<Value>> {
    if arguments.len() < primitive.min_args {
        return Err(RexxError::MissingArgument {
            position: arguments.len() + 1,
        });
    }
    if arguments.len() > primitive.max_args {
        return Err(RexxError::TooManyArguments {
            maximum: primitive.max_args,
            actual: arguments.len(),
        });
    }
    log::trace!("primitive {}/{}", primitive.name, arguments.len());
    let mut ctx = PrimitiveContext {
        receiver,
        selector,
        arguments,
    };
    (primitive.ptr)(&mut ctx)
}

pub fn invoke<R: ?Sized>(
    table: &[PrimitiveMessage<R>],
    receiver: &R,
    selector: &Selector,
    arguments: &[Value],
) -> Result<Option<Value>> {
    match find(table, selector) {
        Some(primitive) => call(primitive, receiver, selector, arguments),
        None => Err(wrong_receiver(selector)),
    }
}

/// Dispatch a message to a collection object.
pub fn dispatch(handle: &Handle, selector: &Selector, arguments: &[Value]) -> Result<Option<Value>> {
    let table = match handle.object_type() {
        ObjectType::Array => array::PRIMITIVES,
        ObjectType::List => list::PRIMITIVES,
        ObjectType::Queue => queue::PRIMITIVES,
        ObjectType::Supplier => supplier::PRIMITIVES,
        ObjectType::Buffer => buffer::PRIMITIVES,
        ObjectType::Table => table::PRIMITIVES,
        ObjectType::WeakReference => general::WEAK_REFERENCE_PRIMITIVES,
    };
    match find(table, selector).or_else(|| find(general::PRIMITIVES, selector)) {
        Some(primitive) => call(primitive, handle, selector, arguments),
        None => Err(wrong_receiver(selector)),
    }
}
