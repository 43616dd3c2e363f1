use std::{cmp::Ordering, fmt, sync::Arc};

use crate::{
    Handle, HeapObject, Message, Receiver, Result, RexxError, Selector, primitives,
};

/// Immutable byte string, the representation of every string value.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RexxString(Arc<[u8]>);

impl RexxString {
    pub fn new(bytes: &[u8]) -> Self {
        Self(Arc::from(bytes))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whole number value, leading and trailing blanks allowed.
    pub fn as_whole_number(&self) -> Option<i64> {
        let text = std::str::from_utf8(&self.0).ok()?;
        let text = text.trim_matches(' ');
        let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        text.parse().ok()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl fmt::Display for RexxString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for RexxString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

impl AsRef<[u8]> for RexxString {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for RexxString {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<String> for RexxString {
    fn from(value: String) -> Self {
        Self(Arc::from(value.into_bytes()))
    }
}

impl From<&[u8]> for RexxString {
    fn from(value: &[u8]) -> Self {
        Self::new(value)
    }
}

impl From<Vec<u8>> for RexxString {
    fn from(value: Vec<u8>) -> Self {
        Self(Arc::from(value))
    }
}

/// A reference held in a collection slot. Empty slots are `None`
/// at the container level, there is no nil value.
#[derive(Clone)]
pub enum Value {
    Integer(i64),
    String(RexxString),
    Object(Handle),
    Message(Arc<Message>),
    Native(Arc<dyn Receiver>),
}

impl Value {
    pub fn string(value: impl Into<RexxString>) -> Self {
        Value::String(value.into())
    }

    /// Wrap a fresh collection object.
    pub fn object(object: impl Into<HeapObject>) -> Self {
        Value::Object(Handle::new(object.into()))
    }

    #[inline]
    pub fn as_handle(&self) -> Option<&Handle> {
        match self {
            Value::Object(handle) => Some(handle),
            _ => None,
        }
    }

    #[inline]
    pub fn as_message(&self) -> Option<&Arc<Message>> {
        match self {
            Value::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Integer value of integers and whole-number strings.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            Value::String(value) => value.as_whole_number(),
            _ => None,
        }
    }

    /// Validate as a 1-based index. `position` is the argument position
    /// reported on failure.
    pub fn as_index(&self, position: usize) -> Result<usize> {
        match self.as_integer() {
            Some(value) if value > 0 => Ok(value as usize),
            _ => Err(RexxError::invalid_index(position, self)),
        }
    }

    pub fn to_rexx_string(&self) -> RexxString {
        match self {
            Value::Integer(value) => RexxString::from(value.to_string()),
            Value::String(value) => value.clone(),
            Value::Object(handle) => RexxString::from(handle.type_name()),
            Value::Message(_) => RexxString::from("a Message"),
            Value::Native(receiver) => RexxString::from(receiver.type_name()),
        }
    }

    /// Identity for objects, strict string comparison otherwise.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Message(a), Value::Message(b)) => Arc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (
                Value::Integer(_) | Value::String(_),
                Value::Integer(_) | Value::String(_),
            ) => self.to_rexx_string() == other.to_rexx_string(),
            _ => false,
        }
    }

    /// Natural ordering used by the default sort.
    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
            (
                Value::Integer(_) | Value::String(_),
                Value::Integer(_) | Value::String(_),
            ) => match (self.as_integer(), other.as_integer()) {
                (Some(a), Some(b)) => Ok(a.cmp(&b)),
                _ => Ok(self
                    .to_rexx_string()
                    .as_bytes()
                    .cmp(other.to_rexx_string().as_bytes())),
            },
            _ => {
                let result = self.send(&Selector::new("COMPARETO"), &[other.clone()])?;
                ordering_of(result)
            }
        }
    }

    /// Dispatch a message to this value.
    pub fn send(&self, selector: &Selector, arguments: &[Value]) -> Result<Option<Value>> {
        match self {
            Value::Integer(_) | Value::String(_) => {
                primitives::string::dispatch(self, selector, arguments)
            }
            Value::Object(handle) => handle.invoke(selector, arguments),
            Value::Message(message) => primitives::message::dispatch(message, selector, arguments),
            Value::Native(receiver) => receiver.invoke(selector, arguments),
        }
    }
}

/// Interpret the result of a `compareTo` style call.
pub(crate) fn ordering_of(result: Option<Value>) -> Result<Ordering> {
    match result.as_ref().and_then(Value::as_integer) {
        Some(value) => Ok(value.cmp(&0)),
        None => Err(RexxError::InvalidArgument {
            position: 1,
            expected: "a whole number comparison result",
            value: result
                .map(|value| value.to_rexx_string().to_string_lossy())
                .unwrap_or_default(),
        }),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rexx_string())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{value}"),
            Value::String(value) => write!(f, "{value:?}"),
            Value::Object(handle) => write!(f, "<{}>", handle.type_name()),
            Value::Message(message) => write!(f, "<message {:?}>", message.selector()),
            Value::Native(receiver) => write!(f, "<{}>", receiver.type_name()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::string(value)
    }
}

impl From<RexxString> for Value {
    fn from(value: RexxString) -> Self {
        Value::String(value)
    }
}

impl From<Handle> for Value {
    fn from(value: Handle) -> Self {
        Value::Object(value)
    }
}

impl From<Arc<Message>> for Value {
    fn from(value: Arc<Message>) -> Self {
        Value::Message(value)
    }
}
