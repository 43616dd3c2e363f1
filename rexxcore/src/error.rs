use thiserror::Error;

pub type Result<T> = std::result::Result<T, RexxError>;

/// Conditions raised by the collection and message kernel.
///
/// All of them are recoverable: the interpreter turns them into
/// conditions of the running program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RexxError {
    #[error("missing argument in position {position}")]
    MissingArgument { position: usize },

    #[error("too many arguments: at most {maximum} expected, {actual} given")]
    TooManyArguments { maximum: usize, actual: usize },

    #[error("argument {position} must be {expected}; found \"{value}\"")]
    InvalidArgument {
        position: usize,
        expected: &'static str,
        value: String,
    },

    #[error("argument {position} must be a positive whole number; found \"{value}\"")]
    InvalidIndex { position: usize, value: String },

    #[error("index {index} not found")]
    IndexNotFound { index: String },

    #[error("index {index} is not valid for this collection (valid range 1 to {limit})")]
    IndexNotValid { index: usize, limit: usize },

    #[error("wrong number of subscripts: too few, {expected} expected, {actual} given")]
    TooFewSubscripts { expected: usize, actual: usize },

    #[error("wrong number of subscripts: too many, {expected} expected, {actual} given")]
    TooManySubscripts { expected: usize, actual: usize },

    #[error("method {method} is only valid on a single dimension array")]
    NotSingleDimension { method: &'static str },

    #[error("array size {requested} exceeds the maximum of {maximum}")]
    ArrayTooBig { requested: usize, maximum: usize },

    #[error("buffer size {requested} exceeds the maximum of {maximum}")]
    BufferTooBig { requested: usize, maximum: usize },

    #[error("out of memory allocating {bytes} bytes")]
    OutOfMemory { bytes: usize },

    #[error("sparse array: no item at index {index}")]
    SparseArray { index: usize },

    #[error("collection was modified during {method}")]
    ModifiedDuringSort { method: &'static str },

    #[error("message object has already been sent or started")]
    MessageReuse,

    #[error("message object has not been sent")]
    MessageNotSent,

    #[error("deadlock: worker {worker} would wait on its own message")]
    Deadlock { worker: u64 },

    #[error("could not start a worker thread: {reason}")]
    ThreadStart { reason: String },

    #[error("activity halted: {reason}")]
    Halted { reason: String },

    #[error("object does not understand message {selector}")]
    NoMethod { selector: String },

    #[error("no more supplier items available")]
    NoMoreItems,

    #[error("{condition}: {description}")]
    Raised {
        condition: String,
        description: String,
    },
}

impl RexxError {
    /// Stable condition name as surfaced to the running program.
    pub fn name(&self) -> &'static str {
        match self {
            RexxError::MissingArgument { .. } => "missing argument",
            RexxError::TooManyArguments { .. } => "too many arguments",
            RexxError::InvalidArgument { .. } => "invalid argument",
            RexxError::InvalidIndex { .. } => "invalid index",
            RexxError::IndexNotFound { .. } => "index not found",
            RexxError::IndexNotValid { .. } => "index not valid",
            RexxError::TooFewSubscripts { .. } | RexxError::TooManySubscripts { .. } => {
                "wrong number of subscripts"
            }
            RexxError::NotSingleDimension { .. } => "not a single dimension array",
            RexxError::ArrayTooBig { .. } => "array too big",
            RexxError::BufferTooBig { .. } => "buffer too big",
            RexxError::OutOfMemory { .. } => "out of memory",
            RexxError::SparseArray { .. } => "sparse array",
            RexxError::ModifiedDuringSort { .. } => "collection modified",
            RexxError::MessageReuse => "message reuse",
            RexxError::MessageNotSent => "message not sent",
            RexxError::Deadlock { .. } => "deadlock",
            RexxError::ThreadStart { .. } => "thread start",
            RexxError::Halted { .. } => "halt",
            RexxError::NoMethod { .. } => "no method",
            RexxError::NoMoreItems => "no more items",
            RexxError::Raised { .. } => "raised",
        }
    }

    pub fn raised(condition: impl Into<String>, description: impl Into<String>) -> Self {
        RexxError::Raised {
            condition: condition.into(),
            description: description.into(),
        }
    }

    pub(crate) fn invalid_index(position: usize, value: impl ToString) -> Self {
        RexxError::InvalidIndex {
            position,
            value: value.to_string(),
        }
    }
}
