use std::{fmt, sync::Arc};

use crate::{Result, Value};

/// Name of a message plus an optional scope override that tells the
/// receiver where to start its method search.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    pub name: Arc<str>,
    pub scope: Option<Arc<str>>,
}

impl Selector {
    /// Selector names are case insensitive and stored upper-cased.
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name.to_ascii_uppercase()),
            scope: None,
        }
    }

    pub fn with_scope(name: &str, scope: &str) -> Self {
        Self {
            scope: Some(Arc::from(scope.to_ascii_uppercase())),
            ..Self::new(name)
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is(&self, name: &str) -> bool {
        &*self.name == name
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}:{}", scope, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::new(name)
    }
}

/// Anything a message can be sent to.
///
/// Built-in objects answer through their primitive tables, host objects
/// implement this directly.
pub trait Receiver: Send + Sync {
    fn invoke(&self, selector: &Selector, arguments: &[Value]) -> Result<Option<Value>>;

    /// Class-ish name used for the default string value.
    fn type_name(&self) -> &str {
        "an Object"
    }
}
