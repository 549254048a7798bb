//! Request-scoped context carrier.
//!
//! Values are stored under namespaced keys so a logging field named
//! `requestID` never collides with an unrelated consumer that stores its own
//! `requestID` in the same context.

use std::collections::HashMap;
use std::fmt;

/// Namespace the formatter reads context fields from.
pub const LOG_FIELD_NAMESPACE: &str = "rask.log";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey {
    namespace: &'static str,
    name: String,
}

impl ContextKey {
    pub fn new(namespace: &'static str, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }

    /// Key in the log-field namespace, visible to `MessageFormatter`.
    pub fn log_field(name: impl Into<String>) -> Self {
        Self::new(LOG_FIELD_NAMESPACE, name)
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogContext {
    scopes: HashMap<&'static str, HashMap<String, String>>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: ContextKey, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Shorthand for `with_value(ContextKey::log_field(name), value)`.
    pub fn with_field(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_value(ContextKey::log_field(name), value)
    }

    pub fn insert(&mut self, key: ContextKey, value: impl Into<String>) -> Option<String> {
        self.scopes
            .entry(key.namespace)
            .or_default()
            .insert(key.name, value.into())
    }

    pub fn get(&self, key: &ContextKey) -> Option<&str> {
        self.lookup(key.namespace, &key.name)
    }

    /// Looks up `name` in the log-field namespace without allocating a key.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.lookup(LOG_FIELD_NAMESPACE, name)
    }

    pub fn len(&self) -> usize {
        self.scopes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, namespace: &str, name: &str) -> Option<&str> {
        self.scopes
            .get(namespace)
            .and_then(|scope| scope.get(name))
            .map(String::as_str)
    }
}
