use std::collections::HashMap;

use super::Value;

/// Parameter values bound when an executor runs.
///
/// Named parameters answer `:name` in rules; positional ones answer `?` in
/// the order they appear.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    named: HashMap<String, Value>,
    positional: Vec<Value>,
}

impl Parameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.named.insert(name.to_owned(), value.into());
        self
    }

    /// Append the next positional parameter.
    #[must_use]
    pub fn push(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    #[must_use]
    pub fn named(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    #[must_use]
    pub fn positional(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }
}
