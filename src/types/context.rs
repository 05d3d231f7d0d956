use std::collections::BTreeMap;

use super::Value;

/// Compile-scoped options passed through the pipeline.
///
/// Callers fill in ambient options for the target; the [`Compiler`](crate::Compiler)
/// writes the rule identifier and executor names as it runs. After a failed
/// compile the derived fields are unspecified and the context should be discarded.
#[derive(Debug, Clone, Default)]
pub struct Context {
    options: BTreeMap<String, Value>,
    rule_identifier: Option<String>,
    executor_name: Option<String>,
    executor_path: Option<String>,
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, builder style.
    #[must_use]
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.options.insert(key.to_owned(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Boolean option, `default` when absent or not a bool.
    #[must_use]
    pub fn flag(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    #[must_use]
    pub fn rule_identifier(&self) -> Option<&str> {
        self.rule_identifier.as_deref()
    }

    /// Short name of the executor unit, e.g. `Executor_<identifier>`.
    #[must_use]
    pub fn executor_name(&self) -> Option<&str> {
        self.executor_name.as_deref()
    }

    /// Fully qualified name of the executor unit.
    #[must_use]
    pub fn executor_path(&self) -> Option<&str> {
        self.executor_path.as_deref()
    }

    pub(crate) fn identify(&mut self, identifier: String, name: String, path: String) {
        self.rule_identifier = Some(identifier);
        self.executor_name = Some(name);
        self.executor_path = Some(path);
    }
}
