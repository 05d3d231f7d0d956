//! Compilation targets: one per backend, each turning a rule AST into
//! backend code.

mod array;

use std::collections::BTreeMap;

use thiserror::Error;

pub use array::ArrayTarget;

use crate::{Context, Expr, Value};

/// A backend-specific code generator.
///
/// Identity is nominal: two targets with the same [`variant`](Self::variant)
/// share compiled executors for the same rule text, whatever their state.
pub trait CompilationTarget: Send + Sync {
    /// Stable tag naming this backend. Part of every cache key.
    fn variant(&self) -> &'static str;

    /// Generate code for `ast`.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] if the rule uses constructs this backend
    /// cannot express.
    fn compile(&self, ast: &Expr, ctx: &Context) -> Result<GeneratedCode, TargetError>;
}

/// What a target hands to the source assembler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedCode {
    /// Behavior fragments to attach, in resolution order.
    pub mixins: Vec<String>,
    /// Constant fields embedded into the executor, keyed by field name.
    pub compiled_data: BTreeMap<String, Value>,
    /// Body of the executor's `execute` method, inserted verbatim.
    pub compiled_rule: String,
}

impl GeneratedCode {
    #[must_use]
    pub fn new(compiled_rule: impl Into<String>) -> Self {
        Self {
            compiled_rule: compiled_rule.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn mixin(mut self, name: &str) -> Self {
        self.mixins.push(name.to_owned());
        self
    }

    #[must_use]
    pub fn data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.compiled_data.insert(key.to_owned(), value.into());
        self
    }
}

/// A rule the selected backend cannot express.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("target '{target}' does not support operator '{operator}'")]
    UnsupportedOperator { target: String, operator: String },

    #[error("target '{target}' has no operator named '{name}'")]
    UnknownOperator { target: String, name: String },

    #[error("target '{target}' cannot compile {construct}")]
    Unsupported { target: String, construct: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_builder() {
        let code = GeneratedCode::new("true")
            .mixin("filter")
            .data("threshold", 18_i64);
        assert_eq!(code.mixins, vec!["filter".to_owned()]);
        assert_eq!(code.compiled_data.get("threshold"), Some(&Value::Int(18)));
        assert_eq!(code.compiled_rule, "true");
    }

    #[test]
    fn target_error_messages() {
        let err = TargetError::UnsupportedOperator {
            target: "array".into(),
            operator: "~~".into(),
        };
        assert_eq!(err.to_string(), "target 'array' does not support operator '~~'");

        let err = TargetError::UnknownOperator {
            target: "array".into(),
            name: "soundex".into(),
        };
        assert_eq!(err.to_string(), "target 'array' has no operator named 'soundex'");
    }
}
