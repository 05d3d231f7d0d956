//! Loaded executor units.
//!
//! An [`Executor`] is what a compiled rule becomes once its source text has
//! been materialized: the text is parsed back, checked, and kept alongside
//! the program it describes.

mod grammar;
mod program;

use std::collections::BTreeMap;

use thiserror::Error;

pub(crate) use program::Node;

use crate::cache::EvaluationError;
use crate::identifier::{self, EXECUTOR_PREFIX};
use crate::{Operators, Parameters, Record, Value};

/// Mixins an executor may carry. `filter` enables [`Executor::filter`].
pub const KNOWN_MIXINS: &[&str] = &["filter"];

/// Failures while running a loaded executor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("no operator named '{name}' is registered")]
    UnknownOperator { name: String },

    #[error("operator '{operator}' takes {expected} argument(s), got {got}")]
    Arity {
        operator: String,
        expected: usize,
        got: usize,
    },

    #[error("operator '{operator}' failed: {message}")]
    Operator { operator: String, message: String },

    #[error("expected a boolean, found {found}")]
    NotBoolean { found: &'static str },

    #[error("executor has no constant named '{name}'")]
    UndefinedConstant { name: String },

    #[error("executor does not carry the '{mixin}' mixin")]
    MissingMixin { mixin: &'static str },
}

/// A compiled rule, ready to run.
///
/// Immutable once loaded; shared behind `Arc` by the [`Compiler`](crate::Compiler).
#[derive(Debug)]
pub struct Executor {
    identifier: String,
    name: String,
    path: String,
    variant: String,
    rule: String,
    mixins: Vec<String>,
    compiled_data: BTreeMap<String, Value>,
    body: Node,
    source: String,
}

impl Executor {
    /// Load an executor from assembled source text.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::Load`] if the text is not a well-formed unit:
    /// bad syntax, names that do not match the identifier, unknown mixins,
    /// duplicate constants, or a body reading a constant that does not exist.
    pub fn load(source: &str) -> Result<Self, EvaluationError> {
        use winnow::Parser;

        let unit = grammar::unit
            .parse(source)
            .map_err(|e| EvaluationError::load(format!("malformed unit: {e}")))?;

        let identifier = unit
            .name
            .strip_prefix(EXECUTOR_PREFIX)
            .filter(|id| identifier::is_identifier(id))
            .ok_or_else(|| EvaluationError::load(format!("bad unit name '{}'", unit.name)))?
            .to_owned();
        if unit.path != identifier::executor_path(&identifier) {
            return Err(EvaluationError::load(format!(
                "unit '{}' declares path '{}'",
                unit.name, unit.path
            )));
        }

        if let Some(unknown) = unit
            .mixins
            .iter()
            .find(|m| !KNOWN_MIXINS.contains(&m.as_str()))
        {
            return Err(EvaluationError::load(format!("unknown mixin '{unknown}'")));
        }

        let mut compiled_data = BTreeMap::new();
        for (key, value) in unit.constants {
            if compiled_data.insert(key.clone(), value).is_some() {
                return Err(EvaluationError::load(format!("duplicate constant '{key}'")));
            }
        }
        if let Some(missing) = unit
            .body
            .constants()
            .into_iter()
            .find(|name| !compiled_data.contains_key(*name))
        {
            return Err(EvaluationError::load(format!(
                "body reads undefined constant '{missing}'"
            )));
        }

        Ok(Self {
            identifier,
            name: unit.name,
            path: unit.path,
            variant: unit.variant,
            rule: unit.rule,
            mixins: unit.mixins,
            compiled_data,
            body: unit.body,
            source: source.to_owned(),
        })
    }

    /// Run the rule against one target record.
    ///
    /// Missing fields and parameters read as `null`; comparisons between
    /// incompatible values are `false`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] if an operator is missing or fails, or the
    /// rule does not produce a boolean.
    pub fn execute(
        &self,
        target: &Record,
        operators: &Operators,
        parameters: &Parameters,
    ) -> Result<bool, ExecutionError> {
        let env = crate::evaluate::Env {
            target,
            operators,
            parameters,
            compiled_data: &self.compiled_data,
        };
        crate::evaluate::evaluate(&self.body, &env)
    }

    /// Keep the records the rule accepts, in order. Requires the `filter` mixin.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::MissingMixin`] without the mixin, or the first
    /// error from [`execute`](Self::execute).
    pub fn filter<'r>(
        &self,
        records: &'r [Record],
        operators: &Operators,
        parameters: &Parameters,
    ) -> Result<Vec<&'r Record>, ExecutionError> {
        if !self.has_mixin("filter") {
            return Err(ExecutionError::MissingMixin { mixin: "filter" });
        }
        let mut kept = Vec::new();
        for record in records {
            if self.execute(record, operators, parameters)? {
                kept.push(record);
            }
        }
        Ok(kept)
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Short name, `Executor_<identifier>`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully qualified name.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Variant of the target that compiled this executor.
    #[must_use]
    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// The rule text this executor was compiled from.
    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    #[must_use]
    pub fn mixins(&self) -> &[String] {
        &self.mixins
    }

    #[must_use]
    pub fn has_mixin(&self, name: &str) -> bool {
        self.mixins.iter().any(|m| m == name)
    }

    #[must_use]
    pub fn compiled_data(&self) -> &BTreeMap<String, Value> {
        &self.compiled_data
    }

    /// The source text this executor was loaded from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}
