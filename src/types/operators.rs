use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::Value;
use crate::unit::ExecutionError;

/// A runtime operator: takes evaluated arguments, returns a value.
pub type OperatorFn = Arc<dyn Fn(&[Value]) -> Result<Value, ExecutionError> + Send + Sync>;

/// Names of the operators every [`Operators`] registry starts with.
pub const BUILTIN_OPERATORS: &[&str] = &["is_null", "length", "like", "lower", "upper"];

/// Registry of named operators available to executors at run time.
///
/// Compiled rules call operators by name (`$operators['length'](..)`); the
/// registry passed to [`Executor::execute`](crate::Executor::execute) resolves them.
#[derive(Clone)]
pub struct Operators {
    table: HashMap<String, OperatorFn>,
}

impl Operators {
    /// A registry holding the built-in operators.
    #[must_use]
    pub fn new() -> Self {
        let mut ops = Self::empty();
        ops.insert("is_null", unary("is_null", |v| Value::Bool(v.is_null())));
        ops.insert(
            "length",
            unary("length", |v| match v {
                Value::String(s) => Value::Int(count(s.chars().count())),
                Value::List(items) => Value::Int(count(items.len())),
                _ => Value::Null,
            }),
        );
        ops.insert(
            "lower",
            unary("lower", |v| match v {
                Value::String(s) => Value::String(s.to_lowercase()),
                _ => Value::Null,
            }),
        );
        ops.insert(
            "upper",
            unary("upper", |v| match v {
                Value::String(s) => Value::String(s.to_uppercase()),
                _ => Value::Null,
            }),
        );
        ops.insert(
            "like",
            Arc::new(|args: &[Value]| match args {
                [value, pattern] => Ok(Value::Bool(match (value, pattern) {
                    (Value::String(s), Value::String(p)) => like(s, p),
                    _ => false,
                })),
                _ => Err(ExecutionError::Arity {
                    operator: "like".to_owned(),
                    expected: 2,
                    got: args.len(),
                }),
            }),
        );
        ops
    }

    /// A registry with no operators at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Register (or replace) an operator, builder style.
    #[must_use]
    pub fn register<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ExecutionError> + Send + Sync + 'static,
    {
        self.insert(name, Arc::new(f));
        self
    }

    pub fn insert(&mut self, name: &str, f: OperatorFn) {
        self.table.insert(name.to_owned(), f);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OperatorFn> {
        self.table.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Call an operator by name.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::UnknownOperator`] if `name` is not registered,
    /// or whatever the operator itself reports.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, ExecutionError> {
        let op = self
            .get(name)
            .ok_or_else(|| ExecutionError::UnknownOperator {
                name: name.to_owned(),
            })?;
        op(args)
    }
}

impl Default for Operators {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Operators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Operators").field("names", &names).finish()
    }
}

fn unary(name: &'static str, f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> OperatorFn {
    Arc::new(move |args: &[Value]| match args {
        [value] => Ok(f(value)),
        _ => Err(ExecutionError::Arity {
            operator: name.to_owned(),
            expected: 1,
            got: args.len(),
        }),
    })
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// SQL `LIKE` matching: `%` is any run of characters, `_` exactly one.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // matches[j]: pattern[..i] matches text[..j]
    let mut matches = vec![false; text.len() + 1];
    matches[0] = true;
    for &p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= matches[j];
                    next[j] = seen;
                }
            }
            _ => {
                for j in 1..=text.len() {
                    next[j] = matches[j - 1] && (p == '_' || p == text[j - 1]);
                }
            }
        }
        matches = next;
    }
    matches[text.len()]
}
