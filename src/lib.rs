//! Compile rule expressions once, run them many times.
//!
//! A rule such as `age > 18 and group in ['admin', 'staff']` is parsed,
//! handed to a [`CompilationTarget`] for a specific backend, and assembled
//! into the source text of a self-contained executor unit. An [`Evaluator`]
//! stores that text under an identifier derived from the target variant and
//! the rule, so each distinct pair is compiled at most once, even under
//! concurrent requests. The [`Compiler`] loads the text into an [`Executor`]
//! and hands out shared handles.
//!
//! ```
//! use rulekit::{ArrayTarget, Compiler, Context, Operators, Parameters, Record};
//!
//! let compiler = Compiler::in_memory();
//! let target = ArrayTarget::new();
//!
//! let rule = "user.age >= :min and status != 'banned'";
//! let first = compiler.compile(rule, &target, &mut Context::new()).unwrap();
//! let again = compiler.compile(rule, &target, &mut Context::new()).unwrap();
//! assert!(std::sync::Arc::ptr_eq(&first, &again));
//!
//! let params = Parameters::new().set("min", 21_i64);
//! let record = Record::new().set("user.age", 30_i64).set("status", "active");
//! assert!(first.execute(&record, &Operators::new(), &params).unwrap());
//! ```

pub mod assemble;
pub mod cache;
mod compile;
mod error;
mod evaluate;
pub mod identifier;
pub mod parse;
pub mod target;
mod types;
mod unit;

pub use assemble::{AssemblyError, UnitHeader};
#[cfg(feature = "file-cache")]
pub use cache::FileEvaluator;
pub use cache::{EvaluationError, Evaluator, MemoryEvaluator};
pub use compile::{Compiler, CompilerBuilder};
pub use error::Error;
pub use parse::{DslParser, ParseError, Parser};
pub use target::{ArrayTarget, CompilationTarget, GeneratedCode, TargetError};
pub use types::{
    field, param, CompareOp, Context, Expr, FieldExpr, OperatorFn, Operators, Parameter,
    Parameters, Record, Value, BUILTIN_OPERATORS,
};
pub use unit::{ExecutionError, Executor, KNOWN_MIXINS};
