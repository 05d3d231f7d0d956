mod context;
mod expr;
mod operators;
mod parameters;
mod record;
mod value;

pub use context::Context;
pub use expr::{CompareOp, Expr, FieldExpr, Parameter, field, param};
pub use operators::{BUILTIN_OPERATORS, OperatorFn, Operators};
pub use parameters::Parameters;
pub use record::Record;
pub use value::Value;
