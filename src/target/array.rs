use std::collections::BTreeSet;

use super::{CompilationTarget, GeneratedCode, TargetError};
use crate::assemble::literal;
use crate::{BUILTIN_OPERATORS, CompareOp, Context, Expr, Parameter, Value};

/// Context option: compile `= null` / `!= null` through the `is_null` operator.
pub const STRICT_NULL: &str = "array.strict_null";

const VARIANT: &str = "array";

/// Target for filtering in-memory [`Record`](crate::Record)s.
///
/// Compiles rules to the executor expression language: fields become
/// `$target[..]` lookups, parameters `$parameters[..]`, list literals are
/// hoisted into `list_N` constants, and function calls go through
/// `$operators[..]`.
#[derive(Debug, Clone)]
pub struct ArrayTarget {
    operators: BTreeSet<String>,
}

impl ArrayTarget {
    /// A target that knows the built-in operators.
    #[must_use]
    pub fn new() -> Self {
        Self {
            operators: BUILTIN_OPERATORS.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// Allow rules to call an operator registered at run time.
    #[must_use]
    pub fn with_operator(mut self, name: &str) -> Self {
        self.operators.insert(name.to_owned());
        self
    }
}

impl Default for ArrayTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilationTarget for ArrayTarget {
    fn variant(&self) -> &'static str {
        VARIANT
    }

    fn compile(&self, ast: &Expr, ctx: &Context) -> Result<GeneratedCode, TargetError> {
        let mut emitter = Emitter {
            target: self,
            strict_null: ctx.flag(STRICT_NULL, false),
            code: GeneratedCode::default().mixin("filter"),
            lists: 0,
        };
        let body = emitter.emit(ast)?;
        emitter.code.compiled_rule = body;
        Ok(emitter.code)
    }
}

struct Emitter<'t> {
    target: &'t ArrayTarget,
    strict_null: bool,
    code: GeneratedCode,
    lists: usize,
}

impl Emitter<'_> {
    fn emit(&mut self, expr: &Expr) -> Result<String, TargetError> {
        match expr {
            Expr::Literal(value) => self.literal(value),
            Expr::Field(path) => Ok(access(path)),
            Expr::Parameter(Parameter::Named(name)) => Ok(format!("$parameters[{}]", quote(name))),
            Expr::Parameter(Parameter::Positional(index)) => Ok(format!("$parameters[{index}]")),
            Expr::Call { name, args } => {
                if !self.target.operators.contains(name) {
                    return Err(TargetError::UnknownOperator {
                        target: VARIANT.to_owned(),
                        name: name.clone(),
                    });
                }
                let args = args
                    .iter()
                    .map(|arg| self.emit(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(call(name, &args))
            }
            Expr::Compare { left, op, right } => self.compare(left, op, right),
            Expr::And(a, b) => Ok(format!("({} && {})", self.emit(a)?, self.emit(b)?)),
            Expr::Or(a, b) => Ok(format!("({} || {})", self.emit(a)?, self.emit(b)?)),
            Expr::Xor(a, b) => Ok(format!("({} xor {})", self.emit(a)?, self.emit(b)?)),
            Expr::Not(inner) => Ok(format!("!{}", self.emit(inner)?)),
        }
    }

    fn compare(&mut self, left: &Expr, op: &CompareOp, right: &Expr) -> Result<String, TargetError> {
        if self.strict_null && matches!(op, CompareOp::Eq | CompareOp::Neq) {
            let other = match (left, right) {
                (Expr::Literal(Value::Null), other) | (other, Expr::Literal(Value::Null)) => {
                    Some(other)
                }
                _ => None,
            };
            if let Some(other) = other {
                let test = call("is_null", &[self.emit(other)?]);
                return Ok(if *op == CompareOp::Eq {
                    test
                } else {
                    format!("!{test}")
                });
            }
        }

        let symbol = match op {
            CompareOp::Eq => "==",
            CompareOp::Neq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::In => "in",
            CompareOp::Like => {
                let args = [self.emit(left)?, self.emit(right)?];
                return Ok(call("like", &args));
            }
            CompareOp::Custom(sym) => {
                return Err(TargetError::UnsupportedOperator {
                    target: VARIANT.to_owned(),
                    operator: sym.clone(),
                });
            }
        };
        Ok(format!("({} {symbol} {})", self.emit(left)?, self.emit(right)?))
    }

    fn literal(&mut self, value: &Value) -> Result<String, TargetError> {
        if let Value::List(_) = value {
            let key = format!("list_{}", self.lists);
            self.lists += 1;
            self.code.compiled_data.insert(key.clone(), value.clone());
            return Ok(format!("$this->{key}"));
        }
        literal(value).map_err(|reason| TargetError::Unsupported {
            target: VARIANT.to_owned(),
            construct: format!("literal {value}: {reason}"),
        })
    }
}

fn access(path: &str) -> String {
    let mut out = String::from("$target");
    for segment in path.split('.') {
        out.push('[');
        out.push_str(&quote(segment));
        out.push(']');
    }
    out
}

fn call(name: &str, args: &[String]) -> String {
    format!("$operators[{}]({})", quote(name), args.join(", "))
}

fn quote(s: &str) -> String {
    // Strings always have a literal form
    literal(&Value::from(s)).unwrap_or_default()
}
