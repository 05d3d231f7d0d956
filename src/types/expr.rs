use std::fmt;
use std::ops::Not;

use super::Value;

/// Comparison operators supported in rule expressions.
///
/// Symbolic operators the grammar does not know are kept as [`CompareOp::Custom`];
/// whether they mean anything is up to the compilation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Like,
    Custom(String),
}

/// A rule parameter, bound when an executor runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    /// `:name`
    Named(String),
    /// `?`, numbered left to right from zero.
    Positional(usize),
}

/// Rule AST produced by a [`Parser`](crate::Parser).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Dot-separated access path into the target, e.g. `user.age`.
    Field(String),
    Parameter(Parameter),
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Compare {
        left: Box<Expr>,
        op: CompareOp,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Xor(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "="),
            CompareOp::Neq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
            CompareOp::In => write!(f, "in"),
            CompareOp::Like => write!(f, "like"),
            CompareOp::Custom(sym) => write!(f, "{sym}"),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Named(name) => write!(f, ":{name}"),
            Parameter::Positional(_) => write!(f, "?"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Field(path) => write!(f, "{path}"),
            Expr::Parameter(param) => write!(f, "{param}"),
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::Compare { left, op, right } => write!(f, "({left} {op} {right})"),
            Expr::And(a, b) => write!(f, "({a} AND {b})"),
            Expr::Or(a, b) => write!(f, "({a} OR {b})"),
            Expr::Xor(a, b) => write!(f, "({a} XOR {b})"),
            Expr::Not(inner) => write!(f, "(NOT {inner})"),
        }
    }
}

impl Expr {
    #[must_use]
    pub fn and(self, other: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn xor(self, other: Expr) -> Expr {
        Expr::Xor(Box::new(self), Box::new(other))
    }

    fn compare(self, op: CompareOp, right: Expr) -> Expr {
        Expr::Compare {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Literal(value)
    }
}

/// Intermediate builder for comparisons on an access path.
/// Created by [`field()`]; requires a comparison method to produce an [`Expr`].
#[derive(Debug, Clone)]
pub struct FieldExpr {
    path: String,
}

macro_rules! field_comparisons {
    ($($method:ident => $op:ident),* $(,)?) => {
        impl FieldExpr {
            $(
                #[must_use]
                pub fn $method(self, value: impl Into<Value>) -> Expr {
                    Expr::Field(self.path).compare(CompareOp::$op, Expr::Literal(value.into()))
                }
            )*

            /// Compare against a parameter instead of a literal.
            #[must_use]
            pub fn cmp_param(self, op: CompareOp, param: Parameter) -> Expr {
                Expr::Field(self.path).compare(op, Expr::Parameter(param))
            }
        }
    };
}

field_comparisons! {
    eq => Eq,
    neq => Neq,
    gt => Gt,
    gte => Gte,
    lt => Lt,
    lte => Lte,
    is_in => In,
    like => Like,
}

#[must_use]
pub fn field(path: &str) -> FieldExpr {
    FieldExpr {
        path: path.to_owned(),
    }
}

#[must_use]
pub fn param(name: &str) -> Parameter {
    Parameter::Named(name.to_owned())
}
