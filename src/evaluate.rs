use std::collections::BTreeMap;

use crate::unit::{ExecutionError, Node};
use crate::{Operators, Parameter, Parameters, Record, Value};

/// Everything an executor body can read while running.
pub(crate) struct Env<'a> {
    pub(crate) target: &'a Record,
    pub(crate) operators: &'a Operators,
    pub(crate) parameters: &'a Parameters,
    pub(crate) compiled_data: &'a BTreeMap<String, Value>,
}

pub(crate) fn evaluate(body: &Node, env: &Env<'_>) -> Result<bool, ExecutionError> {
    let value = eval_expr(body, env)?;
    truth(&value)
}

fn eval_expr(node: &Node, env: &Env<'_>) -> Result<Value, ExecutionError> {
    match node {
        Node::Literal(value) => Ok(value.clone()),
        Node::Target(segments) => Ok(env
            .target
            .get_segments(segments.as_slice())
            .cloned()
            .unwrap_or(Value::Null)),
        Node::Parameter(param) => {
            let found = match param {
                Parameter::Named(name) => env.parameters.named(name),
                Parameter::Positional(index) => env.parameters.positional(*index),
            };
            Ok(found.cloned().unwrap_or(Value::Null))
        }
        Node::This(name) => env
            .compiled_data
            .get(name)
            .cloned()
            .ok_or_else(|| ExecutionError::UndefinedConstant { name: name.clone() }),
        Node::Call { name, args } => {
            let args = args
                .iter()
                .map(|arg| eval_expr(arg, env))
                .collect::<Result<Vec<_>, _>>()?;
            env.operators.call(name, &args)
        }
        Node::Compare { left, op, right } => {
            let l = eval_expr(left, env)?;
            let r = eval_expr(right, env)?;
            Ok(Value::Bool(l.compare(op.clone(), &r).unwrap_or(false)))
        }
        Node::And(a, b) => {
            let result = eval_bool(a, env)? && eval_bool(b, env)?;
            Ok(Value::Bool(result))
        }
        Node::Or(a, b) => {
            let result = eval_bool(a, env)? || eval_bool(b, env)?;
            Ok(Value::Bool(result))
        }
        Node::Xor(a, b) => {
            let (a, b) = (eval_bool(a, env)?, eval_bool(b, env)?);
            Ok(Value::Bool(a != b))
        }
        Node::Not(inner) => Ok(Value::Bool(!eval_bool(inner, env)?)),
    }
}

fn eval_bool(node: &Node, env: &Env<'_>) -> Result<bool, ExecutionError> {
    truth(&eval_expr(node, env)?)
}

// Null is falsy so missing fields fail closed.
fn truth(value: &Value) -> Result<bool, ExecutionError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        other => Err(ExecutionError::NotBoolean {
            found: other.type_name(),
        }),
    }
}
