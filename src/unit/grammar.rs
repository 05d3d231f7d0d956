use winnow::ascii::digit1;
use winnow::combinator::{alt, cut_err, delimited, opt, preceded, repeat, separated, terminated};
use winnow::error::{ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;

use super::program::Node;
use crate::parse::grammar::{keyword, string_literal, value, word, ws};
use crate::{CompareOp, Parameter, Value};

/// A unit as written by the assembler, before validation.
#[derive(Debug)]
pub(super) struct UnitSource {
    pub(super) rule: String,
    pub(super) name: String,
    pub(super) path: String,
    pub(super) variant: String,
    pub(super) mixins: Vec<String>,
    pub(super) constants: Vec<(String, Value)>,
    pub(super) body: Node,
}

fn expected(what: &'static str) -> StrContext {
    StrContext::Expected(StrContextValue::Description(what))
}

// -- Body expressions (precedence: || < xor < && < comparison < !) ----------

fn target_access(input: &mut &str) -> ModalResult<Node> {
    let keys: Vec<String> = preceded(
        "$target",
        repeat(1.., delimited(('[', ws), string_literal, (ws, ']'))),
    )
    .parse_next(input)?;
    Ok(Node::Target(keys))
}

fn parameter_ref(input: &mut &str) -> ModalResult<Node> {
    let param = delimited(
        ("$parameters", '[', ws),
        cut_err(alt((
            string_literal.map(Parameter::Named),
            digit1.try_map(str::parse::<usize>).map(Parameter::Positional),
        ))),
        (ws, cut_err(']')),
    )
    .parse_next(input)?;
    Ok(Node::Parameter(param))
}

fn this_ref(input: &mut &str) -> ModalResult<Node> {
    let name = preceded("$this->", cut_err(word)).parse_next(input)?;
    Ok(Node::This(name.to_owned()))
}

fn operator_call(input: &mut &str) -> ModalResult<Node> {
    let name = delimited(("$operators", '[', ws), string_literal, (ws, ']')).parse_next(input)?;
    let args: Vec<Node> = cut_err(delimited(
        (ws, '(', ws),
        separated(0.., or_expr, (ws, ',')),
        (ws, ')'),
    ))
    .parse_next(input)?;
    Ok(Node::Call { name, args })
}

fn primary(input: &mut &str) -> ModalResult<Node> {
    ws.parse_next(input)?;
    alt((
        delimited('(', or_expr, (ws, cut_err(')'))),
        target_access,
        parameter_ref,
        this_ref,
        operator_call,
        value.map(Node::Literal),
    ))
    .context(expected("operand"))
    .parse_next(input)
}

fn compare_op(input: &mut &str) -> ModalResult<CompareOp> {
    ws.parse_next(input)?;
    alt((
        "==".value(CompareOp::Eq),
        "!=".value(CompareOp::Neq),
        ">=".value(CompareOp::Gte),
        "<=".value(CompareOp::Lte),
        ">".value(CompareOp::Gt),
        "<".value(CompareOp::Lt),
        keyword("in").value(CompareOp::In),
    ))
    .parse_next(input)
}

// `!` binds tighter than comparison: `!$a == $b` is `(!$a) == $b`.
fn negation(input: &mut &str) -> ModalResult<Node> {
    ws.parse_next(input)?;
    if opt('!').parse_next(input)?.is_some() {
        let inner = cut_err(negation).parse_next(input)?;
        Ok(Node::Not(Box::new(inner)))
    } else {
        primary(input)
    }
}

fn comparison(input: &mut &str) -> ModalResult<Node> {
    let left = negation(input)?;
    let Some(op) = opt(compare_op).parse_next(input)? else {
        return Ok(left);
    };
    let right = cut_err(negation).parse_next(input)?;
    Ok(Node::Compare {
        left: Box::new(left),
        op,
        right: Box::new(right),
    })
}

fn and_expr(input: &mut &str) -> ModalResult<Node> {
    let first = comparison(input)?;
    let rest: Vec<Node> =
        repeat(0.., preceded((ws, "&&"), cut_err(comparison))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Node::And(Box::new(acc), Box::new(r))))
}

fn xor_expr(input: &mut &str) -> ModalResult<Node> {
    let first = and_expr(input)?;
    let rest: Vec<Node> =
        repeat(0.., preceded((ws, keyword("xor")), cut_err(and_expr))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Node::Xor(Box::new(acc), Box::new(r))))
}

fn or_expr(input: &mut &str) -> ModalResult<Node> {
    let first = xor_expr(input)?;
    let rest: Vec<Node> = repeat(0.., preceded((ws, "||"), cut_err(xor_expr))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Node::Or(Box::new(acc), Box::new(r))))
}

// -- Unit structure ---------------------------------------------------------

fn directive(name: &'static str) -> impl FnMut(&mut &str) -> ModalResult<String> {
    move |input: &mut &str| {
        delimited(
            (ws, keyword(name), ws),
            cut_err(string_literal),
            (ws, cut_err(';')),
        )
        .parse_next(input)
    }
}

fn mixin(input: &mut &str) -> ModalResult<String> {
    preceded(
        (ws, keyword("use"), ws),
        cut_err(terminated(word, (ws, ';'))),
    )
    .map(str::to_owned)
    .parse_next(input)
}

fn constant(input: &mut &str) -> ModalResult<(String, Value)> {
    preceded(
        (ws, keyword("const"), ws),
        cut_err((
            terminated(word, (ws, '=')),
            terminated(value, (ws, ';')),
        )),
    )
    .map(|(name, value): (&str, Value)| (name.to_owned(), value))
    .parse_next(input)
}

fn execute_fn(input: &mut &str) -> ModalResult<Node> {
    (ws, keyword("fn"), ws, keyword("execute"), ws, '(')
        .context(expected("execute method"))
        .parse_next(input)?;
    (
        ws,
        "$target",
        ws,
        ',',
        ws,
        "$operators",
        ws,
        ',',
        ws,
        "$parameters",
        ws,
        ')',
        ws,
        '{',
    )
        .context(expected("execute signature"))
        .parse_next(input)?;
    let body = delimited(
        (ws, keyword("return")),
        cut_err(or_expr),
        (ws, cut_err(';'), ws, cut_err('}')),
    )
    .parse_next(input)?;
    Ok(body)
}

pub(super) fn unit(input: &mut &str) -> ModalResult<UnitSource> {
    let rule = preceded((ws, "//", ws, "rule:", ws), cut_err(string_literal))
        .context(expected("rule comment"))
        .parse_next(input)?;
    let name = delimited((ws, keyword("unit"), ws), cut_err(word), (ws, cut_err('{')))
        .context(expected("unit declaration"))
        .parse_next(input)?;
    let path = directive("path").parse_next(input)?;
    let variant = directive("target").parse_next(input)?;
    let mixins: Vec<String> = repeat(0.., mixin).parse_next(input)?;
    let constants: Vec<(String, Value)> = repeat(0.., constant).parse_next(input)?;
    let body = cut_err(execute_fn).parse_next(input)?;
    (ws, cut_err('}'), ws).parse_next(input)?;

    Ok(UnitSource {
        rule,
        name: name.to_owned(),
        path,
        variant,
        mixins,
        constants,
        body,
    })
}

/// Parse a standalone body expression.
#[cfg(test)]
pub(super) fn body(input: &mut &str) -> ModalResult<Node> {
    let node = or_expr(input)?;
    ws.parse_next(input)?;
    Ok(node)
}
