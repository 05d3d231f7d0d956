use winnow::ascii::digit1;
use winnow::combinator::{alt, cut_err, delimited, opt, preceded, repeat, separated};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

use crate::{CompareOp, Expr, Parameter, Value};

/// Words that can never be access paths.
const RESERVED: &[&str] = &["and", "or", "xor", "not", "in", "like", "true", "false", "null"];

// -- Whitespace & words -----------------------------------------------------

pub(crate) fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_whitespace())
        .void()
        .parse_next(input)
}

pub(crate) fn word<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

/// Case-insensitive keyword. Backtracks unless the whole word matches,
/// so `android` is never read as `and`.
pub(crate) fn keyword(kw: &'static str) -> impl FnMut(&mut &str) -> ModalResult<()> {
    move |input: &mut &str| {
        let checkpoint = input.checkpoint();
        let w = word.parse_next(input)?;
        if w.eq_ignore_ascii_case(kw) {
            Ok(())
        } else {
            input.reset(&checkpoint);
            Err(ErrMode::from_input(&*input))
        }
    }
}

// -- Literals ---------------------------------------------------------------

pub(crate) fn string_literal(input: &mut &str) -> ModalResult<String> {
    let quote = one_of(['"', '\'']).parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = cut_err(any)
            .context(StrContext::Expected(StrContextValue::Description(
                "closing quote",
            )))
            .parse_next(input)?;
        match ch {
            '\\' => {
                let esc = cut_err(any).parse_next(input)?;
                match esc {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    'r' => s.push('\r'),
                    '\\' | '"' | '\'' => s.push(esc),
                    'u' => {
                        let hex = cut_err(delimited(
                            '{',
                            take_while(1..=6, |c: char| c.is_ascii_hexdigit()),
                            '}',
                        ))
                        .parse_next(input)?;
                        let c = u32::from_str_radix(hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| ErrMode::from_input(&*input).cut())?;
                        s.push(c);
                    }
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            c if c == quote => return Ok(s),
            c => s.push(c),
        }
    }
}

pub(crate) fn number(input: &mut &str) -> ModalResult<Value> {
    let text = (
        opt('-'),
        digit1,
        opt(('.', digit1)),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .parse_next(input)?;
    if text.contains(['.', 'e', 'E']) {
        let f: f64 = text
            .parse()
            .map_err(|_| ErrMode::from_input(&*input).cut())?;
        Ok(Value::Float(f))
    } else {
        // Out-of-range integers are a hard error, not a float
        let i: i64 = text
            .parse()
            .map_err(|_| ErrMode::from_input(&*input).cut())?;
        Ok(Value::Int(i))
    }
}

fn list(input: &mut &str) -> ModalResult<Value> {
    let items: Vec<Value> = delimited(
        ('[', ws),
        separated(0.., value, (ws, ',', ws)),
        (ws, cut_err(']')),
    )
    .parse_next(input)?;
    Ok(Value::List(items))
}

pub(crate) fn value(input: &mut &str) -> ModalResult<Value> {
    ws.parse_next(input)?;
    alt((
        string_literal.map(Value::String),
        number,
        list,
        keyword("true").value(Value::Bool(true)),
        keyword("false").value(Value::Bool(false)),
        keyword("null").value(Value::Null),
    ))
    .context(StrContext::Expected(StrContextValue::Description("value")))
    .parse_next(input)
}

// -- Operands ---------------------------------------------------------------

fn parameter(input: &mut &str) -> ModalResult<Parameter> {
    alt((
        preceded(':', cut_err(word)).map(|name: &str| Parameter::Named(name.to_owned())),
        // Numbered after parsing, see `number_positionals`
        '?'.value(Parameter::Positional(0)),
    ))
    .parse_next(input)
}

fn access_or_call(input: &mut &str) -> ModalResult<Expr> {
    let checkpoint = input.checkpoint();
    let segments: Vec<&str> = separated(1.., word, '.').parse_next(input)?;

    if let [single] = segments.as_slice() {
        if RESERVED.iter().any(|kw| single.eq_ignore_ascii_case(kw)) {
            input.reset(&checkpoint);
            return Err(ErrMode::from_input(&*input));
        }
        let args: Option<Vec<Expr>> = opt(delimited(
            ('(', ws),
            separated(0.., expr, (ws, ',')),
            (ws, cut_err(')')),
        ))
        .parse_next(input)?;
        if let Some(args) = args {
            return Ok(Expr::Call {
                name: (*single).to_owned(),
                args,
            });
        }
    }

    Ok(Expr::Field(segments.join(".")))
}

fn operand(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    alt((
        delimited('(', expr, (ws, cut_err(')'))),
        value.map(Expr::Literal),
        parameter.map(Expr::Parameter),
        access_or_call,
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "operand",
    )))
    .parse_next(input)
}

// -- Operators --------------------------------------------------------------

fn symbolic_op(input: &mut &str) -> ModalResult<CompareOp> {
    let sym = take_while(1.., |c: char| "<>=!~".contains(c)).parse_next(input)?;
    Ok(match sym {
        "=" | "==" => CompareOp::Eq,
        "!=" | "<>" => CompareOp::Neq,
        ">" => CompareOp::Gt,
        ">=" => CompareOp::Gte,
        "<" => CompareOp::Lt,
        "<=" => CompareOp::Lte,
        other => CompareOp::Custom(other.to_owned()),
    })
}

fn compare_op(input: &mut &str) -> ModalResult<CompareOp> {
    ws.parse_next(input)?;
    alt((
        symbolic_op,
        keyword("in").value(CompareOp::In),
        keyword("like").value(CompareOp::Like),
    ))
    .parse_next(input)
}

// -- Expressions (precedence: OR < XOR < AND < NOT < comparison) ------------

fn comparison(input: &mut &str) -> ModalResult<Expr> {
    let left = operand(input)?;
    let Some(op) = opt(compare_op).parse_next(input)? else {
        return Ok(left);
    };
    let right = cut_err(operand).parse_next(input)?;
    Ok(Expr::Compare {
        left: Box::new(left),
        op,
        right: Box::new(right),
    })
}

fn unary(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    if opt(keyword("not")).parse_next(input)?.is_some() {
        let inner = cut_err(unary).parse_next(input)?;
        Ok(Expr::Not(Box::new(inner)))
    } else {
        comparison(input)
    }
}

fn and_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = unary(input)?;
    let rest: Vec<Expr> =
        repeat(0.., preceded((ws, keyword("and")), cut_err(unary))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Expr::And(Box::new(acc), Box::new(r))))
}

fn xor_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = and_expr(input)?;
    let rest: Vec<Expr> =
        repeat(0.., preceded((ws, keyword("xor")), cut_err(and_expr))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Expr::Xor(Box::new(acc), Box::new(r))))
}

fn or_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = xor_expr(input)?;
    let rest: Vec<Expr> =
        repeat(0.., preceded((ws, keyword("or")), cut_err(xor_expr))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Expr::Or(Box::new(acc), Box::new(r))))
}

fn expr(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    or_expr(input)
}

// -- Top level --------------------------------------------------------------

pub(super) fn rule(input: &mut &str) -> ModalResult<Expr> {
    let mut parsed = expr(input)?;
    ws.parse_next(input)?;
    number_positionals(&mut parsed, &mut 0);
    Ok(parsed)
}

/// Number `?` parameters in source order, which is a left-to-right pre-order walk.
fn number_positionals(expr: &mut Expr, next: &mut usize) {
    match expr {
        Expr::Parameter(Parameter::Positional(index)) => {
            *index = *next;
            *next += 1;
        }
        Expr::Call { args, .. } => {
            for arg in args {
                number_positionals(arg, next);
            }
        }
        Expr::Compare { left, right, .. } => {
            number_positionals(left, next);
            number_positionals(right, next);
        }
        Expr::And(a, b) | Expr::Or(a, b) | Expr::Xor(a, b) => {
            number_positionals(a, next);
            number_positionals(b, next);
        }
        Expr::Not(inner) => number_positionals(inner, next),
        Expr::Literal(_) | Expr::Field(_) | Expr::Parameter(Parameter::Named(_)) => {}
    }
}
