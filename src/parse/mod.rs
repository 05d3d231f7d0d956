mod error;
pub(crate) mod grammar;

pub use error::ParseError;

use crate::Expr;

/// Turns rule text into an [`Expr`].
///
/// The [`Compiler`](crate::Compiler) owns one parser and calls it inside the
/// compilation closure, so only cache misses ever parse.
pub trait Parser: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ParseError`] if `rule` is not valid syntax.
    fn parse(&self, rule: &str) -> Result<Expr, ParseError>;
}

/// Parser for the built-in rule DSL.
///
/// ```
/// use rulekit::{DslParser, Parser};
///
/// let ast = DslParser.parse("age > :min and group in ['admin', 'staff']").unwrap();
/// assert_eq!(ast.to_string(), "((age > :min) AND (group in [\"admin\", \"staff\"]))");
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct DslParser;

impl Parser for DslParser {
    fn parse(&self, rule: &str) -> Result<Expr, ParseError> {
        parse(rule)
    }
}

/// Parse rule text with the built-in grammar.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not valid DSL syntax.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    use winnow::Parser;
    grammar::rule
        .parse(input)
        .map_err(|e| ParseError::new(input, e.to_string()))
}
