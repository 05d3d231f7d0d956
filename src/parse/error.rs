use std::fmt;

/// Malformed rule text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    rule: String,
    message: String,
}

impl ParseError {
    pub(crate) fn new(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// The rule text that failed to parse.
    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "syntax error in rule {:?}: {}", self.rule, self.message)
    }
}

impl std::error::Error for ParseError {}
