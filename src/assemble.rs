//! Renders executor units as source text.
//!
//! ## Unit Format
//!
//! ```text
//! // rule: "group in ['a', 'b']"
//! unit Executor_<identifier> {
//!     path "rulekit::compiled::Executor_<identifier>";
//!     target "array";
//!
//!     use filter;
//!
//!     const list_0 = ["a", "b"];
//!
//!     fn execute($target, $operators, $parameters) {
//!         return ($target["group"] in $this->list_0);
//!     }
//! }
//! ```
//!
//! Mixins keep the target's order; constants are sorted by name. The rule is
//! written as an escaped string literal so the comment stays on one line.

use std::fmt::Write as _;

use thiserror::Error;

use crate::target::GeneratedCode;
use crate::Value;

/// Everything about a unit that does not come from the target.
#[derive(Debug, Clone, Copy)]
pub struct UnitHeader<'a> {
    pub identifier: &'a str,
    pub name: &'a str,
    pub path: &'a str,
    pub variant: &'a str,
    pub rule: &'a str,
}

/// Generated code that cannot be written out as a unit.
///
/// These indicate a target bug rather than a bad rule.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("compiled data '{field}' has no literal form: {reason}")]
    NonLiteral { field: String, reason: &'static str },

    #[error("invalid {kind} name '{name}'")]
    InvalidName { kind: &'static str, name: String },
}

/// Render the source text of one executor unit.
///
/// Pure: identical inputs give byte-identical output.
///
/// # Errors
///
/// Returns [`AssemblyError`] if a compiled-data value has no literal form or a
/// mixin or field name is not an identifier.
pub fn assemble(header: &UnitHeader<'_>, code: &GeneratedCode) -> Result<String, AssemblyError> {
    check_name("unit", header.name)?;

    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(out, "// rule: {}", quote(header.rule));
    let _ = writeln!(out, "unit {} {{", header.name);
    let _ = writeln!(out, "    path {};", quote(header.path));
    let _ = writeln!(out, "    target {};", quote(header.variant));

    if !code.mixins.is_empty() {
        out.push('\n');
        for mixin in &code.mixins {
            check_name("mixin", mixin)?;
            let _ = writeln!(out, "    use {mixin};");
        }
    }

    if !code.compiled_data.is_empty() {
        out.push('\n');
        for (key, value) in &code.compiled_data {
            check_name("field", key)?;
            let lit = literal(value).map_err(|reason| AssemblyError::NonLiteral {
                field: key.clone(),
                reason,
            })?;
            let _ = writeln!(out, "    const {key} = {lit};");
        }
    }

    out.push('\n');
    out.push_str("    fn execute($target, $operators, $parameters) {\n");
    let _ = writeln!(out, "        return {};", code.compiled_rule);
    out.push_str("    }\n}\n");
    Ok(out)
}

/// Literal source form of a value, readable back by the rule grammar.
///
/// # Errors
///
/// Non-finite floats have no literal form.
pub(crate) fn literal(value: &Value) -> Result<String, &'static str> {
    let mut out = String::new();
    write_literal(&mut out, value)?;
    Ok(out)
}

fn write_literal(out: &mut String, value: &Value) -> Result<(), &'static str> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Int(v) => {
            let _ = write!(out, "{v}");
        }
        Value::Float(v) => {
            if !v.is_finite() {
                return Err("non-finite float");
            }
            // Debug keeps a '.' or exponent, so it never reads back as an int
            let _ = write!(out, "{v:?}");
        }
        Value::Bool(v) => {
            let _ = write!(out, "{v}");
        }
        Value::String(s) => out.push_str(&quote(s)),
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_literal(out, item)?;
            }
            out.push(']');
        }
    }
    Ok(())
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:x}}}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn check_name(kind: &'static str, name: &str) -> Result<(), AssemblyError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AssemblyError::InvalidName {
            kind,
            name: name.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(rule: &'a str) -> UnitHeader<'a> {
        UnitHeader {
            identifier: "00ff",
            name: "Executor_00ff",
            path: "rulekit::compiled::Executor_00ff",
            variant: "array",
            rule,
        }
    }

    #[test]
    fn full_layout() {
        let code = GeneratedCode::new("($target[\"age\"] > $this->threshold)")
            .mixin("filter")
            .mixin("audit")
            .data("threshold", 18_i64)
            .data("names", vec!["a", "b"]);
        let source = assemble(&header("age > 18"), &code).unwrap();
        assert_eq!(
            source,
            "// rule: \"age > 18\"\n\
             unit Executor_00ff {\n\
             \x20   path \"rulekit::compiled::Executor_00ff\";\n\
             \x20   target \"array\";\n\
             \n\
             \x20   use filter;\n\
             \x20   use audit;\n\
             \n\
             \x20   const names = [\"a\", \"b\"];\n\
             \x20   const threshold = 18;\n\
             \n\
             \x20   fn execute($target, $operators, $parameters) {\n\
             \x20       return ($target[\"age\"] > $this->threshold);\n\
             \x20   }\n\
             }\n"
        );
    }

    #[test]
    fn empty_sections_are_omitted() {
        let source = assemble(&header("true"), &GeneratedCode::new("true")).unwrap();
        assert!(!source.contains("use "));
        assert!(!source.contains("const "));
        assert!(source.contains("return true;"));
    }

    #[test]
    fn multiline_rule_stays_in_one_comment() {
        let source = assemble(&header("a = 1\nand b = \"x\""), &GeneratedCode::new("true")).unwrap();
        assert!(source.starts_with("// rule: \"a = 1\\nand b = \\\"x\\\"\"\n"));
    }

    #[test]
    fn body_is_not_interpreted() {
        let body = "$parameters['age'] > $this->threshold";
        let code = GeneratedCode::new(body).data("threshold", 18_i64);
        let source = assemble(&header("age > 18"), &code).unwrap();
        assert!(source.contains("const threshold = 18;"));
        assert!(source.contains(&format!("return {body};")));
    }

    #[test]
    fn nan_is_not_a_literal() {
        let code = GeneratedCode::new("true").data("limit", f64::NAN);
        assert_eq!(
            assemble(&header("x"), &code),
            Err(AssemblyError::NonLiteral {
                field: "limit".into(),
                reason: "non-finite float",
            })
        );

        let nested = GeneratedCode::new("true").data("xs", Value::List(vec![Value::Float(f64::INFINITY)]));
        assert!(matches!(
            assemble(&header("x"), &nested),
            Err(AssemblyError::NonLiteral { .. })
        ));
    }

    #[test]
    fn bad_names_are_rejected() {
        let code = GeneratedCode::new("true").data("not a field", 1_i64);
        assert!(matches!(
            assemble(&header("x"), &code),
            Err(AssemblyError::InvalidName { kind: "field", .. })
        ));

        let code = GeneratedCode::new("true").mixin("filter; evil");
        assert!(matches!(
            assemble(&header("x"), &code),
            Err(AssemblyError::InvalidName { kind: "mixin", .. })
        ));
    }

    #[test]
    fn literal_forms() {
        assert_eq!(literal(&Value::Null).unwrap(), "null");
        assert_eq!(literal(&Value::Int(-7)).unwrap(), "-7");
        assert_eq!(literal(&Value::Float(1.0)).unwrap(), "1.0");
        assert_eq!(literal(&Value::Float(0.1)).unwrap(), "0.1");
        assert_eq!(literal(&Value::Bool(false)).unwrap(), "false");
        assert_eq!(literal(&Value::from("a\"b\u{1}")).unwrap(), "\"a\\\"b\\u{1}\"");
        assert_eq!(
            literal(&Value::from(vec![Value::Int(1), Value::Null])).unwrap(),
            "[1, null]"
        );
    }
}
