//! Cache keys for compiled rules.
//!
//! An identifier is the first 128 bits of a BLAKE3 digest over the target
//! variant and the raw rule text, rendered as 32 lower-case hex digits. The
//! variant is length-prefixed so `("ab", "c")` and `("a", "bc")` never share
//! an input.

/// Prefix of every executor's short name.
pub const EXECUTOR_PREFIX: &str = "Executor_";

/// Module path compiled executors are registered under.
pub const EXECUTOR_NAMESPACE: &str = "rulekit::compiled";

const IDENTIFIER_BYTES: usize = 16;

/// Derive the identifier for `rule` compiled by the target `variant`.
///
/// Deterministic across runs and processes; whitespace and case in `rule`
/// are significant.
#[must_use]
pub fn derive(variant: &str, rule: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(variant.len() as u64).to_le_bytes());
    hasher.update(variant.as_bytes());
    hasher.update(rule.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(IDENTIFIER_BYTES * 2);
    for byte in &digest.as_bytes()[..IDENTIFIER_BYTES] {
        out.push(hex_digit(byte >> 4));
        out.push(hex_digit(byte & 0x0f));
    }
    out
}

/// `Executor_<identifier>`
#[must_use]
pub fn executor_name(identifier: &str) -> String {
    format!("{EXECUTOR_PREFIX}{identifier}")
}

/// `rulekit::compiled::Executor_<identifier>`
#[must_use]
pub fn executor_path(identifier: &str) -> String {
    format!("{EXECUTOR_NAMESPACE}::{EXECUTOR_PREFIX}{identifier}")
}

/// Whether `s` has the shape of a derived identifier.
#[must_use]
pub fn is_identifier(s: &str) -> bool {
    s.len() == IDENTIFIER_BYTES * 2 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn hex_digit(nibble: u8) -> char {
    char::from(b"0123456789abcdef"[usize::from(nibble)])
}
