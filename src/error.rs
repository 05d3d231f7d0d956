use thiserror::Error;

use crate::assemble::AssemblyError;
use crate::cache::EvaluationError;
use crate::parse::ParseError;
use crate::target::TargetError;

/// Everything that can make [`Compiler::compile`](crate::Compiler::compile) fail.
///
/// Runtime failures of a loaded executor are a separate type,
/// [`ExecutionError`](crate::ExecutionError).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] ParseError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// Two different (variant, rule) pairs derived the same identifier.
    #[error(
        "identifier {identifier} already belongs to {existing_variant:?} rule {existing_rule:?}, \
         not {variant:?} rule {rule:?}"
    )]
    IdentifierConflict {
        identifier: String,
        existing_variant: String,
        existing_rule: String,
        variant: String,
        rule: String,
    },
}
