//! Error taxonomy for expression generation.
//!
//! Configuration errors (bad variable count, malformed input) abort the
//! current generation call. Invariant violations (a signature mismatch after
//! an exact construction step, or an oracle rejection after an escalation
//! step) signal an internal defect and are never downgraded: an unverified
//! obfuscated expression is worse than no output. Callers may retry a failed
//! call with fresh random choices; failed attempts are discarded, not patched.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The requested variable count is outside the supported range 1..=4.
    #[error("variable count must be in 1..=4, got {0}")]
    InvalidVarCount(u32),

    /// Malformed expression input (unbalanced parentheses, empty term, ...).
    #[error("malformed expression {expr:?}: {reason}")]
    Parse { expr: String, reason: String },

    /// An expression must contain at least one term.
    #[error("expression has no terms")]
    EmptyExpression,

    /// An exact construction step produced a signature that differs from its
    /// target. Internal defect, not a recoverable condition.
    #[error("signature mismatch in {stage}: expected {expected:?}, got {actual:?}")]
    SignatureMismatch {
        stage: &'static str,
        expected: Vec<i64>,
        actual: Vec<i64>,
    },

    /// The equivalence oracle rejected the output of a construction step.
    #[error("oracle rejected {stage} at width {width}: {generated:?} is not equivalent to {reference:?}")]
    OracleMismatch {
        stage: &'static str,
        generated: String,
        reference: String,
        width: u32,
    },

    /// The basis corpus cannot supply as many distinct terms as requested.
    #[error("basis for {k} variables has {available} nonstandard terms, {requested} requested")]
    CorpusExhausted {
        k: u32,
        available: usize,
        requested: usize,
    },

    /// A rewrite tactic needs more terms than the expression has.
    #[error("expression has {got} terms, tactic needs at least {needed}")]
    TooFewTerms { needed: usize, got: usize },

    /// A variable-substitution tactic was applied to a constant expression.
    #[error("expression {expr:?} has no free variables")]
    NoVariables { expr: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
