//! # mba-rs: Mixed Boolean-Arithmetic expression generation in Rust
//!
//! **`mba-rs`** generates **Mixed Boolean-Arithmetic (MBA)** expressions: for a
//! simple *ground truth* such as `x+y`, it produces a syntactically complex
//! expression that is provably equivalent on fixed-width machine words.
//! It is designed for obfuscation research and for building datasets of
//! complex/simple expression pairs.
//!
//! ## How does it work?
//!
//! A linear MBA is a sum `c1*F1 + c2*F2 + ...` where each `Fi` is a purely
//! bitwise expression. Over all single-bit assignments, each factor has a
//! **truth-table signature**, and the signature of a linear combination is
//! the coefficient-weighted sum of its factors' signatures. Two linear MBAs
//! with equal signatures compute the same word function at *every* bit
//! width, so linear generation needs no solver: sample random noise terms,
//! then cancel the signature difference exactly against a standard basis.
//!
//! Polynomial and non-polynomial escalation leave the linear class by
//! multiplying linear MBAs and by substituting whole subexpressions into the
//! variable slots of fresh linear identities. Those results are checked by a
//! bounded equivalence oracle.
//!
//! ## Key Features
//!
//! - **Proof-Carrying Linear Generation**: Linear results are verified by
//!   exact signature equality, a width-independent proof.
//! - **Escalation Ladder**: Linear, polynomial (term products and zero
//!   injection), and non-polynomial (recursive pairing, variable
//!   substitution) transforms, chainable via [`obfuscate::Obfuscator`].
//! - **Deterministic**: Every generator takes an explicit [`rand::Rng`], so
//!   seeded runs reproduce byte-identical output.
//! - **Validated Basis Corpus**: Bitwise bases are synthesized from truth
//!   tables and re-validated against their invariants at load time.
//!
//! ## Basic Usage
//!
//! ```rust
//! use mba_rs::obfuscate::{Obfuscator, Transform};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let obfuscator = Obfuscator::new();
//! let mut rng = StdRng::seed_from_u64(42);
//!
//! let complex = obfuscator
//!     .obfuscate("x+y", Transform::Linear, &mut rng)
//!     .unwrap();
//! // `complex` computes x+y at every bit width, but does not look like it.
//! assert_ne!(complex, "x+y");
//! ```
//!
//! ## Core Components
//!
//! - **[`expr`]**: The signed-term expression algebra.
//! - **[`signature`]**: Truth-table signatures and the exact linear proof.
//! - **[`basis`]**: Standard/nonstandard bitwise basis corpora.
//! - **[`linear`]**, **[`poly`]**, **[`nonpoly`]**: The escalation ladder.
//! - **[`oracle`]**: Bounded brute-force equivalence checking.
//! - **[`obfuscate`]**: The top-level facade.
//! - **[`dataset`]**: Record I/O for complex/ground-truth pair datasets.

pub mod basis;
pub mod dataset;
pub mod error;
pub mod expr;
pub mod linear;
pub mod nonpoly;
pub mod obfuscate;
pub mod oracle;
pub mod poly;
pub mod signature;
pub mod types;
