//! Bitwise basis corpus.
//!
//! For each supported variable count `k`, the corpus partitions bitwise
//! terms into a *standard basis* (`2^k` terms whose signatures are singleton
//! indicators, keyed by assignment index) and a *nonstandard basis* (terms
//! with at least two nonzero signature entries, used as obfuscation noise).
//! A library is loaded once per `k`, validated against its invariants, and
//! shared read-only for the generator's lifetime.

use crate::error::{Error, Result};
use crate::signature::factor_signature;
use crate::types::{VarCount, VARIABLE_NAMES};

/// A validated basis partition for one variable count.
///
/// # Invariants
///
/// - `standard[i]` has signature equal to the indicator at index `i`.
/// - Every nonstandard entry has at least two nonzero signature entries.
/// - Immutable after construction.
#[derive(Debug, Clone)]
pub struct BasisLibrary {
    k: VarCount,
    standard: Vec<String>,
    nonstandard: Vec<String>,
}

impl BasisLibrary {
    /// Wraps a corpus partition, checking every invariant via the signature
    /// engine. A corpus that fails here is corrupt and unusable.
    pub fn new(k: VarCount, standard: Vec<String>, nonstandard: Vec<String>) -> Result<Self> {
        if standard.len() != k.assignments() {
            return Err(Error::Parse {
                expr: format!("standard basis of {} terms", standard.len()),
                reason: format!("expected {} standard terms for k={}", k.assignments(), k),
            });
        }
        for (i, factor) in standard.iter().enumerate() {
            let sig = factor_signature(factor, k)?;
            let mut indicator = vec![0i64; k.assignments()];
            indicator[i] = 1;
            if sig.values() != indicator {
                return Err(Error::SignatureMismatch {
                    stage: "basis load (standard)",
                    expected: indicator,
                    actual: sig.values().to_vec(),
                });
            }
        }
        for factor in &nonstandard {
            let sig = factor_signature(factor, k)?;
            if sig.weight() < 2 {
                return Err(Error::SignatureMismatch {
                    stage: "basis load (nonstandard)",
                    expected: vec![2],
                    actual: vec![sig.weight() as i64],
                });
            }
        }
        Ok(Self {
            k,
            standard,
            nonstandard,
        })
    }

    pub fn k(&self) -> VarCount {
        self.k
    }

    /// The singleton-indicator term for assignment index `i`.
    pub fn standard(&self, i: usize) -> &str {
        &self.standard[i]
    }

    pub fn nonstandard(&self) -> &[String] {
        &self.nonstandard
    }
}

/// Source of basis corpora, one immutable library per variable count.
/// A missing or corrupt corpus is fatal at generation time.
pub trait BasisProvider {
    fn load_basis(&self, k: VarCount) -> Result<BasisLibrary>;
}

/// Built-in provider that synthesizes the full corpus from truth tables:
/// every nonzero table over `k` variables, rendered as a disjunction of its
/// minterms. Single-minterm tables form the standard basis.
#[derive(Debug, Default, Clone, Copy)]
pub struct SynthesizedBasis;

impl SynthesizedBasis {
    fn minterm(k: VarCount, index: usize) -> String {
        let n = k.get() as usize;
        let mut literals = Vec::with_capacity(n);
        for (j, &name) in VARIABLE_NAMES[..n].iter().enumerate() {
            if k.bit(index, j) == 1 {
                literals.push(name.to_string());
            } else {
                literals.push(format!("~{}", name));
            }
        }
        if n == 1 {
            literals.swap_remove(0)
        } else {
            format!("({})", literals.join("&"))
        }
    }

    fn table_expression(k: VarCount, mask: usize) -> String {
        let minterms: Vec<String> = (0..k.assignments())
            .filter(|i| mask >> i & 1 == 1)
            .map(|i| Self::minterm(k, i))
            .collect();
        if minterms.len() == 1 {
            minterms.into_iter().next().unwrap_or_default()
        } else {
            format!("({})", minterms.join("|"))
        }
    }
}

impl BasisProvider for SynthesizedBasis {
    fn load_basis(&self, k: VarCount) -> Result<BasisLibrary> {
        let assignments = k.assignments();
        let mut standard = vec![String::new(); assignments];
        let mut nonstandard = Vec::with_capacity((1usize << assignments) - 1 - assignments);
        for mask in 1usize..1 << assignments {
            if mask.count_ones() == 1 {
                let index = mask.trailing_zeros() as usize;
                standard[index] = Self::minterm(k, index);
            } else {
                nonstandard.push(Self::table_expression(k, mask));
            }
        }
        BasisLibrary::new(k, standard, nonstandard)
    }
}
