//! Linear MBA generation by signature cancellation.
//!
//! Given a ground truth `G` (optionally with a mandatory partial term `P`),
//! the generator samples random nonstandard-basis noise `N`, computes the
//! residual `diff = sig(G) - sig(P) - sig(N)`, and cancels it exactly with
//! standard-basis terms: `standard[i]` is the indicator at `i`, so appending
//! `(diff[i], standard[i])` for every nonzero index yields a combination
//! whose signature equals `sig(G)` by construction. No solver is involved;
//! the signature re-check is exact and the oracle call is defense in depth.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use rand::Rng;

use crate::basis::{BasisLibrary, BasisProvider, SynthesizedBasis};
use crate::error::{Error, Result};
use crate::expr::{Expression, SignedTerm};
use crate::oracle::{EquivalenceOracle, ExhaustiveOracle, Verdict};
use crate::signature::signature_of_linear;
use crate::types::VarCount;

/// Weighted coefficient multiset for noise terms.
///
/// The default skews heavily toward `±1`, then `±2`, with a rare tail of
/// small primes and their negatives, so generated coefficients stay
/// plausible while occasionally injecting larger ones. The distribution is
/// a tunable parameter, not a contract.
#[derive(Debug, Clone)]
pub struct CoefficientPool {
    weighted: Vec<i64>,
}

impl CoefficientPool {
    /// Builds a pool from a weighted list. Zero coefficients are rejected:
    /// a zero term is no noise at all.
    pub fn new(weighted: Vec<i64>) -> Result<Self> {
        if weighted.is_empty() || weighted.contains(&0) {
            return Err(Error::Parse {
                expr: "coefficient pool".to_string(),
                reason: "pool must be non-empty with nonzero entries".to_string(),
            });
        }
        Ok(Self { weighted })
    }

    pub fn sample(&self, rng: &mut impl Rng) -> i64 {
        self.weighted[rng.gen_range(0..self.weighted.len())]
    }
}

impl Default for CoefficientPool {
    fn default() -> Self {
        let mut weighted = Vec::with_capacity(134);
        for _ in 0..19 {
            weighted.extend_from_slice(&[1, -1]);
        }
        for _ in 0..13 {
            weighted.extend_from_slice(&[2, -2]);
        }
        for _ in 0..7 {
            weighted.extend_from_slice(&[3, 4, 5, 7, 11, -3, -5, -6, -7, -11]);
        }
        Self { weighted }
    }
}

/// Generator of complex linear combinations provably equal to a target.
///
/// Basis libraries are loaded lazily, once per variable count, and shared
/// read-only for the generator's lifetime.
pub struct LinearGenerator {
    provider: Box<dyn BasisProvider>,
    libraries: RefCell<HashMap<u32, Arc<BasisLibrary>>>,
    pool: CoefficientPool,
    noise_terms: Option<usize>,
    oracle: Box<dyn EquivalenceOracle>,
    verify_width: u32,
}

impl LinearGenerator {
    pub fn new() -> Self {
        Self {
            provider: Box::new(SynthesizedBasis),
            libraries: RefCell::new(HashMap::new()),
            pool: CoefficientPool::default(),
            noise_terms: None,
            oracle: Box::new(ExhaustiveOracle::new()),
            verify_width: 2,
        }
    }

    pub fn with_provider(mut self, provider: impl BasisProvider + 'static) -> Self {
        self.provider = Box::new(provider);
        self.libraries.borrow_mut().clear();
        self
    }

    pub fn with_pool(mut self, pool: CoefficientPool) -> Self {
        self.pool = pool;
        self
    }

    /// Fixes the noise-term count; the default is `k` for a `k`-variable
    /// target.
    pub fn with_noise_terms(mut self, count: usize) -> Self {
        self.noise_terms = Some(count);
        self
    }

    pub fn with_oracle(mut self, oracle: impl EquivalenceOracle + 'static) -> Self {
        self.oracle = Box::new(oracle);
        self
    }

    pub fn with_verify_width(mut self, width: u32) -> Self {
        self.verify_width = width;
        self
    }

    /// The shared basis library for `k`, loading it on first use.
    pub fn basis(&self, k: VarCount) -> Result<Arc<BasisLibrary>> {
        if let Some(lib) = self.libraries.borrow().get(&k.get()) {
            return Ok(lib.clone());
        }
        let lib = Arc::new(self.provider.load_basis(k)?);
        self.libraries.borrow_mut().insert(k.get(), lib.clone());
        Ok(lib)
    }

    /// Complexifies a ground truth into a syntactically larger expression
    /// with the same signature.
    pub fn complexify(&self, gt: &Expression, rng: &mut impl Rng) -> Result<Expression> {
        self.complexify_with(gt, None, rng)
    }

    /// Complexifies with a mandatory partial term that must appear in the
    /// output. The variable count is `max(2, span(gt), span(partial))`.
    pub fn complexify_with(
        &self,
        gt: &Expression,
        partial: Option<&Expression>,
        rng: &mut impl Rng,
    ) -> Result<Expression> {
        let span = gt
            .var_span()
            .max(partial.map(Expression::var_span).unwrap_or(0));
        let k = VarCount::new(span.max(2))?;
        self.complexify_at(gt, partial, k, rng)
    }

    /// Explicit-`k` variant of [`complexify_with`][Self::complexify_with].
    pub fn complexify_at(
        &self,
        gt: &Expression,
        partial: Option<&Expression>,
        k: VarCount,
        rng: &mut impl Rng,
    ) -> Result<Expression> {
        let basis = self.basis(k)?;
        let cnumber = self.noise_terms.unwrap_or(k.get() as usize);
        let available = basis.nonstandard().len();
        if cnumber == 0 || cnumber > available {
            return Err(Error::CorpusExhausted {
                k: k.get(),
                available,
                requested: cnumber,
            });
        }

        let mut terms: Vec<SignedTerm> = Vec::new();
        if let Some(p) = partial {
            terms.extend(p.terms().iter().cloned());
        }
        for i in rand::seq::index::sample(rng, available, cnumber) {
            terms.push(SignedTerm::new(
                self.pool.sample(rng),
                basis.nonstandard()[i].clone(),
            ));
        }

        // diff = sig(G) - sig(P) - sig(N), then cancel every nonzero entry
        // with the matching indicator term.
        let target = signature_of_linear(gt, k)?;
        let mut residual = target.clone();
        let assembled = Expression::new(terms.clone())?;
        residual.add_scaled(&signature_of_linear(&assembled, k)?, -1);
        for (i, &v) in residual.values().iter().enumerate() {
            if v != 0 {
                terms.push(SignedTerm::new(v, basis.standard(i)));
            }
        }

        let result = Expression::new(terms)?.merge_like_terms();
        let actual = signature_of_linear(&result, k)?;
        if actual != target {
            return Err(Error::SignatureMismatch {
                stage: "linear cancellation",
                expected: target.values().to_vec(),
                actual: actual.values().to_vec(),
            });
        }
        self.spot_check("linear cancellation", &result, &gt.to_string())?;
        debug!(
            "complexified {} into {} terms at k={}",
            gt,
            result.term_count(),
            k
        );
        Ok(result)
    }

    /// The zero-sum dual direction: build a random nonzero combination,
    /// cancel its aggregate signature to zero with standard terms, then
    /// split off one or two terms as the (negated) ground truth. The large
    /// remainder equals the negation of the removed subset by the zero-sum
    /// invariant.
    pub fn generate_equation(
        &self,
        k: VarCount,
        noise_terms: usize,
        rng: &mut impl Rng,
    ) -> Result<(Expression, Expression)> {
        if noise_terms < 3 {
            return Err(Error::TooFewTerms {
                needed: 3,
                got: noise_terms,
            });
        }
        let basis = self.basis(k)?;
        let available = basis.nonstandard().len();
        if noise_terms > available {
            return Err(Error::CorpusExhausted {
                k: k.get(),
                available,
                requested: noise_terms,
            });
        }

        let mut terms: Vec<SignedTerm> = rand::seq::index::sample(rng, available, noise_terms)
            .iter()
            .map(|i| SignedTerm::new(self.pool.sample(rng), basis.nonstandard()[i].clone()))
            .collect();
        let sig = signature_of_linear(&Expression::new(terms.clone())?, k)?;
        for (i, &v) in sig.values().iter().enumerate() {
            if v != 0 {
                terms.push(SignedTerm::new(-v, basis.standard(i)));
            }
        }

        // Remove 1..=2 random terms; their negation is the ground truth.
        let take = rng.gen_range(1..=2usize).min(terms.len() - 1);
        let mut picked = rand::seq::index::sample(rng, terms.len(), take).into_vec();
        picked.sort_unstable_by(|a, b| b.cmp(a));
        let mut ground = Vec::with_capacity(take);
        for i in picked {
            ground.push(terms.remove(i).negated());
        }

        let complex = Expression::new(terms)?;
        let ground_truth = Expression::new(ground)?;
        let cs = signature_of_linear(&complex, k)?;
        let gs = signature_of_linear(&ground_truth, k)?;
        if cs != gs {
            return Err(Error::SignatureMismatch {
                stage: "zero-sum split",
                expected: gs.values().to_vec(),
                actual: cs.values().to_vec(),
            });
        }
        debug!(
            "generated equation with {} complex terms at k={}",
            complex.term_count(),
            k
        );
        Ok((complex, ground_truth))
    }

    pub(crate) fn spot_check(
        &self,
        stage: &'static str,
        generated: &Expression,
        reference: &str,
    ) -> Result<()> {
        let rendered = generated.to_string();
        match self.oracle.check(&rendered, reference, self.verify_width)? {
            Verdict::Equivalent => Ok(()),
            Verdict::NotEquivalent => Err(Error::OracleMismatch {
                stage,
                generated: rendered,
                reference: reference.to_string(),
                width: self.verify_width,
            }),
        }
    }
}

impl Default for LinearGenerator {
    fn default() -> Self {
        Self::new()
    }
}
