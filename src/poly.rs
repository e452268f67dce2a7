//! Polynomial escalation.
//!
//! Two ways past the linear class: multiply two linear MBAs term by term,
//! or inject a provably-zero product as padding. Products leave the reach of
//! the signature engine, so every result is backstopped by the equivalence
//! oracle at a small width.

use log::debug;
use rand::Rng;

use crate::error::{Error, Result};
use crate::expr::{Expression, SignedTerm};
use crate::linear::LinearGenerator;
use crate::oracle::{EquivalenceOracle, ExhaustiveOracle, Verdict};

pub struct PolyGenerator {
    linear: LinearGenerator,
    oracle: Box<dyn EquivalenceOracle>,
    verify_width: u32,
}

impl PolyGenerator {
    pub fn new() -> Self {
        Self {
            linear: LinearGenerator::new(),
            oracle: Box::new(ExhaustiveOracle::new()),
            verify_width: 2,
        }
    }

    pub fn with_linear(mut self, linear: LinearGenerator) -> Self {
        self.linear = linear;
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

    pub fn linear(&self) -> &LinearGenerator {
        &self.linear
    }

    /// Cartesian term-by-term product of two linear combinations. The factor
    /// `"1"` is absorbed rather than rendered, so `c*1 * d*F` stays `cd*F`.
    pub fn multiply(&self, a: &Expression, b: &Expression) -> Result<Expression> {
        let mut terms = Vec::with_capacity(a.term_count() * b.term_count());
        for ta in a.terms() {
            for tb in b.terms() {
                terms.push(SignedTerm::new(
                    ta.coefficient * tb.coefficient,
                    join_factors(&ta.factor, &tb.factor),
                ));
            }
        }
        let product = Expression::new(terms)?.merge_like_terms();
        let reference = format!("({})*({})", a, b);
        self.verify("multiply", &product, &reference)?;
        debug!(
            "multiplied {}x{} terms into {}",
            a.term_count(),
            b.term_count(),
            product.term_count()
        );
        Ok(product)
    }

    /// Complexifies the ground truth linearly, then pads it with a product
    /// that is provably zero:
    ///
    /// 1. `C1 = complexify(gt)`, `C2 = complexify(1)`.
    /// 2. `original = C1 * C2` (equals `gt * 1 = gt`).
    /// 3. `flipped` is `C1` with each term's sign flipped with probability
    ///    1/3; `partial` is the first half (plus one) of `C2`'s terms, each
    ///    sign-flipped with the same probability.
    /// 4. `Z = complexify(0, partial)` is a zero expression anchored on
    ///    `partial`; `padding = flipped * Z` is therefore zero too.
    /// 5. The result merges `original ++ padding`.
    pub fn inject_zero_equality(
        &self,
        gt: &Expression,
        rng: &mut impl Rng,
    ) -> Result<Expression> {
        let c1 = self.linear.complexify(gt, rng)?;
        let c2 = self.linear.complexify(&Expression::constant(1), rng)?;
        let original = self.multiply(&c1, &c2)?;

        let flipped = flip_signs(c1.terms(), rng)?;
        let half = c2.term_count() / 2 + 1;
        let partial = flip_signs(&c2.terms()[..half], rng)?;
        let zero = self
            .linear
            .complexify_with(&Expression::constant(0), Some(&partial), rng)?;
        let padding = self.multiply(&flipped, &zero)?;

        let result = original.concat(&padding).merge_like_terms();
        self.verify("zero-equality injection", &result, &gt.to_string())?;
        debug!(
            "injected zero equality: {} -> {} terms",
            gt.term_count(),
            result.term_count()
        );
        Ok(result)
    }

    /// String-level entry point: parse, escalate, render.
    pub fn groundtruth_to_polynomial(&self, gt: &str, rng: &mut impl Rng) -> Result<String> {
        let parsed = Expression::parse(gt)?;
        Ok(self.inject_zero_equality(&parsed, rng)?.to_string())
    }

    fn verify(&self, stage: &'static str, generated: &Expression, reference: &str) -> Result<()> {
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

impl Default for PolyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Each term keeps or flips its sign with probability 2/3 vs 1/3.
fn flip_signs(terms: &[SignedTerm], rng: &mut impl Rng) -> Result<Expression> {
    Expression::new(
        terms
            .iter()
            .map(|t| {
                if rng.gen_range(1..=3u32) % 2 == 0 {
                    t.negated()
                } else {
                    t.clone()
                }
            })
            .collect(),
    )
}

fn join_factors(a: &str, b: &str) -> String {
    match (a == "1", b == "1") {
        (true, true) => "1".to_string(),
        (true, false) => b.to_string(),
        (false, true) => a.to_string(),
        (false, false) => format!("{}*{}", a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_log::test;

    use crate::oracle::evaluate;

    fn assert_equivalent(a: &str, b: &str, width: u32) {
        let oracle = ExhaustiveOracle::new();
        assert_eq!(
            oracle.check(a, b, width).unwrap(),
            Verdict::Equivalent,
            "{a} vs {b} at width {width}"
        );
    }

    #[test]
    fn test_multiply_variables() {
        let poly = PolyGenerator::new();
        let p = poly
            .multiply(
                &Expression::parse("x").unwrap(),
                &Expression::parse("y").unwrap(),
            )
            .unwrap();
        assert_eq!(p.to_string(), "x*y");
        for (x, y) in [(0u64, 0u64), (3, 5), (7, 2)] {
            assert_eq!(evaluate(&p.to_string(), &[x, y], 8).unwrap(), x * y & 0xff);
        }
    }

    #[test]
    fn test_multiply_distributes() {
        let poly = PolyGenerator::new();
        let a = Expression::parse("x+2*(x&y)").unwrap();
        let b = Expression::parse("3*(x|y)-1").unwrap();
        let p = poly.multiply(&a, &b).unwrap();
        assert_equivalent(&p.to_string(), &format!("({})*({})", a, b), 3);
    }

    #[test]
    fn test_multiply_absorbs_constant_factor() {
        let poly = PolyGenerator::new();
        let p = poly
            .multiply(
                &Expression::parse("2").unwrap(),
                &Expression::parse("x-3").unwrap(),
            )
            .unwrap();
        assert_eq!(p.to_string(), "2*x-6");
    }

    #[test]
    fn test_inject_zero_equality() {
        let poly = PolyGenerator::new();
        let mut rng = StdRng::seed_from_u64(17);
        for gt in ["x+y", "x-y", "2*x"] {
            let e = poly
                .inject_zero_equality(&Expression::parse(gt).unwrap(), &mut rng)
                .unwrap();
            assert_equivalent(&e.to_string(), gt, 2);
            assert!(e.term_count() > 2, "{gt} -> {e}");
        }
    }

    #[test]
    fn test_inject_zero_ground_truth_twice() {
        // Two successive zero injections stacked together still evaluate to
        // 0 at every single-bit assignment. Nesting the calls instead is
        // rejected by construction: the first output carries product
        // factors, which complexify cannot take as a ground truth.
        let poly = PolyGenerator::new();
        let mut rng = StdRng::seed_from_u64(29);
        let first = poly
            .inject_zero_equality(&Expression::constant(0), &mut rng)
            .unwrap();
        let second = poly
            .inject_zero_equality(&Expression::constant(0), &mut rng)
            .unwrap();
        let stacked = first.concat(&second).to_string();
        for (x, y) in [(0u64, 0u64), (0, 1), (1, 0), (1, 1)] {
            assert_eq!(evaluate(&stacked, &[x, y], 1).unwrap(), 0);
        }
        assert_equivalent(&stacked, "0", 4);
        assert!(poly.inject_zero_equality(&first, &mut rng).is_err());
    }

    #[test]
    fn test_groundtruth_to_polynomial() {
        let poly = PolyGenerator::new();
        let mut rng = StdRng::seed_from_u64(1);
        let s = poly.groundtruth_to_polynomial("x+y", &mut rng).unwrap();
        assert_equivalent(&s, "x+y", 2);
        assert!(s.contains('*'));
    }
}
