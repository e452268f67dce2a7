//! Top-level obfuscation facade.
//!
//! One entry point per escalation class, plus [`Obfuscator::escalate`] for
//! chaining. Every run ends with an equivalence check of the final output
//! against the original source at the facade width, independent of the
//! per-step checks the generators already perform.

use log::info;
use rand::Rng;

use crate::error::{Error, Result};
use crate::expr::Expression;
use crate::nonpoly::NonPolyGenerator;
use crate::oracle::{EquivalenceOracle, ExhaustiveOracle, Verdict};

/// A single escalation step.
///
/// `Linear`, `Polynomial`, `AddZero` and `ReplaceSubterm` assume a linear
/// input; `RecursivePairing` and `SubstituteVariable` accept any output of a
/// previous step, which makes them the ones safe to chain freely.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transform {
    Linear,
    Polynomial,
    AddZero,
    RecursivePairing,
    SubstituteVariable,
    ReplaceSubterm,
}

pub struct Obfuscator {
    nonpoly: NonPolyGenerator,
    oracle: Box<dyn EquivalenceOracle>,
    final_width: u32,
}

impl Obfuscator {
    pub fn new() -> Self {
        Self {
            nonpoly: NonPolyGenerator::new(),
            oracle: Box::new(ExhaustiveOracle::new()),
            final_width: 8,
        }
    }

    pub fn with_nonpoly(mut self, nonpoly: NonPolyGenerator) -> Self {
        self.nonpoly = nonpoly;
        self
    }

    pub fn with_oracle(mut self, oracle: impl EquivalenceOracle + 'static) -> Self {
        self.oracle = Box::new(oracle);
        self
    }

    pub fn with_final_width(mut self, width: u32) -> Self {
        self.final_width = width;
        self
    }

    pub fn nonpoly(&self) -> &NonPolyGenerator {
        &self.nonpoly
    }

    /// Applies one transform to a source expression string.
    pub fn obfuscate(
        &self,
        source: &str,
        transform: Transform,
        rng: &mut impl Rng,
    ) -> Result<String> {
        let parsed = Expression::parse(source)?;
        let result = self.apply(&parsed, transform, rng)?;
        self.final_check(source, &result)?;
        info!("{:?}: {} -> {} terms", transform, parsed.term_count(), result.term_count());
        Ok(result.to_string())
    }

    /// Applies a chain of transforms in order. Each step is validated
    /// against its predecessor inside the generators; the final output is
    /// additionally checked against the original source.
    pub fn escalate(
        &self,
        source: &str,
        transforms: &[Transform],
        rng: &mut impl Rng,
    ) -> Result<String> {
        let mut current = Expression::parse(source)?;
        for &transform in transforms {
            current = self.apply(&current, transform, rng)?;
        }
        self.final_check(source, &current)?;
        Ok(current.to_string())
    }

    fn apply(
        &self,
        expr: &Expression,
        transform: Transform,
        rng: &mut impl Rng,
    ) -> Result<Expression> {
        let poly = self.nonpoly.poly();
        match transform {
            Transform::Linear => poly.linear().complexify(expr, rng),
            Transform::Polynomial => poly.inject_zero_equality(expr, rng),
            Transform::AddZero => self.nonpoly.add_zero(expr, rng),
            Transform::RecursivePairing => self.nonpoly.recursive_pairing(expr, rng),
            Transform::SubstituteVariable => self.nonpoly.substitute_variable(expr, rng),
            Transform::ReplaceSubterm => self.nonpoly.replace_subterm(expr, rng),
        }
    }

    fn final_check(&self, source: &str, result: &Expression) -> Result<()> {
        let rendered = result.to_string();
        match self.oracle.check(&rendered, source, self.final_width)? {
            Verdict::Equivalent => Ok(()),
            Verdict::NotEquivalent => Err(Error::OracleMismatch {
                stage: "obfuscate",
                generated: rendered,
                reference: source.to_string(),
                width: self.final_width,
            }),
        }
    }
}

impl Default for Obfuscator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_log::test;

    fn assert_equivalent(a: &str, b: &str, width: u32) {
        let oracle = ExhaustiveOracle::new();
        assert_eq!(
            oracle.check(a, b, width).unwrap(),
            Verdict::Equivalent,
            "{a} vs {b} at width {width}"
        );
    }

    #[test]
    fn test_each_transform_preserves_semantics() {
        let obf = Obfuscator::new();
        let transforms = [
            Transform::Linear,
            Transform::Polynomial,
            Transform::AddZero,
            Transform::RecursivePairing,
            Transform::SubstituteVariable,
            Transform::ReplaceSubterm,
        ];
        for (i, &t) in transforms.iter().enumerate() {
            let mut rng = StdRng::seed_from_u64(100 + i as u64);
            let out = obf.obfuscate("x+y", t, &mut rng).unwrap();
            assert_equivalent(&out, "x+y", 8);
            assert_ne!(out, "x+y", "{t:?} left the source unchanged");
        }
    }

    #[test]
    fn test_escalate_chain() {
        // Chained outputs get big; width 4 keeps the exhaustive check cheap.
        let obf = Obfuscator::new().with_final_width(4);
        let mut rng = StdRng::seed_from_u64(55);
        let chain = [
            Transform::Linear,
            Transform::RecursivePairing,
            Transform::SubstituteVariable,
        ];
        let out = obf.escalate("x-y", &chain, &mut rng).unwrap();
        assert_equivalent(&out, "x-y", 4);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let obf = Obfuscator::new();
        let a = obf
            .obfuscate("x+y", Transform::Polynomial, &mut StdRng::seed_from_u64(9))
            .unwrap();
        let b = obf
            .obfuscate("x+y", Transform::Polynomial, &mut StdRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_malformed_source() {
        let obf = Obfuscator::new();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(obf.obfuscate("x++y", Transform::Linear, &mut rng).is_err());
    }
}
