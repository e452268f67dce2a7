//! Non-polynomial escalation.
//!
//! These rewrites push an expression outside the polynomial class by
//! substituting whole subexpressions into the variable slots of fresh linear
//! identities. A linear MBA identity holds for arbitrary word values in its
//! variables, so any term may stand in for `x` or `y`; the result is no
//! longer a polynomial over the original variables. Each rewrite is checked
//! against its input by the equivalence oracle.

use log::debug;
use rand::Rng;

use crate::error::{Error, Result};
use crate::expr::{Expression, SignedTerm};
use crate::oracle::{EquivalenceOracle, ExhaustiveOracle, Verdict};
use crate::poly::PolyGenerator;
use crate::signature::factor_signature;
use crate::types::{VarCount, VARIABLE_NAMES};

pub struct NonPolyGenerator {
    poly: PolyGenerator,
    oracle: Box<dyn EquivalenceOracle>,
    verify_width: u32,
}

impl NonPolyGenerator {
    pub fn new() -> Self {
        Self {
            poly: PolyGenerator::new(),
            oracle: Box::new(ExhaustiveOracle::new()),
            verify_width: 2,
        }
    }

    pub fn with_poly(mut self, poly: PolyGenerator) -> Self {
        self.poly = poly;
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

    pub fn poly(&self) -> &PolyGenerator {
        &self.poly
    }

    /// Folds the first two terms into a fresh obfuscation of `x+y`, with the
    /// terms substituted for the variables. Inputs with fewer than two terms
    /// are complexified linearly first.
    pub fn recursive_pairing(&self, expr: &Expression, rng: &mut impl Rng) -> Result<Expression> {
        let expr = if expr.term_count() < 2 {
            self.poly.linear().complexify(expr, rng)?
        } else {
            expr.clone()
        };
        if expr.term_count() < 2 {
            return Err(Error::TooFewTerms {
                needed: 2,
                got: expr.term_count(),
            });
        }

        let nested = self.poly.linear().complexify_at(
            &Expression::parse("x+y")?,
            None,
            VarCount::new(2)?,
            rng,
        )?;
        let first = format!("({})", expr.terms()[0]);
        let second = format!("({})", expr.terms()[1]);
        let mut terms: Vec<SignedTerm> = nested
            .terms()
            .iter()
            .map(|t| SignedTerm::new(t.coefficient, substitute_pair(&t.factor, &first, &second)))
            .collect();
        terms.extend(expr.terms()[2..].iter().cloned());

        let result = Expression::new(terms)?;
        self.verify("recursive pairing", &result, &expr.to_string())?;
        debug!(
            "paired first two of {} terms into {}",
            expr.term_count(),
            result.term_count()
        );
        Ok(result)
    }

    /// Replaces every occurrence of the lowest-numbered variable, in the
    /// first and last terms that mention it, with a polynomial expansion of
    /// that variable. Constants have nothing to substitute.
    pub fn substitute_variable(
        &self,
        expr: &Expression,
        rng: &mut impl Rng,
    ) -> Result<Expression> {
        let v = match expr.variables().into_iter().next() {
            Some(v) => v,
            None => {
                return Err(Error::NoVariables {
                    expr: expr.to_string(),
                })
            }
        };
        let name = VARIABLE_NAMES[v];
        let var = Expression::from(SignedTerm::new(1, name.to_string()));
        let expansion = format!("({})", self.poly.inject_zero_equality(&var, rng)?);

        let mentions: Vec<usize> = expr
            .terms()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.factor.contains(name))
            .map(|(i, _)| i)
            .collect();
        let first = mentions[0];
        let last = *mentions.last().unwrap_or(&first);
        let terms: Vec<SignedTerm> = expr
            .terms()
            .iter()
            .enumerate()
            .map(|(i, t)| {
                if i == first || i == last {
                    SignedTerm::new(
                        t.coefficient,
                        t.factor.replace(name, &expansion),
                    )
                } else {
                    t.clone()
                }
            })
            .collect();

        let result = Expression::new(terms)?;
        self.verify("variable substitution", &result, &expr.to_string())?;
        debug!("substituted {} in terms {} and {}", name, first, last);
        Ok(result)
    }

    /// Appends a polynomial zero expansion. Linear inputs are complexified
    /// first so the zero padding lands on an already-obscured base.
    pub fn add_zero(&self, expr: &Expression, rng: &mut impl Rng) -> Result<Expression> {
        let base = if is_linear(expr) {
            self.poly.linear().complexify(expr, rng)?
        } else {
            expr.clone()
        };
        let zero = self
            .poly
            .inject_zero_equality(&Expression::constant(0), rng)?;
        let result = base.concat(&zero);
        self.verify("zero addition", &result, &expr.to_string())?;
        Ok(result)
    }

    /// Replaces the last term with a polynomial expansion of that single
    /// term. The term must be linear on its own; a nonlinear factor cannot
    /// be complexified and the error propagates.
    pub fn replace_subterm(&self, expr: &Expression, rng: &mut impl Rng) -> Result<Expression> {
        let (rest, last) = match expr.terms() {
            [rest @ .., last] => (rest, last),
            [] => return Err(Error::EmptyExpression),
        };
        let expansion = self
            .poly
            .inject_zero_equality(&Expression::from(last.clone()), rng)?;
        let mut terms = rest.to_vec();
        terms.extend(expansion.terms().iter().cloned());

        let result = Expression::new(terms)?;
        self.verify("subterm replacement", &result, &expr.to_string())?;
        Ok(result)
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

impl Default for NonPolyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Simultaneous substitution of `x` and `y` in a factor string. A single
/// left-to-right scan guarantees replacement text is never re-scanned.
fn substitute_pair(factor: &str, for_x: &str, for_y: &str) -> String {
    let mut out = String::with_capacity(factor.len() + for_x.len() + for_y.len());
    for c in factor.chars() {
        match c {
            'x' => out.push_str(for_x),
            'y' => out.push_str(for_y),
            _ => out.push(c),
        }
    }
    out
}

/// Whether every non-constant factor is purely bitwise, i.e. the expression
/// is in the linear class the signature engine covers.
fn is_linear(expr: &Expression) -> bool {
    let k = match VarCount::new(expr.var_span().max(1)) {
        Ok(k) => k,
        Err(_) => return false,
    };
    expr.terms()
        .iter()
        .all(|t| t.is_constant() || factor_signature(&t.factor, k).is_ok())
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
    fn test_substitute_pair_is_simultaneous() {
        // The x-replacement mentions y; it must not be rewritten again.
        assert_eq!(substitute_pair("(x&y)", "(y)", "(0)"), "((y)&(0))");
    }

    #[test]
    fn test_recursive_pairing() {
        let gen = NonPolyGenerator::new();
        let mut rng = StdRng::seed_from_u64(31);
        let e = Expression::parse("x+y").unwrap();
        let r = gen.recursive_pairing(&e, &mut rng).unwrap();
        assert!(r.term_count() > e.term_count());
        assert_equivalent(&r.to_string(), "x+y", 2);
        // Single-bit values over assignments 00,01,10,11.
        let rendered = r.to_string();
        let values: Vec<u64> = [(0u64, 0u64), (0, 1), (1, 0), (1, 1)]
            .iter()
            .map(|&(x, y)| crate::oracle::evaluate(&rendered, &[x, y], 2).unwrap())
            .collect();
        assert_eq!(values, [0, 1, 1, 2]);
    }

    #[test]
    fn test_recursive_pairing_complexifies_short_input() {
        let gen = NonPolyGenerator::new();
        let mut rng = StdRng::seed_from_u64(8);
        let r = gen
            .recursive_pairing(&Expression::parse("x").unwrap(), &mut rng)
            .unwrap();
        assert_equivalent(&r.to_string(), "x", 2);
    }

    #[test]
    fn test_recursive_pairing_chains() {
        let gen = NonPolyGenerator::new();
        let mut rng = StdRng::seed_from_u64(4);
        let mut e = Expression::parse("x-y").unwrap();
        for _ in 0..2 {
            e = gen.recursive_pairing(&e, &mut rng).unwrap();
        }
        assert_equivalent(&e.to_string(), "x-y", 2);
    }

    #[test]
    fn test_substitute_variable() {
        let gen = NonPolyGenerator::new();
        let mut rng = StdRng::seed_from_u64(13);
        let e = Expression::parse("x+2*(x&y)-y").unwrap();
        let r = gen.substitute_variable(&e, &mut rng).unwrap();
        assert_equivalent(&r.to_string(), &e.to_string(), 2);
        // The last x-mentioning term now embeds an expansion.
        assert!(r.to_string().len() > e.to_string().len());
    }

    #[test]
    fn test_substitute_variable_rejects_constants() {
        let gen = NonPolyGenerator::new();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            gen.substitute_variable(&Expression::constant(5), &mut rng),
            Err(Error::NoVariables { .. })
        ));
    }

    #[test]
    fn test_add_zero() {
        let gen = NonPolyGenerator::new();
        let mut rng = StdRng::seed_from_u64(21);
        let e = Expression::parse("x+y").unwrap();
        let r = gen.add_zero(&e, &mut rng).unwrap();
        assert_equivalent(&r.to_string(), "x+y", 2);
        assert!(r.term_count() > e.term_count());
    }

    #[test]
    fn test_replace_subterm() {
        let gen = NonPolyGenerator::new();
        let mut rng = StdRng::seed_from_u64(19);
        let e = Expression::parse("x+2*(x&y)").unwrap();
        let r = gen.replace_subterm(&e, &mut rng).unwrap();
        assert_equivalent(&r.to_string(), &e.to_string(), 2);
    }

    #[test]
    fn test_replace_subterm_rejects_nonlinear_tail() {
        let gen = NonPolyGenerator::new();
        let mut rng = StdRng::seed_from_u64(2);
        let e = Expression::parse("x+(x&y)*(x|y)").unwrap();
        assert!(gen.replace_subterm(&e, &mut rng).is_err());
    }
}
