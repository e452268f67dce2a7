//! Truth-table signature vectors.
//!
//! The signature of a bitwise factor is its truth table over all `2^k`
//! single-bit assignments; the signature of a linear combination is the
//! coefficient-weighted pointwise sum of its factors' signatures. Equality
//! of two linear signatures is an exact, width-independent equivalence
//! proof — no external oracle involved.
//!
//! Constant terms follow the machine-word convention: the all-ones per-bit
//! pattern is the word `-1`, so a constant term with value `c` contributes
//! `-c` to every signature entry. This keeps linear results correct at every
//! bit width, including for ground truths such as `"1"`.

use std::fmt;

use crate::error::{Error, Result};
use crate::expr::Expression;
use crate::types::{variable_index, VarCount};

/// An integer vector of length `2^k`, indexed by boolean assignment.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Signature {
    values: Vec<i64>,
}

impl Signature {
    pub fn zero(k: VarCount) -> Self {
        Self {
            values: vec![0; k.assignments()],
        }
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0)
    }

    /// Number of nonzero entries.
    pub fn weight(&self) -> usize {
        self.values.iter().filter(|&&v| v != 0).count()
    }

    pub(crate) fn add_scaled(&mut self, other: &Signature, coefficient: i64) {
        debug_assert_eq!(self.values.len(), other.values.len());
        for (v, o) in self.values.iter_mut().zip(&other.values) {
            *v += coefficient * o;
        }
    }

    pub(crate) fn add_constant(&mut self, value: i64) {
        for v in &mut self.values {
            *v += value;
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}

/// A parsed bitwise-only factor. No arithmetic operators are admitted here;
/// products and sums belong to the oracle's evaluator, not the signature
/// engine.
enum BitExpr {
    Const(u64),
    Var(usize),
    Not(Box<BitExpr>),
    And(Box<BitExpr>, Box<BitExpr>),
    Xor(Box<BitExpr>, Box<BitExpr>),
    Or(Box<BitExpr>, Box<BitExpr>),
}

impl BitExpr {
    fn eval(&self, k: VarCount, assignment: usize) -> u64 {
        match self {
            BitExpr::Const(b) => *b,
            BitExpr::Var(j) => k.bit(assignment, *j),
            BitExpr::Not(a) => a.eval(k, assignment) ^ 1,
            BitExpr::And(a, b) => a.eval(k, assignment) & b.eval(k, assignment),
            BitExpr::Xor(a, b) => a.eval(k, assignment) ^ b.eval(k, assignment),
            BitExpr::Or(a, b) => a.eval(k, assignment) | b.eval(k, assignment),
        }
    }
}

struct BitParser<'a> {
    factor: &'a str,
    bytes: &'a [u8],
    pos: usize,
    k: VarCount,
}

impl<'a> BitParser<'a> {
    fn new(factor: &'a str, k: VarCount) -> Self {
        Self {
            factor,
            bytes: factor.as_bytes(),
            pos: 0,
            k,
        }
    }

    fn error(&self, reason: &str) -> Error {
        Error::Parse {
            expr: self.factor.to_string(),
            reason: reason.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    // Precedence, loosest first: `|`, `^`, `&`, unary `~`.
    fn or(&mut self) -> Result<BitExpr> {
        let mut lhs = self.xor()?;
        while self.eat(b'|') {
            lhs = BitExpr::Or(Box::new(lhs), Box::new(self.xor()?));
        }
        Ok(lhs)
    }

    fn xor(&mut self) -> Result<BitExpr> {
        let mut lhs = self.and()?;
        while self.eat(b'^') {
            lhs = BitExpr::Xor(Box::new(lhs), Box::new(self.and()?));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<BitExpr> {
        let mut lhs = self.unary()?;
        while self.eat(b'&') {
            lhs = BitExpr::And(Box::new(lhs), Box::new(self.unary()?));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<BitExpr> {
        if self.eat(b'~') {
            Ok(BitExpr::Not(Box::new(self.unary()?)))
        } else {
            self.atom()
        }
    }

    fn atom(&mut self) -> Result<BitExpr> {
        match self.bump() {
            Some(b'(') => {
                let inner = self.or()?;
                if !self.eat(b')') {
                    return Err(self.error("unbalanced parentheses"));
                }
                Ok(inner)
            }
            Some(b'0') => Ok(BitExpr::Const(0)),
            Some(b'1') => Ok(BitExpr::Const(1)),
            Some(c) => {
                let j = variable_index(c as char)
                    .ok_or_else(|| self.error("not a bitwise factor"))?;
                if j >= self.k.get() as usize {
                    return Err(self.error("variable outside the declared count"));
                }
                Ok(BitExpr::Var(j))
            }
            None => Err(self.error("unexpected end of factor")),
        }
    }

    fn parse(mut self) -> Result<BitExpr> {
        let expr = self.or()?;
        if self.pos != self.bytes.len() {
            return Err(self.error("trailing input in factor"));
        }
        Ok(expr)
    }
}

/// Truth table of a bitwise factor over all `2^k` assignments.
///
/// Pure and deterministic; only `& ^ | ~`, parentheses, variables and the
/// literals `0`/`1` are admitted.
pub fn factor_signature(factor: &str, k: VarCount) -> Result<Signature> {
    let parsed = BitParser::new(factor, k).parse()?;
    let mut sig = Signature::zero(k);
    for assignment in 0..k.assignments() {
        sig.values[assignment] = parsed.eval(k, assignment) as i64;
    }
    Ok(sig)
}

/// Signature of a linear combination: `Σ coefficient × signature(factor)`,
/// pointwise, in exact `i64` arithmetic.
pub fn signature_of_linear(expr: &Expression, k: VarCount) -> Result<Signature> {
    let mut sig = Signature::zero(k);
    for term in expr.terms() {
        if term.is_constant() {
            // Constant c is the word -c per bit position.
            sig.add_constant(-term.coefficient);
        } else {
            let fs = factor_signature(&term.factor, k)?;
            sig.add_scaled(&fs, term.coefficient);
        }
    }
    Ok(sig)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(n: u32) -> VarCount {
        VarCount::new(n).unwrap()
    }

    fn sig(expr: &str, n: u32) -> Signature {
        signature_of_linear(&Expression::parse(expr).unwrap(), k(n)).unwrap()
    }

    #[test]
    fn test_factor_signatures() {
        assert_eq!(factor_signature("x", k(2)).unwrap().values(), [0, 0, 1, 1]);
        assert_eq!(factor_signature("y", k(2)).unwrap().values(), [0, 1, 0, 1]);
        assert_eq!(
            factor_signature("(x&y)", k(2)).unwrap().values(),
            [0, 0, 0, 1]
        );
        assert_eq!(
            factor_signature("(x|y)", k(2)).unwrap().values(),
            [0, 1, 1, 1]
        );
        assert_eq!(
            factor_signature("~(x^y)", k(2)).unwrap().values(),
            [1, 0, 0, 1]
        );
        assert_eq!(factor_signature("~x", k(1)).unwrap().values(), [1, 0]);
    }

    #[test]
    fn test_factor_rejects_arithmetic() {
        assert!(factor_signature("x+y", k(2)).is_err());
        assert!(factor_signature("(x&y)*(x|y)", k(2)).is_err());
        assert!(factor_signature("z", k(2)).is_err());
    }

    #[test]
    fn test_linear_scenario() {
        // The literal scenario: signature("x+y", 2) over 00,01,10,11.
        assert_eq!(sig("x+y", 2).values(), [0, 1, 1, 2]);
    }

    #[test]
    fn test_linearity_of_concatenation() {
        let a = Expression::parse("2*(x&y)-x").unwrap();
        let b = Expression::parse("(x^y)+3*~y").unwrap();
        let sa = signature_of_linear(&a, k(2)).unwrap();
        let sb = signature_of_linear(&b, k(2)).unwrap();
        let mut sum = Signature::zero(k(2));
        sum.add_scaled(&sa, 1);
        sum.add_scaled(&sb, 1);
        let joined = signature_of_linear(&a.concat(&b), k(2)).unwrap();
        assert_eq!(joined, sum);
    }

    #[test]
    fn test_constant_convention() {
        // The all-ones bit pattern is the word -1, so the constant c has
        // uniform signature -c.
        assert_eq!(sig("1", 2).values(), [-1, -1, -1, -1]);
        assert_eq!(sig("0", 2).values(), [0, 0, 0, 0]);
        // "x - x + 1" has the same signature as the all-ones factor negated.
        let all_ones = factor_signature("~(x&~x)", k(2)).unwrap();
        assert_eq!(all_ones.values(), [1, 1, 1, 1]);
        assert_eq!(sig("-1", 2).values(), all_ones.values());
    }

    #[test]
    fn test_zero_equality_leaves_signature_unchanged() {
        // (x^y) - (x^y) is a zero equality; adding it changes nothing.
        let e = Expression::parse("x+y").unwrap();
        let z = Expression::parse("2*(x^y)-2*(x^y)").unwrap();
        assert!(signature_of_linear(&z, k(2)).unwrap().is_zero());
        assert_eq!(
            signature_of_linear(&e.concat(&z), k(2)).unwrap(),
            signature_of_linear(&e, k(2)).unwrap()
        );
    }

    #[test]
    fn test_merge_preserves_signature() {
        let e = Expression::parse("x+2*(x&y)+x-(x&y)").unwrap();
        assert_eq!(
            signature_of_linear(&e.merge_like_terms(), k(2)).unwrap(),
            signature_of_linear(&e, k(2)).unwrap()
        );
    }
}
