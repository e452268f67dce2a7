//! Canonical signed-term expression algebra.
//!
//! An [`Expression`] is an ordered sequence of [`SignedTerm`]s. The sign of a
//! term lives in its coefficient, never in the factor string. Expressions are
//! immutable values: every transformation produces a new `Expression`, and
//! the string form is only produced at the output boundary via `Display`.
//!
//! Input is either user-authored ground truth or internally generated, so a
//! malformed string (unbalanced parentheses, empty term) is a construction
//! error, not a runtime condition to recover from.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::error::{Error, Result};
use crate::types::variable_index;

/// A single `coefficient * factor` term.
///
/// # Invariants
///
/// - The factor is never empty.
/// - Constant terms use the factor `"1"`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct SignedTerm {
    pub coefficient: i64,
    pub factor: String,
}

impl SignedTerm {
    pub fn new(coefficient: i64, factor: impl Into<String>) -> Self {
        let factor = factor.into();
        debug_assert!(!factor.is_empty());
        Self { coefficient, factor }
    }

    /// A constant term with factor `"1"`.
    pub fn constant(value: i64) -> Self {
        Self::new(value, "1")
    }

    /// The same term with the coefficient sign flipped.
    pub fn negated(&self) -> Self {
        Self::new(-self.coefficient, self.factor.clone())
    }

    pub fn is_constant(&self) -> bool {
        self.factor == "1"
    }

    fn fmt_magnitude(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.coefficient.unsigned_abs();
        if self.is_constant() {
            write!(f, "{}", abs)
        } else if abs == 1 {
            write!(f, "{}", self.factor)
        } else {
            write!(f, "{}*{}", abs, self.factor)
        }
    }
}

impl fmt::Display for SignedTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coefficient < 0 {
            write!(f, "-")?;
        }
        self.fmt_magnitude(f)
    }
}

/// An ordered sequence of signed terms.
///
/// Two expressions are *structurally* distinct even when semantically equal;
/// that gap is the entire point of the generator.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Expression {
    terms: Vec<SignedTerm>,
}

impl Expression {
    /// Wraps a non-empty term list.
    pub fn new(terms: Vec<SignedTerm>) -> Result<Self> {
        if terms.is_empty() {
            return Err(Error::EmptyExpression);
        }
        Ok(Self { terms })
    }

    /// The constant expression with the given value.
    pub fn constant(value: i64) -> Self {
        Self {
            terms: vec![SignedTerm::constant(value)],
        }
    }

    /// Splits a canonical string on top-level `+`/`-` boundaries and parses
    /// each chunk as `coef*factor`, a bare factor, or a bare integer.
    pub fn parse(input: &str) -> Result<Self> {
        let s: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        if s.is_empty() {
            return Err(Error::EmptyExpression);
        }

        let bytes = s.as_bytes();
        let mut terms = Vec::new();
        let mut depth = 0usize;
        let mut sign = 1i64;
        let mut start = 0;
        let mut i = 0;
        if bytes[0] == b'+' || bytes[0] == b'-' {
            sign = if bytes[0] == b'-' { -1 } else { 1 };
            start = 1;
            i = 1;
        }
        while i < bytes.len() {
            match bytes[i] {
                b'(' => depth += 1,
                b')' => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| parse_error(input, "unbalanced parentheses"))?;
                }
                b'+' | b'-' if depth == 0 => {
                    terms.push(parse_term(input, &s[start..i], sign)?);
                    sign = if bytes[i] == b'-' { -1 } else { 1 };
                    start = i + 1;
                }
                _ => {}
            }
            i += 1;
        }
        if depth != 0 {
            return Err(parse_error(input, "unbalanced parentheses"));
        }
        terms.push(parse_term(input, &s[start..], sign)?);

        Self::new(terms)
    }

    pub fn terms(&self) -> &[SignedTerm] {
        &self.terms
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// The same expression with every coefficient sign flipped.
    pub fn negated(&self) -> Self {
        Self {
            terms: self.terms.iter().map(SignedTerm::negated).collect(),
        }
    }

    /// Concatenation of the two term lists, in order.
    pub fn concat(&self, other: &Expression) -> Self {
        let mut terms = self.terms.clone();
        terms.extend(other.terms.iter().cloned());
        Self { terms }
    }

    /// Sums coefficients of identical factor strings, preserving first-seen
    /// order and dropping zero results. A fully cancelled list collapses to
    /// the constant `0`.
    pub fn merge_like_terms(&self) -> Self {
        let mut merged: Vec<SignedTerm> = Vec::with_capacity(self.terms.len());
        let mut index: HashMap<String, usize> = HashMap::new();
        for term in &self.terms {
            match index.get(&term.factor) {
                Some(&i) => merged[i].coefficient += term.coefficient,
                None => {
                    index.insert(term.factor.clone(), merged.len());
                    merged.push(term.clone());
                }
            }
        }
        merged.retain(|t| t.coefficient != 0);
        if merged.is_empty() {
            merged.push(SignedTerm::constant(0));
        }
        Self { terms: merged }
    }

    /// Positional indices of the free variables occurring in any factor.
    pub fn variables(&self) -> BTreeSet<usize> {
        let mut vars = BTreeSet::new();
        for term in &self.terms {
            for c in term.factor.chars() {
                if let Some(i) = variable_index(c) {
                    vars.insert(i);
                }
            }
        }
        vars
    }

    /// The variable count needed to evaluate this expression: one past the
    /// highest variable position in use (an expression mentioning only `y`
    /// still ranges over two variables), or 0 for constants.
    pub fn var_span(&self) -> u32 {
        self.variables()
            .iter()
            .next_back()
            .map(|&i| i as u32 + 1)
            .unwrap_or(0)
    }
}

impl From<SignedTerm> for Expression {
    fn from(term: SignedTerm) -> Self {
        Self { terms: vec![term] }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if term.coefficient < 0 {
                write!(f, "-")?;
            } else if i > 0 {
                write!(f, "+")?;
            }
            term.fmt_magnitude(f)?;
        }
        Ok(())
    }
}

fn parse_error(expr: &str, reason: &str) -> Error {
    Error::Parse {
        expr: expr.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_term(whole: &str, chunk: &str, sign: i64) -> Result<SignedTerm> {
    if chunk.is_empty() {
        return Err(parse_error(whole, "empty term"));
    }
    let bytes = chunk.as_bytes();
    if bytes[0].is_ascii_digit() {
        let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
        let coefficient: i64 = chunk[..digits]
            .parse()
            .map_err(|_| parse_error(whole, "coefficient out of range"))?;
        let rest = &chunk[digits..];
        let factor = if rest.is_empty() {
            "1".to_string()
        } else if let Some(factor) = rest.strip_prefix('*') {
            if factor.is_empty() {
                return Err(parse_error(whole, "missing factor after '*'"));
            }
            factor.to_string()
        } else {
            return Err(parse_error(whole, "expected '*' after coefficient"));
        };
        Ok(SignedTerm::new(sign * coefficient, factor))
    } else {
        Ok(SignedTerm::new(sign, chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let e = Expression::parse("x+y").unwrap();
        assert_eq!(e.term_count(), 2);
        assert_eq!(e.terms()[0], SignedTerm::new(1, "x"));
        assert_eq!(e.terms()[1], SignedTerm::new(1, "y"));
        assert_eq!(e.to_string(), "x+y");
    }

    #[test]
    fn test_parse_signs_and_coefficients() {
        let e = Expression::parse("-3*(x^y)+2*(x&y)-1").unwrap();
        assert_eq!(e.terms()[0], SignedTerm::new(-3, "(x^y)"));
        assert_eq!(e.terms()[1], SignedTerm::new(2, "(x&y)"));
        assert_eq!(e.terms()[2], SignedTerm::constant(-1));
        assert_eq!(e.to_string(), "-3*(x^y)+2*(x&y)-1");
    }

    #[test]
    fn test_parse_respects_parentheses() {
        // The inner `+` and `-` must not split the term.
        let e = Expression::parse("(x+y-1)*(x|y)+z").unwrap();
        assert_eq!(e.term_count(), 2);
        assert_eq!(e.terms()[0].factor, "(x+y-1)*(x|y)");
    }

    #[test]
    fn test_parse_product_factor() {
        let e = Expression::parse("6*(x&y)*(x|y)").unwrap();
        assert_eq!(e.terms()[0], SignedTerm::new(6, "(x&y)*(x|y)"));
        assert_eq!(e.to_string(), "6*(x&y)*(x|y)");
    }

    #[test]
    fn test_parse_constants() {
        assert_eq!(Expression::parse("0").unwrap(), Expression::constant(0));
        assert_eq!(Expression::parse("3").unwrap(), Expression::constant(3));
        assert_eq!(Expression::constant(0).to_string(), "0");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Expression::parse("").is_err());
        assert!(Expression::parse("x++y").is_err());
        assert!(Expression::parse("x+(y").is_err());
        assert!(Expression::parse("x)+y(").is_err());
        assert!(Expression::parse("3x").is_err());
        assert!(Expression::parse("2*").is_err());
    }

    #[test]
    fn test_roundtrip() {
        for s in ["x+y", "-x-y", "2*(x|y)-(x^y)+4", "t-z", "-2*~(x&y)+x"] {
            let e = Expression::parse(s).unwrap();
            assert_eq!(Expression::parse(&e.to_string()).unwrap(), e, "{s}");
        }
    }

    #[test]
    fn test_merge_like_terms() {
        let e = Expression::parse("x+2*(x&y)+x-2*(x&y)+y").unwrap();
        let m = e.merge_like_terms();
        assert_eq!(m.to_string(), "2*x+y");
        // Idempotent.
        assert_eq!(m.merge_like_terms(), m);
    }

    #[test]
    fn test_merge_collapses_to_zero() {
        let e = Expression::parse("x-x").unwrap();
        assert_eq!(e.merge_like_terms(), Expression::constant(0));
    }

    #[test]
    fn test_merge_order_independent_sums() {
        let a = Expression::parse("x+y+2*x").unwrap().merge_like_terms();
        let b = Expression::parse("2*x+y+x").unwrap().merge_like_terms();
        assert_eq!(a.terms()[0].coefficient, 3);
        assert_eq!(b.terms()[0].coefficient, 3);
    }

    #[test]
    fn test_negated() {
        let e = Expression::parse("x-2*y").unwrap();
        assert_eq!(e.negated().to_string(), "-x+2*y");
        assert_eq!(e.negated().negated(), e);
    }

    #[test]
    fn test_variables() {
        let e = Expression::parse("2*(y&z)-1").unwrap();
        let vars: Vec<usize> = e.variables().into_iter().collect();
        assert_eq!(vars, vec![1, 2]);
        assert_eq!(e.var_span(), 3);
        assert_eq!(Expression::constant(7).var_span(), 0);
    }
}
