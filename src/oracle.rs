//! Bounded equivalence checking.
//!
//! The signature engine proves linear claims exactly; everything else
//! (products, nested substitutions) is backstopped by an equivalence oracle
//! checked at a small bit width. A positive verdict is evidence at the
//! tested width only, never a proof for all widths.
//!
//! The built-in [`ExhaustiveOracle`] evaluates both expressions over
//! `width`-bit wrapping arithmetic. While the joint assignment space fits in
//! 16 bits it is enumerated exhaustively; beyond that a fixed-seed random
//! sample is checked, so verdicts stay deterministic. A negative verdict is
//! always a concrete counterexample.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::types::variable_index;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Verdict {
    Equivalent,
    NotEquivalent,
}

/// External decision procedure for expression equivalence at a bounded
/// width. Implementations may be slow; callers should bound the width.
pub trait EquivalenceOracle {
    fn check(&self, a: &str, b: &str, width: u32) -> Result<Verdict>;
}

/// Full MBA expression grammar: `+ - * & ^ | ~`, unary minus, integer
/// literals, variables, parentheses.
enum Ast {
    Const(u64),
    Var(usize),
    Not(Box<Ast>),
    Neg(Box<Ast>),
    Add(Box<Ast>, Box<Ast>),
    Sub(Box<Ast>, Box<Ast>),
    Mul(Box<Ast>, Box<Ast>),
    And(Box<Ast>, Box<Ast>),
    Xor(Box<Ast>, Box<Ast>),
    Or(Box<Ast>, Box<Ast>),
}

impl Ast {
    fn eval(&self, values: &[u64; 4], mask: u64) -> u64 {
        match self {
            Ast::Const(c) => c & mask,
            Ast::Var(j) => values[*j] & mask,
            Ast::Not(a) => !a.eval(values, mask) & mask,
            Ast::Neg(a) => a.eval(values, mask).wrapping_neg() & mask,
            Ast::Add(a, b) => a.eval(values, mask).wrapping_add(b.eval(values, mask)) & mask,
            Ast::Sub(a, b) => a.eval(values, mask).wrapping_sub(b.eval(values, mask)) & mask,
            Ast::Mul(a, b) => a.eval(values, mask).wrapping_mul(b.eval(values, mask)) & mask,
            Ast::And(a, b) => a.eval(values, mask) & b.eval(values, mask),
            Ast::Xor(a, b) => a.eval(values, mask) ^ b.eval(values, mask),
            Ast::Or(a, b) => a.eval(values, mask) | b.eval(values, mask),
        }
    }

    fn collect_vars(&self, present: &mut [bool; 4]) {
        match self {
            Ast::Const(_) => {}
            Ast::Var(j) => present[*j] = true,
            Ast::Not(a) | Ast::Neg(a) => a.collect_vars(present),
            Ast::Add(a, b)
            | Ast::Sub(a, b)
            | Ast::Mul(a, b)
            | Ast::And(a, b)
            | Ast::Xor(a, b)
            | Ast::Or(a, b) => {
                a.collect_vars(present);
                b.collect_vars(present);
            }
        }
    }
}

struct Parser<'a> {
    expr: &'a str,
    bytes: Vec<u8>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(expr: &'a str) -> Self {
        Self {
            expr,
            bytes: expr.bytes().filter(|b| !b.is_ascii_whitespace()).collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: &str) -> Error {
        Error::Parse {
            expr: self.expr.to_string(),
            reason: reason.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    // Precedence, loosest first: `|`, `^`, `&`, `+ -`, `*`, unary `~ -`.
    // Arithmetic binds tighter than the bitwise operators, matching the
    // canonical rendering where every structured factor is parenthesized.
    fn or(&mut self) -> Result<Ast> {
        let mut lhs = self.xor()?;
        while self.eat(b'|') {
            lhs = Ast::Or(Box::new(lhs), Box::new(self.xor()?));
        }
        Ok(lhs)
    }

    fn xor(&mut self) -> Result<Ast> {
        let mut lhs = self.and()?;
        while self.eat(b'^') {
            lhs = Ast::Xor(Box::new(lhs), Box::new(self.and()?));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Ast> {
        let mut lhs = self.sum()?;
        while self.eat(b'&') {
            lhs = Ast::And(Box::new(lhs), Box::new(self.sum()?));
        }
        Ok(lhs)
    }

    fn sum(&mut self) -> Result<Ast> {
        let mut lhs = self.product()?;
        loop {
            if self.eat(b'+') {
                lhs = Ast::Add(Box::new(lhs), Box::new(self.product()?));
            } else if self.eat(b'-') {
                lhs = Ast::Sub(Box::new(lhs), Box::new(self.product()?));
            } else {
                return Ok(lhs);
            }
        }
    }

    fn product(&mut self) -> Result<Ast> {
        let mut lhs = self.unary()?;
        while self.eat(b'*') {
            lhs = Ast::Mul(Box::new(lhs), Box::new(self.unary()?));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Ast> {
        if self.eat(b'~') {
            Ok(Ast::Not(Box::new(self.unary()?)))
        } else if self.eat(b'-') {
            Ok(Ast::Neg(Box::new(self.unary()?)))
        } else {
            self.atom()
        }
    }

    fn atom(&mut self) -> Result<Ast> {
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let inner = self.or()?;
                if !self.eat(b')') {
                    return Err(self.error("unbalanced parentheses"));
                }
                Ok(inner)
            }
            Some(b) if b.is_ascii_digit() => {
                let start = self.pos;
                while matches!(self.peek(), Some(d) if d.is_ascii_digit()) {
                    self.pos += 1;
                }
                let digits = std::str::from_utf8(&self.bytes[start..self.pos])
                    .map_err(|_| self.error("invalid literal"))?;
                let value: u64 = digits
                    .parse()
                    .map_err(|_| self.error("literal out of range"))?;
                Ok(Ast::Const(value))
            }
            Some(b) => {
                let j = variable_index(b as char)
                    .ok_or_else(|| self.error("unexpected character"))?;
                self.pos += 1;
                Ok(Ast::Var(j))
            }
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn parse(mut self) -> Result<Ast> {
        let ast = self.or()?;
        if self.pos != self.bytes.len() {
            return Err(self.error("trailing input"));
        }
        Ok(ast)
    }
}

/// Evaluates an MBA expression string over `width`-bit wrapping arithmetic.
/// `values` binds the variables `x,y,z,t` positionally; missing entries are
/// zero.
pub fn evaluate(expr: &str, values: &[u64], width: u32) -> Result<u64> {
    let ast = Parser::new(expr).parse()?;
    let mask = width_mask(expr, width)?;
    let mut bound = [0u64; 4];
    for (slot, &v) in bound.iter_mut().zip(values) {
        *slot = v & mask;
    }
    Ok(ast.eval(&bound, mask))
}

fn width_mask(expr: &str, width: u32) -> Result<u64> {
    if !(1..=32).contains(&width) {
        return Err(Error::Parse {
            expr: expr.to_string(),
            reason: format!("oracle width must be in 1..=32, got {}", width),
        });
    }
    Ok((1u64 << width) - 1)
}

/// Brute-force bit-vector oracle.
#[derive(Debug, Clone)]
pub struct ExhaustiveOracle {
    /// Joint assignment-space bound (in bits) for exhaustive enumeration.
    exhaustive_bits: u32,
    /// Sample count once the space exceeds the exhaustive bound.
    samples: usize,
}

impl ExhaustiveOracle {
    pub fn new() -> Self {
        Self {
            exhaustive_bits: 16,
            samples: 4096,
        }
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }
}

impl Default for ExhaustiveOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl EquivalenceOracle for ExhaustiveOracle {
    fn check(&self, a: &str, b: &str, width: u32) -> Result<Verdict> {
        let mask = width_mask(a, width)?;
        let left = Parser::new(a).parse()?;
        let right = Parser::new(b).parse()?;

        let mut present = [false; 4];
        left.collect_vars(&mut present);
        right.collect_vars(&mut present);
        let vars: Vec<usize> = (0..4).filter(|&j| present[j]).collect();

        let total_bits = width as usize * vars.len();
        let mut values = [0u64; 4];
        if total_bits as u32 <= self.exhaustive_bits {
            for n in 0..1u64 << total_bits {
                for (slot, &j) in vars.iter().enumerate() {
                    values[j] = (n >> (width as usize * slot)) & mask;
                }
                if left.eval(&values, mask) != right.eval(&values, mask) {
                    return Ok(Verdict::NotEquivalent);
                }
            }
        } else {
            // Deterministic sample so repeated checks agree.
            let mut rng = StdRng::seed_from_u64(0x6d62_615f);
            for _ in 0..self.samples {
                for &j in &vars {
                    values[j] = rng.gen::<u64>() & mask;
                }
                if left.eval(&values, mask) != right.eval(&values, mask) {
                    return Ok(Verdict::NotEquivalent);
                }
            }
        }
        Ok(Verdict::Equivalent)
    }
}
