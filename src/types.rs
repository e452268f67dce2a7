//! Type-safe variable counts and the assignment enumeration order.
//!
//! Signature vectors are indexed by boolean assignments. The order is fixed
//! once and for all: for `k` variables, assignment `i` (0-based) gives
//! variable `j` the bit `(i >> (k-1-j)) & 1`, so the first variable is the
//! most significant bit. For k=2 the order over `(x, y)` is `00,01,10,11`.

use std::fmt;

use crate::error::{Error, Result};

/// Variable names in positional order.
pub const VARIABLE_NAMES: [char; 4] = ['x', 'y', 'z', 't'];

/// Number of boolean variables a truth table ranges over.
///
/// # Invariants
///
/// - Always in `1..=4`; anything else is a configuration error.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VarCount(u32);

impl VarCount {
    /// Creates a variable count, rejecting values outside `1..=4`.
    pub fn new(k: u32) -> Result<Self> {
        if (1..=4).contains(&k) {
            Ok(VarCount(k))
        } else {
            Err(Error::InvalidVarCount(k))
        }
    }

    /// Returns the raw count.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Number of boolean assignments, `2^k`.
    pub fn assignments(self) -> usize {
        1 << self.0
    }

    /// Bit of variable `var` (0-based) in assignment `index`.
    pub fn bit(self, index: usize, var: usize) -> u64 {
        debug_assert!(var < self.0 as usize);
        ((index >> (self.0 as usize - 1 - var)) & 1) as u64
    }

    /// The variable names covered by this count.
    pub fn names(self) -> &'static [char] {
        &VARIABLE_NAMES[..self.0 as usize]
    }
}

impl fmt::Display for VarCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Positional index of a variable name, if it is one of `x,y,z,t`.
pub fn variable_index(name: char) -> Option<usize> {
    VARIABLE_NAMES.iter().position(|&v| v == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_count_range() {
        assert!(VarCount::new(0).is_err());
        assert!(VarCount::new(5).is_err());
        for k in 1..=4 {
            assert_eq!(VarCount::new(k).unwrap().get(), k);
        }
    }

    #[test]
    fn test_assignment_order() {
        let k = VarCount::new(2).unwrap();
        assert_eq!(k.assignments(), 4);
        // Assignment 0b01: x=0, y=1.
        assert_eq!(k.bit(1, 0), 0);
        assert_eq!(k.bit(1, 1), 1);
        // Assignment 0b10: x=1, y=0.
        assert_eq!(k.bit(2, 0), 1);
        assert_eq!(k.bit(2, 1), 0);
    }

    #[test]
    fn test_variable_index() {
        assert_eq!(variable_index('x'), Some(0));
        assert_eq!(variable_index('t'), Some(3));
        assert_eq!(variable_index('w'), None);
    }
}
