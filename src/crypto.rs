//! Constant-time comparison helpers
//!
//! Secret comparisons must not leak where the inputs diverge. An early-exit
//! `==` lets an attacker measure response times and recover a secret byte by
//! byte; these helpers take the same time regardless of input values.

use subtle::ConstantTimeEq;

/// Compares two byte slices in constant time.
///
/// Inputs of different lengths compare unequal, but the comparison itself
/// does not short-circuit on the first mismatching byte.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Compares two strings in constant time.
///
/// Convenience wrapper around [`constant_time_eq`] for credential checks.
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}
