//! Deterministic structural fingerprints.
//!
//! A [`Fingerprint`] is a 64-bit XXHash of a syntax tree's structure. The
//! module registry uses it to tell "the same module registered twice" apart
//! from "two different modules claiming one path".
//!
//! # Examples
//!
//! ```
//! use quill_core::FingerprintBuilder;
//!
//! let mut a = FingerprintBuilder::new();
//! a.write_str("let").write_str("x").write_i64(1);
//!
//! let mut b = FingerprintBuilder::new();
//! b.write_str("let").write_str("x").write_i64(1);
//!
//! assert_eq!(a.finish(), b.finish());
//! ```

use std::fmt;
use xxhash_rust::xxh64::Xxh64;

/// Domain-specific mixing constants.
///
/// Each written component is prefixed with a tag so that, for example, the
/// string `"1"` and the integer `1` never produce the same byte stream.
mod tags {
    pub const SEED: u64 = 0x2fac10b63a6cc57c;
    pub const STR: u8 = 0x01;
    pub const INT: u8 = 0x02;
    pub const TAG: u8 = 0x03;
    pub const LEN: u8 = 0x04;
}

/// A deterministic 64-bit structural hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Fingerprint(pub u64);

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:#018x})", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Incremental builder for a [`Fingerprint`].
pub struct FingerprintBuilder {
    hasher: Xxh64,
}

impl FingerprintBuilder {
    /// Create a builder with the fixed seed.
    pub fn new() -> Self {
        Self {
            hasher: Xxh64::new(tags::SEED),
        }
    }

    /// Mix in a string component.
    pub fn write_str(&mut self, value: &str) -> &mut Self {
        self.hasher.update(&[tags::STR]);
        self.hasher.update(&(value.len() as u64).to_le_bytes());
        self.hasher.update(value.as_bytes());
        self
    }

    /// Mix in an integer component.
    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        self.hasher.update(&[tags::INT]);
        self.hasher.update(&value.to_le_bytes());
        self
    }

    /// Mix in a node-kind tag.
    pub fn write_tag(&mut self, tag: u8) -> &mut Self {
        self.hasher.update(&[tags::TAG, tag]);
        self
    }

    /// Mix in the length of a following sequence.
    pub fn write_len(&mut self, len: usize) -> &mut Self {
        self.hasher.update(&[tags::LEN]);
        self.hasher.update(&(len as u64).to_le_bytes());
        self
    }

    /// Produce the fingerprint of everything written so far.
    pub fn finish(&self) -> Fingerprint {
        Fingerprint(self.hasher.digest())
    }
}

impl Default for FingerprintBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_fingerprint() {
        let mut a = FingerprintBuilder::new();
        a.write_tag(1).write_str("entry");
        let mut b = FingerprintBuilder::new();
        b.write_tag(1).write_str("entry");
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn string_and_integer_do_not_collide() {
        let mut a = FingerprintBuilder::new();
        a.write_str("1");
        let mut b = FingerprintBuilder::new();
        b.write_i64(1);
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn order_matters() {
        let mut a = FingerprintBuilder::new();
        a.write_str("a").write_str("b");
        let mut b = FingerprintBuilder::new();
        b.write_str("b").write_str("a");
        assert_ne!(a.finish(), b.finish());
    }
}
