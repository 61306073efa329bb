//! Low-level bit-range helpers for fields that share bytes.
//!
//! Bits are addressed LSB-first within a value: shift 0 is the lowest bit.

/// Mask covering the low `len` bits.
pub fn mask(len: u32) -> u64 {
    if len >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}

/// Reads `len` bits of `value` starting at bit `shift`.
pub fn extract(value: u64, shift: u32, len: u32) -> u64 {
    if shift >= u64::BITS {
        return 0;
    }
    (value >> shift) & mask(len)
}

/// Returns `value` with the `len` bits at `shift` replaced by the low bits of `bits`.
pub fn insert(value: u64, shift: u32, len: u32, bits: u64) -> u64 {
    if shift >= u64::BITS {
        return value;
    }
    let m = mask(len) << shift;
    (value & !m) | ((bits << shift) & m)
}

/// Whether `bits` fits in `len` bits.
pub fn fits(bits: u64, len: u32) -> bool {
    bits & !mask(len) == 0
}
