//! Order-preserving hexadecimal encoders for numeric literals.
//!
//! Encoded strings compare lexicographically in the same order as the numbers
//! they encode, which gives literals a canonical, sortable text form.

const SIGN_BIT_32: u32 = 1 << 31;
const SIGN_BIT_64: u64 = 1 << 63;

/// Encodes an i32 as 8 lowercase hex digits.
pub fn encode_i32(v: i32) -> String {
    format!("{:08x}", (v as u32) ^ SIGN_BIT_32)
}

/// Encodes an i64 as 16 lowercase hex digits.
pub fn encode_i64(v: i64) -> String {
    format!("{:016x}", (v as u64) ^ SIGN_BIT_64)
}

/// Encodes an f32 as 8 lowercase hex digits (NaN not allowed).
pub fn encode_f32(v: f32) -> String {
    debug_assert!(!v.is_nan(), "NaN cannot be ordered");
    let bits = v.to_bits();
    let ordered = if bits & SIGN_BIT_32 != 0 {
        !bits
    } else {
        bits ^ SIGN_BIT_32
    };
    format!("{ordered:08x}")
}

/// Encodes an f64 as 16 lowercase hex digits (NaN not allowed).
pub fn encode_f64(v: f64) -> String {
    debug_assert!(!v.is_nan(), "NaN cannot be ordered");
    let bits = v.to_bits();
    let ordered = if bits & SIGN_BIT_64 != 0 {
        !bits
    } else {
        bits ^ SIGN_BIT_64
    };
    format!("{ordered:016x}")
}

/// Decodes the output of [`encode_i64`].
pub fn decode_i64(encoded: &str) -> Option<i64> {
    if encoded.len() != 16 {
        return None;
    }
    u64::from_str_radix(encoded, 16)
        .ok()
        .map(|raw| (raw ^ SIGN_BIT_64) as i64)
}

/// Decodes the output of [`encode_f64`].
pub fn decode_f64(encoded: &str) -> Option<f64> {
    if encoded.len() != 16 {
        return None;
    }
    let ordered = u64::from_str_radix(encoded, 16).ok()?;
    let bits = if ordered & SIGN_BIT_64 != 0 {
        ordered ^ SIGN_BIT_64
    } else {
        !ordered
    };
    Some(f64::from_bits(bits))
}
