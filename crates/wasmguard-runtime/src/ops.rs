//! Wasm numeric operations whose semantics differ from a plain Rust operator.
//!
//! ## Float-to-integer truncation
//!
//! Rust's `as` cast for float-to-integer is **saturating** (e.g.
//! `f32::INFINITY as i32 == i32::MAX`, `NaN as i32 == 0`). That is exactly
//! Wasm's `trunc_sat` family. The trapping `trunc` family validates the input
//! first: NaN traps `InvalidConversion`, anything outside the target range
//! traps `IntegerOverflow`. The range constants are the IEEE rounding of the
//! true limits in the source float type, so every accepted input truncates
//! to a representable value.
//!
//! ## Integer division / remainder
//!
//! A zero divisor traps `DivisionByZero`. `MIN / -1` traps `IntegerOverflow`,
//! while `MIN rem -1` is 0: the remainder after a would-be-overflowing
//! division exists and is zero.
//!
//! ## Floats
//!
//! `min`/`max` return the canonical quiet NaN when either operand is NaN and
//! order the zeros by sign. The rounding operations and `sqrt` return their
//! NaN input with the quiet bit set instead of whatever payload the host libm
//! would produce. `abs`, `neg` and `copysign` are pure sign-bit operations.
//!
//! All trapping functions are `#[inline(never)]` (outline pattern). There
//! are no generics here, so the public function IS the inner function.
//!
//! `no_std` compatible: no alloc, no std, no panics.

use crate::{trap, WasmResult, WasmTrap};

/// Canonical f32 NaN: quiet bit set, zero payload, positive sign.
pub const F32_CANONICAL_NAN: u32 = 0x7fc0_0000;
/// Canonical f64 NaN.
pub const F64_CANONICAL_NAN: u64 = 0x7ff8_0000_0000_0000;

const F32_QUIET_BIT: u32 = 0x0040_0000;
const F64_QUIET_BIT: u64 = 0x0008_0000_0000_0000;
const F32_SIGN_BIT: u32 = 0x8000_0000;
const F64_SIGN_BIT: u64 = 0x8000_0000_0000_0000;

// ── Float → integer trapping truncation ──────────────────────────────────────

macro_rules! trapping_trunc {
    ($($(#[$doc:meta])* $name:ident: $from:ty => $cast:ty as $to:ty, $lo:literal $lo_op:tt, $hi:literal;)*) => {
        $(
            $(#[$doc])*
            #[inline(never)]
            pub fn $name(v: $from) -> WasmResult<$to> {
                if v.is_nan() {
                    return trap(WasmTrap::InvalidConversion);
                }
                if !(v $lo_op $lo && v < $hi) {
                    return trap(WasmTrap::IntegerOverflow);
                }
                Ok(v as $cast as $to)
            }
        )*
    };
}

trapping_trunc! {
    /// Wasm `i32.trunc_f32_s`: truncate f32 toward zero to i32.
    i32_trunc_f32_s: f32 => i32 as i32, -2147483648.0 >=, 2147483648.0;
    /// Wasm `i32.trunc_f32_u`: truncate f32 toward zero to u32 (returned as i32).
    ///
    /// The lower bound is `> -1.0` (not `>= 0.0`): `-0.5` truncates to 0,
    /// which is a valid unsigned value.
    i32_trunc_f32_u: f32 => u32 as i32, -1.0 >, 4294967296.0;
    /// Wasm `i32.trunc_f64_s`: truncate f64 toward zero to i32.
    ///
    /// f64 represents `-2147483648.5`, which truncates to `i32::MIN`, so the
    /// lower bound is exclusive at `-2147483649.0`.
    i32_trunc_f64_s: f64 => i32 as i32, -2147483649.0 >, 2147483648.0;
    /// Wasm `i32.trunc_f64_u`: truncate f64 toward zero to u32 (returned as i32).
    i32_trunc_f64_u: f64 => u32 as i32, -1.0 >, 4294967296.0;
    /// Wasm `i64.trunc_f32_s`: truncate f32 toward zero to i64.
    i64_trunc_f32_s: f32 => i64 as i64, -9223372036854775808.0 >=, 9223372036854775808.0;
    /// Wasm `i64.trunc_f32_u`: truncate f32 toward zero to u64 (returned as i64).
    i64_trunc_f32_u: f32 => u64 as i64, -1.0 >, 18446744073709551616.0;
    /// Wasm `i64.trunc_f64_s`: truncate f64 toward zero to i64.
    i64_trunc_f64_s: f64 => i64 as i64, -9223372036854775808.0 >=, 9223372036854775808.0;
    /// Wasm `i64.trunc_f64_u`: truncate f64 toward zero to u64 (returned as i64).
    i64_trunc_f64_u: f64 => u64 as i64, -1.0 >, 18446744073709551616.0;
}

// ── Float → integer saturating truncation ────────────────────────────────────

macro_rules! saturating_trunc {
    ($($name:ident: $from:ty => $cast:ty as $to:ty;)*) => {
        $(
            #[doc = concat!("Wasm `", stringify!($name), "`: NaN gives 0, out-of-range input clamps.")]
            #[inline(always)]
            pub fn $name(v: $from) -> $to {
                v as $cast as $to
            }
        )*
    };
}

saturating_trunc! {
    i32_trunc_sat_f32_s: f32 => i32 as i32;
    i32_trunc_sat_f32_u: f32 => u32 as i32;
    i32_trunc_sat_f64_s: f64 => i32 as i32;
    i32_trunc_sat_f64_u: f64 => u32 as i32;
    i64_trunc_sat_f32_s: f32 => i64 as i64;
    i64_trunc_sat_f32_u: f32 => u64 as i64;
    i64_trunc_sat_f64_s: f64 => i64 as i64;
    i64_trunc_sat_f64_u: f64 => u64 as i64;
}

// ── i32 division / remainder ──────────────────────────────────────────────────

/// Wasm `i32.div_s`: signed integer division, trapping on divide-by-zero or
/// signed overflow (`i32::MIN / -1`).
#[inline(never)]
pub fn i32_div_s(lhs: i32, rhs: i32) -> WasmResult<i32> {
    if rhs == 0 {
        return trap(WasmTrap::DivisionByZero);
    }
    match lhs.checked_div(rhs) {
        Some(v) => Ok(v),
        None => trap(WasmTrap::IntegerOverflow),
    }
}

/// Wasm `i32.div_u`: unsigned integer division, trapping on divide-by-zero.
#[inline(never)]
pub fn i32_div_u(lhs: i32, rhs: i32) -> WasmResult<i32> {
    match (lhs as u32).checked_div(rhs as u32) {
        Some(v) => Ok(v as i32),
        None => trap(WasmTrap::DivisionByZero),
    }
}

/// Wasm `i32.rem_s`: signed remainder, trapping on divide-by-zero.
/// `i32::MIN rem_s -1` is 0.
#[inline(never)]
pub fn i32_rem_s(lhs: i32, rhs: i32) -> WasmResult<i32> {
    if rhs == 0 {
        return trap(WasmTrap::DivisionByZero);
    }
    Ok(lhs.wrapping_rem(rhs))
}

/// Wasm `i32.rem_u`: unsigned remainder, trapping on divide-by-zero.
#[inline(never)]
pub fn i32_rem_u(lhs: i32, rhs: i32) -> WasmResult<i32> {
    match (lhs as u32).checked_rem(rhs as u32) {
        Some(v) => Ok(v as i32),
        None => trap(WasmTrap::DivisionByZero),
    }
}

// ── i64 division / remainder ──────────────────────────────────────────────────

/// Wasm `i64.div_s`: signed integer division, trapping on divide-by-zero or
/// signed overflow (`i64::MIN / -1`).
#[inline(never)]
pub fn i64_div_s(lhs: i64, rhs: i64) -> WasmResult<i64> {
    if rhs == 0 {
        return trap(WasmTrap::DivisionByZero);
    }
    match lhs.checked_div(rhs) {
        Some(v) => Ok(v),
        None => trap(WasmTrap::IntegerOverflow),
    }
}

/// Wasm `i64.div_u`: unsigned integer division, trapping on divide-by-zero.
#[inline(never)]
pub fn i64_div_u(lhs: i64, rhs: i64) -> WasmResult<i64> {
    match (lhs as u64).checked_div(rhs as u64) {
        Some(v) => Ok(v as i64),
        None => trap(WasmTrap::DivisionByZero),
    }
}

/// Wasm `i64.rem_s`: signed remainder, trapping on divide-by-zero.
/// `i64::MIN rem_s -1` is 0.
#[inline(never)]
pub fn i64_rem_s(lhs: i64, rhs: i64) -> WasmResult<i64> {
    if rhs == 0 {
        return trap(WasmTrap::DivisionByZero);
    }
    Ok(lhs.wrapping_rem(rhs))
}

/// Wasm `i64.rem_u`: unsigned remainder, trapping on divide-by-zero.
#[inline(never)]
pub fn i64_rem_u(lhs: i64, rhs: i64) -> WasmResult<i64> {
    match (lhs as u64).checked_rem(rhs as u64) {
        Some(v) => Ok(v as i64),
        None => trap(WasmTrap::DivisionByZero),
    }
}

// ── Rotates ───────────────────────────────────────────────────────────────────

/// Wasm `i32.rotl`. The shift count is taken modulo 32.
#[inline(always)]
pub fn i32_rotl(x: i32, n: i32) -> i32 {
    (x as u32).rotate_left(n as u32 & 31) as i32
}

/// Wasm `i32.rotr`. The shift count is taken modulo 32.
#[inline(always)]
pub fn i32_rotr(x: i32, n: i32) -> i32 {
    (x as u32).rotate_right(n as u32 & 31) as i32
}

/// Wasm `i64.rotl`. The shift count is taken modulo 64.
#[inline(always)]
pub fn i64_rotl(x: i64, n: i64) -> i64 {
    (x as u64).rotate_left(n as u32 & 63) as i64
}

/// Wasm `i64.rotr`. The shift count is taken modulo 64.
#[inline(always)]
pub fn i64_rotr(x: i64, n: i64) -> i64 {
    (x as u64).rotate_right(n as u32 & 63) as i64
}

// ── Bit counting ──────────────────────────────────────────────────────────────

/// Wasm `i32.clz`. Zero gives 32.
#[inline(always)]
pub fn i32_clz(x: i32) -> i32 {
    #[cfg(not(feature = "portable-bitops"))]
    let n = (x as u32).leading_zeros();
    #[cfg(feature = "portable-bitops")]
    let n = portable::clz32(x as u32);
    n as i32
}

/// Wasm `i32.ctz`. Zero gives 32.
#[inline(always)]
pub fn i32_ctz(x: i32) -> i32 {
    #[cfg(not(feature = "portable-bitops"))]
    let n = (x as u32).trailing_zeros();
    #[cfg(feature = "portable-bitops")]
    let n = portable::ctz32(x as u32);
    n as i32
}

/// Wasm `i32.popcnt`.
#[inline(always)]
pub fn i32_popcnt(x: i32) -> i32 {
    #[cfg(not(feature = "portable-bitops"))]
    let n = (x as u32).count_ones();
    #[cfg(feature = "portable-bitops")]
    let n = portable::popcnt32(x as u32);
    n as i32
}

/// Wasm `i64.clz`. Zero gives 64.
#[inline(always)]
pub fn i64_clz(x: i64) -> i64 {
    #[cfg(not(feature = "portable-bitops"))]
    let n = (x as u64).leading_zeros();
    #[cfg(feature = "portable-bitops")]
    let n = portable::clz64(x as u64);
    n as i64
}

/// Wasm `i64.ctz`. Zero gives 64.
#[inline(always)]
pub fn i64_ctz(x: i64) -> i64 {
    #[cfg(not(feature = "portable-bitops"))]
    let n = (x as u64).trailing_zeros();
    #[cfg(feature = "portable-bitops")]
    let n = portable::ctz64(x as u64);
    n as i64
}

/// Wasm `i64.popcnt`.
#[inline(always)]
pub fn i64_popcnt(x: i64) -> i64 {
    #[cfg(not(feature = "portable-bitops"))]
    let n = (x as u64).count_ones();
    #[cfg(feature = "portable-bitops")]
    let n = portable::popcnt64(x as u64);
    n as i64
}

/// Bit counting with shifts, masks and multiplies only, for targets whose
/// count instructions are missing or slow.
pub mod portable {
    /// SWAR population count.
    pub const fn popcnt32(mut x: u32) -> u32 {
        x -= (x >> 1) & 0x5555_5555;
        x = (x & 0x3333_3333) + ((x >> 2) & 0x3333_3333);
        x = (x + (x >> 4)) & 0x0f0f_0f0f;
        x.wrapping_mul(0x0101_0101) >> 24
    }

    pub const fn popcnt64(mut x: u64) -> u64 {
        x -= (x >> 1) & 0x5555_5555_5555_5555;
        x = (x & 0x3333_3333_3333_3333) + ((x >> 2) & 0x3333_3333_3333_3333);
        x = (x + (x >> 4)) & 0x0f0f_0f0f_0f0f_0f0f;
        x.wrapping_mul(0x0101_0101_0101_0101) >> 56
    }

    /// Count trailing zeros: the bits below the lowest set bit, counted.
    pub const fn ctz32(x: u32) -> u32 {
        if x == 0 {
            return 32;
        }
        popcnt32((x & x.wrapping_neg()) - 1)
    }

    pub const fn ctz64(x: u64) -> u64 {
        if x == 0 {
            return 64;
        }
        popcnt64((x & x.wrapping_neg()) - 1)
    }

    /// Count leading zeros as the trailing zeros of the bit-reversed word.
    pub const fn clz32(x: u32) -> u32 {
        ctz32(reverse32(x))
    }

    pub const fn clz64(x: u64) -> u64 {
        ctz64(reverse64(x))
    }

    pub const fn reverse32(mut x: u32) -> u32 {
        x = ((x >> 1) & 0x5555_5555) | ((x & 0x5555_5555) << 1);
        x = ((x >> 2) & 0x3333_3333) | ((x & 0x3333_3333) << 2);
        x = ((x >> 4) & 0x0f0f_0f0f) | ((x & 0x0f0f_0f0f) << 4);
        x = ((x >> 8) & 0x00ff_00ff) | ((x & 0x00ff_00ff) << 8);
        (x >> 16) | (x << 16)
    }

    pub const fn reverse64(mut x: u64) -> u64 {
        x = ((x >> 1) & 0x5555_5555_5555_5555) | ((x & 0x5555_5555_5555_5555) << 1);
        x = ((x >> 2) & 0x3333_3333_3333_3333) | ((x & 0x3333_3333_3333_3333) << 2);
        x = ((x >> 4) & 0x0f0f_0f0f_0f0f_0f0f) | ((x & 0x0f0f_0f0f_0f0f_0f0f) << 4);
        x = ((x >> 8) & 0x00ff_00ff_00ff_00ff) | ((x & 0x00ff_00ff_00ff_00ff) << 8);
        x = ((x >> 16) & 0x0000_ffff_0000_ffff) | ((x & 0x0000_ffff_0000_ffff) << 16);
        (x >> 32) | (x << 32)
    }
}

// ── Float min / max ───────────────────────────────────────────────────────────

/// Wasm `f32.min`.
#[inline(always)]
pub fn f32_min(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        return f32::from_bits(F32_CANONICAL_NAN);
    }
    if a == 0.0 && b == 0.0 {
        return if a.is_sign_negative() { a } else { b };
    }
    if a < b {
        a
    } else {
        b
    }
}

/// Wasm `f32.max`.
#[inline(always)]
pub fn f32_max(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        return f32::from_bits(F32_CANONICAL_NAN);
    }
    if a == 0.0 && b == 0.0 {
        return if a.is_sign_negative() { b } else { a };
    }
    if a > b {
        a
    } else {
        b
    }
}

/// Wasm `f64.min`.
#[inline(always)]
pub fn f64_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::from_bits(F64_CANONICAL_NAN);
    }
    if a == 0.0 && b == 0.0 {
        return if a.is_sign_negative() { a } else { b };
    }
    if a < b {
        a
    } else {
        b
    }
}

/// Wasm `f64.max`.
#[inline(always)]
pub fn f64_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::from_bits(F64_CANONICAL_NAN);
    }
    if a == 0.0 && b == 0.0 {
        return if a.is_sign_negative() { b } else { a };
    }
    if a > b {
        a
    } else {
        b
    }
}

// ── Sign-bit operations ───────────────────────────────────────────────────────
//
// These touch only the sign bit: a NaN keeps its payload and quiet bit.

/// Wasm `f32.abs`: clear the sign bit.
#[inline(always)]
pub fn f32_abs(x: f32) -> f32 {
    f32::from_bits(x.to_bits() & !F32_SIGN_BIT)
}

/// Wasm `f64.abs`: clear the sign bit.
#[inline(always)]
pub fn f64_abs(x: f64) -> f64 {
    f64::from_bits(x.to_bits() & !F64_SIGN_BIT)
}

/// Wasm `f32.neg`: flip the sign bit.
#[inline(always)]
pub fn f32_neg(x: f32) -> f32 {
    f32::from_bits(x.to_bits() ^ F32_SIGN_BIT)
}

/// Wasm `f64.neg`: flip the sign bit.
#[inline(always)]
pub fn f64_neg(x: f64) -> f64 {
    f64::from_bits(x.to_bits() ^ F64_SIGN_BIT)
}

/// Wasm `f32.copysign`: the magnitude of `x` with the sign of `sign`.
#[inline(always)]
pub fn f32_copysign(x: f32, sign: f32) -> f32 {
    f32::from_bits((x.to_bits() & !F32_SIGN_BIT) | (sign.to_bits() & F32_SIGN_BIT))
}

/// Wasm `f64.copysign`.
#[inline(always)]
pub fn f64_copysign(x: f64, sign: f64) -> f64 {
    f64::from_bits((x.to_bits() & !F64_SIGN_BIT) | (sign.to_bits() & F64_SIGN_BIT))
}

// ── Rounding and square root ──────────────────────────────────────────────────

/// Set the quiet bit of a NaN, keeping sign and payload.
#[inline(always)]
pub fn f32_quiet_nan(x: f32) -> f32 {
    f32::from_bits(x.to_bits() | F32_QUIET_BIT)
}

/// Set the quiet bit of a NaN, keeping sign and payload.
#[inline(always)]
pub fn f64_quiet_nan(x: f64) -> f64 {
    f64::from_bits(x.to_bits() | F64_QUIET_BIT)
}

macro_rules! nan_quieting {
    ($($name:ident: $ty:ty => $quiet:ident, $libm:path;)*) => {
        $(
            #[doc = concat!("Wasm `", stringify!($name), "`. A NaN input comes back quieted.")]
            #[inline(always)]
            pub fn $name(x: $ty) -> $ty {
                if x.is_nan() {
                    $quiet(x)
                } else {
                    $libm(x)
                }
            }
        )*
    };
}

nan_quieting! {
    f32_floor: f32 => f32_quiet_nan, libm::floorf;
    f32_ceil: f32 => f32_quiet_nan, libm::ceilf;
    f32_trunc: f32 => f32_quiet_nan, libm::truncf;
    f32_nearest: f32 => f32_quiet_nan, libm::rintf;
    f32_sqrt: f32 => f32_quiet_nan, libm::sqrtf;
    f64_floor: f64 => f64_quiet_nan, libm::floor;
    f64_ceil: f64 => f64_quiet_nan, libm::ceil;
    f64_trunc: f64 => f64_quiet_nan, libm::trunc;
    f64_nearest: f64 => f64_quiet_nan, libm::rint;
    f64_sqrt: f64 => f64_quiet_nan, libm::sqrt;
}

// ── Reinterpretation ──────────────────────────────────────────────────────────

/// Wasm `i32.reinterpret_f32`: the raw bits, NaN payloads included.
#[inline(always)]
pub fn i32_reinterpret_f32(x: f32) -> i32 {
    x.to_bits() as i32
}

/// Wasm `f32.reinterpret_i32`.
#[inline(always)]
pub fn f32_reinterpret_i32(x: i32) -> f32 {
    f32::from_bits(x as u32)
}

/// Wasm `i64.reinterpret_f64`.
#[inline(always)]
pub fn i64_reinterpret_f64(x: f64) -> i64 {
    x.to_bits() as i64
}

/// Wasm `f64.reinterpret_i64`.
#[inline(always)]
pub fn f64_reinterpret_i64(x: i64) -> f64 {
    f64::from_bits(x as u64)
}

// ── Tests ─────────────────────────────────────────────────────────────────────


#[cfg(kani)]
mod proofs {
    use super::*;

    /// Proof: the portable bit counts agree with the intrinsics on every input.
    #[kani::proof]
    fn portable_bitops_match_intrinsics() {
        let x: u32 = kani::any();
        kani::assert(portable::popcnt32(x) == x.count_ones(), "popcnt32");
        kani::assert(portable::ctz32(x) == x.trailing_zeros(), "ctz32");
        kani::assert(portable::clz32(x) == x.leading_zeros(), "clz32");
    }
}
