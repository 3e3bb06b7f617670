//! Numeric semantics against values from the WebAssembly reference test suite
//! (`i32.wast`, `i64.wast`, `conversions.wast`, `float_misc.wast`).

use wasmguard_runtime::ops::*;
use wasmguard_runtime::WasmTrap;

// ── Integer division ──

#[test]
fn test_i32_div_rem() {
    assert_eq!(i32_div_s(-7, 2), Ok(-3));
    assert_eq!(i32_rem_s(-7, 2), Ok(-1));
    assert_eq!(i32_div_u(-7, 2), Ok(0x7fff_fffc));
    assert_eq!(i32_rem_u(-7, 2), Ok(1));
    assert_eq!(i32_div_s(i32::MIN, -1), Err(WasmTrap::IntegerOverflow));
    assert_eq!(i32_rem_s(i32::MIN, -1), Ok(0));
    assert_eq!(i32_div_u(1, 0), Err(WasmTrap::DivisionByZero));
    assert_eq!(i32_rem_s(1, 0), Err(WasmTrap::DivisionByZero));
}

#[test]
fn test_i64_div_rem() {
    assert_eq!(i64_div_s(i64::MIN, -1), Err(WasmTrap::IntegerOverflow));
    assert_eq!(i64_rem_s(i64::MIN, -1), Ok(0));
    assert_eq!(i64_div_u(-1, 2), Ok(i64::MAX));
    assert_eq!(i64_rem_u(0, 0), Err(WasmTrap::DivisionByZero));
}

// ── Bits ──

#[test]
fn test_bit_counts() {
    assert_eq!(i32_clz(0), 32);
    assert_eq!(i32_ctz(0), 32);
    assert_eq!(i32_popcnt(-1), 32);
    assert_eq!(i64_clz(1), 63);
    assert_eq!(i64_ctz(i64::MIN), 63);
    assert_eq!(i64_popcnt(0x00ff_00ff_00ff_00ff), 32);
}

#[test]
fn test_rotates_mask_count() {
    assert_eq!(i32_rotl(0xfe00_dc00u32 as i32, 4), 0xe00d_c00fu32 as i32);
    assert_eq!(i32_rotr(0xb0c1_d2e3u32 as i32, 0x0005), 0x1d86_0e97);
    assert_eq!(i32_rotl(1, 33), 2);
    assert_eq!(i64_rotr(1, 65), i64::MIN);
}

// ── Float to int ──

#[test]
fn test_trapping_truncation_edges() {
    assert_eq!(i32_trunc_f32_s(-2147483648.0), Ok(i32::MIN));
    assert_eq!(i32_trunc_f32_s(2147483648.0), Err(WasmTrap::IntegerOverflow));
    assert_eq!(i32_trunc_f64_s(-2147483648.9), Ok(i32::MIN));
    assert_eq!(i32_trunc_f64_s(-2147483649.0), Err(WasmTrap::IntegerOverflow));
    assert_eq!(i32_trunc_f64_u(-0.9), Ok(0));
    assert_eq!(i32_trunc_f64_u(-1.0), Err(WasmTrap::IntegerOverflow));
    assert_eq!(i32_trunc_f64_u(4294967295.9), Ok(-1));
    assert_eq!(i64_trunc_f64_u(1.8446744073709552e19), Err(WasmTrap::IntegerOverflow));
    assert_eq!(i64_trunc_f32_s(f32::NAN), Err(WasmTrap::InvalidConversion));
    assert_eq!(i64_trunc_f64_s(f64::INFINITY), Err(WasmTrap::IntegerOverflow));
}

#[test]
fn test_saturating_truncation() {
    assert_eq!(i32_trunc_sat_f32_s(f32::NAN), 0);
    assert_eq!(i32_trunc_sat_f32_s(f32::INFINITY), i32::MAX);
    assert_eq!(i32_trunc_sat_f64_s(2147483648.0), i32::MAX);
    assert_eq!(i32_trunc_sat_f64_s(-2147483649.0), i32::MIN);
    assert_eq!(i32_trunc_sat_f64_s(-2147483648.9), i32::MIN);
    assert_eq!(i32_trunc_sat_f64_u(-1.0), 0);
    assert_eq!(i32_trunc_sat_f64_u(1e10), -1);
    assert_eq!(i64_trunc_sat_f64_s(f64::NEG_INFINITY), i64::MIN);
    assert_eq!(i64_trunc_sat_f32_u(f32::NAN), 0);
}

// ── Floats ──

#[test]
fn test_min_max_zero_signs() {
    assert_eq!(f32_min(0.0, -0.0).to_bits(), (-0.0f32).to_bits());
    assert_eq!(f32_max(-0.0, 0.0).to_bits(), 0.0f32.to_bits());
    assert_eq!(f64_min(-0.0, 0.0).to_bits(), (-0.0f64).to_bits());
    assert_eq!(f64_max(0.0, -0.0).to_bits(), 0.0f64.to_bits());
}

#[test]
fn test_min_max_nan_is_canonical() {
    assert_eq!(f32_min(f32::NAN, 1.0).to_bits(), F32_CANONICAL_NAN);
    assert_eq!(f64_max(2.0, f64::NAN).to_bits(), F64_CANONICAL_NAN);
}

#[test]
fn test_sign_ops_never_touch_payload() {
    let snan = f32::from_bits(0x7fa0_0001);
    assert_eq!(f32_neg(snan).to_bits(), 0xffa0_0001);
    assert_eq!(f32_abs(f32::from_bits(0xffa0_0001)).to_bits(), 0x7fa0_0001);
    assert_eq!(f64_copysign(1.5, -0.0), -1.5);
}

#[test]
fn test_rounding() {
    assert_eq!(f64_nearest(0.5), 0.0);
    assert_eq!(f64_nearest(1.5), 2.0);
    assert_eq!(f64_nearest(-2.5), -2.0);
    assert_eq!(f32_nearest(4.5), 4.0);
    assert_eq!(f32_trunc(-1.7), -1.0);
    assert_eq!(f64_floor(-0.5), -1.0);
    assert_eq!(f64_ceil(-0.5).to_bits(), (-0.0f64).to_bits());
    assert_eq!(f64_sqrt(4.0), 2.0);
}

#[test]
fn test_rounding_quiets_nan() {
    let snan = f64::from_bits(0x7ff0_0000_0000_0001);
    let out = f64_floor(snan).to_bits();
    assert_eq!(out & 0x0008_0000_0000_0000, 0x0008_0000_0000_0000);
    assert!(f64::from_bits(out).is_nan());
}

#[test]
fn test_reinterpret() {
    assert_eq!(i32_reinterpret_f32(-0.0), i32::MIN);
    assert_eq!(f64_reinterpret_i64(0x3ff0_0000_0000_0000), 1.0);
}
