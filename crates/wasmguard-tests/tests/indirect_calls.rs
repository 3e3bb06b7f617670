//! Runtime tests for indirect function calls (call_indirect) and the table
//! operations around them.
//!
//! These tests verify that:
//! 1. call_indirect dispatches to the correct function based on table index
//! 2. Type checking works (wrong type traps with IndirectCallTypeMismatch)
//! 3. Out-of-bounds and null slots trap with their own kinds
//! 4. table.copy / table.init / table.fill / table.grow keep dispatch correct

use wasmguard_runtime::WasmTrap;
use wasmguard_tests::indirect_call;

// ── dispatch_binop: (i32, i32) -> i32 via $binop type ──

#[test]
fn test_binop_dispatch_all_ops() {
    let mut module = indirect_call::new().unwrap();
    for (a, b) in [(1, 2), (100, 50), (-5, 3), (0, 0), (i32::MAX, 1)] {
        assert_eq!(
            module.dispatch_binop(a, b, 0).unwrap(),
            a.wrapping_add(b),
            "add({a}, {b})"
        );
        assert_eq!(
            module.dispatch_binop(a, b, 1).unwrap(),
            a.wrapping_sub(b),
            "sub({a}, {b})"
        );
        assert_eq!(
            module.dispatch_binop(a, b, 2).unwrap(),
            a.wrapping_mul(b),
            "mul({a}, {b})"
        );
    }
}

#[test]
fn test_binop_direct_vs_indirect() {
    let mut module = indirect_call::new().unwrap();
    assert_eq!(
        module.add(7, 3).unwrap(),
        module.dispatch_binop(7, 3, 0).unwrap()
    );
    assert_eq!(
        module.mul(7, 3).unwrap(),
        module.dispatch_binop(7, 3, 2).unwrap()
    );
}

// ── dispatch_unop: (i32) -> i32 via $unop type ──

#[test]
fn test_unop_dispatch_negate() {
    let mut module = indirect_call::new().unwrap();
    // table[3] = negate, type $unop
    assert_eq!(module.dispatch_unop(42, 3).unwrap(), -42);
    assert_eq!(module.dispatch_unop(i32::MIN, 3).unwrap(), i32::MIN);
}

// ── Traps ──

#[test]
fn test_type_mismatch_binop_on_unop_slot() {
    let mut module = indirect_call::new().unwrap();
    assert_eq!(
        module.dispatch_binop(1, 2, 3),
        Err(WasmTrap::IndirectCallTypeMismatch)
    );
}

#[test]
fn test_type_mismatch_unop_on_binop_slot() {
    let mut module = indirect_call::new().unwrap();
    assert_eq!(
        module.dispatch_unop(1, 0),
        Err(WasmTrap::IndirectCallTypeMismatch)
    );
}

#[test]
fn test_index_out_of_bounds() {
    let mut module = indirect_call::new().unwrap();
    assert_eq!(
        module.dispatch_binop(1, 2, 4),
        Err(WasmTrap::TableOutOfBounds)
    );
    assert_eq!(
        module.dispatch_binop(1, 2, -1),
        Err(WasmTrap::TableOutOfBounds)
    );
}

#[test]
fn test_null_slot_after_fill() {
    let mut module = indirect_call::new().unwrap();
    module.clear(1, 2).unwrap();
    assert_eq!(module.dispatch_binop(1, 2, 0), Ok(3));
    assert_eq!(
        module.dispatch_binop(1, 2, 1),
        Err(WasmTrap::UndefinedElement)
    );
    assert_eq!(
        module.dispatch_binop(1, 2, 2),
        Err(WasmTrap::UndefinedElement)
    );
}

// ── Table operations ──

#[test]
fn test_copy_slots_overlapping() {
    let mut module = indirect_call::new().unwrap();
    // [add, sub, mul, neg] -> [add, add, sub, mul]
    module.copy_slots(1, 0, 3).unwrap();
    assert_eq!(module.dispatch_binop(5, 2, 1), Ok(7));
    assert_eq!(module.dispatch_binop(5, 2, 2), Ok(3));
    assert_eq!(module.dispatch_binop(5, 2, 3), Ok(10));
}

#[test]
fn test_copy_out_of_range_changes_nothing() {
    let mut module = indirect_call::new().unwrap();
    assert_eq!(module.copy_slots(2, 0, 3), Err(WasmTrap::TableOutOfBounds));
    assert_eq!(module.dispatch_binop(5, 2, 2), Ok(10));
    assert_eq!(module.dispatch_unop(5, 3), Ok(-5));
}

#[test]
fn test_load_spare_segment() {
    let mut module = indirect_call::new().unwrap();
    // $spare = [mul, add]; put add at slot 3
    module.load_spare(3, 1, 1).unwrap();
    assert_eq!(module.dispatch_binop(6, 4, 3), Ok(10));
    assert_eq!(
        module.load_spare(0, 1, 2),
        Err(WasmTrap::TableOutOfBounds)
    );
}

#[test]
fn test_grow_adds_null_slots() {
    let mut module = indirect_call::new().unwrap();
    assert_eq!(module.size(), Ok(4));
    assert_eq!(module.grow(2), Ok(4));
    assert_eq!(module.size(), Ok(6));
    assert_eq!(
        module.dispatch_binop(1, 1, 5),
        Err(WasmTrap::UndefinedElement)
    );
    module.load_spare(4, 0, 2).unwrap();
    assert_eq!(module.dispatch_binop(3, 4, 4), Ok(12));
}

#[test]
fn test_grow_past_max_fails() {
    let mut module = indirect_call::new().unwrap();
    assert_eq!(module.grow(5), Ok(-1));
    assert_eq!(module.size(), Ok(4));
    assert_eq!(module.grow(4), Ok(4));
    assert_eq!(module.grow(0), Ok(8));
}
