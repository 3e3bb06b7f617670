//! Runtime tests for return_call / return_call_indirect through the
//! trampoline.

use wasmguard_runtime::WasmTrap;
use wasmguard_tests::countdown;

#[test]
fn test_mutual_tail_recursion() {
    let mut module = countdown::new().unwrap();
    assert_eq!(module.is_even(10).unwrap(), 1);
    assert_eq!(module.is_odd(10).unwrap(), 0);
    assert_eq!(module.is_even(7).unwrap(), 0);
    assert_eq!(module.is_odd(0).unwrap(), 0);
}

#[test]
fn test_long_chain_uses_constant_stack() {
    let mut module = countdown::new().unwrap();
    // A million nested native calls would overflow the test thread's stack.
    assert_eq!(module.is_even(1_000_001).unwrap(), 0);
    assert_eq!(module.sum_to(1_000_000, 0).unwrap(), 500_000_500_000);
}

#[test]
fn test_sum_to_with_accumulator() {
    let mut module = countdown::new().unwrap();
    assert_eq!(module.sum_to(0, 42).unwrap(), 42);
    assert_eq!(module.sum_to(3, 10).unwrap(), 16);
}

#[test]
fn test_return_call_indirect_uses_slot_step() {
    let mut module = countdown::new().unwrap();
    assert_eq!(module.dispatch(100_000, 0).unwrap(), 1);
    assert_eq!(module.dispatch(100_000, 1).unwrap(), 0);
}

#[test]
fn test_return_call_indirect_without_step() {
    let mut module = countdown::new().unwrap();
    // $is_zero has no tail step: the default step calls it normally.
    assert_eq!(module.dispatch(0, 2).unwrap(), 1);
    assert_eq!(module.dispatch(5, 2).unwrap(), 0);
}

#[test]
fn test_return_call_indirect_traps() {
    let mut module = countdown::new().unwrap();
    assert_eq!(module.dispatch(1, 3), Err(WasmTrap::TableOutOfBounds));
    assert_eq!(
        module.dispatch_mistyped(0),
        Err(WasmTrap::IndirectCallTypeMismatch)
    );
}
