//! Runtime tests for linear memory: size/grow, sub-width accesses, bulk
//! operations and active data segments.

use wasmguard_runtime::{WasmTrap, PAGE_SIZE};
use wasmguard_tests::memory_grow;

#[test]
fn test_initial_size() {
    let mut module = memory_grow::new().unwrap();
    assert_eq!(module.get_size().unwrap(), 1);
}

#[test]
fn test_grow_success() {
    let mut module = memory_grow::new().unwrap();
    assert_eq!(module.grow(1).unwrap(), 1);
    assert_eq!(module.get_size().unwrap(), 2);
}

#[test]
fn test_grow_failure_returns_neg1() {
    let mut module = memory_grow::new().unwrap();
    // Max is 2 pages, initial is 1. Growing by 2 would exceed max.
    assert_eq!(module.grow(2).unwrap(), -1);
    assert_eq!(module.get_size().unwrap(), 1);
    // A huge delta (reinterpreted as u32) fails the same way.
    assert_eq!(module.grow(-1).unwrap(), -1);
}

#[test]
fn test_grow_zero_returns_current_size() {
    let mut module = memory_grow::new().unwrap();
    assert_eq!(module.grow(0).unwrap(), 1);
}

#[test]
fn test_grow_then_use_new_memory() {
    let mut module = memory_grow::new().unwrap();
    let addr = PAGE_SIZE as i32;
    assert_eq!(module.store_and_load(addr, 42), Err(WasmTrap::OutOfBounds));
    module.grow(1).unwrap();
    assert_eq!(module.store_and_load(addr, 42).unwrap(), 42);
    // The new page starts zeroed.
    assert_eq!(module.load_half_u(addr + 100).unwrap(), 0);
}

#[test]
fn test_data_segment_applied() {
    let module = memory_grow::new().unwrap();
    assert_eq!(&module.memory()[16..20], b"wasm");
}

#[test]
fn test_last_bytes_in_bounds() {
    let mut module = memory_grow::new().unwrap();
    let last_word = (PAGE_SIZE - 4) as i32;
    assert_eq!(module.store_and_load(last_word, -7).unwrap(), -7);
    assert_eq!(
        module.store_and_load(last_word + 1, 0),
        Err(WasmTrap::OutOfBounds)
    );
    // Negative i32 addresses are large unsigned offsets.
    assert_eq!(module.store_and_load(-4, 0), Err(WasmTrap::OutOfBounds));
}

#[test]
fn test_subwidth_extension() {
    let mut module = memory_grow::new().unwrap();
    module.store_byte(0, 0x1ff).unwrap(); // wraps to 0xff
    assert_eq!(module.load_byte_s(0).unwrap(), -1);
    assert_eq!(module.load_half_u(0).unwrap(), 0xff);
    module.store_and_load(8, -2).unwrap();
    assert_eq!(module.load_wide(8).unwrap(), -2i64);
}

#[test]
fn test_fill_and_copy() {
    let mut module = memory_grow::new().unwrap();
    module.fill(100, 0xAB, 8).unwrap();
    module.copy(104, 100, 8).unwrap(); // overlapping
    assert_eq!(&module.memory()[100..112], &[0xAB; 12]);
    assert_eq!(module.memory()[112], 0);
}

#[test]
fn test_bulk_out_of_bounds_writes_nothing() {
    let mut module = memory_grow::new().unwrap();
    let near_end = (PAGE_SIZE - 4) as i32;
    assert_eq!(module.fill(near_end, 1, 8), Err(WasmTrap::OutOfBounds));
    assert_eq!(module.copy(near_end, 16, 8), Err(WasmTrap::OutOfBounds));
    assert!(module.memory()[PAGE_SIZE - 4..].iter().all(|&b| b == 0));
}

#[test]
fn test_zero_length_bulk_at_end() {
    let mut module = memory_grow::new().unwrap();
    let end = PAGE_SIZE as i32;
    assert_eq!(module.fill(end, 1, 0), Ok(()));
    assert_eq!(module.copy(end, end, 0), Ok(()));
    assert_eq!(module.fill(end + 1, 1, 0), Err(WasmTrap::OutOfBounds));
}
