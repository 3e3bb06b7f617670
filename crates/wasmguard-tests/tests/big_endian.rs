//! Runtime tests for the reversed (big-endian host) memory layout. Every
//! Wasm-visible result must match the little-endian build; only the host
//! bytes differ.

use wasmguard_runtime::{WasmTrap, PAGE_SIZE};
use wasmguard_tests::big_endian;

#[test]
fn test_data_segment_reads_little_endian() {
    let mut module = big_endian::new().unwrap();
    assert_eq!(module.load_i32(0).unwrap(), 0x0403_0201);
    assert_eq!(module.load_i64(0).unwrap(), 0x0807_0605_0403_0201);
    assert_eq!(module.load_i32(1).unwrap(), 0x0504_0302);
    assert_eq!(module.load_u8(7).unwrap(), 8);
}

#[test]
fn test_host_bytes_are_mirrored() {
    let module = big_endian::new().unwrap();
    let host = module.host_bytes();
    assert_eq!(host.len(), PAGE_SIZE);
    // Wasm address 0 is the last host byte.
    assert_eq!(&host[PAGE_SIZE - 8..], &[8, 7, 6, 5, 4, 3, 2, 1]);
}

#[test]
fn test_store_then_partial_load() {
    let mut module = big_endian::new().unwrap();
    module.store_i32(100, 0x1122_3344).unwrap();
    assert_eq!(module.load_u8(100).unwrap(), 0x44);
    assert_eq!(module.load_u8(103).unwrap(), 0x11);
}

#[test]
fn test_float_roundtrip_keeps_bits() {
    let mut module = big_endian::new().unwrap();
    let nan = f64::from_bits(0x7ff4_0000_0000_0001);
    module.store_f64(16, nan).unwrap();
    assert_eq!(module.load_f64(16).unwrap().to_bits(), nan.to_bits());
}

#[test]
fn test_memory_init_keeps_byte_order() {
    let mut module = big_endian::new().unwrap();
    // "hello"[1..4] = "ell"
    module.init_passive(200, 1, 3).unwrap();
    assert_eq!(module.load_u8(200).unwrap(), b'e' as i32);
    assert_eq!(module.load_u8(201).unwrap(), b'l' as i32);
    assert_eq!(module.load_u8(202).unwrap(), b'l' as i32);
    assert_eq!(module.init_passive(0, 3, 3), Err(WasmTrap::OutOfBounds));
}

#[test]
fn test_copy_overlapping() {
    let mut module = big_endian::new().unwrap();
    module.copy(2, 0, 4).unwrap();
    // [1,2,3,4,5,6,7,8] -> [1,2,1,2,3,4,7,8]
    assert_eq!(module.load_i64(0).unwrap(), 0x0807_0403_0201_0201);
}

#[test]
fn test_grow_preserves_contents() {
    let mut module = big_endian::new().unwrap();
    module.store_i32(1000, -123).unwrap();
    assert_eq!(module.grow(2).unwrap(), 1);
    assert_eq!(module.load_i32(0).unwrap(), 0x0403_0201);
    assert_eq!(module.load_i32(1000).unwrap(), -123);
    // New pages read as zero at their Wasm addresses.
    assert_eq!(module.load_i64(PAGE_SIZE as i32).unwrap(), 0);
    assert_eq!(module.host_bytes().len(), 3 * PAGE_SIZE);
}

#[test]
fn test_out_of_bounds() {
    let mut module = big_endian::new().unwrap();
    let end = PAGE_SIZE as i32;
    assert_eq!(module.load_i32(end - 3), Err(WasmTrap::OutOfBounds));
    assert_eq!(module.store_i32(end, 0), Err(WasmTrap::OutOfBounds));
    assert_eq!(module.load_u8(end - 1), Ok(0));
}

#[test]
fn test_grow_to_max_pages() {
    let mut module = big_endian::new().unwrap();
    let max = module.max_pages() as i32;
    assert_eq!(module.grow(max).unwrap(), -1);
    assert_eq!(module.grow(max - 1).unwrap(), 1);
    assert_eq!(module.host_bytes().len(), max as usize * PAGE_SIZE);
    assert_eq!(module.load_i32(0).unwrap(), 0x0403_0201);
    let last = (max as usize * PAGE_SIZE - 8) as i32;
    module.store_f64(last, -1.5).unwrap();
    assert_eq!(module.load_f64(last).unwrap(), -1.5);
    assert_eq!(module.grow(1).unwrap(), -1);
}

#[test]
fn test_instances_are_independent() {
    // Each instance owns a full-size memory; several fit at once.
    let mut modules: Vec<_> = (0..4).map(|_| big_endian::new().unwrap()).collect();
    modules[0].store_i32(64, 7).unwrap();
    assert_eq!(modules[0].load_i32(64).unwrap(), 7);
    assert!(modules[1..].iter_mut().all(|m| m.load_i32(64) == Ok(0)));
}
