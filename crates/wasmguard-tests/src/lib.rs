//! Wasm modules compiled by hand onto `wasmguard-runtime`, in the shape an
//! ahead-of-time compiler emits: one Rust module per Wasm module, a
//! `WasmModule` struct owning the instance state, a `new()` that runs
//! instantiation, and one method per export.
//!
//! The `tests/` directory drives these end to end; the benchmarks compare
//! them against plain Rust.

pub mod big_endian;
pub mod countdown;
pub mod fibo;
pub mod histogram;
pub mod indirect_call;
pub mod linked;
pub mod memory_grow;
pub mod memory_sort;

pub fn fibo_orig(n: i32) -> i32 {
    if n <= 1 {
        n
    } else {
        let mut a: i32 = 0;
        let mut b: i32 = 1;
        for _ in 2..=n {
            let tmp = a.wrapping_add(b);
            a = b;
            b = tmp;
        }
        b
    }
}

pub fn fill_sort_sum_orig(n: i32, seed: i32) -> i32 {
    let mut values: Vec<i32> = (0..n)
        .scan(seed as u32, |state, _| {
            *state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            Some((*state >> 16) as i32 & 0x7fff)
        })
        .collect();
    values.sort_unstable();
    values
        .iter()
        .enumerate()
        .fold(0i32, |acc, (i, v)| acc.wrapping_add(v.wrapping_mul(i as i32)))
}
