//! ```wat
//! (module
//!   (memory 2)
//!   (func (export "fill_sort_sum") (param $n i32) (param $seed i32) (result i32)
//!     ;; fill n i32s from an LCG, insertion sort them in place,
//!     ;; return sum(v[i] * i)
//!     ...))
//! ```

use wasmguard_runtime::*;

const MAX_PAGES: usize = 2;

pub struct WasmModule {
    memory: IsolatedMemory<MAX_PAGES>,
}

pub fn new() -> WasmResult<WasmModule> {
    Ok(WasmModule {
        memory: IsolatedMemory::try_new(MAX_PAGES)?,
    })
}

fn addr(i: i32) -> usize {
    (i as u32).wrapping_mul(4) as usize
}

fn func_fill(memory: &mut IsolatedMemory<MAX_PAGES>, n: i32, seed: i32) -> WasmResult<()> {
    let mut state = seed;
    let mut i = 0;
    while i < n {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let value = ((state as u32) >> 16) as i32 & 0x7fff;
        memory.store_i32(addr(i), value)?;
        i += 1;
    }
    Ok(())
}

fn func_sort(memory: &mut IsolatedMemory<MAX_PAGES>, n: i32) -> WasmResult<()> {
    let mut i = 1;
    while i < n {
        let key = memory.load_i32(addr(i))?;
        let mut j = i - 1;
        while j >= 0 {
            let v = memory.load_i32(addr(j))?;
            if v <= key {
                break;
            }
            memory.store_i32(addr(j + 1), v)?;
            j -= 1;
        }
        memory.store_i32(addr(j + 1), key)?;
        i += 1;
    }
    Ok(())
}

fn func_sum(memory: &IsolatedMemory<MAX_PAGES>, n: i32) -> WasmResult<i32> {
    let mut sum: i32 = 0;
    let mut i = 0;
    while i < n {
        sum = sum.wrapping_add(memory.load_i32(addr(i))?.wrapping_mul(i));
        i += 1;
    }
    Ok(sum)
}

impl WasmModule {
    pub fn fill_sort_sum(&mut self, n: i32, seed: i32) -> WasmResult<i32> {
        func_fill(&mut self.memory, n, seed)?;
        func_sort(&mut self.memory, n)?;
        func_sum(&self.memory, n)
    }
}
