//! A module whose functions are compiled once against `LinearMemory`, so
//! the embedder picks the addressing strategy: the module's own
//! `IsolatedMemory`, or the same memory installed with segue.
//!
//! ```wat
//! (module
//!   (memory 1 2)
//!   (data (i32.const 0) "\03\01\04\01\05\09\02\06")
//!   ;; counts[b] += 1 for each of the first $n data bytes; counts are i16 at 256
//!   (func $count (param $n i32) ...
//!     local.get $i  i32.load8_u  ...  i32.load16_u  i32.const 1  i32.add  i32.store16)
//!   ;; sum of counts[b] * b, widened through i64.load16_s
//!   (func $weigh (result i64) ...)
//!   (func (export "count_and_weigh") (param i32) (result i64)
//!     local.get 0  call $count  call $weigh)
//!   (func (export "reset") i32.const 256  i32.const 0  i32.const 32  memory.fill))
//! ```

use wasmguard_runtime::*;

const MAX_PAGES: usize = 2;

const DATA_0: &[u8] = &[3, 1, 4, 1, 5, 9, 2, 6];

const COUNTS: usize = 256;
const BUCKETS: i32 = 16;

pub struct WasmModule {
    memory: IsolatedMemory<MAX_PAGES>,
}

pub fn new() -> WasmResult<WasmModule> {
    let mut memory = IsolatedMemory::try_new(1)?;
    memory.init_data(0, DATA_0)?;
    Ok(WasmModule { memory })
}

fn func_count<M: LinearMemory>(memory: &mut M, n: i32) -> WasmResult<()> {
    let mut i: i32 = 0;
    while i < n {
        let b = memory.i32_load8_u(i as u32 as usize)?;
        let slot = (COUNTS as i32).wrapping_add(b.wrapping_mul(2)) as u32 as usize;
        let c = memory.i32_load16_u(slot)?;
        memory.i32_store16(slot, c.wrapping_add(1))?;
        i = i.wrapping_add(1);
    }
    Ok(())
}

fn func_weigh<M: LinearMemory>(memory: &M) -> WasmResult<i64> {
    let mut total: i64 = 0;
    let mut b: i32 = 0;
    while b < BUCKETS {
        let slot = (COUNTS as i32).wrapping_add(b.wrapping_mul(2)) as u32 as usize;
        let c = memory.i64_load16_s(slot)?;
        total = total.wrapping_add(c.wrapping_mul(b as i64));
        b = b.wrapping_add(1);
    }
    Ok(total)
}

/// Export `count_and_weigh`, run against any memory strategy.
pub fn count_and_weigh<M: LinearMemory>(memory: &mut M, n: i32) -> WasmResult<i64> {
    func_count(memory, n)?;
    func_weigh(memory)
}

/// Export `reset`, run against any memory strategy.
pub fn reset<M: LinearMemory>(memory: &mut M) -> WasmResult<()> {
    memory.memory_fill(COUNTS as u32, 0, (BUCKETS * 2) as u32)
}

impl WasmModule {
    pub fn count_and_weigh(&mut self, n: i32) -> WasmResult<i64> {
        count_and_weigh(&mut self.memory, n)
    }

    pub fn reset(&mut self) -> WasmResult<()> {
        reset(&mut self.memory)
    }

    /// The instance memory, for installing another addressing strategy.
    pub fn memory_mut(&mut self) -> &mut IsolatedMemory<MAX_PAGES> {
        &mut self.memory
    }
}
