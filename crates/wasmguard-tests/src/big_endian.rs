//! The `memory_grow`-style module compiled for a big-endian host: the
//! memory uses `ReversedLayout`, so Wasm address `a` of an `n`-byte value
//! lives at host index `size - a - n`, stored big-endian. Wasm-visible
//! behaviour is identical to the little-endian build.
//!
//! ```wat
//! (module
//!   (memory 1 4)
//!   (data (i32.const 0) "\01\02\03\04\05\06\07\08")
//!   (data $passive "hello")
//!   (func (export "load_i32") (param i32) (result i32) local.get 0  i32.load)
//!   (func (export "load_i64") (param i32) (result i64) local.get 0  i64.load)
//!   (func (export "load_u8") (param i32) (result i32) local.get 0  i32.load8_u)
//!   (func (export "store_i32") (param i32 i32) local.get 0  local.get 1  i32.store)
//!   (func (export "store_f64") (param i32 f64) local.get 0  local.get 1  f64.store)
//!   (func (export "load_f64") (param i32) (result f64) local.get 0  f64.load)
//!   (func (export "init_passive") (param i32 i32 i32) ... memory.init $passive)
//!   (func (export "copy") (param i32 i32 i32) ... memory.copy)
//!   (func (export "grow") (param i32) (result i32) local.get 0  memory.grow))
//! ```

use std::mem::MaybeUninit;

use wasmguard_runtime::*;

pub type Layout = Config<BoundsChecked, ReversedLayout>;

const MAX_PAGES: usize = 4;

const DATA_0: &[u8] = &[1, 2, 3, 4, 5, 6, 7, 8];
const DATA_PASSIVE: &[u8] = b"hello";

pub struct WasmModule {
    memory: Box<IsolatedMemory<MAX_PAGES, Layout>>,
}

pub fn new() -> WasmResult<WasmModule> {
    // Four pages are built in place on the heap, never on the stack.
    let mut slot: Box<MaybeUninit<IsolatedMemory<MAX_PAGES, Layout>>> = Box::new_uninit();
    IsolatedMemory::<MAX_PAGES, Layout>::try_init(&mut *slot, 1)?;
    // SAFETY: try_init returned Ok, so every field is initialized.
    let mut memory = unsafe { slot.assume_init() };
    memory.init_data(0, DATA_0)?;
    Ok(WasmModule { memory })
}

impl WasmModule {
    pub fn load_i32(&mut self, addr: i32) -> WasmResult<i32> {
        self.memory.load_i32(addr as u32 as usize)
    }

    pub fn load_i64(&mut self, addr: i32) -> WasmResult<i64> {
        self.memory.load_i64(addr as u32 as usize)
    }

    pub fn load_u8(&mut self, addr: i32) -> WasmResult<i32> {
        self.memory.i32_load8_u(addr as u32 as usize)
    }

    pub fn store_i32(&mut self, addr: i32, value: i32) -> WasmResult<()> {
        self.memory.store_i32(addr as u32 as usize, value)
    }

    pub fn store_f64(&mut self, addr: i32, value: f64) -> WasmResult<()> {
        self.memory.store_f64(addr as u32 as usize, value)
    }

    pub fn load_f64(&mut self, addr: i32) -> WasmResult<f64> {
        self.memory.load_f64(addr as u32 as usize)
    }

    pub fn init_passive(&mut self, dst: i32, src: i32, len: i32) -> WasmResult<()> {
        self.memory
            .memory_init(DATA_PASSIVE, dst as u32, src as u32, len as u32)
    }

    pub fn copy(&mut self, dst: i32, src: i32, len: i32) -> WasmResult<()> {
        self.memory.memory_copy(dst as u32, src as u32, len as u32)
    }

    pub fn grow(&mut self, delta: i32) -> WasmResult<i32> {
        Ok(self.memory.grow(delta as u32))
    }

    pub fn max_pages(&self) -> usize {
        MAX_PAGES
    }

    /// Host-side view of the active memory, in host order.
    pub fn host_bytes(&self) -> &[u8] {
        self.memory.as_slice()
    }
}
