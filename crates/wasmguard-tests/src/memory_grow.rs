//! ```wat
//! (module
//!   (memory 1 2)
//!   (data (i32.const 16) "wasm")
//!   (func (export "get_size") (result i32) memory.size)
//!   (func (export "grow") (param i32) (result i32) local.get 0  memory.grow)
//!   (func (export "store_and_load") (param i32 i32) (result i32)
//!     local.get 0  local.get 1  i32.store
//!     local.get 0  i32.load)
//!   (func (export "load_byte_s") (param i32) (result i32) local.get 0  i32.load8_s)
//!   (func (export "load_half_u") (param i32) (result i32) local.get 0  i32.load16_u)
//!   (func (export "store_byte") (param i32 i32) local.get 0  local.get 1  i32.store8)
//!   (func (export "load_wide") (param i32) (result i64) local.get 0  i64.load32_s)
//!   (func (export "fill") (param i32 i32 i32) ... memory.fill)
//!   (func (export "copy") (param i32 i32 i32) ... memory.copy))
//! ```

use wasmguard_runtime::*;

const MAX_PAGES: usize = 2;

pub struct WasmModule {
    memory: IsolatedMemory<MAX_PAGES>,
}

const DATA_0: &[u8] = b"wasm";

pub fn new() -> WasmResult<WasmModule> {
    let mut memory = IsolatedMemory::try_new(1)?;
    memory.init_data(16, DATA_0)?;
    Ok(WasmModule { memory })
}

impl WasmModule {
    pub fn get_size(&mut self) -> WasmResult<i32> {
        Ok(self.memory.size())
    }

    pub fn grow(&mut self, delta: i32) -> WasmResult<i32> {
        Ok(self.memory.grow(delta as u32))
    }

    pub fn store_and_load(&mut self, addr: i32, value: i32) -> WasmResult<i32> {
        self.memory.store_i32(addr as u32 as usize, value)?;
        self.memory.load_i32(addr as u32 as usize)
    }

    pub fn load_byte_s(&mut self, addr: i32) -> WasmResult<i32> {
        self.memory.i32_load8_s(addr as u32 as usize)
    }

    pub fn load_half_u(&mut self, addr: i32) -> WasmResult<i32> {
        self.memory.i32_load16_u(addr as u32 as usize)
    }

    pub fn store_byte(&mut self, addr: i32, value: i32) -> WasmResult<()> {
        self.memory.i32_store8(addr as u32 as usize, value)
    }

    pub fn load_wide(&mut self, addr: i32) -> WasmResult<i64> {
        self.memory.i64_load32_s(addr as u32 as usize)
    }

    pub fn fill(&mut self, dst: i32, value: i32, len: i32) -> WasmResult<()> {
        self.memory.memory_fill(dst as u32, value as u8, len as u32)
    }

    pub fn copy(&mut self, dst: i32, src: i32, len: i32) -> WasmResult<()> {
        self.memory.memory_copy(dst as u32, src as u32, len as u32)
    }

    /// Host-side view of the active memory.
    pub fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }
}
