//! ```wat
//! (module
//!   (func $fib (export "fib") (param i32) (result i32)
//!     local.get 0  i32.const 2  i32.lt_s
//!     if (result i32) local.get 0
//!     else
//!       local.get 0 i32.const 1 i32.sub  call $fib
//!       local.get 0 i32.const 2 i32.sub  call $fib
//!       i32.add
//!     end)
//!   (func $depth (export "depth") (param i32) (result i32)
//!     local.get 0  i32.eqz
//!     if (result i32) i32.const 0
//!     else local.get 0 i32.const 1 i32.sub  call $depth  i32.const 1 i32.add end)
//!   (func (export "fibo") (param i32) (result i32) ... iterative loop ...))
//! ```
//!
//! Every compiled function body runs inside `CallDepth::call`.

use wasmguard_runtime::*;

pub struct WasmModule {
    depth: CallDepth,
}

pub fn new() -> WasmResult<WasmModule> {
    Ok(WasmModule {
        depth: CallDepth::default(),
    })
}

/// Instantiate with a custom maximum call depth.
pub fn with_max_depth(max: u32) -> WasmResult<WasmModule> {
    Ok(WasmModule {
        depth: CallDepth::new(max),
    })
}

fn func_fib(depth: &mut CallDepth, n: i32) -> WasmResult<i32> {
    depth.call(|depth| {
        if n < 2 {
            return Ok(n);
        }
        let a = func_fib(depth, n.wrapping_sub(1))?;
        let b = func_fib(depth, n.wrapping_sub(2))?;
        Ok(a.wrapping_add(b))
    })
}

fn func_depth(depth: &mut CallDepth, n: i32) -> WasmResult<i32> {
    depth.call(|depth| {
        if n == 0 {
            return Ok(0);
        }
        Ok(func_depth(depth, n.wrapping_sub(1))?.wrapping_add(1))
    })
}

fn func_fibo(depth: &mut CallDepth, n: i32) -> WasmResult<i32> {
    depth.call(|_| {
        if n <= 1 {
            return Ok(n);
        }
        let mut a: i32 = 0;
        let mut b: i32 = 1;
        let mut i: i32 = 2;
        loop {
            let tmp = a.wrapping_add(b);
            a = b;
            b = tmp;
            i = i.wrapping_add(1);
            if i > n {
                break;
            }
        }
        Ok(b)
    })
}

impl WasmModule {
    pub fn fib(&mut self, n: i32) -> WasmResult<i32> {
        func_fib(&mut self.depth, n)
    }

    pub fn depth(&mut self, n: i32) -> WasmResult<i32> {
        func_depth(&mut self.depth, n)
    }

    pub fn fibo(&mut self, n: i32) -> WasmResult<i32> {
        func_fibo(&mut self.depth, n)
    }

    /// Current nesting depth, zero between export calls.
    pub fn current_depth(&self) -> u32 {
        self.depth.depth()
    }
}
