//! ```wat
//! (module
//!   (type $binop (func (param i32 i32) (result i32)))
//!   (type $unop (func (param i32) (result i32)))
//!   (table 4 8 funcref)
//!   (elem (i32.const 0) $add $sub $mul $negate)
//!   (elem $spare func $mul $add)
//!   (func $add (export "add") (type $binop) ...)
//!   (func $sub (export "sub") (type $binop) ...)
//!   (func $mul (export "mul") (type $binop) ...)
//!   (func $negate (type $unop) ...)
//!   (func (export "dispatch_binop") (param i32 i32 i32) (result i32)
//!     local.get 0  local.get 1  local.get 2  call_indirect (type $binop))
//!   (func (export "dispatch_unop") (param i32 i32) (result i32)
//!     local.get 0  local.get 1  call_indirect (type $unop))
//!   (func (export "copy_slots") (param i32 i32 i32)
//!     local.get 0  local.get 1  local.get 2  table.copy)
//!   (func (export "load_spare") (param i32 i32 i32)
//!     local.get 0  local.get 1  local.get 2  table.init $spare)
//!   (func (export "clear") (param i32 i32)
//!     local.get 0  ref.null func  local.get 1  table.fill)
//!   (func (export "grow") (param i32) (result i32)
//!     ref.null func  local.get 0  table.grow)
//!   (func (export "size") (result i32) table.size))
//! ```

use wasmguard_runtime::*;

const TABLE_MAX: usize = 8;

type Binop = fn((), i32, i32) -> WasmResult<i32>;
type Unop = fn((), i32) -> WasmResult<i32>;

pub struct WasmModule {
    table: FuncTable<(), TABLE_MAX>,
}

fn no_instance(_: ()) {}

fn elem_0() -> [ElemExpr<(), ()>; 4] {
    [
        ElemExpr::RefFunc(FuncDesc::new(func_add as Binop, no_instance)),
        ElemExpr::RefFunc(FuncDesc::new(func_sub as Binop, no_instance)),
        ElemExpr::RefFunc(FuncDesc::new(func_mul as Binop, no_instance)),
        ElemExpr::RefFunc(FuncDesc::new(func_negate as Unop, no_instance)),
    ]
}

fn elem_spare() -> [ElemExpr<(), ()>; 2] {
    [
        ElemExpr::RefFunc(FuncDesc::new(func_mul as Binop, no_instance)),
        ElemExpr::RefFunc(FuncDesc::new(func_add as Binop, no_instance)),
    ]
}

pub fn new() -> WasmResult<WasmModule> {
    let mut table = FuncTable::try_new(4)?;
    table.init((), &elem_0(), 0, 0, 4)?;
    Ok(WasmModule { table })
}

fn func_add(_: (), a: i32, b: i32) -> WasmResult<i32> {
    Ok(a.wrapping_add(b))
}

fn func_sub(_: (), a: i32, b: i32) -> WasmResult<i32> {
    Ok(a.wrapping_sub(b))
}

fn func_mul(_: (), a: i32, b: i32) -> WasmResult<i32> {
    Ok(a.wrapping_mul(b))
}

fn func_negate(_: (), a: i32) -> WasmResult<i32> {
    Ok(0i32.wrapping_sub(a))
}

impl WasmModule {
    pub fn add(&mut self, a: i32, b: i32) -> WasmResult<i32> {
        func_add((), a, b)
    }

    pub fn sub(&mut self, a: i32, b: i32) -> WasmResult<i32> {
        func_sub((), a, b)
    }

    pub fn mul(&mut self, a: i32, b: i32) -> WasmResult<i32> {
        func_mul((), a, b)
    }

    pub fn dispatch_binop(&mut self, a: i32, b: i32, op: i32) -> WasmResult<i32> {
        let callee = self.table.call_indirect::<Binop>(op as u32)?;
        (callee.func)(callee.instance, a, b)
    }

    pub fn dispatch_unop(&mut self, a: i32, op: i32) -> WasmResult<i32> {
        let callee = self.table.call_indirect::<Unop>(op as u32)?;
        (callee.func)(callee.instance, a)
    }

    pub fn copy_slots(&mut self, dst: i32, src: i32, len: i32) -> WasmResult<()> {
        self.table.copy_within(dst as u32, src as u32, len as u32)
    }

    pub fn load_spare(&mut self, dst: i32, src: i32, len: i32) -> WasmResult<()> {
        self.table
            .init((), &elem_spare(), dst as u32, src as u32, len as u32)
    }

    pub fn clear(&mut self, dst: i32, len: i32) -> WasmResult<()> {
        self.table.fill(dst as u32, None, len as u32)
    }

    pub fn grow(&mut self, delta: i32) -> WasmResult<i32> {
        Ok(self.table.grow(delta as u32, None))
    }

    pub fn size(&mut self) -> WasmResult<i32> {
        Ok(self.table.size() as i32)
    }
}
