//! Two modules linked through a funcref table.
//!
//! ```wat
//! (module $counter
//!   (memory 1)
//!   (global $count (mut i32) (i32.const 0))
//!   (func (export "bump") (param i32) (result i32)
//!     global.get $count  local.get 0  i32.add  global.set $count
//!     i32.const 0  global.get $count  i32.store
//!     global.get $count)
//!   (func (export "peek") (param i32) (result i32) local.get 0  i32.load))
//!
//! (module $app
//!   (import "left" "bump" (func $left_bump (param i32) (result i32)))
//!   (import "right" "bump" (func $right_bump (param i32) (result i32)))
//!   (import "left" "peek_ref" (global $peek funcref))
//!   (type $bump (func (param i32) (result i32)))
//!   (table 4 funcref)
//!   (elem (i32.const 0) funcref
//!     (ref.func $left_bump) (ref.func $right_bump) (global.get $peek) (ref.null func))
//!   (func (export "bump_via") (param $slot i32) (param $by i32) (result i32)
//!     local.get $by  local.get $slot  call_indirect (type $bump)))
//! ```
//!
//! `$counter` is instantiated twice. Every slot of the app's table carries
//! the counter instance its function must run against.

use std::cell::{Cell, RefCell};

use wasmguard_runtime::*;

pub type Bump<'a> = fn(&'a Counter, i32) -> WasmResult<i32>;

pub struct Counter {
    memory: RefCell<IsolatedMemory<1>>,
    count: Cell<i32>,
}

pub fn new_counter() -> WasmResult<Counter> {
    Ok(Counter {
        memory: RefCell::new(IsolatedMemory::try_new(1)?),
        count: Cell::new(0),
    })
}

fn func_bump(inst: &Counter, by: i32) -> WasmResult<i32> {
    let count = inst.count.get().wrapping_add(by);
    inst.count.set(count);
    inst.memory.borrow_mut().store_i32(0, count)?;
    Ok(count)
}

fn func_peek(inst: &Counter, addr: i32) -> WasmResult<i32> {
    inst.memory.borrow().load_i32(addr as u32 as usize)
}

impl Counter {
    pub fn bump(&self, by: i32) -> WasmResult<i32> {
        func_bump(self, by)
    }

    pub fn peek(&self, addr: i32) -> WasmResult<i32> {
        func_peek(self, addr)
    }

    /// The `peek_ref` funcref global this instance exports.
    pub fn peek_ref(&self) -> FuncRef<&Counter> {
        FuncRef::new(func_peek as Bump, self)
    }
}

pub struct Imports<'a> {
    pub left: &'a Counter,
    pub right: &'a Counter,
}

pub struct WasmModule<'a> {
    table: FuncTable<&'a Counter, 4>,
}

pub fn new<'a>(imports: Imports<'a>) -> WasmResult<WasmModule<'a>> {
    let elems: [ElemExpr<&Imports<'a>, &'a Counter>; 4] = [
        ElemExpr::RefFunc(FuncDesc::new(func_bump as Bump<'a>, |i| i.left)),
        ElemExpr::RefFunc(FuncDesc::new(func_bump as Bump<'a>, |i| i.right)),
        ElemExpr::GlobalGet(|i| Some(i.left.peek_ref())),
        ElemExpr::RefNull,
    ];
    let mut table = FuncTable::try_new(4)?;
    table.init(&imports, &elems, 0, 0, 4)?;
    Ok(WasmModule { table })
}

impl<'a> WasmModule<'a> {
    pub fn bump_via(&mut self, slot: i32, by: i32) -> WasmResult<i32> {
        let callee = self.table.call_indirect::<Bump<'a>>(slot as u32)?;
        (callee.func)(callee.instance, by)
    }

    /// Which counter a slot is bound to, if any.
    pub fn slot_instance(&self, slot: i32) -> WasmResult<Option<&'a Counter>> {
        Ok(self.table.get(slot as u32)?.map(|f| f.instance()))
    }
}
