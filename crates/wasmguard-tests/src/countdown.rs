//! ```wat
//! (module
//!   (type $pred (func (param i64) (result i32)))
//!   (table 3 funcref)
//!   (elem (i32.const 0) $is_even $is_odd $is_zero)
//!   (func $is_even (export "is_even") (type $pred)
//!     local.get 0  i64.eqz
//!     if (result i32) i32.const 1
//!     else local.get 0 i64.const 1 i64.sub  return_call $is_odd end)
//!   (func $is_odd (export "is_odd") (type $pred)
//!     local.get 0  i64.eqz
//!     if (result i32) i32.const 0
//!     else local.get 0 i64.const 1 i64.sub  return_call $is_even end)
//!   (func $is_zero (type $pred) local.get 0  i64.eqz)
//!   (func $sum_to (export "sum_to") (param $n i64) (param $acc i64) (result i64)
//!     local.get $n  i64.eqz
//!     if (result i64) local.get $acc
//!     else
//!       local.get $n i64.const 1 i64.sub
//!       local.get $acc local.get $n i64.add
//!       return_call $sum_to
//!     end)
//!   (func (export "dispatch") (param $n i64) (param $op i32) (result i32)
//!     local.get $n  local.get $op  return_call_indirect (type $pred)))
//! ```
//!
//! Functions that make tail calls are compiled twice: a plain entry point
//! that runs the trampoline, and a step that schedules its tail callee
//! instead of calling it. `$is_zero` makes no tail calls and has no step.

use wasmguard_runtime::*;

type Pred = fn((), i64) -> WasmResult<i32>;
type Accumulate = fn((), i64, i64) -> WasmResult<i64>;

pub struct WasmModule {
    table: FuncTable<(), 3>,
}

pub fn new() -> WasmResult<WasmModule> {
    let mut table = FuncTable::try_new(3)?;
    // SAFETY: the steps never restore their RawFunc.
    let elems = unsafe {
        [
            Some(FuncRef::new(func_is_even as Pred, ()).with_tail_step(tail_is_even)),
            Some(FuncRef::new(func_is_odd as Pred, ()).with_tail_step(tail_is_odd)),
            Some(FuncRef::new(func_is_zero as Pred, ())),
        ]
    };
    table.init_elements(0, &elems)?;
    Ok(WasmModule { table })
}

/// Run `step` for `func` to completion.
fn run(step: TailStep<()>, func: RawFunc, stack: &mut TailCallStack) -> WasmResult<()> {
    // SAFETY: the steps in this module never restore their RawFunc.
    trampoline(unsafe { Tailcallee::new(step, func, ()) }, stack)
}

fn func_is_even(_: (), n: i64) -> WasmResult<i32> {
    let mut stack = TailCallStack::new();
    stack.set(0, n)?;
    run(tail_is_even, (func_is_even as Pred).erase(), &mut stack)?;
    stack.get(0)
}

fn func_is_odd(_: (), n: i64) -> WasmResult<i32> {
    let mut stack = TailCallStack::new();
    stack.set(0, n)?;
    run(tail_is_odd, (func_is_odd as Pred).erase(), &mut stack)?;
    stack.get(0)
}

fn func_is_zero(_: (), n: i64) -> WasmResult<i32> {
    Ok((n == 0) as i32)
}

fn func_sum_to(_: (), n: i64, acc: i64) -> WasmResult<i64> {
    let mut stack = TailCallStack::new();
    stack.set(0, n)?;
    stack.set(1, acc)?;
    run(tail_sum_to, (func_sum_to as Accumulate).erase(), &mut stack)?;
    stack.get(0)
}

fn tail_is_even(
    _: (),
    _: RawFunc,
    stack: &mut TailCallStack,
    next: &mut Option<Tailcallee<()>>,
) -> WasmResult<()> {
    let n: i64 = stack.get(0)?;
    if n == 0 {
        return stack.set(0, 1i32);
    }
    stack.set(0, n.wrapping_sub(1))?;
    // SAFETY: tail_is_odd never restores its RawFunc.
    *next = Some(unsafe { Tailcallee::new(tail_is_odd, (func_is_odd as Pred).erase(), ()) });
    Ok(())
}

fn tail_is_odd(
    _: (),
    _: RawFunc,
    stack: &mut TailCallStack,
    next: &mut Option<Tailcallee<()>>,
) -> WasmResult<()> {
    let n: i64 = stack.get(0)?;
    if n == 0 {
        return stack.set(0, 0i32);
    }
    stack.set(0, n.wrapping_sub(1))?;
    // SAFETY: tail_is_even never restores its RawFunc.
    *next = Some(unsafe { Tailcallee::new(tail_is_even, (func_is_even as Pred).erase(), ()) });
    Ok(())
}

fn tail_sum_to(
    _: (),
    func: RawFunc,
    stack: &mut TailCallStack,
    next: &mut Option<Tailcallee<()>>,
) -> WasmResult<()> {
    let n: i64 = stack.get(0)?;
    let acc: i64 = stack.get(1)?;
    if n == 0 {
        return stack.set(0, acc);
    }
    stack.set(0, n.wrapping_sub(1))?;
    stack.set(1, acc.wrapping_add(n))?;
    // SAFETY: tail_sum_to never restores its RawFunc.
    *next = Some(unsafe { Tailcallee::new(tail_sum_to, func, ()) });
    Ok(())
}

impl WasmModule {
    pub fn is_even(&mut self, n: i64) -> WasmResult<i32> {
        func_is_even((), n)
    }

    pub fn is_odd(&mut self, n: i64) -> WasmResult<i32> {
        func_is_odd((), n)
    }

    pub fn sum_to(&mut self, n: i64, acc: i64) -> WasmResult<i64> {
        func_sum_to((), n, acc)
    }

    pub fn dispatch(&mut self, n: i64, op: i32) -> WasmResult<i32> {
        let mut stack = TailCallStack::new();
        stack.set(0, n)?;
        let mut next = None;
        self.table.return_call_indirect::<Pred>(op as u32, &mut next)?;
        if let Some(first) = next {
            trampoline(first, &mut stack)?;
        }
        stack.get(0)
    }

    /// `dispatch` with the signature of `$sum_to`, which no slot has.
    pub fn dispatch_mistyped(&mut self, op: i32) -> WasmResult<()> {
        let mut next = None;
        self.table
            .return_call_indirect::<Accumulate>(op as u32, &mut next)
    }
}
