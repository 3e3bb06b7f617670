//! Execution guards: call-depth limiting and the tail-call trampoline.
//!
//! Compiled code runs on the native stack, so unbounded Wasm recursion would
//! overflow it. Every compiled function brackets its body with
//! [`CallDepth::enter`] / [`CallDepth::exit`] (or [`CallDepth::call`]), which
//! turns runaway recursion into a `CallStackExhausted` trap.
//!
//! Tail calls go the other way: instead of calling the callee, a function
//! schedules it as the next [`Tailcallee`] and returns, and [`trampoline`]
//! keeps running scheduled steps until none is left. Arguments and results
//! travel through a [`TailCallStack`].

use crate::{trap, RawFunc, WasmFunc, WasmResult, WasmTrap, WasmValue};

/// Default maximum nesting depth for [`CallDepth`].
pub const DEFAULT_MAX_CALL_DEPTH: u32 = 500;

/// Number of 64-bit slots in a [`TailCallStack`].
pub const TAIL_CALL_STACK_SLOTS: usize = 16;

/// Call-depth counter for one execution context.
///
/// With the `call-depth-guard` feature disabled, `enter` never traps and the
/// counter stays at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDepth {
    depth: u32,
    max: u32,
}

impl CallDepth {
    pub const fn new(max: u32) -> Self {
        Self { depth: 0, max }
    }

    /// Enter a function. Traps `CallStackExhausted` when the depth already
    /// equals the maximum; the depth is unchanged in that case.
    #[inline(always)]
    pub fn enter(&mut self) -> WasmResult<()> {
        #[cfg(feature = "call-depth-guard")]
        {
            if self.depth >= self.max {
                return self.exhausted();
            }
            self.depth += 1;
        }
        Ok(())
    }

    /// Leave a function entered with [`CallDepth::enter`].
    #[inline(always)]
    pub fn exit(&mut self) {
        #[cfg(feature = "call-depth-guard")]
        {
            self.depth = self.depth.saturating_sub(1);
        }
    }

    /// Run `body` one level deeper. The depth is restored whether `body`
    /// returns a value or a trap.
    #[inline(always)]
    pub fn call<T>(&mut self, body: impl FnOnce(&mut Self) -> WasmResult<T>) -> WasmResult<T> {
        self.enter()?;
        let result = body(self);
        self.exit();
        result
    }

    #[inline(always)]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline(always)]
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Reset to zero, e.g. after a trap unwound past unmatched `enter`s.
    pub fn reset(&mut self) {
        self.depth = 0;
    }

    #[cold]
    #[inline(never)]
    #[cfg_attr(not(feature = "call-depth-guard"), allow(dead_code))]
    fn exhausted(&self) -> WasmResult<()> {
        trace_event!(depth = self.depth, max = self.max, "call depth exhausted");
        trap(WasmTrap::CallStackExhausted)
    }
}

impl Default for CallDepth {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CALL_DEPTH)
    }
}

/// Scratch stack carrying arguments and results across trampoline steps.
///
/// Every value takes one 64-bit slot. Slot indices beyond
/// [`TAIL_CALL_STACK_SLOTS`] trap `OutOfBounds`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailCallStack {
    slots: [u64; TAIL_CALL_STACK_SLOTS],
}

impl TailCallStack {
    pub const fn new() -> Self {
        Self {
            slots: [0; TAIL_CALL_STACK_SLOTS],
        }
    }

    #[inline(always)]
    pub fn get<T: WasmValue>(&self, index: usize) -> WasmResult<T> {
        match self.slots.get(index) {
            Some(&slot) => Ok(T::from_slot(slot)),
            None => trap(WasmTrap::OutOfBounds),
        }
    }

    #[inline(always)]
    pub fn set<T: WasmValue>(&mut self, index: usize, value: T) -> WasmResult<()> {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = value.to_slot();
                Ok(())
            }
            None => trap(WasmTrap::OutOfBounds),
        }
    }
}

impl Default for TailCallStack {
    fn default() -> Self {
        Self::new()
    }
}

/// One trampoline step: run `func` for `instance`, reading arguments from
/// the stack, and optionally schedule the next step in `next`.
pub type TailStep<C> =
    fn(C, RawFunc, &mut TailCallStack, &mut Option<Tailcallee<C>>) -> WasmResult<()>;

/// A scheduled tail call.
#[derive(Debug, Clone, Copy)]
pub struct Tailcallee<C> {
    step: TailStep<C>,
    func: RawFunc,
    instance: C,
}

impl<C: Copy> Tailcallee<C> {
    /// Schedule a tail-call-capable step.
    ///
    /// # Safety
    /// `step` must accept `func` as its `RawFunc` argument: if it restores
    /// it, `func` must have been erased from the type it restores to.
    pub unsafe fn new(step: TailStep<C>, func: RawFunc, instance: C) -> Self {
        Self {
            step,
            func,
            instance,
        }
    }

    /// Schedule a function that has no tail-call entry: the step reads its
    /// arguments from the stack, calls it normally and writes its results
    /// back, scheduling nothing.
    pub fn fallback<F: WasmFunc<C>>(func: F, instance: C) -> Self {
        Self {
            step: fallback_step::<C, F>,
            func: func.erase(),
            instance,
        }
    }

    #[inline(always)]
    pub fn instance(&self) -> C {
        self.instance
    }
}

fn fallback_step<C, F: WasmFunc<C>>(
    instance: C,
    func: RawFunc,
    stack: &mut TailCallStack,
    _next: &mut Option<Tailcallee<C>>,
) -> WasmResult<()> {
    // SAFETY: `fallback_step::<C, F>` is only paired with a `RawFunc` erased
    // from an `F`, by `Tailcallee::fallback` or after a successful type check
    // in `return_call_indirect`.
    let func = unsafe { F::restore(func) };
    func.call_with_stack(instance, stack)
}

/// The default step for `F`, for callers that already hold a `RawFunc`
/// erased from an `F`.
pub(crate) fn fallback_step_for<C, F: WasmFunc<C>>() -> TailStep<C> {
    fallback_step::<C, F>
}

/// Run `first` and every step it schedules, in order, until no step is
/// left. Native stack use stays constant however long the chain is.
pub fn trampoline<C: Copy>(first: Tailcallee<C>, stack: &mut TailCallStack) -> WasmResult<()> {
    let mut next = Some(first);
    while let Some(current) = next.take() {
        (current.step)(current.instance, current.func, stack, &mut next)?;
    }
    Ok(())
}
