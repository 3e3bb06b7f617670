//! Wasm tables (funcref and externref) and `call_indirect`.
//!
//! A table is a vector of nullable references with a current size. Function
//! references hold functions of every signature, so each [`FuncRef`] stores
//! its entry point type-erased next to its canonical [`FuncType`].
//! `call_indirect::<F>` checks the slot's type against `F`'s and only then
//! hands back a typed, directly callable [`Callee`].
//!
//! Element segments are initialized in two phases: the compiled module
//! describes each element as an [`ElemExpr`] relative to an instance base
//! not known until instantiation, and [`FuncTable::init`] resolves the
//! descriptors against that base.
//!
//! The table uses a fixed-size backing array (const generic `MAX_SIZE`)
//! to stay `no_std` compatible.

use core::num::NonZeroUsize;
use core::ops::Range;

use crate::guard::fallback_step_for;
use crate::{
    func_types_eq, trap, ConstructionError, FuncType, RawFunc, TailStep, Tailcallee, WasmFunc,
    WasmResult, WasmTrap,
};

/// A live function reference: signature, entry point, optional tail-call
/// entry, and the owning instance's context.
#[derive(Debug, Clone, Copy)]
pub struct FuncRef<C> {
    ty: &'static FuncType,
    func: RawFunc,
    tail_step: Option<TailStep<C>>,
    instance: C,
}

impl<C: Copy> FuncRef<C> {
    pub fn new<F: WasmFunc<C>>(func: F, instance: C) -> Self {
        Self {
            ty: F::TYPE,
            func: func.erase(),
            tail_step: None,
            instance,
        }
    }

    /// Attach a tail-call entry, used by `return_call_indirect` instead of
    /// the default step.
    ///
    /// # Safety
    /// `step` must accept this reference's entry point as its `RawFunc`
    /// argument (see [`Tailcallee::new`]).
    pub unsafe fn with_tail_step(mut self, step: TailStep<C>) -> Self {
        self.tail_step = Some(step);
        self
    }

    #[inline(always)]
    pub fn func_type(&self) -> &'static FuncType {
        self.ty
    }

    #[inline(always)]
    pub fn raw(&self) -> RawFunc {
        self.func
    }

    #[inline(always)]
    pub fn instance(&self) -> C {
        self.instance
    }

    #[inline(always)]
    pub fn has_tail_step(&self) -> bool {
        self.tail_step.is_some()
    }
}

/// An opaque, non-null host reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternRef(NonZeroUsize);

impl ExternRef {
    /// `None` for 0, which is reserved for the null reference.
    pub const fn new(value: usize) -> Option<Self> {
        match NonZeroUsize::new(value) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    pub const fn get(self) -> usize {
        self.0.get()
    }
}

/// A type-checked indirect call target.
///
/// Generated code calls it as `(callee.func)(callee.instance, args..)`.
#[derive(Debug, Clone, Copy)]
pub struct Callee<F, C> {
    pub func: F,
    pub instance: C,
}

/// A direct function element, described relative to an instance base `B`.
#[derive(Debug, Clone, Copy)]
pub struct FuncDesc<B, C> {
    ty: &'static FuncType,
    func: RawFunc,
    tail_step: Option<TailStep<C>>,
    instance: fn(B) -> C,
}

impl<B, C: Copy> FuncDesc<B, C> {
    /// `instance` maps the instance base to the context of the instance
    /// owning `func`.
    pub fn new<F: WasmFunc<C>>(func: F, instance: fn(B) -> C) -> Self {
        Self {
            ty: F::TYPE,
            func: func.erase(),
            tail_step: None,
            instance,
        }
    }

    /// # Safety
    /// Same contract as [`FuncRef::with_tail_step`].
    pub unsafe fn with_tail_step(mut self, step: TailStep<C>) -> Self {
        self.tail_step = Some(step);
        self
    }
}

/// Element segment initializer expression.
#[derive(Debug, Clone, Copy)]
pub enum ElemExpr<B, C> {
    /// `ref.func`
    RefFunc(FuncDesc<B, C>),
    /// `ref.null func`
    RefNull,
    /// `global.get` of a funcref global, read from the instance at
    /// initialization time.
    GlobalGet(fn(B) -> Option<FuncRef<C>>),
}

impl<B: Copy, C: Copy> ElemExpr<B, C> {
    /// Resolve against the instance base. `None` is the null reference.
    pub fn resolve(&self, base: B) -> Option<FuncRef<C>> {
        match *self {
            ElemExpr::RefFunc(desc) => Some(FuncRef {
                ty: desc.ty,
                func: desc.func,
                tail_step: desc.tail_step,
                instance: (desc.instance)(base),
            }),
            ElemExpr::RefNull => None,
            ElemExpr::GlobalGet(global) => global(base),
        }
    }
}

/// Wasm table with a compile-time maximum size.
///
/// `MAX_SIZE` is derived from the Wasm module's table declaration.
/// Entries are `Option<T>`: `None` is the null reference.
pub struct Table<T: Copy, const MAX_SIZE: usize> {
    entries: [Option<T>; MAX_SIZE],
    /// Current number of active entries (analogous to `active_pages`).
    /// Accesses at or beyond this index trap with `TableOutOfBounds`.
    active_size: usize,
}

/// A `funcref` table whose functions take instance context `C`.
pub type FuncTable<C, const MAX_SIZE: usize> = Table<FuncRef<C>, MAX_SIZE>;

/// An `externref` table.
pub type ExternTable<const MAX_SIZE: usize> = Table<ExternRef, MAX_SIZE>;

impl<T: Copy, const MAX_SIZE: usize> Table<T, MAX_SIZE> {
    /// Create a new table with `initial_size` slots, all null.
    ///
    /// # Errors
    /// Returns `ConstructionError::TableInitialSizeExceedsMax` if `initial_size > MAX_SIZE`.
    pub fn try_new(initial_size: usize) -> Result<Self, ConstructionError> {
        if initial_size > MAX_SIZE {
            trace_event!(initial_size, max_size = MAX_SIZE, "table initial size exceeds maximum");
            return Err(ConstructionError::TableInitialSizeExceedsMax {
                initial: initial_size,
                max: MAX_SIZE,
            });
        }
        Ok(Self {
            entries: [None; MAX_SIZE],
            active_size: initial_size,
        })
    }

    /// Current number of active table slots.
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.active_size
    }

    #[inline(always)]
    fn active(&self) -> &[Option<T>] {
        self.entries.get(..self.active_size).unwrap_or(&[])
    }

    #[inline(always)]
    fn active_mut(&mut self) -> &mut [Option<T>] {
        match self.entries.get_mut(..self.active_size) {
            Some(s) => s,
            None => &mut [],
        }
    }

    /// Wasm `table.get`. Traps `TableOutOfBounds` if `index >= size`.
    #[inline]
    pub fn get(&self, index: u32) -> WasmResult<Option<T>> {
        match self.active().get(index as usize) {
            Some(entry) => Ok(*entry),
            None => trap(WasmTrap::TableOutOfBounds),
        }
    }

    /// Wasm `table.set`. Traps `TableOutOfBounds` if `index >= size`.
    #[inline]
    pub fn set(&mut self, index: u32, value: Option<T>) -> WasmResult<()> {
        match self.active_mut().get_mut(index as usize) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => trap(WasmTrap::TableOutOfBounds),
        }
    }

    /// Wasm `table.fill`.
    pub fn fill(&mut self, dst: u32, value: Option<T>, len: u32) -> WasmResult<()> {
        let range = table_range(dst, len, self.active_size)?;
        self.active_mut()[range].fill(value);
        Ok(())
    }

    /// Wasm `table.copy` within one table. Overlapping ranges are handled
    /// like `memmove`.
    pub fn copy_within(&mut self, dst: u32, src: u32, len: u32) -> WasmResult<()> {
        let dst_range = table_range(dst, len, self.active_size)?;
        let src_range = table_range(src, len, self.active_size)?;
        self.active_mut().copy_within(src_range, dst_range.start);
        Ok(())
    }

    /// Wasm `table.copy` from another table of the same element type.
    pub fn copy_from<const SRC_SIZE: usize>(
        &mut self,
        src_table: &Table<T, SRC_SIZE>,
        dst: u32,
        src: u32,
        len: u32,
    ) -> WasmResult<()> {
        let dst_range = table_range(dst, len, self.active_size)?;
        let src_range = table_range(src, len, src_table.active_size)?;
        self.active_mut()[dst_range].copy_from_slice(&src_table.active()[src_range]);
        Ok(())
    }

    /// Wasm `table.grow`: fill `delta` new slots with `init`. Returns the
    /// previous size, or -1 on failure.
    pub fn grow(&mut self, delta: u32, init: Option<T>) -> i32 {
        let old = self.active_size;
        let new = match old.checked_add(delta as usize) {
            Some(new) if new <= MAX_SIZE => new,
            _ => return -1,
        };
        self.entries[old..new].fill(init);
        self.active_size = new;
        old as i32
    }

    /// Write `refs` into consecutive slots starting at `dst`: the shorthand
    /// for an active element segment whose references are already resolved.
    ///
    /// # Errors
    /// Returns `Err(TableOutOfBounds)` if any slot index is out of range.
    pub fn init_elements(&mut self, dst: u32, refs: &[Option<T>]) -> WasmResult<()> {
        let len = u32::try_from(refs.len()).or_else(|_| trap(WasmTrap::TableOutOfBounds))?;
        let range = table_range(dst, len, self.active_size)?;
        self.active_mut()[range].copy_from_slice(refs);
        Ok(())
    }
}

impl<C: Copy, const MAX_SIZE: usize> Table<FuncRef<C>, MAX_SIZE> {
    /// Wasm `table.init` for a funcref table: resolve `elems[src..src + len]`
    /// against `base` and write them to `dst..dst + len`.
    ///
    /// Both ranges are checked before any slot is written.
    pub fn init<B: Copy>(
        &mut self,
        base: B,
        elems: &[ElemExpr<B, C>],
        dst: u32,
        src: u32,
        len: u32,
    ) -> WasmResult<()> {
        let src_range = table_range(src, len, elems.len())?;
        let dst_range = table_range(dst, len, self.active_size)?;
        for (slot, elem) in self.active_mut()[dst_range].iter_mut().zip(&elems[src_range]) {
            *slot = elem.resolve(base);
        }
        Ok(())
    }

    /// Wasm `call_indirect` with expected type `F`.
    ///
    /// - `TableOutOfBounds` if `index >= size`
    /// - `UndefinedElement` if the slot is null
    /// - `IndirectCallTypeMismatch` if the slot's type differs from `F`'s
    #[inline(always)]
    pub fn call_indirect<F: WasmFunc<C>>(&self, index: u32) -> WasmResult<Callee<F, C>> {
        let entry = lookup(self.active(), index, F::TYPE)?;
        // SAFETY: the slot's type equals F::TYPE, and the WasmFunc contract
        // makes the canonical type unique to F, so the entry was erased from
        // an F.
        let func = unsafe { F::restore(entry.func) };
        Ok(Callee {
            func,
            instance: entry.instance,
        })
    }

    /// `call_indirect` without any check, for trusted modules.
    ///
    /// # Safety
    /// `index` must be below `size`, the slot must be non-null, and its
    /// function must have been erased from an `F`.
    #[inline(always)]
    pub unsafe fn call_indirect_unchecked<F: WasmFunc<C>>(&self, index: u32) -> Callee<F, C> {
        // SAFETY: forwarded to the caller.
        let entry = unsafe {
            self.entries
                .get_unchecked(index as usize)
                .unwrap_unchecked()
        };
        Callee {
            // SAFETY: forwarded to the caller.
            func: unsafe { F::restore(entry.func) },
            instance: entry.instance,
        }
    }

    /// Wasm `return_call_indirect`: the same checks as `call_indirect`,
    /// then schedule the slot's tail step on the trampoline. A slot with no
    /// tail step gets the default step for `F`.
    ///
    /// The caller has already written the arguments to the tail-call stack.
    pub fn return_call_indirect<F: WasmFunc<C>>(
        &self,
        index: u32,
        next: &mut Option<Tailcallee<C>>,
    ) -> WasmResult<()> {
        let entry = lookup(self.active(), index, F::TYPE)?;
        let step = entry.tail_step.unwrap_or_else(fallback_step_for::<C, F>);
        // SAFETY: a slot's own tail step accepts the slot's entry point
        // (`with_tail_step` contract); the default step for F accepts it
        // because the type check above passed.
        *next = Some(unsafe { Tailcallee::new(step, entry.func, entry.instance) });
        Ok(())
    }
}

impl<const MAX_SIZE: usize> Table<ExternRef, MAX_SIZE> {
    /// Wasm `table.init` for an externref table. Element segments of
    /// externrefs can only hold nulls, so only the segment length is needed.
    pub fn init_null(&mut self, src_len: u32, dst: u32, src: u32, len: u32) -> WasmResult<()> {
        table_range(src, len, src_len as usize)?;
        self.fill(dst, None, len)
    }
}

// ── Inner functions (outline pattern) ───────────────────────────────────────

/// `start..start + len` if it lies within `size`.
#[inline(never)]
fn table_range(start: u32, len: u32, size: usize) -> WasmResult<Range<usize>> {
    let start = start as usize;
    match start.checked_add(len as usize) {
        Some(end) if end <= size => Ok(start..end),
        _ => trap(WasmTrap::TableOutOfBounds),
    }
}

/// Index, null and signature checks shared by `call_indirect` and
/// `return_call_indirect`. Generic over the context only, not `MAX_SIZE`.
#[inline(never)]
fn lookup<C: Copy>(
    active: &[Option<FuncRef<C>>],
    index: u32,
    expected: &FuncType,
) -> WasmResult<FuncRef<C>> {
    let entry = match active.get(index as usize) {
        Some(Some(entry)) => *entry,
        Some(None) => return trap(WasmTrap::UndefinedElement),
        None => return trap(WasmTrap::TableOutOfBounds),
    };
    if !func_types_eq(entry.ty, expected) {
        return trap(WasmTrap::IndirectCallTypeMismatch);
    }
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{trampoline, TailCallStack, WasmResults};

    type UnaryI32 = fn((), i32) -> WasmResult<i32>;
    type UnaryI64 = fn((), i64) -> WasmResult<i64>;

    fn inc(_: (), x: i32) -> WasmResult<i32> {
        Ok(x + 1)
    }

    fn neg(_: (), x: i32) -> WasmResult<i32> {
        Ok(-x)
    }

    fn widen(_: (), x: i64) -> WasmResult<i64> {
        Ok(x << 1)
    }

    fn inc_ref() -> FuncRef<()> {
        FuncRef::new(inc as UnaryI32, ())
    }

    fn extern_ref(v: usize) -> Option<ExternRef> {
        ExternRef::new(v)
    }

    #[test]
    fn new_table_is_null() {
        let table = ExternTable::<8>::try_new(4).unwrap();
        assert_eq!(table.size(), 4);
        assert_eq!(table.get(0), Ok(None));
        assert_eq!(table.get(3), Ok(None));
    }

    #[test]
    fn try_new_fails_if_initial_exceeds_max() {
        let result = ExternTable::<4>::try_new(5);
        assert!(matches!(
            result,
            Err(ConstructionError::TableInitialSizeExceedsMax { initial: 5, max: 4 })
        ));
    }

    #[test]
    fn get_set_out_of_bounds() {
        let mut table = ExternTable::<8>::try_new(4).unwrap();
        assert_eq!(table.get(4), Err(WasmTrap::TableOutOfBounds));
        assert_eq!(table.get(u32::MAX), Err(WasmTrap::TableOutOfBounds));
        assert_eq!(table.set(4, extern_ref(1)), Err(WasmTrap::TableOutOfBounds));
    }

    #[test]
    fn set_and_clear() {
        let mut table = ExternTable::<8>::try_new(4).unwrap();
        table.set(2, extern_ref(7)).unwrap();
        assert_eq!(table.get(2), Ok(extern_ref(7)));
        table.set(2, None).unwrap();
        assert_eq!(table.get(2), Ok(None));
    }

    #[test]
    fn extern_ref_zero_is_null() {
        assert_eq!(ExternRef::new(0), None);
        assert_eq!(ExternRef::new(5).map(ExternRef::get), Some(5));
    }

    #[test]
    fn fill_range() {
        let mut table = ExternTable::<8>::try_new(6).unwrap();
        table.fill(1, extern_ref(9), 3).unwrap();
        assert_eq!(table.get(0), Ok(None));
        assert_eq!(table.get(3), Ok(extern_ref(9)));
        assert_eq!(table.get(4), Ok(None));
        assert_eq!(table.fill(4, None, 3), Err(WasmTrap::TableOutOfBounds));
        assert!(table.fill(6, None, 0).is_ok());
    }

    #[test]
    fn copy_within_overlapping() {
        let mut table = ExternTable::<8>::try_new(5).unwrap();
        table
            .init_elements(0, &[extern_ref(1), extern_ref(2), extern_ref(3)])
            .unwrap();
        table.copy_within(1, 0, 3).unwrap();
        assert_eq!(table.get(1), Ok(extern_ref(1)));
        assert_eq!(table.get(2), Ok(extern_ref(2)));
        assert_eq!(table.get(3), Ok(extern_ref(3)));
        assert_eq!(
            table.copy_within(3, 0, 3),
            Err(WasmTrap::TableOutOfBounds)
        );
    }

    #[test]
    fn copy_from_other_table() {
        let mut src = ExternTable::<4>::try_new(4).unwrap();
        src.set(3, extern_ref(42)).unwrap();
        let mut dst = ExternTable::<8>::try_new(8).unwrap();
        dst.copy_from(&src, 6, 2, 2).unwrap();
        assert_eq!(dst.get(7), Ok(extern_ref(42)));
        assert_eq!(
            dst.copy_from(&src, 0, 3, 2),
            Err(WasmTrap::TableOutOfBounds)
        );
    }

    #[test]
    fn grow_success_and_failure() {
        let mut table = ExternTable::<4>::try_new(2).unwrap();
        assert_eq!(table.grow(1, extern_ref(3)), 2);
        assert_eq!(table.size(), 3);
        assert_eq!(table.get(2), Ok(extern_ref(3)));
        assert_eq!(table.grow(2, None), -1); // would be 5 > 4
        assert_eq!(table.size(), 3);
    }

    #[test]
    fn init_elements_out_of_bounds() {
        let mut table = ExternTable::<4>::try_new(4).unwrap();
        // dst=3, 2 entries → slots 3 and 4; slot 4 is OOB
        assert_eq!(
            table.init_elements(3, &[extern_ref(1), extern_ref(2)]),
            Err(WasmTrap::TableOutOfBounds)
        );
        // Nothing was written.
        assert_eq!(table.get(3), Ok(None));
    }

    #[test]
    fn extern_init_null_checks_segment() {
        let mut table = ExternTable::<4>::try_new(4).unwrap();
        table.fill(0, extern_ref(1), 4).unwrap();
        table.init_null(3, 1, 0, 2).unwrap();
        assert_eq!(table.get(0), Ok(extern_ref(1)));
        assert_eq!(table.get(1), Ok(None));
        assert_eq!(table.get(2), Ok(None));
        assert_eq!(table.init_null(3, 0, 2, 2), Err(WasmTrap::TableOutOfBounds));
    }

    // ── funcref ──

    #[test]
    fn call_indirect_dispatches() {
        let mut table = FuncTable::<(), 4>::try_new(4).unwrap();
        table.set(1, Some(inc_ref())).unwrap();
        let callee = table.call_indirect::<UnaryI32>(1).unwrap();
        assert_eq!((callee.func)(callee.instance, 41), Ok(42));
    }

    #[test]
    fn call_indirect_traps() {
        let mut table = FuncTable::<(), 4>::try_new(2).unwrap();
        table.set(0, Some(inc_ref())).unwrap();
        assert_eq!(
            table.call_indirect::<UnaryI32>(2).err(),
            Some(WasmTrap::TableOutOfBounds)
        );
        assert_eq!(
            table.call_indirect::<UnaryI32>(1).err(),
            Some(WasmTrap::UndefinedElement)
        );
        assert_eq!(
            table.call_indirect::<UnaryI64>(0).err(),
            Some(WasmTrap::IndirectCallTypeMismatch)
        );
    }

    #[test]
    fn call_indirect_unchecked_dispatches() {
        let mut table = FuncTable::<(), 4>::try_new(1).unwrap();
        table.set(0, Some(FuncRef::new(neg as UnaryI32, ()))).unwrap();
        // SAFETY: slot 0 holds a UnaryI32.
        let callee = unsafe { table.call_indirect_unchecked::<UnaryI32>(0) };
        assert_eq!((callee.func)(callee.instance, 5), Ok(-5));
    }

    #[test]
    fn call_indirect_passes_slot_instance() {
        fn scaled(factor: i32, x: i32) -> WasmResult<i32> {
            Ok(factor * x)
        }
        let mut table = FuncTable::<i32, 2>::try_new(2).unwrap();
        let f = scaled as fn(i32, i32) -> WasmResult<i32>;
        table
            .init_elements(0, &[Some(FuncRef::new(f, 3)), Some(FuncRef::new(f, 10))])
            .unwrap();
        let a = table.call_indirect::<fn(i32, i32) -> WasmResult<i32>>(0).unwrap();
        let b = table.call_indirect::<fn(i32, i32) -> WasmResult<i32>>(1).unwrap();
        assert_eq!((a.func)(a.instance, 2), Ok(6));
        assert_eq!((b.func)(b.instance, 2), Ok(20));
    }

    #[test]
    fn init_resolves_against_base() {
        struct Instance {
            offset: i32,
            global: Option<FuncRef<i32>>,
        }
        fn add(offset: i32, x: i32) -> WasmResult<i32> {
            Ok(offset + x)
        }
        type Add = fn(i32, i32) -> WasmResult<i32>;

        let elems: [ElemExpr<&Instance, i32>; 3] = [
            ElemExpr::RefFunc(FuncDesc::new(add as Add, |inst: &Instance| inst.offset)),
            ElemExpr::RefNull,
            ElemExpr::GlobalGet(|inst: &Instance| inst.global),
        ];
        let inst = Instance {
            offset: 100,
            global: Some(FuncRef::new(add as Add, -1)),
        };
        let mut table = FuncTable::<i32, 4>::try_new(4).unwrap();
        table.init(&inst, &elems, 1, 0, 3).unwrap();

        assert!(table.get(0).unwrap().is_none());
        let first = table.call_indirect::<Add>(1).unwrap();
        assert_eq!((first.func)(first.instance, 5), Ok(105));
        assert!(table.get(2).unwrap().is_none());
        let third = table.call_indirect::<Add>(3).unwrap();
        assert_eq!((third.func)(third.instance, 5), Ok(4));
    }

    #[test]
    fn init_checks_both_ranges_before_writing() {
        let elems: [ElemExpr<(), ()>; 2] = [
            ElemExpr::RefFunc(FuncDesc::new(inc as UnaryI32, |_| ())),
            ElemExpr::RefFunc(FuncDesc::new(inc as UnaryI32, |_| ())),
        ];
        let mut table = FuncTable::<(), 4>::try_new(4).unwrap();
        assert_eq!(
            table.init((), &elems, 0, 1, 2),
            Err(WasmTrap::TableOutOfBounds)
        );
        assert_eq!(
            table.init((), &elems, 3, 0, 2),
            Err(WasmTrap::TableOutOfBounds)
        );
        assert!(table.get(0).unwrap().is_none());
        assert!(table.get(3).unwrap().is_none());
    }

    #[test]
    fn return_call_indirect_uses_fallback() {
        let mut table = FuncTable::<(), 2>::try_new(2).unwrap();
        table.set(0, Some(inc_ref())).unwrap();
        let mut next = None;
        table.return_call_indirect::<UnaryI32>(0, &mut next).unwrap();
        let Some(first) = next else {
            panic!("nothing scheduled");
        };
        let mut stack = TailCallStack::new();
        stack.set(0, 9i32).unwrap();
        trampoline(first, &mut stack).unwrap();
        assert_eq!(i32::load(&stack), Ok(10));
    }

    #[test]
    fn return_call_indirect_checks_like_call_indirect() {
        let mut table = FuncTable::<(), 2>::try_new(2).unwrap();
        table.set(0, Some(FuncRef::new(widen as UnaryI64, ()))).unwrap();
        let mut next = None;
        assert_eq!(
            table.return_call_indirect::<UnaryI32>(0, &mut next),
            Err(WasmTrap::IndirectCallTypeMismatch)
        );
        assert_eq!(
            table.return_call_indirect::<UnaryI64>(1, &mut next),
            Err(WasmTrap::UndefinedElement)
        );
        assert!(next.is_none());
    }
}

// ── Kani Formal Verification Proofs ──────────────────────────────────────

#[cfg(kani)]
mod proofs {
    use super::*;

    /// Proof: get never panics, only returns Ok or Err.
    #[kani::proof]
    #[kani::unwind(1)]
    fn get_never_panics() {
        let table = ExternTable::<8>::try_new(4).unwrap();
        let index: u32 = kani::any();
        let _ = table.get(index);
    }

    /// Proof: set followed by get returns the same value.
    #[kani::proof]
    #[kani::unwind(1)]
    fn set_get_roundtrip() {
        let mut table = ExternTable::<8>::try_new(4).unwrap();
        let index: u32 = kani::any();
        let value = ExternRef::new(kani::any());
        if table.set(index, value).is_ok() {
            kani::assert((index as usize) < table.size(), "successful set implies index < size");
            kani::assert(table.get(index) == Ok(value), "get returns what set stored");
        }
    }

    /// Proof: grow respects MAX_SIZE: active_size never exceeds it.
    #[kani::proof]
    #[kani::unwind(5)]
    fn grow_respects_max_size() {
        let mut table = ExternTable::<4>::try_new(1).unwrap();
        let delta: u32 = kani::any();
        let old_size = table.size();
        let result = table.grow(delta, None);
        kani::assert(table.size() <= 4, "active_size must not exceed MAX_SIZE");
        if result >= 0 {
            kani::assert(result == old_size as i32, "grow returns old size");
        } else {
            kani::assert(table.size() == old_size, "failed grow leaves size unchanged");
        }
    }

    /// Proof: every range helper result lies inside the table.
    #[kani::proof]
    fn table_range_is_in_bounds() {
        let start: u32 = kani::any();
        let len: u32 = kani::any();
        if let Ok(range) = table_range(start, len, 8) {
            kani::assert(range.end <= 8, "range end within size");
            kani::assert(range.start <= range.end, "range is ordered");
        }
    }
}
