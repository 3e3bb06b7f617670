//! Function types and type-erased entry points.
//!
//! A table slot holds functions of every signature, so the entry point is
//! stored erased as a [`RawFunc`] next to the function's canonical
//! [`FuncType`]. `call_indirect` compares the stored type against the type
//! the call site expects and only then restores the concrete Rust function
//! pointer. The [`WasmFunc`] impls below tie both sides together: a Rust
//! signature `fn(C, i32, f64) -> WasmResult<i64>` always maps to the same
//! `FuncType`, and equal `FuncType`s always mean the same Rust signature.

use crate::{TailCallStack, WasmResult};

/// Wasm value types, encoded with their binary-format type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValType {
    I32 = 0x7f,
    I64 = 0x7e,
    F32 = 0x7d,
    F64 = 0x7c,
    FuncRef = 0x70,
    ExternRef = 0x6f,
}

/// Canonical 32-byte encoding of a function type.
///
/// Layout: `[param count, result count, param codes.., result codes.., 0..]`.
/// Two types are equal exactly when their encodings are byte-identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncType([u8; 32]);

impl FuncType {
    /// Most params plus results a single encoding can hold.
    pub const MAX_ARITY: usize = 30;

    /// Encode a function type.
    ///
    /// # Panics
    /// If `params.len() + results.len()` exceeds [`Self::MAX_ARITY`]. Used in
    /// `const` items, this is a compile-time error.
    pub const fn new(params: &[ValType], results: &[ValType]) -> Self {
        assert!(
            params.len() + results.len() <= Self::MAX_ARITY,
            "function type has too many params and results"
        );
        let mut bytes = [0u8; 32];
        bytes[0] = params.len() as u8;
        bytes[1] = results.len() as u8;
        let mut i = 0;
        while i < params.len() {
            bytes[2 + i] = params[i] as u8;
            i += 1;
        }
        let mut j = 0;
        while j < results.len() {
            bytes[2 + params.len() + j] = results[j] as u8;
            j += 1;
        }
        Self(bytes)
    }

    #[inline(always)]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[inline(always)]
    pub const fn param_count(&self) -> usize {
        self.0[0] as usize
    }

    #[inline(always)]
    pub const fn result_count(&self) -> usize {
        self.0[1] as usize
    }
}

/// Function type equality: same object, or byte-identical encodings.
#[inline(always)]
pub fn func_types_eq(a: &FuncType, b: &FuncType) -> bool {
    core::ptr::eq(a, b) || a.0 == b.0
}

/// A type-erased function entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFunc(*const ());

impl RawFunc {
    #[inline(always)]
    pub fn as_ptr(self) -> *const () {
        self.0
    }
}

mod private {
    pub trait Sealed {}
}

/// A Wasm number type, as carried through the tail-call scratch stack.
pub trait WasmValue: Copy + private::Sealed {
    const TYPE: ValType;
    /// Widen to a 64-bit stack slot, bit-exact.
    fn to_slot(self) -> u64;
    fn from_slot(slot: u64) -> Self;
}

impl private::Sealed for i32 {}
impl private::Sealed for i64 {}
impl private::Sealed for f32 {}
impl private::Sealed for f64 {}

impl WasmValue for i32 {
    const TYPE: ValType = ValType::I32;
    #[inline(always)]
    fn to_slot(self) -> u64 {
        self as u32 as u64
    }
    #[inline(always)]
    fn from_slot(slot: u64) -> Self {
        slot as u32 as i32
    }
}

impl WasmValue for i64 {
    const TYPE: ValType = ValType::I64;
    #[inline(always)]
    fn to_slot(self) -> u64 {
        self as u64
    }
    #[inline(always)]
    fn from_slot(slot: u64) -> Self {
        slot as i64
    }
}

impl WasmValue for f32 {
    const TYPE: ValType = ValType::F32;
    #[inline(always)]
    fn to_slot(self) -> u64 {
        self.to_bits() as u64
    }
    #[inline(always)]
    fn from_slot(slot: u64) -> Self {
        f32::from_bits(slot as u32)
    }
}

impl WasmValue for f64 {
    const TYPE: ValType = ValType::F64;
    #[inline(always)]
    fn to_slot(self) -> u64 {
        self.to_bits()
    }
    #[inline(always)]
    fn from_slot(slot: u64) -> Self {
        f64::from_bits(slot)
    }
}

/// The result list of a Wasm function: `()`, one value, or a pair.
pub trait WasmResults: Sized {
    const TYPES: &'static [ValType];
    /// Write the results to the scratch stack, starting at slot 0.
    fn store(self, stack: &mut TailCallStack) -> WasmResult<()>;
    /// Read results written by `store`.
    fn load(stack: &TailCallStack) -> WasmResult<Self>;
}

impl WasmResults for () {
    const TYPES: &'static [ValType] = &[];
    #[inline(always)]
    fn store(self, _stack: &mut TailCallStack) -> WasmResult<()> {
        Ok(())
    }
    #[inline(always)]
    fn load(_stack: &TailCallStack) -> WasmResult<Self> {
        Ok(())
    }
}

macro_rules! single_result {
    ($($t:ty),*) => {
        $(
            impl WasmResults for $t {
                const TYPES: &'static [ValType] = &[<$t as WasmValue>::TYPE];
                #[inline(always)]
                fn store(self, stack: &mut TailCallStack) -> WasmResult<()> {
                    stack.set(0, self)
                }
                #[inline(always)]
                fn load(stack: &TailCallStack) -> WasmResult<Self> {
                    stack.get(0)
                }
            }
        )*
    };
}

single_result!(i32, i64, f32, f64);

impl<A: WasmValue, B: WasmValue> WasmResults for (A, B) {
    const TYPES: &'static [ValType] = &[A::TYPE, B::TYPE];
    #[inline(always)]
    fn store(self, stack: &mut TailCallStack) -> WasmResult<()> {
        stack.set(0, self.0)?;
        stack.set(1, self.1)
    }
    #[inline(always)]
    fn load(stack: &TailCallStack) -> WasmResult<Self> {
        Ok((stack.get(0)?, stack.get(1)?))
    }
}

/// A compiled Wasm function taking instance context `C`.
///
/// # Safety
/// `TYPE` must be the canonical type of `Self`, and no two implementing
/// types may share a `TYPE` for the same `C`. `restore` relies on this to
/// turn a `RawFunc` whose stored type equals `TYPE` back into `Self`.
pub unsafe trait WasmFunc<C>: Copy {
    const TYPE: &'static FuncType;

    fn erase(self) -> RawFunc;

    /// Recover the function erased by [`WasmFunc::erase`].
    ///
    /// # Safety
    /// `raw` must come from `erase` on a value of this exact type.
    unsafe fn restore(raw: RawFunc) -> Self;

    /// Call with arguments read from slots `0..n` of `stack`, and write the
    /// results back from slot 0.
    fn call_with_stack(self, instance: C, stack: &mut TailCallStack) -> WasmResult<()>;
}

macro_rules! wasm_func {
    ($($p:ident $arg:ident $slot:literal),*) => {
        unsafe impl<C, $($p: WasmValue,)* R: WasmResults> WasmFunc<C>
            for fn(C $(, $p)*) -> WasmResult<R>
        {
            const TYPE: &'static FuncType = &FuncType::new(&[$($p::TYPE),*], R::TYPES);

            #[inline(always)]
            fn erase(self) -> RawFunc {
                RawFunc(self as *const ())
            }

            #[inline(always)]
            unsafe fn restore(raw: RawFunc) -> Self {
                // SAFETY: fn pointers and `*const ()` have the same size, and
                // the caller guarantees `raw` was erased from a `Self`.
                unsafe { core::mem::transmute_copy::<*const (), Self>(&raw.0) }
            }

            #[inline(always)]
            fn call_with_stack(self, instance: C, stack: &mut TailCallStack) -> WasmResult<()> {
                $(let $arg: $p = stack.get($slot)?;)*
                self(instance $(, $arg)*)?.store(stack)
            }
        }
    };
}

wasm_func!();
wasm_func!(P0 a0 0);
wasm_func!(P0 a0 0, P1 a1 1);
wasm_func!(P0 a0 0, P1 a1 1, P2 a2 2);
wasm_func!(P0 a0 0, P1 a1 1, P2 a2 2, P3 a3 3);
wasm_func!(P0 a0 0, P1 a1 1, P2 a2 2, P3 a3 3, P4 a4 4);
wasm_func!(P0 a0 0, P1 a1 1, P2 a2 2, P3 a3 3, P4 a4 4, P5 a5 5);
