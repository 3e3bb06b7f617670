//! `wasmguard-runtime`: runtime support for ahead-of-time compiled WebAssembly.
//!
//! Compiled module code calls into this crate on every memory access,
//! trapping arithmetic op, table op and indirect call. It provides:
//! - `IsolatedMemory<MAX_PAGES, C>` for Wasm linear memory, with the bounds
//!   check policy and byte layout fixed at compile time by a [`MemoryConfig`]
//! - [`ops`]: trapping division, truncation, rotates, bit counting, NaN-exact
//!   float operations
//! - `Table<T, MAX_SIZE>` for funcref/externref tables and signature-checked
//!   `call_indirect`
//! - [`CallDepth`] and the tail-call [`trampoline`]
//! - `WasmTrap` / `WasmResult<T>` shared by all of the above
//!
//! This crate is `#![no_std]`. Cargo features:
//! - `call-depth-guard` (default): `CallDepth` counts and traps
//! - `guard-pages`: [`DefaultConfig`] uses the [`GuardPages`] policy
//! - `portable-bitops`: bit counting via the portable fallbacks
//! - `segue`: GS-relative addressing (`segue` module, x86_64 Linux)
//! - `trace`: `tracing` events on traps and construction failures

#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

/// Emits a `tracing` event when the `trace` feature is enabled, nothing otherwise.
macro_rules! trace_event {
    ($($arg:tt)*) => {
        #[cfg(feature = "trace")]
        tracing::debug!(target: "wasmguard", $($arg)*);
    };
}

/// WebAssembly page size: 64 KiB per the Wasm specification.
pub const PAGE_SIZE: usize = 65536;

mod config;
pub use config::{
    BoundsChecked, ByteLayout, Config, DefaultCheck, DefaultConfig, Enforcing, GuardPages,
    LittleEndianLayout, MemCheck, MemoryConfig, NativeLayout, ReversedLayout, Unchecked,
};

mod memory;
pub use memory::{IsolatedMemory, LinearMemory};

pub mod ops;

mod func;
pub use func::{func_types_eq, FuncType, RawFunc, ValType, WasmFunc, WasmResults, WasmValue};

mod guard;
pub use guard::{
    trampoline, CallDepth, TailCallStack, TailStep, Tailcallee, DEFAULT_MAX_CALL_DEPTH,
    TAIL_CALL_STACK_SLOTS,
};

mod table;
pub use table::{Callee, ElemExpr, ExternRef, ExternTable, FuncDesc, FuncRef, FuncTable, Table};

#[cfg(all(feature = "segue", target_arch = "x86_64", target_os = "linux"))]
pub mod segue;

/// Wasm execution errors. No panics, no unwinding.
///
/// A trap ends the current module execution: generated code propagates it
/// with `?` until it reaches the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WasmTrap {
    /// Memory access out of bounds.
    OutOfBounds,
    /// Integer division or remainder by zero.
    DivisionByZero,
    /// Integer overflow: `MIN / -1`, or a float-to-int truncation whose
    /// input lies outside the target range.
    IntegerOverflow,
    /// Float-to-int truncation of a NaN.
    InvalidConversion,
    /// The call depth guard's maximum was reached.
    CallStackExhausted,
    /// Unreachable instruction executed.
    Unreachable,
    /// Indirect call type mismatch (`call_indirect` signature check).
    IndirectCallTypeMismatch,
    /// Table access out of bounds.
    TableOutOfBounds,
    /// Indirect call through a null table slot.
    UndefinedElement,
}

impl WasmTrap {
    /// True for memory and table out-of-bounds traps.
    pub fn is_out_of_bounds(self) -> bool {
        matches!(self, WasmTrap::OutOfBounds | WasmTrap::TableOutOfBounds)
    }

    /// True for the traps `call_indirect` raises after a successful
    /// index check (null slot or signature mismatch).
    pub fn is_call_indirect(self) -> bool {
        matches!(
            self,
            WasmTrap::UndefinedElement | WasmTrap::IndirectCallTypeMismatch
        )
    }
}

/// Result type for Wasm operations: `Result<T, WasmTrap>`.
pub type WasmResult<T> = Result<T, WasmTrap>;

/// Raise a trap of the given kind.
///
/// Every trap in this crate goes through here, so a host that enables the
/// `trace` feature sees one event per trap.
#[cold]
#[inline(never)]
pub fn trap<T>(kind: WasmTrap) -> WasmResult<T> {
    trace_event!(trap = ?kind, "wasm trap");
    Err(kind)
}

/// Wasm `unreachable`.
#[inline(always)]
pub fn unreachable<T>() -> WasmResult<T> {
    trap(WasmTrap::Unreachable)
}

/// Errors that occur during memory/table construction.
///
/// These are programming errors in the translator, not runtime Wasm traps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionError {
    /// Initial pages exceeds MAX_PAGES for memory.
    MemoryInitialPagesExceedsMax { initial: usize, max: usize },
    /// Initial size exceeds MAX_SIZE for table.
    TableInitialSizeExceedsMax { initial: usize, max: usize },
}

impl From<ConstructionError> for WasmTrap {
    fn from(_: ConstructionError) -> Self {
        // Instantiating with an oversized memory or table is reported to the
        // host the same way an out-of-range access would be.
        WasmTrap::OutOfBounds
    }
}
