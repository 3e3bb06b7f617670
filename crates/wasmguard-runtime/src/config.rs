//! Compile-time memory configuration.
//!
//! A memory's bounds-check policy and byte layout are type parameters, so
//! the choice is baked into the compiled module and every access is a
//! straight-line sequence with no runtime branch on the configuration.
//!
//! | policy          | explicit range check | how an out-of-range access is caught  |
//! |-----------------|----------------------|---------------------------------------|
//! | `BoundsChecked` | yes                  | overflow-safe `addr + n <= size`      |
//! | `GuardPages`    | no                   | the active-region slice faults        |
//! | `Unchecked`     | no                   | not caught; `unsafe` construction     |
//!
//! `DefaultConfig` uses `BoundsChecked` (or `GuardPages` with the
//! `guard-pages` feature) and the host's native layout.

use core::marker::PhantomData;

use crate::{trap, WasmResult, WasmTrap};

mod private {
    pub trait Sealed {}
}

/// Bounds-check policy for linear memory accesses.
pub trait MemCheck: private::Sealed {
    /// Validate an access of `len` bytes at Wasm address `addr` against
    /// `active` bytes, before the address is translated.
    fn check(addr: usize, len: usize, active: usize) -> WasmResult<()>;

    /// Return `active[start..start + len]`.
    ///
    /// # Safety
    /// For `Unchecked` the range must lie inside `active`; the other
    /// policies are safe to call with any range.
    unsafe fn bytes(active: &[u8], start: usize, len: usize) -> WasmResult<&[u8]>;

    /// Mutable variant of `bytes`.
    ///
    /// # Safety
    /// Same contract as `bytes`.
    unsafe fn bytes_mut(active: &mut [u8], start: usize, len: usize) -> WasmResult<&mut [u8]>;
}

/// Policies that never let an out-of-range access through. Memories using
/// them can be constructed safely.
pub trait Enforcing: MemCheck {}

/// Full bounds checking: every access verifies `addr + len <= size`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundsChecked;

/// Guard-page style checking: no explicit range arithmetic. Address
/// translation uses wrapping arithmetic and the slice over the active region
/// rejects anything outside it, the way an unmapped guard region would.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuardPages;

/// No checking at all, for trusted modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unchecked;

impl private::Sealed for BoundsChecked {}
impl private::Sealed for GuardPages {}
impl private::Sealed for Unchecked {}

impl Enforcing for BoundsChecked {}
impl Enforcing for GuardPages {}

impl MemCheck for BoundsChecked {
    #[inline(always)]
    fn check(addr: usize, len: usize, active: usize) -> WasmResult<()> {
        match addr.checked_add(len) {
            Some(end) if end <= active => Ok(()),
            _ => trap(WasmTrap::OutOfBounds),
        }
    }

    #[inline(always)]
    unsafe fn bytes(active: &[u8], start: usize, len: usize) -> WasmResult<&[u8]> {
        // `check` already proved the range; get() keeps this path panic-free.
        match active.get(start..start.wrapping_add(len)) {
            Some(s) => Ok(s),
            None => trap(WasmTrap::OutOfBounds),
        }
    }

    #[inline(always)]
    unsafe fn bytes_mut(active: &mut [u8], start: usize, len: usize) -> WasmResult<&mut [u8]> {
        match active.get_mut(start..start.wrapping_add(len)) {
            Some(s) => Ok(s),
            None => trap(WasmTrap::OutOfBounds),
        }
    }
}

impl MemCheck for GuardPages {
    #[inline(always)]
    fn check(_addr: usize, _len: usize, _active: usize) -> WasmResult<()> {
        Ok(())
    }

    #[inline(always)]
    unsafe fn bytes(active: &[u8], start: usize, len: usize) -> WasmResult<&[u8]> {
        // A wrapped end yields an inverted range, which get() rejects.
        match active.get(start..start.wrapping_add(len)) {
            Some(s) => Ok(s),
            None => trap(WasmTrap::OutOfBounds),
        }
    }

    #[inline(always)]
    unsafe fn bytes_mut(active: &mut [u8], start: usize, len: usize) -> WasmResult<&mut [u8]> {
        match active.get_mut(start..start.wrapping_add(len)) {
            Some(s) => Ok(s),
            None => trap(WasmTrap::OutOfBounds),
        }
    }
}

impl MemCheck for Unchecked {
    #[inline(always)]
    fn check(_addr: usize, _len: usize, _active: usize) -> WasmResult<()> {
        Ok(())
    }

    #[inline(always)]
    unsafe fn bytes(active: &[u8], start: usize, len: usize) -> WasmResult<&[u8]> {
        // SAFETY: forwarded to the caller (see trait docs).
        Ok(unsafe { active.get_unchecked(start..start + len) })
    }

    #[inline(always)]
    unsafe fn bytes_mut(active: &mut [u8], start: usize, len: usize) -> WasmResult<&mut [u8]> {
        // SAFETY: forwarded to the caller (see trait docs).
        Ok(unsafe { active.get_unchecked_mut(start..start + len) })
    }
}

/// Byte layout of a linear memory in host memory.
pub trait ByteLayout: private::Sealed {
    /// When true the region is stored byte-reversed: Wasm address `a` of an
    /// `n`-byte value lives at host index `size - a - n`, and multi-byte
    /// values are stored big-endian.
    const REVERSED: bool;
}

/// Wasm byte order, host index == Wasm address. Native on little-endian hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct LittleEndianLayout;

/// Byte-reversed region. Native on big-endian hosts, where it lets a plain
/// native-endian access read a little-endian Wasm value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReversedLayout;

impl private::Sealed for LittleEndianLayout {}
impl private::Sealed for ReversedLayout {}

impl ByteLayout for LittleEndianLayout {
    const REVERSED: bool = false;
}

impl ByteLayout for ReversedLayout {
    const REVERSED: bool = true;
}

/// The host's native layout.
#[cfg(target_endian = "little")]
pub type NativeLayout = LittleEndianLayout;
/// The host's native layout.
#[cfg(target_endian = "big")]
pub type NativeLayout = ReversedLayout;

/// Policy used by [`DefaultConfig`].
#[cfg(not(feature = "guard-pages"))]
pub type DefaultCheck = BoundsChecked;
/// Policy used by [`DefaultConfig`].
#[cfg(feature = "guard-pages")]
pub type DefaultCheck = GuardPages;

/// Compile-time configuration of an `IsolatedMemory`.
pub trait MemoryConfig {
    type Check: MemCheck;
    type Layout: ByteLayout;
}

/// A `MemoryConfig` assembled from a policy and a layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Config<K, L>(PhantomData<(K, L)>);

impl<K: MemCheck, L: ByteLayout> MemoryConfig for Config<K, L> {
    type Check = K;
    type Layout = L;
}

/// Configuration used when a memory names none.
pub type DefaultConfig = Config<DefaultCheck, NativeLayout>;

/// Host start index of an `len`-byte access at Wasm address `addr`.
///
/// Wrapping arithmetic: for checked policies the range is already known to
/// be valid, for `GuardPages` a wrapped index is rejected by the slice.
#[inline(always)]
pub(crate) fn host_index<L: ByteLayout>(active: usize, addr: usize, len: usize) -> usize {
    if L::REVERSED {
        active.wrapping_sub(addr).wrapping_sub(len)
    } else {
        addr
    }
}
