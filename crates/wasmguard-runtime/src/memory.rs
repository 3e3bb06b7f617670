//! WebAssembly linear memory: `IsolatedMemory<const MAX_PAGES: usize, C>`.
//!
//! The backing array is `[[u8; PAGE_SIZE]; MAX_PAGES]`, a 2D array that
//! is contiguous in memory. We use `as_flattened()` (stable since Rust 1.80)
//! to get a flat `&[u8]` view for the inner functions.
//!
//! Every access goes through the same three steps, all resolved at compile
//! time from `C: MemoryConfig`:
//! 1. `C::Check::check`: the bounds-check policy
//! 2. `host_index`: address translation for the configured byte layout
//! 3. `C::Check::bytes`: the slice over the active region
//!
//! Load/store operations use the **outline pattern**: the generic wrapper
//! delegates to an inner function that is generic only over the config and
//! access width, so one copy of the access logic serves every `MAX_PAGES`.

use core::hint::black_box;
use core::marker::PhantomData;
use core::mem::MaybeUninit;

use crate::config::{host_index, BoundsChecked, ByteLayout, Enforcing, MemCheck, MemoryConfig};
use crate::{trap, ConstructionError, DefaultConfig, WasmResult, WasmTrap, PAGE_SIZE};

macro_rules! extending_loads {
    ([] $($name:ident: $load:ident as $narrow:ty => $wide:ty;)*) => {
        $(
            #[doc = concat!("Wasm `", stringify!($name), "`: load and extend to `", stringify!($wide), "`.")]
            #[inline(always)]
            fn $name(&self, addr: usize) -> WasmResult<$wide> {
                self.$load(addr).map(|v| v as $narrow as $wide)
            }
        )*
    };
    ([$vis:vis] $($name:ident: $load:ident as $narrow:ty => $wide:ty;)*) => {
        $(
            #[doc = concat!("Wasm `", stringify!($name), "`: load and extend to `", stringify!($wide), "`.")]
            #[inline(always)]
            $vis fn $name(&self, addr: usize) -> WasmResult<$wide> {
                self.$load(addr).map(|v| v as $narrow as $wide)
            }
        )*
    };
}

macro_rules! narrowing_stores {
    ([] $($name:ident: $wide:ty => $store:ident as $narrow:ty;)*) => {
        $(
            #[doc = concat!("Wasm `", stringify!($name), "`: wrap to `", stringify!($narrow), "` and store.")]
            #[inline(always)]
            fn $name(&mut self, addr: usize, value: $wide) -> WasmResult<()> {
                self.$store(addr, value as $narrow)
            }
        )*
    };
    ([$vis:vis] $($name:ident: $wide:ty => $store:ident as $narrow:ty;)*) => {
        $(
            #[doc = concat!("Wasm `", stringify!($name), "`: wrap to `", stringify!($narrow), "` and store.")]
            #[inline(always)]
            $vis fn $name(&mut self, addr: usize, value: $wide) -> WasmResult<()> {
                self.$store(addr, value as $narrow)
            }
        )*
    };
}

/// Isolated linear memory for a single Wasm module.
///
/// `MAX_PAGES` is the compile-time maximum (from the Wasm module's declared
/// maximum or a translator override). The backing array is fully
/// pre-allocated. `C` fixes the bounds-check policy and byte layout.
pub struct IsolatedMemory<const MAX_PAGES: usize, C: MemoryConfig = DefaultConfig> {
    /// Backing storage: `MAX_PAGES` pages of `PAGE_SIZE` bytes each.
    pages: [[u8; PAGE_SIZE]; MAX_PAGES],
    /// Number of currently active pages. Starts at `initial_pages`,
    /// incremented by `grow`. Accesses beyond `active_pages * PAGE_SIZE`
    /// are out-of-bounds traps.
    active_pages: usize,
    _config: PhantomData<C>,
}

fn check_initial_pages(initial_pages: usize, max_pages: usize) -> Result<(), ConstructionError> {
    if initial_pages > max_pages {
        trace_event!(initial_pages, max_pages, "memory initial size exceeds maximum");
        return Err(ConstructionError::MemoryInitialPagesExceedsMax {
            initial: initial_pages,
            max: max_pages,
        });
    }
    Ok(())
}

impl<const MAX_PAGES: usize, C: MemoryConfig> IsolatedMemory<MAX_PAGES, C>
where
    C::Check: Enforcing,
{
    /// Create a new `IsolatedMemory` with `initial_pages` active.
    ///
    /// # Errors
    /// Returns `ConstructionError::MemoryInitialPagesExceedsMax` if `initial_pages > MAX_PAGES`.
    #[inline(never)]
    pub fn try_new(initial_pages: usize) -> Result<Self, ConstructionError> {
        check_initial_pages(initial_pages, MAX_PAGES)?;
        Ok(Self::zeroed(initial_pages))
    }

    /// Initialize a memory in place within a caller-provided slot.
    ///
    /// Unlike `try_new`, this never materialises the memory on the call
    /// stack. Use this when `MAX_PAGES` is large.
    ///
    /// # Errors
    /// Returns `ConstructionError` if `initial_pages` exceeds `MAX_PAGES`.
    #[inline(never)]
    pub fn try_init(
        slot: &mut MaybeUninit<Self>,
        initial_pages: usize,
    ) -> Result<(), ConstructionError> {
        check_initial_pages(initial_pages, MAX_PAGES)?;
        let ptr = slot.as_mut_ptr();
        // SAFETY: ptr comes from MaybeUninit so it is valid for writes and
        // correctly aligned. Every field is written before the caller can
        // call assume_init on the slot; write_bytes(0, 1) zeroes exactly one
        // backing array.
        unsafe {
            core::ptr::addr_of_mut!((*ptr).pages).write_bytes(0, 1);
            core::ptr::addr_of_mut!((*ptr).active_pages).write(initial_pages);
            core::ptr::addr_of_mut!((*ptr)._config).write(PhantomData);
        }
        Ok(())
    }
}

impl<const MAX_PAGES: usize, C: MemoryConfig> IsolatedMemory<MAX_PAGES, C> {
    /// Create a memory whose policy may skip bounds checks (`Unchecked`).
    ///
    /// # Safety
    /// Every load and store made through the returned memory must be in
    /// bounds of the active region. Bulk operations are still range checked.
    #[inline(never)]
    pub unsafe fn try_new_trusted(initial_pages: usize) -> Result<Self, ConstructionError> {
        check_initial_pages(initial_pages, MAX_PAGES)?;
        Ok(Self::zeroed(initial_pages))
    }

    fn zeroed(initial_pages: usize) -> Self {
        Self {
            pages: [[0u8; PAGE_SIZE]; MAX_PAGES],
            active_pages: initial_pages,
            _config: PhantomData,
        }
    }

    /// Current number of active pages.
    #[inline(always)]
    pub fn page_count(&self) -> usize {
        self.active_pages
    }

    /// Current active size in bytes.
    #[inline(always)]
    pub fn active_size(&self) -> usize {
        self.active_pages * PAGE_SIZE
    }

    /// Wasm `memory.size`: returns current page count.
    #[inline(always)]
    pub fn size(&self) -> i32 {
        self.active_pages as i32
    }

    /// Wasm `memory.grow`: returns previous page count, or -1 on failure.
    /// No allocation occurs: the backing array is already sized to `MAX_PAGES`.
    ///
    /// A reversed-layout memory keeps its data at the top of the active
    /// region, so growing moves the existing bytes up and zeroes the bottom.
    pub fn grow(&mut self, delta: u32) -> i32 {
        let old = self.active_pages;
        let new = match old.checked_add(delta as usize) {
            Some(new) if new <= MAX_PAGES => new,
            _ => return -1,
        };
        let old_bytes = old * PAGE_SIZE;
        let new_bytes = new * PAGE_SIZE;
        let flat = self.pages.as_flattened_mut();
        if C::Layout::REVERSED {
            let shift = new_bytes - old_bytes;
            flat.copy_within(0..old_bytes, shift);
            flat[..shift].fill(0);
        } else {
            // Zero-init the new pages (fresh Wasm pages read as zero).
            flat[old_bytes..new_bytes].fill(0);
        }
        self.active_pages = new;
        old as i32
    }

    /// Base address of the backing storage.
    #[inline(always)]
    pub fn base_ptr(&self) -> *const u8 {
        self.pages.as_flattened().as_ptr()
    }

    /// Read-only access to the active memory region, in host byte order
    /// (reversed for a `ReversedLayout` memory).
    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        let size = self.active_size();
        self.pages.as_flattened().get(..size).unwrap_or(&[])
    }

    /// Mutable access to the active memory region, in host byte order.
    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let size = self.active_size();
        match self.pages.as_flattened_mut().get_mut(..size) {
            Some(s) => s,
            None => &mut [],
        }
    }

    // ── Typed load/store ──────────────────────────────────────────────

    /// Load an i32 from linear memory.
    #[inline(always)]
    pub fn load_i32(&self, addr: usize) -> WasmResult<i32> {
        read::<C, 4>(self.as_slice(), addr).map(i32::from_le_bytes)
    }

    /// Load an i64 from linear memory.
    #[inline(always)]
    pub fn load_i64(&self, addr: usize) -> WasmResult<i64> {
        read::<C, 8>(self.as_slice(), addr).map(i64::from_le_bytes)
    }

    /// Load an f32 from linear memory. The bit pattern is preserved, NaN
    /// payloads included.
    #[inline(always)]
    pub fn load_f32(&self, addr: usize) -> WasmResult<f32> {
        read::<C, 4>(self.as_slice(), addr).map(f32::from_le_bytes)
    }

    /// Load an f64 from linear memory.
    #[inline(always)]
    pub fn load_f64(&self, addr: usize) -> WasmResult<f64> {
        read::<C, 8>(self.as_slice(), addr).map(f64::from_le_bytes)
    }

    /// Load one byte from linear memory.
    #[inline(always)]
    pub fn load_u8(&self, addr: usize) -> WasmResult<u8> {
        read::<C, 1>(self.as_slice(), addr).map(u8::from_le_bytes)
    }

    /// Load a u16 from linear memory. The source of the 16-bit extending loads.
    #[inline(always)]
    pub fn load_u16(&self, addr: usize) -> WasmResult<u16> {
        read::<C, 2>(self.as_slice(), addr).map(u16::from_le_bytes)
    }

    /// Load a u32 from linear memory. Same bytes as `load_i32`, unsigned.
    #[inline(always)]
    pub fn load_u32(&self, addr: usize) -> WasmResult<u32> {
        read::<C, 4>(self.as_slice(), addr).map(u32::from_le_bytes)
    }

    /// Load a u64 from linear memory.
    #[inline(always)]
    pub fn load_u64(&self, addr: usize) -> WasmResult<u64> {
        read::<C, 8>(self.as_slice(), addr).map(u64::from_le_bytes)
    }

    /// Store an i32 into linear memory.
    #[inline(always)]
    pub fn store_i32(&mut self, addr: usize, value: i32) -> WasmResult<()> {
        write::<C, 4>(self.as_mut_slice(), addr, value.to_le_bytes())
    }

    /// Store an i64 into linear memory.
    #[inline(always)]
    pub fn store_i64(&mut self, addr: usize, value: i64) -> WasmResult<()> {
        write::<C, 8>(self.as_mut_slice(), addr, value.to_le_bytes())
    }

    /// Store an f32 into linear memory.
    #[inline(always)]
    pub fn store_f32(&mut self, addr: usize, value: f32) -> WasmResult<()> {
        write::<C, 4>(self.as_mut_slice(), addr, value.to_le_bytes())
    }

    /// Store an f64 into linear memory.
    #[inline(always)]
    pub fn store_f64(&mut self, addr: usize, value: f64) -> WasmResult<()> {
        write::<C, 8>(self.as_mut_slice(), addr, value.to_le_bytes())
    }

    /// Store one byte into linear memory.
    #[inline(always)]
    pub fn store_u8(&mut self, addr: usize, value: u8) -> WasmResult<()> {
        write::<C, 1>(self.as_mut_slice(), addr, [value])
    }

    /// Store a u16 into linear memory.
    #[inline(always)]
    pub fn store_u16(&mut self, addr: usize, value: u16) -> WasmResult<()> {
        write::<C, 2>(self.as_mut_slice(), addr, value.to_le_bytes())
    }

    /// Store a u32 into linear memory.
    #[inline(always)]
    pub fn store_u32(&mut self, addr: usize, value: u32) -> WasmResult<()> {
        write::<C, 4>(self.as_mut_slice(), addr, value.to_le_bytes())
    }

    /// Store a u64 into linear memory.
    #[inline(always)]
    pub fn store_u64(&mut self, addr: usize, value: u64) -> WasmResult<()> {
        write::<C, 8>(self.as_mut_slice(), addr, value.to_le_bytes())
    }

    extending_loads! {
        [pub]
        i32_load8_s: load_u8 as i8 => i32;
        i32_load8_u: load_u8 as u8 => i32;
        i32_load16_s: load_u16 as i16 => i32;
        i32_load16_u: load_u16 as u16 => i32;
        i64_load8_s: load_u8 as i8 => i64;
        i64_load8_u: load_u8 as u8 => i64;
        i64_load16_s: load_u16 as i16 => i64;
        i64_load16_u: load_u16 as u16 => i64;
        i64_load32_s: load_u32 as i32 => i64;
        i64_load32_u: load_u32 as u32 => i64;
    }

    narrowing_stores! {
        [pub]
        i32_store8: i32 => store_u8 as u8;
        i32_store16: i32 => store_u16 as u16;
        i64_store8: i64 => store_u8 as u8;
        i64_store16: i64 => store_u16 as u16;
        i64_store32: i64 => store_u32 as u32;
    }

    // ── Bulk memory operations ────────────────────────────────────────
    //
    // These always range check, whatever the policy: a bulk op touches an
    // arbitrary number of bytes and the check is negligible next to it.

    /// Wasm `memory.fill`: set `len` bytes starting at `dst` to `value`.
    pub fn memory_fill(&mut self, dst: u32, value: u8, len: u32) -> WasmResult<()> {
        let active = self.active_size();
        let (dst, len) = (dst as usize, len as usize);
        BoundsChecked::check(dst, len, active)?;
        let start = host_index::<C::Layout>(active, dst, len);
        let region = slice_mut(self.as_mut_slice(), start, len)?;
        region.fill(value);
        Ok(())
    }

    /// Wasm `memory.copy`: copy `len` bytes from `src` to `dst`.
    ///
    /// Semantics match `memmove`: overlapping source and destination regions
    /// are handled correctly. Traps (`OutOfBounds`) if either region extends
    /// beyond the current active memory.
    pub fn memory_copy(&mut self, dst: u32, src: u32, len: u32) -> WasmResult<()> {
        let active = self.active_size();
        let (dst, src, len) = (dst as usize, src as usize, len as usize);
        BoundsChecked::check(dst, len, active)?;
        BoundsChecked::check(src, len, active)?;
        let host_dst = host_index::<C::Layout>(active, dst, len);
        let host_src = host_index::<C::Layout>(active, src, len);
        self.as_mut_slice()
            .copy_within(host_src..host_src + len, host_dst);
        Ok(())
    }

    /// Wasm `memory.copy` between two memories of the same configuration.
    pub fn memory_copy_from<const SRC_PAGES: usize>(
        &mut self,
        src_mem: &IsolatedMemory<SRC_PAGES, C>,
        dst: u32,
        src: u32,
        len: u32,
    ) -> WasmResult<()> {
        let dst_active = self.active_size();
        let src_active = src_mem.active_size();
        let (dst, src, len) = (dst as usize, src as usize, len as usize);
        BoundsChecked::check(dst, len, dst_active)?;
        BoundsChecked::check(src, len, src_active)?;
        let from = slice(
            src_mem.as_slice(),
            host_index::<C::Layout>(src_active, src, len),
            len,
        )?;
        let to = slice_mut(
            self.as_mut_slice(),
            host_index::<C::Layout>(dst_active, dst, len),
            len,
        )?;
        to.copy_from_slice(from);
        Ok(())
    }

    /// Wasm `memory.init`: copy `len` bytes of the passive data segment
    /// `data`, starting at `src`, to `dst`.
    ///
    /// Traps if `src + len` exceeds the segment or `dst + len` exceeds the
    /// active memory.
    pub fn memory_init(&mut self, data: &[u8], dst: u32, src: u32, len: u32) -> WasmResult<()> {
        let active = self.active_size();
        let (dst, src, len) = (dst as usize, src as usize, len as usize);
        BoundsChecked::check(src, len, data.len())?;
        BoundsChecked::check(dst, len, active)?;
        let from = slice(data, src, len)?;
        let start = host_index::<C::Layout>(active, dst, len);
        let to = slice_mut(self.as_mut_slice(), start, len)?;
        to.copy_from_slice(from);
        if C::Layout::REVERSED {
            to.reverse();
        }
        Ok(())
    }

    /// Initialize a region of memory from an active data segment.
    ///
    /// # Errors
    /// Returns `Err(WasmTrap::OutOfBounds)` if `offset + data.len()` exceeds
    /// `active_pages * PAGE_SIZE`.
    #[inline(always)]
    pub fn init_data(&mut self, offset: u32, data: &[u8]) -> WasmResult<()> {
        let len = u32::try_from(data.len()).or_else(|_| trap(WasmTrap::OutOfBounds))?;
        self.memory_init(data, offset, 0, len)
    }
}

// ── Address-translation interface ─────────────────────────────────────

/// The load/store surface generated code is written against.
///
/// Implemented by [`IsolatedMemory`] and, with the `segue` feature, by
/// `segue::SegueMemory`. A compiled function generic over
/// `M: LinearMemory` switches addressing strategy without touching its
/// body; every implementation traps on exactly the same accesses and
/// reads back exactly the same values.
///
/// Implementors provide the unsigned accesses, the size and grow pair and
/// the bulk ops. Signed, float, extending and narrowing forms are derived.
pub trait LinearMemory {
    /// Wasm `memory.size`, in pages.
    fn size(&self) -> i32;

    /// Wasm `memory.grow`: previous page count, or -1.
    fn grow(&mut self, delta: u32) -> i32;

    fn load_u8(&self, addr: usize) -> WasmResult<u8>;
    fn load_u16(&self, addr: usize) -> WasmResult<u16>;
    fn load_u32(&self, addr: usize) -> WasmResult<u32>;
    fn load_u64(&self, addr: usize) -> WasmResult<u64>;

    fn store_u8(&mut self, addr: usize, value: u8) -> WasmResult<()>;
    fn store_u16(&mut self, addr: usize, value: u16) -> WasmResult<()>;
    fn store_u32(&mut self, addr: usize, value: u32) -> WasmResult<()>;
    fn store_u64(&mut self, addr: usize, value: u64) -> WasmResult<()>;

    /// Wasm `memory.fill`.
    fn memory_fill(&mut self, dst: u32, value: u8, len: u32) -> WasmResult<()>;
    /// Wasm `memory.copy` within this memory.
    fn memory_copy(&mut self, dst: u32, src: u32, len: u32) -> WasmResult<()>;
    /// Wasm `memory.init` from a passive data segment.
    fn memory_init(&mut self, data: &[u8], dst: u32, src: u32, len: u32) -> WasmResult<()>;

    #[inline(always)]
    fn load_i32(&self, addr: usize) -> WasmResult<i32> {
        self.load_u32(addr).map(|v| v as i32)
    }

    #[inline(always)]
    fn load_i64(&self, addr: usize) -> WasmResult<i64> {
        self.load_u64(addr).map(|v| v as i64)
    }

    #[inline(always)]
    fn load_f32(&self, addr: usize) -> WasmResult<f32> {
        self.load_u32(addr).map(f32::from_bits)
    }

    #[inline(always)]
    fn load_f64(&self, addr: usize) -> WasmResult<f64> {
        self.load_u64(addr).map(f64::from_bits)
    }

    #[inline(always)]
    fn store_i32(&mut self, addr: usize, value: i32) -> WasmResult<()> {
        self.store_u32(addr, value as u32)
    }

    #[inline(always)]
    fn store_i64(&mut self, addr: usize, value: i64) -> WasmResult<()> {
        self.store_u64(addr, value as u64)
    }

    #[inline(always)]
    fn store_f32(&mut self, addr: usize, value: f32) -> WasmResult<()> {
        self.store_u32(addr, value.to_bits())
    }

    #[inline(always)]
    fn store_f64(&mut self, addr: usize, value: f64) -> WasmResult<()> {
        self.store_u64(addr, value.to_bits())
    }

    extending_loads! {
        []
        i32_load8_s: load_u8 as i8 => i32;
        i32_load8_u: load_u8 as u8 => i32;
        i32_load16_s: load_u16 as i16 => i32;
        i32_load16_u: load_u16 as u16 => i32;
        i64_load8_s: load_u8 as i8 => i64;
        i64_load8_u: load_u8 as u8 => i64;
        i64_load16_s: load_u16 as i16 => i64;
        i64_load16_u: load_u16 as u16 => i64;
        i64_load32_s: load_u32 as i32 => i64;
        i64_load32_u: load_u32 as u32 => i64;
    }

    narrowing_stores! {
        []
        i32_store8: i32 => store_u8 as u8;
        i32_store16: i32 => store_u16 as u16;
        i64_store8: i64 => store_u8 as u8;
        i64_store16: i64 => store_u16 as u16;
        i64_store32: i64 => store_u32 as u32;
    }
}

impl<const MAX_PAGES: usize, C: MemoryConfig> LinearMemory for IsolatedMemory<MAX_PAGES, C> {
    #[inline(always)]
    fn size(&self) -> i32 {
        IsolatedMemory::size(self)
    }

    #[inline(always)]
    fn grow(&mut self, delta: u32) -> i32 {
        IsolatedMemory::grow(self, delta)
    }

    #[inline(always)]
    fn load_u8(&self, addr: usize) -> WasmResult<u8> {
        IsolatedMemory::load_u8(self, addr)
    }

    #[inline(always)]
    fn load_u16(&self, addr: usize) -> WasmResult<u16> {
        IsolatedMemory::load_u16(self, addr)
    }

    #[inline(always)]
    fn load_u32(&self, addr: usize) -> WasmResult<u32> {
        IsolatedMemory::load_u32(self, addr)
    }

    #[inline(always)]
    fn load_u64(&self, addr: usize) -> WasmResult<u64> {
        IsolatedMemory::load_u64(self, addr)
    }

    #[inline(always)]
    fn store_u8(&mut self, addr: usize, value: u8) -> WasmResult<()> {
        IsolatedMemory::store_u8(self, addr, value)
    }

    #[inline(always)]
    fn store_u16(&mut self, addr: usize, value: u16) -> WasmResult<()> {
        IsolatedMemory::store_u16(self, addr, value)
    }

    #[inline(always)]
    fn store_u32(&mut self, addr: usize, value: u32) -> WasmResult<()> {
        IsolatedMemory::store_u32(self, addr, value)
    }

    #[inline(always)]
    fn store_u64(&mut self, addr: usize, value: u64) -> WasmResult<()> {
        IsolatedMemory::store_u64(self, addr, value)
    }

    fn memory_fill(&mut self, dst: u32, value: u8, len: u32) -> WasmResult<()> {
        IsolatedMemory::memory_fill(self, dst, value, len)
    }

    fn memory_copy(&mut self, dst: u32, src: u32, len: u32) -> WasmResult<()> {
        IsolatedMemory::memory_copy(self, dst, src, len)
    }

    fn memory_init(&mut self, data: &[u8], dst: u32, src: u32, len: u32) -> WasmResult<()> {
        IsolatedMemory::memory_init(self, data, dst, src, len)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────

/// `memory[start..start + len]`, trapping instead of panicking.
#[inline(always)]
fn slice(memory: &[u8], start: usize, len: usize) -> WasmResult<&[u8]> {
    match start.checked_add(len).and_then(|end| memory.get(start..end)) {
        Some(s) => Ok(s),
        None => trap(WasmTrap::OutOfBounds),
    }
}

/// Mutable variant of `slice`.
#[inline(always)]
fn slice_mut(memory: &mut [u8], start: usize, len: usize) -> WasmResult<&mut [u8]> {
    match start.checked_add(len).and_then(|end| memory.get_mut(start..end)) {
        Some(s) => Ok(s),
        None => trap(WasmTrap::OutOfBounds),
    }
}

/// Convert a slice to a fixed-size array. Traps if the length doesn't
/// match; never panics.
#[inline(always)]
fn to_array<const N: usize>(slice: &[u8]) -> WasmResult<[u8; N]> {
    match slice.try_into() {
        Ok(bytes) => Ok(bytes),
        Err(_) => trap(WasmTrap::OutOfBounds),
    }
}

// ── Inner access functions (outline pattern) ─────────────────────────
//
// Generic over the config and width only: one copy per (C, N), shared by
// every MAX_PAGES. No unwrap(), no indexing, no panic paths.

/// Read the `N` bytes at Wasm address `addr`, in Wasm (little-endian) order.
///
/// The result passes through `black_box` so a load whose value the caller
/// ignores is still performed, and still traps.
#[inline(never)]
fn read<C: MemoryConfig, const N: usize>(active: &[u8], addr: usize) -> WasmResult<[u8; N]> {
    C::Check::check(addr, N, active.len())?;
    let start = host_index::<C::Layout>(active.len(), addr, N);
    // SAFETY: either `check` proved the range, the policy's slice access
    // rejects it, or the memory came from `try_new_trusted`, whose caller
    // guarantees the access is in bounds.
    let s = unsafe { C::Check::bytes(active, start, N) }?;
    let mut bytes: [u8; N] = to_array(s)?;
    if C::Layout::REVERSED {
        bytes.reverse();
    }
    Ok(black_box(bytes))
}

/// Write `bytes` (Wasm order) at Wasm address `addr`.
#[inline(never)]
fn write<C: MemoryConfig, const N: usize>(
    active: &mut [u8],
    addr: usize,
    mut bytes: [u8; N],
) -> WasmResult<()> {
    C::Check::check(addr, N, active.len())?;
    let start = host_index::<C::Layout>(active.len(), addr, N);
    if C::Layout::REVERSED {
        bytes.reverse();
    }
    // SAFETY: as in `read`.
    let s = unsafe { C::Check::bytes_mut(active, start, N) }?;
    s.copy_from_slice(&bytes);
    Ok(())
}


// ── Kani Formal Verification Proofs ──────────────────────────────────────
//
// Run with: cargo kani -p wasmguard-runtime
//
// The proofs establish that:
// - loads/stores either succeed or trap, never panic, under every policy
// - a successful access lies inside the active region
// - store/load roundtrips preserve values in both layouts
// - grow respects MAX_PAGES

#[cfg(kani)]
mod proofs {
    use super::*;
    use crate::config::{Config, GuardPages, LittleEndianLayout, ReversedLayout};

    /// Proof: a successful load implies `offset + 4 <= active_size`.
    #[kani::proof]
    #[kani::unwind(1)]
    fn load_success_implies_valid_range() {
        let mem = IsolatedMemory::<1>::try_new(1).unwrap();
        let offset: usize = kani::any();
        if mem.load_i32(offset).is_ok() {
            let end = offset.checked_add(4);
            kani::assert(end.is_some(), "successful load offset does not overflow");
            kani::assert(
                end.unwrap() <= mem.active_size(),
                "successful load is within bounds",
            );
        }
    }

    /// Proof: the guard-page policy accepts exactly what bounds checking accepts.
    #[kani::proof]
    #[kani::unwind(1)]
    fn guard_pages_agree_with_bounds_check() {
        let checked = IsolatedMemory::<1, Config<BoundsChecked, LittleEndianLayout>>::try_new(1)
            .unwrap();
        let guarded = IsolatedMemory::<1, Config<GuardPages, LittleEndianLayout>>::try_new(1)
            .unwrap();
        let offset: usize = kani::any();
        kani::assert(
            checked.load_i64(offset).is_ok() == guarded.load_i64(offset).is_ok(),
            "policies agree on every offset",
        );
    }

    /// Proof: reversed-layout store followed by load returns the same value.
    #[kani::proof]
    #[kani::unwind(1)]
    fn store_load_roundtrip_reversed() {
        let mut mem = IsolatedMemory::<1, Config<BoundsChecked, ReversedLayout>>::try_new(1)
            .unwrap();
        let offset: usize = kani::any();
        let value: i64 = kani::any();
        if mem.store_i64(offset, value).is_ok() {
            kani::assert(mem.load_i64(offset) == Ok(value), "roundtrip preserves value");
        }
    }

    /// Proof: grow respects MAX_PAGES.
    #[kani::proof]
    #[kani::unwind(5)]
    fn grow_respects_max_pages() {
        let mut mem = IsolatedMemory::<4>::try_new(1).unwrap();
        let delta: u32 = kani::any();
        let old_pages = mem.page_count();
        let result = mem.grow(delta);
        kani::assert(mem.page_count() <= 4, "active_pages must not exceed MAX_PAGES");
        if result < 0 {
            kani::assert(mem.page_count() == old_pages, "failed grow leaves pages unchanged");
        }
    }
}
