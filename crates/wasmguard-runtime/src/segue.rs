//! Segment-relative linear memory access ("segue"), x86_64 Linux only.
//!
//! While a [`SegueMemory`] is installed, the GS segment base points at the
//! memory's backing array and every access is a single `gs:[addr]`
//! instruction: no base register, no base add. Installing saves the previous
//! GS base and dropping restores it.
//!
//! Requirements:
//! - the CPU supports FSGSBASE and the kernel has enabled it (Linux 5.9+)
//! - exactly one memory, unshared, used from the installing thread
//! - nothing else on the thread touches GS while installed
//!
//! Segue accesses always range check against the active size, whatever the
//! memory's policy, since there is no slice behind them to reject a stray
//! address. Only the little-endian layout is supported.

use core::arch::asm;

use crate::config::{BoundsChecked, ByteLayout, MemCheck, MemoryConfig};
use crate::{DefaultConfig, IsolatedMemory, LinearMemory, WasmResult};

/// An `IsolatedMemory` whose base is installed in GS.
pub struct SegueMemory<'m, const MAX_PAGES: usize, C: MemoryConfig = DefaultConfig> {
    memory: &'m mut IsolatedMemory<MAX_PAGES, C>,
    saved_base: u64,
}

impl<'m, const MAX_PAGES: usize, C: MemoryConfig> SegueMemory<'m, MAX_PAGES, C> {
    /// Point GS at `memory`.
    ///
    /// # Safety
    /// FSGSBASE must be available and enabled, and nothing else on this
    /// thread may read or write the GS base until the returned value is
    /// dropped.
    pub unsafe fn install(memory: &'m mut IsolatedMemory<MAX_PAGES, C>) -> Self {
        const {
            assert!(
                !<C::Layout as ByteLayout>::REVERSED,
                "segue requires the little-endian layout"
            )
        };
        // SAFETY: forwarded to the caller.
        let saved_base = unsafe { read_gs_base() };
        let base = memory.base_ptr() as u64;
        // SAFETY: forwarded to the caller; the borrow keeps `base` valid
        // until drop.
        unsafe { write_gs_base(base) };
        trace_event!(base, saved_base, "segue installed");
        Self { memory, saved_base }
    }

    /// The installed memory.
    #[inline(always)]
    pub fn memory(&self) -> &IsolatedMemory<MAX_PAGES, C> {
        self.memory
    }

    /// Mutable access to the installed memory. The backing array never
    /// moves, so the installed base stays valid.
    #[inline(always)]
    pub fn memory_mut(&mut self) -> &mut IsolatedMemory<MAX_PAGES, C> {
        self.memory
    }

    /// Catch a GS base changed behind our back.
    #[inline(always)]
    fn check_base(&self) {
        // SAFETY: install verified FSGSBASE use is allowed.
        debug_assert_eq!(
            unsafe { read_gs_base() },
            self.memory.base_ptr() as u64,
            "GS base changed while segue memory was installed"
        );
    }

    /// Range check first: a rejected access never touches GS.
    #[inline(always)]
    fn check(&self, addr: usize, len: usize) -> WasmResult<()> {
        BoundsChecked::check(addr, len, self.memory.active_size())?;
        self.check_base();
        Ok(())
    }
}

impl<const MAX_PAGES: usize, C: MemoryConfig> LinearMemory for SegueMemory<'_, MAX_PAGES, C> {
    #[inline(always)]
    fn size(&self) -> i32 {
        self.memory.size()
    }

    /// The backing array never moves, so the installed base stays valid.
    #[inline(always)]
    fn grow(&mut self, delta: u32) -> i32 {
        self.memory.grow(delta)
    }

    #[inline(always)]
    fn load_u8(&self, addr: usize) -> WasmResult<u8> {
        self.check(addr, 1)?;
        let v: u32;
        // SAFETY: GS points at the backing array and the access is in bounds.
        unsafe {
            asm!("movzx {v:e}, byte ptr gs:[{a}]", a = in(reg) addr, v = out(reg) v,
                options(nostack, readonly, preserves_flags));
        }
        Ok(v as u8)
    }

    #[inline(always)]
    fn load_u16(&self, addr: usize) -> WasmResult<u16> {
        self.check(addr, 2)?;
        let v: u32;
        // SAFETY: as in load_u8.
        unsafe {
            asm!("movzx {v:e}, word ptr gs:[{a}]", a = in(reg) addr, v = out(reg) v,
                options(nostack, readonly, preserves_flags));
        }
        Ok(v as u16)
    }

    #[inline(always)]
    fn load_u32(&self, addr: usize) -> WasmResult<u32> {
        self.check(addr, 4)?;
        let v: u32;
        // SAFETY: as in load_u8.
        unsafe {
            asm!("mov {v:e}, dword ptr gs:[{a}]", a = in(reg) addr, v = out(reg) v,
                options(nostack, readonly, preserves_flags));
        }
        Ok(v)
    }

    #[inline(always)]
    fn load_u64(&self, addr: usize) -> WasmResult<u64> {
        self.check(addr, 8)?;
        let v: u64;
        // SAFETY: as in load_u8.
        unsafe {
            asm!("mov {v}, qword ptr gs:[{a}]", a = in(reg) addr, v = out(reg) v,
                options(nostack, readonly, preserves_flags));
        }
        Ok(v)
    }

    #[inline(always)]
    fn store_u8(&mut self, addr: usize, value: u8) -> WasmResult<()> {
        self.check(addr, 1)?;
        // SAFETY: GS points at the backing array, which `self` borrows
        // mutably, and the access is in bounds.
        unsafe {
            asm!("mov byte ptr gs:[{a}], {v}", a = in(reg) addr, v = in(reg_byte) value,
                options(nostack, preserves_flags));
        }
        Ok(())
    }

    #[inline(always)]
    fn store_u16(&mut self, addr: usize, value: u16) -> WasmResult<()> {
        self.check(addr, 2)?;
        // SAFETY: as in store_u8.
        unsafe {
            asm!("mov word ptr gs:[{a}], {v:x}", a = in(reg) addr, v = in(reg) value,
                options(nostack, preserves_flags));
        }
        Ok(())
    }

    #[inline(always)]
    fn store_u32(&mut self, addr: usize, value: u32) -> WasmResult<()> {
        self.check(addr, 4)?;
        // SAFETY: as in store_u8.
        unsafe {
            asm!("mov dword ptr gs:[{a}], {v:e}", a = in(reg) addr, v = in(reg) value,
                options(nostack, preserves_flags));
        }
        Ok(())
    }

    #[inline(always)]
    fn store_u64(&mut self, addr: usize, value: u64) -> WasmResult<()> {
        self.check(addr, 8)?;
        // SAFETY: as in store_u8.
        unsafe {
            asm!("mov qword ptr gs:[{a}], {v}", a = in(reg) addr, v = in(reg) value,
                options(nostack, preserves_flags));
        }
        Ok(())
    }

    // Bulk ops go through the ordinary slice path: same bytes, same checks.

    fn memory_fill(&mut self, dst: u32, value: u8, len: u32) -> WasmResult<()> {
        self.memory_mut().memory_fill(dst, value, len)
    }

    fn memory_copy(&mut self, dst: u32, src: u32, len: u32) -> WasmResult<()> {
        self.memory_mut().memory_copy(dst, src, len)
    }

    fn memory_init(&mut self, data: &[u8], dst: u32, src: u32, len: u32) -> WasmResult<()> {
        self.memory_mut().memory_init(data, dst, src, len)
    }
}

impl<const MAX_PAGES: usize, C: MemoryConfig> Drop for SegueMemory<'_, MAX_PAGES, C> {
    fn drop(&mut self) {
        // SAFETY: restores the base saved by install.
        unsafe { write_gs_base(self.saved_base) };
        trace_event!(saved_base = self.saved_base, "segue removed");
    }
}

// rdgsbase/wrgsbase are emitted as raw bytes: the assembler only accepts the
// mnemonics when the fsgsbase target feature is enabled.

/// `rdgsbase rax`
#[inline(always)]
unsafe fn read_gs_base() -> u64 {
    let base: u64;
    // SAFETY: forwarded to the caller.
    unsafe {
        asm!(".byte 0xf3, 0x48, 0x0f, 0xae, 0xc8", out("rax") base,
            options(nomem, nostack, preserves_flags));
    }
    base
}

/// `wrgsbase rax`
#[inline(always)]
unsafe fn write_gs_base(base: u64) {
    // SAFETY: forwarded to the caller.
    unsafe {
        asm!(".byte 0xf3, 0x48, 0x0f, 0xae, 0xd8", in("rax") base,
            options(nostack, preserves_flags));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{WasmTrap, PAGE_SIZE};
    use core::ffi::c_ulong;
    use core::mem::ManuallyDrop;

    extern "C" {
        fn getauxval(kind: c_ulong) -> c_ulong;
    }

    const AT_HWCAP2: c_ulong = 26;
    const HWCAP2_FSGSBASE: c_ulong = 1 << 1;

    /// The kernel sets this bit only once it has enabled FSGSBASE for user space.
    fn fsgsbase_enabled() -> bool {
        // SAFETY: getauxval has no preconditions.
        unsafe { getauxval(AT_HWCAP2) & HWCAP2_FSGSBASE != 0 }
    }

    #[test]
    fn out_of_bounds_rejected_before_gs() {
        let mut mem = IsolatedMemory::<1>::try_new(1).unwrap();
        // Never installed, never dropped: only the range check runs.
        let mut segue = ManuallyDrop::new(SegueMemory { memory: &mut mem, saved_base: 0 });
        assert_eq!(segue.load_u8(PAGE_SIZE), Err(WasmTrap::OutOfBounds));
        assert_eq!(segue.load_i64(PAGE_SIZE - 4), Err(WasmTrap::OutOfBounds));
        assert_eq!(segue.i64_load32_s(usize::MAX), Err(WasmTrap::OutOfBounds));
        assert_eq!(segue.store_f32(PAGE_SIZE - 3, 1.0), Err(WasmTrap::OutOfBounds));
        assert_eq!(segue.i32_store16(PAGE_SIZE - 1, 7), Err(WasmTrap::OutOfBounds));
        assert_eq!(segue.memory_fill(PAGE_SIZE as u32, 0, 1), Err(WasmTrap::OutOfBounds));
        assert_eq!(segue.size(), 1);
    }

    #[test]
    fn segue_roundtrip_and_restore() {
        if !fsgsbase_enabled() {
            return;
        }
        let mut mem = IsolatedMemory::<1>::try_new(1).unwrap();
        // SAFETY: FSGSBASE is enabled; the test thread does not otherwise use GS.
        let before = unsafe { read_gs_base() };
        {
            // SAFETY: as above.
            let mut segue = unsafe { SegueMemory::install(&mut mem) };
            segue.store_i32(16, 0x1234_5678).unwrap();
            segue.store_u8(0, 0xAB).unwrap();
            segue.i64_store32(32, -1).unwrap();
            assert_eq!(segue.load_i32(16), Ok(0x1234_5678));
            assert_eq!(segue.load_u16(16), Ok(0x5678));
            assert_eq!(segue.i32_load8_s(0), Ok(-85));
            assert_eq!(segue.i64_load32_u(32), Ok(0xFFFF_FFFF));
            assert_eq!(segue.load_i64(32), Ok(0xFFFF_FFFF));
            segue.memory_copy(40, 16, 4).unwrap();
            assert_eq!(segue.load_u32(40), Ok(0x1234_5678));
            assert_eq!(segue.load_i64(PAGE_SIZE - 4), Err(WasmTrap::OutOfBounds));
        }
        // SAFETY: as above.
        assert_eq!(unsafe { read_gs_base() }, before);
        // The same bytes are visible through the ordinary path.
        assert_eq!(mem.load_i32(16), Ok(0x1234_5678));
        assert_eq!(mem.load_u8(0), Ok(0xAB));
    }
}
