//! Passthrough to the host's real x87 FPU.
//!
//! Rust and LLVM never emit x87 instructions of their own on x86-64 (all
//! float code goes through SSE), so the x87 register file belongs entirely
//! to the `asm!` blocks below and its state persists between calls. The one
//! thing this module promises is that the `Extended` bit patterns read back
//! out match what the real hardware produced; everything in between is the
//! CPU's business.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

use core::arch::asm;

use crate::float::{Double, Extended, Single};
use crate::fpu::Fpu;

static CLAIMED: AtomicBool = AtomicBool::new(false);

/// Issues an x87 instruction that names a register-stack operand. The
/// register number is part of the instruction text, so a runtime index has
/// to be dispatched over the eight spellings.
macro_rules! st_asm {
    ($before:tt, $after:tt, $i:expr) => {
        match $i {
            0 => unsafe { asm!(concat!($before, "0", $after)) },
            1 => unsafe { asm!(concat!($before, "1", $after)) },
            2 => unsafe { asm!(concat!($before, "2", $after)) },
            3 => unsafe { asm!(concat!($before, "3", $after)) },
            4 => unsafe { asm!(concat!($before, "4", $after)) },
            5 => unsafe { asm!(concat!($before, "5", $after)) },
            6 => unsafe { asm!(concat!($before, "6", $after)) },
            7 => unsafe { asm!(concat!($before, "7", $after)) },
            i => unreachable!("register index {} out of range", i),
        }
    };
}

/// The host's x87, behind the same interface as the software model.
///
/// The register file is process-global state, so at most one `HardFpu` is
/// alive at a time: [`HardFpu::claim`] hands out the construction token and
/// `Drop` returns it. Nothing stops *other* code in the process from
/// emitting x87 instructions while the token is held; keeping the oracle
/// uncontaminated is the caller's job. x87 state lives in the current
/// thread's context, so the type is neither `Send` nor `Sync`.
pub struct HardFpu {
    _not_send: PhantomData<*mut ()>,
}

impl HardFpu {
    /// Claims the host FPU and resets its register stack.
    ///
    /// Returns `None` while another instance is alive.
    pub fn claim() -> Option<HardFpu> {
        CLAIMED
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()?;
        unsafe { asm!("fninit") };
        Some(HardFpu {
            _not_send: PhantomData,
        })
    }
}

impl Drop for HardFpu {
    fn drop(&mut self) {
        CLAIMED.store(false, Ordering::Release);
    }
}

impl fmt::Debug for HardFpu {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("HardFpu")
    }
}

impl Fpu for HardFpu {
    fn fld(&mut self, f: Extended) {
        let bytes = f.to_bytes();
        unsafe { asm!("fld tbyte ptr [{}]", in(reg) &bytes) };
    }

    fn fld_double(&mut self, f: Double) {
        let bits = f.to_bits();
        unsafe { asm!("fld qword ptr [{}]", in(reg) &bits) };
    }

    fn fld_single(&mut self, f: Single) {
        let bits = f.to_bits();
        unsafe { asm!("fld dword ptr [{}]", in(reg) &bits) };
    }

    fn fld_st(&mut self, i: usize) {
        st_asm!("fld st(", ")", i);
    }

    fn fild_i16(&mut self, i: i16) {
        unsafe { asm!("fild word ptr [{}]", in(reg) &i) };
    }

    fn fild_i32(&mut self, i: i32) {
        unsafe { asm!("fild dword ptr [{}]", in(reg) &i) };
    }

    fn fild_i64(&mut self, i: i64) {
        unsafe { asm!("fild qword ptr [{}]", in(reg) &i) };
    }

    fn fstp(&mut self) -> Extended {
        let mut bytes = [0u8; 10];
        unsafe { asm!("fstp tbyte ptr [{}]", in(reg) &mut bytes) };
        Extended::from_bytes(bytes)
    }

    fn fstp_double(&mut self) -> Double {
        let mut bits = 0u64;
        unsafe { asm!("fstp qword ptr [{}]", in(reg) &mut bits) };
        Double::from_bits(bits)
    }

    fn fstp_single(&mut self) -> Single {
        let mut bits = 0u32;
        unsafe { asm!("fstp dword ptr [{}]", in(reg) &mut bits) };
        Single::from_bits(bits)
    }

    fn fadd_st(&mut self, i: usize) {
        st_asm!("fadd st(0), st(", ")", i);
    }

    fn faddp_st(&mut self, i: usize) {
        st_asm!("faddp st(", "), st(0)", i);
    }

    fn fadd_double(&mut self, f: Double) {
        let bits = f.to_bits();
        unsafe { asm!("fadd qword ptr [{}]", in(reg) &bits) };
    }

    fn fadd_single(&mut self, f: Single) {
        let bits = f.to_bits();
        unsafe { asm!("fadd dword ptr [{}]", in(reg) &bits) };
    }
}
