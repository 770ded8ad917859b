//! The abstract FPU interface shared by the software model and the hardware
//! passthrough.

use crate::float::{Double, Extended, Single};

/// The operation surface of an x87 implementation.
///
/// Register stack indices are relative to the current top: `st(0)` is the
/// most recently pushed value. Indices outside `0..=7` are programmer errors
/// and assert. Methods that take a narrow operand widen it on the way in;
/// the narrow stores round on the way out and pop unconditionally.
pub trait Fpu {
    /// Pushes an 80-bit value.
    fn fld(&mut self, f: Extended);
    /// Widens and pushes a 64-bit value.
    fn fld_double(&mut self, f: Double);
    /// Widens and pushes a 32-bit value.
    fn fld_single(&mut self, f: Single);
    /// Pushes a copy of `st(i)` (read before the push).
    fn fld_st(&mut self, i: usize);

    /// Converts a 16-bit integer and pushes it.
    fn fild_i16(&mut self, i: i16);
    /// Converts a 32-bit integer and pushes it.
    fn fild_i32(&mut self, i: i32);
    /// Converts a 64-bit integer and pushes it.
    fn fild_i64(&mut self, i: i64);

    /// Pops `st(0)` unchanged.
    fn fstp(&mut self) -> Extended;
    /// Rounds `st(0)` to 64 bits and pops.
    fn fstp_double(&mut self) -> Double;
    /// Rounds `st(0)` to 32 bits and pops.
    fn fstp_single(&mut self) -> Single;

    /// `st(0) <- st(0) + st(i)`.
    fn fadd_st(&mut self, i: usize);
    /// `st(i) <- st(i) + st(0)`, then pop.
    fn faddp_st(&mut self, i: usize);
    /// Widens the operand and adds it into `st(0)`.
    fn fadd_double(&mut self, f: Double);
    /// Widens the operand and adds it into `st(0)`.
    fn fadd_single(&mut self, f: Single);

    /// `st(0) <- st(0) + st(1)`.
    fn fadd(&mut self) {
        self.fadd_st(1);
    }

    /// `st(1) <- st(1) + st(0)`, then pop.
    fn faddp(&mut self) {
        self.faddp_st(1);
    }
}

/// Width-generic load/store dispatch, so test drivers can run the same pass
/// over every operand width.
pub trait FpuOperand: Copy {
    fn fld_into<F: Fpu + ?Sized>(self, fpu: &mut F);
    fn fstp_from<F: Fpu + ?Sized>(fpu: &mut F) -> Self;
}

impl FpuOperand for Extended {
    fn fld_into<F: Fpu + ?Sized>(self, fpu: &mut F) {
        fpu.fld(self);
    }

    fn fstp_from<F: Fpu + ?Sized>(fpu: &mut F) -> Self {
        fpu.fstp()
    }
}

impl FpuOperand for Double {
    fn fld_into<F: Fpu + ?Sized>(self, fpu: &mut F) {
        fpu.fld_double(self);
    }

    fn fstp_from<F: Fpu + ?Sized>(fpu: &mut F) -> Self {
        fpu.fstp_double()
    }
}

impl FpuOperand for Single {
    fn fld_into<F: Fpu + ?Sized>(self, fpu: &mut F) {
        fpu.fld_single(self);
    }

    fn fstp_from<F: Fpu + ?Sized>(fpu: &mut F) -> Self {
        fpu.fstp_single()
    }
}
