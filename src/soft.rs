//! The software x87 model: an eight-entry rotating register stack over the
//! integer-only conversion core.

use std::cmp;

use crate::convert::{compress, expand, from_i64};
use crate::float::{Double, Extended, Single};
use crate::fpu::Fpu;

/// A software model of the x87 register stack.
///
/// Eight 80-bit slots addressed relative to a rotating top index. There is
/// no tag word: the stack starts out all-zero and freely wraps around, so
/// over- and underflow reuse whatever the slots currently hold.
#[derive(Debug, Clone)]
pub struct SoftFpu {
    stack: [Extended; 8],
    top: usize,
}

impl SoftFpu {
    pub fn new() -> Self {
        SoftFpu {
            stack: [Extended::ZERO; 8],
            top: 0,
        }
    }

    fn st(&self, i: usize) -> Extended {
        assert!(i < 8, "register index {} out of range", i);
        self.stack[(self.top + i) & 7]
    }

    fn st_mut(&mut self, i: usize) -> &mut Extended {
        assert!(i < 8, "register index {} out of range", i);
        &mut self.stack[(self.top + i) & 7]
    }

    fn push(&mut self) {
        self.top = self.top.wrapping_sub(1) & 7;
    }

    fn pop(&mut self) -> Extended {
        let val = self.stack[self.top];
        self.top = (self.top + 1) & 7;
        val
    }
}

impl Default for SoftFpu {
    fn default() -> Self {
        SoftFpu::new()
    }
}

impl Fpu for SoftFpu {
    fn fld(&mut self, f: Extended) {
        self.push();
        *self.st_mut(0) = f;
    }

    fn fld_double(&mut self, f: Double) {
        self.fld(expand(f));
    }

    fn fld_single(&mut self, f: Single) {
        self.fld(expand(f));
    }

    fn fld_st(&mut self, i: usize) {
        let val = self.st(i);
        self.fld(val);
    }

    fn fild_i16(&mut self, i: i16) {
        self.fld(from_i64(i.into()));
    }

    fn fild_i32(&mut self, i: i32) {
        self.fld(from_i64(i.into()));
    }

    fn fild_i64(&mut self, i: i64) {
        self.fld(from_i64(i));
    }

    fn fstp(&mut self) -> Extended {
        self.pop()
    }

    fn fstp_double(&mut self) -> Double {
        compress(self.pop())
    }

    fn fstp_single(&mut self) -> Single {
        compress(self.pop())
    }

    fn fadd_st(&mut self, i: usize) {
        let sum = add(self.st(0), self.st(i), false);
        *self.st_mut(0) = sum;
    }

    fn faddp_st(&mut self, i: usize) {
        let sum = add(self.st(i), self.st(0), false);
        *self.st_mut(i) = sum;
        self.pop();
    }

    fn fadd_double(&mut self, f: Double) {
        let sum = add(self.st(0), expand(f), false);
        *self.st_mut(0) = sum;
    }

    fn fadd_single(&mut self, f: Single) {
        let sum = add(self.st(0), expand(f), false);
        *self.st_mut(0) = sum;
    }
}

/// Significand-aligned addition on the raw 80-bit encodings.
///
/// Integer operations only. Known gaps, deliberate for now: the bit shifted
/// out by a carry is dropped without rounding, exponent overflow wraps
/// instead of producing infinity, special operands (NaN, infinity) take the
/// ordinary arithmetic path, and a cancelling subtraction whose normalizing
/// shift is clamped at exponent zero can leave an unnormal.
fn add(a: Extended, b: Extended, subtract: bool) -> Extended {
    let effective_subtract = subtract ^ (a.sign() ^ b.sign());

    let swap = b.exponent() > a.exponent();
    let (bigger, smaller) = if swap { (b, a) } else { (a, b) };
    // The result takes the dominant operand's sign; when that operand is the
    // subtrahend it entered the sum negated.
    let sign = bigger.sign() ^ (swap && subtract);
    let diff = u32::from(bigger.exponent() - smaller.exponent());
    let mut exponent = i32::from(bigger.exponent());

    let smaller_sig = smaller.significand().checked_shr(diff).unwrap_or(0);

    let significand = if effective_subtract {
        let difference = bigger.significand().wrapping_sub(smaller_sig);
        if difference == 0 {
            return Extended::from_parts(sign, 0, 0);
        }
        let norm = cmp::min(difference.leading_zeros() as i32, exponent);
        exponent -= norm;
        difference << norm
    } else {
        let (sum, carry) = bigger.significand().overflowing_add(smaller_sig);
        if carry {
            exponent += 1;
            (sum >> 1) | Extended::INTEGER_BIT
        } else {
            sum
        }
    };

    trace!(
        "add: {} {} {} -> exponent={} significand={:#x}",
        a,
        if effective_subtract { "-" } else { "+" },
        b,
        exponent,
        significand
    );
    Extended::from_parts(sign, exponent as u16, significand)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ext(v: f64) -> Extended {
        Extended::from_f64_lossy(v)
    }

    #[test]
    fn push_rotates_and_wraps() {
        let mut fpu = SoftFpu::new();
        for i in 1..=8 {
            fpu.fild_i32(i);
        }
        // Eight pushes fill every slot; st(0) is the last one in.
        assert_eq!(fpu.fstp(), ext(8.0));
        assert_eq!(fpu.fstp(), ext(7.0));

        // Push over the freed slots and drain everything.
        fpu.fild_i32(9);
        assert_eq!(fpu.fstp(), ext(9.0));
        for i in (1..=6).rev() {
            assert_eq!(fpu.fstp(), ext(f64::from(i)));
        }
    }

    #[test]
    fn fld_st_reads_before_the_push() {
        let mut fpu = SoftFpu::new();
        fpu.fild_i32(1);
        fpu.fild_i32(2);
        fpu.fld_st(1); // duplicates the pre-push st(1), the 1.0
        assert_eq!(fpu.fstp(), ext(1.0));
        assert_eq!(fpu.fstp(), ext(2.0));
        assert_eq!(fpu.fstp(), ext(1.0));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn register_index_is_checked() {
        let mut fpu = SoftFpu::new();
        fpu.fadd_st(8);
    }

    #[test]
    fn add_same_exponent_carries() {
        assert_eq!(add(ext(1.0), ext(1.0), false), ext(2.0));
        assert_eq!(add(ext(1.5), ext(1.5), false), ext(3.0));
    }

    #[test]
    fn add_aligns_exponents() {
        assert_eq!(add(ext(1.5), ext(0.25), false), ext(1.75));
        assert_eq!(add(ext(0.25), ext(1.5), false), ext(1.75));
        assert_eq!(add(ext(1024.0), ext(0.5), false), ext(1024.5));
    }

    #[test]
    fn add_of_opposite_signs_cancels() {
        assert_eq!(add(ext(3.0), ext(-2.0), false), ext(1.0));
        assert_eq!(add(ext(-3.0), ext(2.0), false), ext(-1.0));
        // Complete cancellation leaves a zero with the dominant sign.
        assert_eq!(add(ext(2.0), ext(-2.0), false), ext(0.0));
    }

    #[test]
    fn add_huge_alignment_gap_keeps_the_big_operand() {
        let big = ext(1.0);
        let tiny = Extended::from_parts(false, 1, Extended::INTEGER_BIT);
        assert_eq!(add(big, tiny, false), big);
    }

    #[test]
    fn subtract_sign_follows_the_dominant_operand() {
        assert_eq!(add(ext(1.0), ext(4.0), true), ext(-3.0));
        assert_eq!(add(ext(4.0), ext(1.0), true), ext(3.0));
        assert_eq!(add(ext(-1.0), ext(-4.0), true), ext(3.0));
        assert_eq!(add(ext(-1.0), ext(4.0), true), ext(-5.0));
    }

    #[test]
    fn fadd_variants_target_the_right_slot() {
        let mut fpu = SoftFpu::new();
        fpu.fild_i32(10);
        fpu.fild_i32(3);
        fpu.fadd(); // st(0) = 3 + 10
        assert_eq!(fpu.st(0), ext(13.0));
        assert_eq!(fpu.st(1), ext(10.0));

        let mut fpu = SoftFpu::new();
        fpu.fild_i32(10);
        fpu.fild_i32(3);
        fpu.faddp(); // st(1) = 10 + 3, then pop
        assert_eq!(fpu.fstp(), ext(13.0));

        let mut fpu = SoftFpu::new();
        fpu.fild_i32(1);
        fpu.fadd_double(Double::from_f64_lossy(2.5));
        assert_eq!(fpu.fstp(), ext(3.5));

        let mut fpu = SoftFpu::new();
        fpu.fild_i32(1);
        fpu.fadd_single(Single::from_f64_lossy(0.5));
        assert_eq!(fpu.fstp(), ext(1.5));
    }

    #[test]
    fn integer_loads_are_exact() {
        let mut fpu = SoftFpu::new();
        fpu.fild_i16(-300);
        fpu.fild_i32(1 << 20);
        fpu.fild_i64(1 << 40);
        assert_eq!(fpu.fstp(), ext((1u64 << 40) as f64));
        assert_eq!(fpu.fstp(), ext(f64::from(1 << 20)));
        assert_eq!(fpu.fstp(), ext(-300.0));
    }
}
