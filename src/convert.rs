//! Widening and narrowing conversions between the narrow formats and the
//! 80-bit extended format, using only integer operations.
//!
//! Useful resources:
//! * IA-32 SDM vol. 1, ch. 4.8 ("Real Numbers and Floating-Point Formats")
//! * http://pages.cs.wisc.edu/~markhill/cs354/Fall2008/notes/flpt.apprec.html

use crate::float::{Extended, NarrowFloat};

/// Widens a narrow IEEE value to the 80-bit extended format. Lossless.
///
/// Denormal inputs are renormalized (the extended format has enough exponent
/// range for every narrow denormal) and NaNs come out quiet, which is what
/// the x87 does when loading through `fld m32fp`/`fld m64fp`.
pub fn expand<N: NarrowFloat>(f: N) -> Extended {
    let sign = f.sign();
    let significand = f.significand();
    let shift = 63 - N::SIG_BITS;

    if f.exponent() == N::EXP_MAX {
        // Infinity keeps an empty payload; everything else becomes a quiet
        // NaN regardless of the input's signaling bit.
        let significand = if significand == 0 {
            Extended::INTEGER_BIT
        } else {
            (significand << shift) | Extended::INTEGER_BIT | Extended::QUIET_BIT
        };
        return Extended::from_parts(sign, Extended::EXP_MAX, significand);
    }

    let (exponent, significand) = if f.exponent() == 0 {
        if significand == 0 {
            return Extended::from_parts(sign, 0, 0);
        }
        // Denormal: bring the leading 1 up to the integer position in a
        // single shift, paying one exponent step per bit.
        let norm = significand.leading_zeros() - shift;
        (1 - norm as i32, significand << norm)
    } else {
        (i32::from(f.exponent()), significand)
    };

    trace!("expand: exponent={} significand={:#x}", exponent, significand);
    let exponent = exponent - N::BIAS + Extended::EXPONENT_BIAS;
    Extended::from_parts(
        sign,
        exponent as u16,
        Extended::INTEGER_BIT | (significand << shift),
    )
}

/// Narrows an 80-bit extended value, rounding to nearest with ties to even.
///
/// Out-of-range magnitudes overflow to infinity or denormalize/flush to a
/// signed zero; NaN payloads are truncated with the quiet bit forced, so a
/// NaN can never collapse into an infinity. Unnormal inputs take the ordinary
/// arithmetic path and are not special-cased.
pub fn compress<N: NarrowFloat>(f: Extended) -> N {
    let sign = f.sign();
    let shift = 63 - N::SIG_BITS;

    if f.exponent() == Extended::EXP_MAX {
        if f.fraction() == 0 {
            return N::from_parts(sign, N::EXP_MAX, 0);
        }
        let payload = ((f.significand() & !Extended::INTEGER_BIT) | Extended::QUIET_BIT) >> shift;
        return N::from_parts(sign, N::EXP_MAX, payload);
    }

    let exponent = i32::from(f.exponent()) - Extended::EXPONENT_BIAS + N::BIAS;
    if exponent >= i32::from(N::EXP_MAX) {
        // Overflow to infinity.
        return N::from_parts(sign, N::EXP_MAX, 0);
    }

    let (mut exponent, shift) = if exponent <= 0 {
        if exponent < -(N::SIG_BITS as i32) {
            // Below even the denormal range.
            return N::from_parts(sign, 0, 0);
        }
        // Denormalize: every exponent step below 1 costs one significand bit.
        (0, shift + (1 - exponent) as u32)
    } else {
        (exponent, shift)
    };

    // Round to nearest, ties to even. The smallest denormals discard all 64
    // significand bits, so the discarded-bit math is done in 128 bits.
    let significand = u128::from(f.significand());
    let mut retained = (significand >> shift) as u64;
    let guard = significand & ((1u128 << shift) - 1);
    let half = 1u128 << (shift - 1);
    if guard > half || (guard == half && retained & 1 == 1) {
        retained += 1;
        // A carry out of the significand bumps the exponent: a denormal
        // becomes the smallest normal, a normal moves up one binade (and may
        // now overflow after all). `from_parts` truncates the carry bit.
        let width = if exponent == 0 { N::SIG_BITS } else { N::SIG_BITS + 1 };
        if retained == 1 << width {
            exponent += 1;
            if exponent >= i32::from(N::EXP_MAX) {
                return N::from_parts(sign, N::EXP_MAX, 0);
            }
        }
    }

    trace!("compress: exponent={} retained={:#x} guard={:#x}", exponent, retained, guard);
    N::from_parts(sign, exponent as u16, retained)
}

/// Converts a signed integer to its exact extended-precision rendering.
///
/// Every `i64` fits in the 64-bit significand, so no rounding is involved.
pub(crate) fn from_i64(i: i64) -> Extended {
    if i == 0 {
        return Extended::ZERO;
    }
    let magnitude = i.unsigned_abs();
    let norm = magnitude.leading_zeros();
    Extended::from_parts(
        i < 0,
        (Extended::EXPONENT_BIAS + 63 - norm as i32) as u16,
        magnitude << norm,
    )
}
