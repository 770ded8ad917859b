//! A software model of the legacy x87 floating point unit, together with the
//! machinery to test it bit-for-bit against the host's real x87.
//!
//! The model covers the 80-bit extended format with its explicit integer
//! bit, the widening and narrowing conversions to the 32- and 64-bit IEEE
//! formats (round to nearest, ties to even), and the eight-entry rotating
//! register stack with load, store-and-pop and add. Everything is done with
//! ordinary integer operations; host floats never touch the values under
//! test. Control and status words are not modeled, only the FPU's default
//! mode.
//!
//! The hardware side is a thin passthrough to the host's x87 and is only
//! available on x86 targets. The host is assumed to use little-endian.

#![warn(missing_debug_implementations)]

#[macro_use]
extern crate log;

mod convert;
mod float;
mod fpu;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod hard;
mod sequence;
mod soft;

pub use convert::{compress, expand};
pub use float::{Double, Extended, NarrowFloat, Single};
pub use fpu::{Fpu, FpuOperand};
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use hard::HardFpu;
pub use sequence::{Filtered, RandomBits, Transformed, Uniform};
pub use soft::SoftFpu;
