//! Differential test driver: feeds identical value streams to the software
//! FPU model and to the host's x87, comparing the 80-bit results.
//!
//! Every disagreement is a single diagnostic line on stdout; the run always
//! continues and the process exits 0. Progress goes through `log`, so a
//! default invocation prints nothing but mismatches.

use std::env;
use std::fmt;

use log::info;

use x87diff::{
    Double, Extended, Filtered, Fpu, FpuOperand, NarrowFloat, Single, SoftFpu, Transformed,
    Uniform,
};

const ROUNDTRIP_COUNT: usize = 4_000_000;
const HAPPY_COUNT: usize = 4_000_000;
const DENORMAL_COUNT: usize = 4_000_000;
const NAN_COUNT: usize = 1_000_000;
const STORE_COUNT: usize = 10_000_000;

/// `fstp` rounding boundaries worked out by hand. The conversion core's unit
/// tests pin the expected narrow results; here the hardware gets a vote too.
const ROUNDING_CASES: [(bool, u16, u64); 8] = [
    (true, 0x3f69, 0xcc53_702c_050d_3513),
    (false, 0x3bff, 0x8e65_bd86_3070_9000),
    (false, 0x3f80, 0xffff_ff1f_d1ad_2bdd),
    (false, 0x3f80, 0xffff_ff80_0000_0000),
    (false, 0x3f80, 0xffff_fe80_0000_0000),
    (false, 0x3c00, 0x801c_eee9_d3ec_8800),
    (false, 0x3c00, 0x801c_eee9_d3ec_8801),
    (false, 0x3c00, 0x801c_eee9_d3ec_8c00),
];

/// Loads `val` into both FPUs and compares the 80-bit read-back.
fn check_load<A, B, T>(a: &mut A, b: &mut B, val: T) -> u64
where
    A: Fpu,
    B: Fpu,
    T: FpuOperand + fmt::Display,
{
    val.fld_into(a);
    val.fld_into(b);
    let res_a = Extended::fstp_from(a);
    let res_b = Extended::fstp_from(b);
    if res_a != res_b {
        println!("{} resulted in {} and {}", val, res_a, res_b);
        1
    } else {
        0
    }
}

/// Loads `val` into both FPUs and compares the narrowed read-back.
fn check_store<T, A, B>(a: &mut A, b: &mut B, val: Extended) -> u64
where
    A: Fpu,
    B: Fpu,
    T: FpuOperand + PartialEq + fmt::Display,
{
    val.fld_into(a);
    val.fld_into(b);
    let res_a = T::fstp_from(a);
    let res_b = T::fstp_from(b);
    if res_a != res_b {
        println!("{} resulted in {} and {}", val, res_a, res_b);
        1
    } else {
        0
    }
}

/// The conversion passes for one narrow width, load side then store side.
fn conversion_tests_inner<N, A, B>(a: &mut A, b: &mut B, seed: u64) -> u64
where
    N: NarrowFloat + FpuOperand + x87diff::RandomBits,
    A: Fpu,
    B: Fpu,
{
    let mut mismatches = 0;

    // Note: zero is not a happy float.
    info!("loading {}-bit \"happy\" floats...", N::BITS);
    let happy = Filtered::with_seed(HAPPY_COUNT, seed, |f: N| {
        f.exponent() != N::EXP_MAX && f.exponent() != 0
    });
    for val in happy {
        mismatches += check_load(a, b, val);
    }

    info!("loading {}-bit denormal floats...", N::BITS);
    let denormals = Transformed::with_seed(DENORMAL_COUNT, seed, |f: N| {
        // Apply the implicit integer bit, then reuse the random exponent as
        // the shift so the leading-zero count is uniformly distributed.
        let significand = f.significand() | (1 << N::SIG_BITS);
        N::from_parts(
            f.sign(),
            0,
            significand >> (u32::from(f.exponent()) % N::SIG_BITS),
        )
    });
    for val in denormals {
        mismatches += check_load(a, b, val);
    }

    info!("loading {}-bit infinities...", N::BITS);
    mismatches += check_load(a, b, N::from_parts(false, N::EXP_MAX, 0));
    mismatches += check_load(a, b, N::from_parts(true, N::EXP_MAX, 0));

    info!("loading {}-bit zeros...", N::BITS);
    mismatches += check_load(a, b, N::from_parts(true, 0, 0));
    mismatches += check_load(a, b, N::from_parts(false, 0, 0));

    info!("loading {}-bit NaNs...", N::BITS);
    let nans = Transformed::with_seed(NAN_COUNT, seed, |f: N| {
        N::from_parts(f.sign(), N::EXP_MAX, f.significand())
    });
    for val in nans {
        mismatches += check_load(a, b, val);
    }

    info!("storing \"happy\" floats to {} bits...", N::BITS);
    let happy_long = Filtered::with_seed(STORE_COUNT, seed, |f: Extended| {
        f.exponent() != Extended::EXP_MAX && f.integer_bit()
    });
    for val in happy_long {
        mismatches += check_store::<N, _, _>(a, b, val);
    }

    for &(sign, exponent, significand) in ROUNDING_CASES.iter() {
        let val = Extended::from_parts(sign, exponent, significand);
        mismatches += check_store::<N, _, _>(a, b, val);
    }

    info!("storing floats requiring denormalization to {} bits...", N::BITS);
    let min_exponent = -N::BIAS - N::SIG_BITS as i32;
    let band = N::SIG_BITS as i32 + 1;
    let denormalable = Transformed::with_seed(STORE_COUNT, seed, move |f: Extended| {
        // Force the biased exponent into the narrow format's denormal band
        // and make the significand an honest integer.
        let exponent = (Extended::EXPONENT_BIAS + min_exponent) + i32::from(f.exponent()) % band;
        Extended::from_parts(
            f.sign(),
            exponent as u16,
            f.significand() | Extended::INTEGER_BIT,
        )
    });
    for val in denormalable {
        mismatches += check_store::<N, _, _>(a, b, val);
    }

    info!("storing zeros to {} bits...", N::BITS);
    mismatches += check_store::<N, _, _>(a, b, Extended::ZERO);
    mismatches += check_store::<N, _, _>(a, b, -Extended::ZERO);

    info!("storing infinities to {} bits...", N::BITS);
    mismatches += check_store::<N, _, _>(a, b, Extended::INFINITY);
    mismatches += check_store::<N, _, _>(a, b, Extended::NEG_INFINITY);

    info!("storing NaNs to {} bits...", N::BITS);
    let nans = Transformed::with_seed(NAN_COUNT, seed, |f: Extended| {
        Extended::from_parts(
            f.sign(),
            Extended::EXP_MAX,
            f.significand() | Extended::INTEGER_BIT,
        )
    });
    for val in nans {
        mismatches += check_store::<N, _, _>(a, b, val);
    }

    mismatches
}

fn conversion_tests<A: Fpu, B: Fpu>(a: &mut A, b: &mut B, seed: u64) -> u64 {
    let mut mismatches = 0;

    // Quick check that raw 80-bit loads and stores round-trip, non-canonical
    // encodings included.
    info!("loading 80-bit floats...");
    for val in Uniform::<Extended>::with_seed(ROUNDTRIP_COUNT, seed) {
        mismatches += check_load(a, b, val);
    }

    mismatches += conversion_tests_inner::<Single, _, _>(a, b, seed);
    mismatches += conversion_tests_inner::<Double, _, _>(a, b, seed);
    mismatches
}

fn seed_from_env() -> u64 {
    match env::var("X87DIFF_SEED") {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("X87DIFF_SEED must be an unsigned integer, got {:?}", raw)),
        Err(_) => 0,
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn main() {
    env_logger::init();

    let seed = seed_from_env();
    info!("seed = {}", seed);

    let mut soft = SoftFpu::new();
    let mut hard = x87diff::HardFpu::claim().expect("host x87 already claimed");

    let mismatches = conversion_tests(&mut soft, &mut hard, seed);
    if mismatches == 0 {
        info!("software model agrees with the hardware on every pass");
    } else {
        info!("{} mismatches in total", mismatches);
    }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
fn main() {
    eprintln!("x87diff needs a host CPU with an x87 unit");
    std::process::exit(1);
}
