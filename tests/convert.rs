//! Conversion laws that hold without consulting the host FPU.

use proptest::prelude::*;

use x87diff::{compress, expand, Double, Extended, Fpu, NarrowFloat, Single, SoftFpu};

proptest! {
    /// Every normal single survives widening and narrowing untouched.
    #[test]
    fn single_roundtrip_normals(bits: u32) {
        let val = Single::from_bits(bits);
        prop_assume!(val.exponent() != 0 && val.exponent() != Single::EXP_MAX);

        let wide = expand(val);
        prop_assert!(wide.integer_bit());
        prop_assert_eq!(compress::<Single>(wide), val);
    }
}

proptest! {
    /// Every normal double survives widening and narrowing untouched.
    #[test]
    fn double_roundtrip_normals(bits: u64) {
        let val = Double::from_bits(bits);
        prop_assume!(val.exponent() != 0 && val.exponent() != Double::EXP_MAX);

        let wide = expand(val);
        prop_assert!(wide.integer_bit());
        prop_assert_eq!(compress::<Double>(wide), val);
    }
}

proptest! {
    /// Denormal singles also round-trip: they widen to normal extendeds well
    /// inside the single range, so narrowing denormalizes them right back.
    #[test]
    fn single_roundtrip_denormals(bits in 1u32..0x0080_0000) {
        let val = Single::from_bits(bits);
        prop_assert_eq!(compress::<Single>(expand(val)), val);
    }
}

proptest! {
    /// Finite 80-bit values with the integer bit set pass through a
    /// load/store pair bit-identically.
    #[test]
    fn extended_load_store_roundtrip(bytes: [u8; 10]) {
        let val = Extended::from_bytes(bytes);
        prop_assume!(val.exponent() != 0 && val.exponent() != Extended::EXP_MAX);
        prop_assume!(val.integer_bit());

        let mut fpu = SoftFpu::new();
        fpu.fld(val);
        prop_assert_eq!(fpu.fstp(), val);
    }
}

proptest! {
    /// The raw byte representation round-trips for any bit pattern.
    #[test]
    fn extended_byte_roundtrip(bytes: [u8; 10]) {
        prop_assert_eq!(Extended::from_bytes(bytes).to_bytes(), bytes);
    }
}

proptest! {
    /// Widening preserves the sign exactly, and so does a widen/narrow pair.
    #[test]
    fn sign_is_preserved(bits: u32) {
        let val = Single::from_bits(bits);
        let wide = expand(val);
        prop_assert_eq!(wide.sign(), val.sign());
        prop_assert_eq!(compress::<Single>(wide).sign(), val.sign());
    }
}

proptest! {
    /// A narrow value with an all-ones exponent and empty significand is an
    /// infinity and widens to exactly the canonical encoding.
    #[test]
    fn infinities_expand_exactly(sign: bool) {
        let single = Single::from_parts(sign, Single::EXP_MAX, 0);
        let double = Double::from_parts(sign, Double::EXP_MAX, 0);
        let expected = if sign { Extended::NEG_INFINITY } else { Extended::INFINITY };
        prop_assert_eq!(expand(single), expected);
        prop_assert_eq!(expand(double), expected);
    }
}

proptest! {
    /// Every widened NaN carries the quiet bit, whatever the input payload.
    #[test]
    fn expanded_nans_are_quiet(payload in 1u64..0x0010_0000_0000_0000, sign: bool) {
        let wide = expand(Double::from_parts(sign, Double::EXP_MAX, payload));
        prop_assert_eq!(wide.exponent(), Extended::EXP_MAX);
        prop_assert_eq!(wide.sign(), sign);
        prop_assert!(wide.significand() & Extended::QUIET_BIT != 0);
        prop_assert!(wide.integer_bit());
    }
}

proptest! {
    /// Narrowing never turns a NaN into anything else: the exponent stays
    /// all-ones and the payload stays non-zero.
    #[test]
    fn compressed_nans_stay_nans(fraction in 1u64..(1 << 63), sign: bool, integer_bit: bool) {
        let significand = if integer_bit {
            fraction | Extended::INTEGER_BIT
        } else {
            fraction
        };
        let nan = Extended::from_parts(sign, Extended::EXP_MAX, significand);

        let narrow = compress::<Double>(nan);
        prop_assert_eq!(narrow.exponent(), Double::EXP_MAX);
        prop_assert!(narrow.significand() != 0);
        prop_assert_eq!(narrow.sign(), sign);

        let narrow = compress::<Single>(nan);
        prop_assert_eq!(narrow.exponent(), Single::EXP_MAX);
        prop_assert!(narrow.significand() != 0);
    }
}
