//! Order-preserving bit transforms for radix keys.
//!
//! Every key is mapped to an unsigned pattern of the same width such that
//! unsigned comparison of the patterns matches the key's natural order:
//!
//! - unsigned integers are used as-is,
//! - signed integers get their sign bit flipped,
//! - floats get every bit flipped when negative, only the sign bit otherwise.
//!
//! Float order is the IEEE total order (`f32::total_cmp`), so `-0.0 < 0.0`
//! and NaNs land at the extremes according to their sign.

mod private {
    pub trait Sealed {}
}

/// Keys the group sort can extract radix digits from.
pub trait RadixKey: private::Sealed + Copy + Send + Sync + 'static {
    /// Width of the key in bits.
    const BITS: u32;

    /// Monotonic bijection onto `[0, 2^BITS)`, zero-extended to 64 bits.
    fn to_ordered_bits(self) -> u64;

    /// Inverse of [`RadixKey::to_ordered_bits`]; bits above `BITS` are ignored.
    fn from_ordered_bits(bits: u64) -> Self;
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {$(
        impl private::Sealed for $t {}

        impl RadixKey for $t {
            const BITS: u32 = <$t>::BITS;

            #[inline]
            fn to_ordered_bits(self) -> u64 {
                self as u64
            }

            #[inline]
            fn from_ordered_bits(bits: u64) -> Self {
                bits as $t
            }
        }
    )*};
}

macro_rules! impl_signed {
    ($($t:ty => $u:ty),*) => {$(
        impl private::Sealed for $t {}

        impl RadixKey for $t {
            const BITS: u32 = <$t>::BITS;

            #[inline]
            fn to_ordered_bits(self) -> u64 {
                ((self as $u) ^ (1 << (<$t>::BITS - 1))) as u64
            }

            #[inline]
            fn from_ordered_bits(bits: u64) -> Self {
                ((bits as $u) ^ (1 << (<$t>::BITS - 1))) as $t
            }
        }
    )*};
}

macro_rules! impl_float {
    ($($t:ty => $u:ty),*) => {$(
        impl private::Sealed for $t {}

        impl RadixKey for $t {
            const BITS: u32 = <$u>::BITS;

            #[inline]
            fn to_ordered_bits(self) -> u64 {
                const SIGN: $u = 1 << (<$u>::BITS - 1);
                let bits = self.to_bits();
                let ordered = if bits & SIGN != 0 { !bits } else { bits ^ SIGN };
                ordered as u64
            }

            #[inline]
            fn from_ordered_bits(bits: u64) -> Self {
                const SIGN: $u = 1 << (<$u>::BITS - 1);
                let bits = bits as $u;
                let raw = if bits & SIGN != 0 { bits ^ SIGN } else { !bits };
                <$t>::from_bits(raw)
            }
        }
    )*};
}

impl_unsigned!(u8, u16, u32, u64, usize);
impl_signed!(i8 => u8, i16 => u16, i32 => u32, i64 => u64, isize => usize);
impl_float!(f32 => u32, f64 => u64);

#[inline]
pub(crate) fn width_mask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1_u64 << bits) - 1
    }
}

/// Transformed key bits for the requested direction. Descending order is the
/// complement of the ascending pattern within the key width.
#[inline]
pub(crate) fn order_preserving_cast<K: RadixKey>(key: K, ascending: bool) -> u64 {
    let bits = key.to_ordered_bits();
    if ascending {
        bits
    } else {
        !bits & width_mask(K::BITS)
    }
}

#[inline]
pub(crate) fn get_bucket(bits: u64, begin_bit: u32, mask: u64) -> usize {
    ((bits >> begin_bit) & mask) as usize
}

/// Padding value that sorts after every real key in the given direction.
///
/// Its transformed pattern is all ones, so stability keeps real keys equal to
/// it in front of the padding. For floats this is a NaN rather than `MAX`,
/// which keeps `+inf` inputs ahead of the padding.
#[inline]
pub fn sentinel<K: RadixKey>(ascending: bool) -> K {
    if ascending {
        K::from_ordered_bits(width_mask(K::BITS))
    } else {
        K::from_ordered_bits(0)
    }
}
