//! Utility functions to work with random numbers.

/// A simple implementation of the [SplitMix64] algorithm.
///
/// This is mainly used to turn a 64-bit seed into a sequence of 64-bit numbers to use as
/// the base state for the main random number generator.
///
/// [SplitMix64]: http://prng.di.unimi.it/splitmix64.c
pub fn splitmix64(st: u64) -> u64 {
    let mut t = st.wrapping_add(0x9e3779b97f4a7c15);
    t = (t ^ (t >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    t = (t ^ (t >> 27)).wrapping_mul(0x94d049bb133111eb);
    t ^ (t >> 31)
}

/// Converts a `u32` value into a `f32` value in the range `[0.0, 1.0]`.
#[inline]
pub fn f32_from_u32_01(x: u32) -> f32 {
    (x & 0xFFFFFF) as f32 * (1.0 / 0xFFFFFF as f32)
}

/// Converts a `u32` value into a `f32` value in the range `[-1.0, 1.0]`.
#[inline]
pub fn f32_from_u32_11(x: u32) -> f32 {
    // `f32_from_u32_01` does not use the most significant bit of `x`, meaning we can use it for
    // the sign bit.
    if x & 0x1000_0000 != 0 {
        -f32_from_u32_01(x)
    } else {
        f32_from_u32_01(x)
    }
}

/// Returns the largest `i32` value that is less than or equal to `x`.
#[inline]
pub fn floor_i32(x: f32) -> i32 {
    let t = x as i32;
    if x < t as f32 {
        t - 1
    } else {
        t
    }
}
