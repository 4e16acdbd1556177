//! Primitives entières et bit-à-bit du moteur d'effets.
//!
//! Aucune division, aucun flottant : uniquement des multiplications, des
//! décalages et des masques. Toutes les fonctions sont pures et ne peuvent
//! pas échouer.

/// Luminance perceptuelle approchée : `(77·r + 150·g + 29·b) >> 8`.
///
/// 77/256 ≈ 0.301, 150/256 ≈ 0.586, 29/256 ≈ 0.113.
///
/// # Example
/// ```
/// use gk_core::bitops::luminance;
/// assert_eq!(luminance(255, 255, 255), 255);
/// assert_eq!(luminance(255, 0, 0), 76);
/// ```
#[inline(always)]
#[must_use]
pub const fn luminance(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 77 + g as u32 * 150 + b as u32 * 29) >> 8) as u8
}

/// Maps an 8-bit value into `[0, buckets)` with a multiply-shift.
///
/// # Example
/// ```
/// use gk_core::bitops::map_index;
/// assert_eq!(map_index(0, 11), 0);
/// assert_eq!(map_index(255, 11), 10);
/// assert_eq!(map_index(76, 11), 3);
/// ```
#[inline(always)]
#[must_use]
pub const fn map_index(value: u8, buckets: usize) -> usize {
    (value as usize * buckets) >> 8
}

/// Clamp branchless vers `[0, 255]` (astuces de bit de signe, complément à deux).
///
/// # Example
/// ```
/// use gk_core::bitops::clamp_byte;
/// assert_eq!(clamp_byte(-40), 0);
/// assert_eq!(clamp_byte(128), 128);
/// assert_eq!(clamp_byte(4000), 255);
/// ```
#[inline(always)]
#[must_use]
pub const fn clamp_byte(v: i32) -> u8 {
    // max(v, 0) : le masque de signe annule les négatifs
    let mut v = v & !(v >> 31);
    // min(v, 255)
    v -= 255;
    v &= v >> 31;
    v += 255;
    v as u8
}

/// Clamp branchless d'une coordonnée vers `[0, len - 1]`.
///
/// `len` doit être ≥ 1.
///
/// # Example
/// ```
/// use gk_core::bitops::clamp_index;
/// assert_eq!(clamp_index(-1, 10), 0);
/// assert_eq!(clamp_index(10, 10), 9);
/// assert_eq!(clamp_index(4, 10), 4);
/// ```
#[inline(always)]
#[must_use]
pub const fn clamp_index(v: i32, len: i32) -> i32 {
    let v = v & !(v >> 31);
    let over = v - (len - 1);
    v - (over & !(over >> 31))
}

/// Valeur absolue sans branchement.
///
/// # Example
/// ```
/// use gk_core::bitops::abs;
/// assert_eq!(abs(-1020), 1020);
/// assert_eq!(abs(7), 7);
/// ```
#[inline(always)]
#[must_use]
pub const fn abs(v: i32) -> i32 {
    let mask = v >> 31;
    (v ^ mask).wrapping_sub(mask)
}

/// Deterministic 32-bit position hash (Fibonacci multiplicative mix + xor-shift).
///
/// Same `(x, y, seed)` always yields the same value. Not for security.
///
/// # Example
/// ```
/// use gk_core::bitops::position_hash;
/// assert_eq!(position_hash(3, 4, 7), position_hash(3, 4, 7));
/// assert_ne!(position_hash(3, 4, 7), position_hash(3, 4, 8));
/// ```
#[inline(always)]
#[must_use]
pub const fn position_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = x.wrapping_mul(73_856_093)
        ^ y.wrapping_mul(19_349_669)
        ^ seed.wrapping_mul(83_492_791);
    h = h.wrapping_mul(2_654_435_761);
    h ^= h >> 16;
    h
}

/// `1` si `value > threshold`, sinon `0`, via le bit de signe de `threshold - value`.
///
/// # Example
/// ```
/// use gk_core::bitops::threshold_bit;
/// assert_eq!(threshold_bit(200, 128), 1);
/// assert_eq!(threshold_bit(128, 128), 0);
/// assert_eq!(threshold_bit(50, 128), 0);
/// ```
#[inline(always)]
#[must_use]
pub const fn threshold_bit(value: i32, threshold: i32) -> u32 {
    (threshold.wrapping_sub(value) as u32) >> 31
}
