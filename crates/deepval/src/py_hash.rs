//! Python-compatible `hash()` for the hashable value variants.
//!
//! These hashes only place dict keys and set elements; they are unrelated to
//! the structural fingerprint computed by `Engine::deep_hash`.
//!
//! Equal values must hash equal across types (`1 == 1.0 == True`), so every
//! numeric hash reduces the value modulo the Mersenne prime `2^61 - 1` exactly
//! like CPython. Text and bytes use SipHash-1-3 with a zero key, which is what
//! CPython does under `PYTHONHASHSEED=0`, so placement is deterministic across
//! runs.

use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;

/// `2^61 - 1`, the modulus of all numeric hashes.
const MODULUS: u64 = (1 << 61) - 1;
const MODULUS_BITS: u32 = 61;

/// Hash of `float('inf')`; negative infinity hashes to its negation.
const INF_HASH: i64 = 314_159;

/// Multiplier mixing the imaginary part into a complex hash.
const IMAG_MULTIPLIER: u64 = 1_000_003;

/// `-1` is reserved as an error marker in CPython's hash lane.
#[inline]
fn finish(hash: i64) -> u64 {
    let hash = if hash == -1 { -2 } else { hash };
    hash as u64
}

/// Hash of a byte string: SipHash-1-3, zero key, empty input hashes to 0.
#[must_use]
pub(crate) fn hash_bytes(bytes: &[u8]) -> u64 {
    if bytes.is_empty() {
        return 0;
    }
    finish(SipState::new().digest(bytes) as i64)
}

/// Hash of a text value, taken over its UTF-8 encoding.
#[must_use]
pub(crate) fn hash_str(text: &str) -> u64 {
    hash_bytes(text.as_bytes())
}

/// Hash of a machine integer.
#[must_use]
pub(crate) fn hash_int(value: i64) -> u64 {
    let reduced = (value.unsigned_abs() % MODULUS) as i64;
    finish(if value < 0 { -reduced } else { reduced })
}

/// Hash of an arbitrary-precision integer, consistent with [`hash_int`].
#[must_use]
pub(crate) fn hash_bigint(value: &BigInt) -> u64 {
    let reduced = (value.magnitude() % MODULUS)
        .to_u64()
        .map_or(0, |r| r as i64);
    finish(if value.sign() == Sign::Minus { -reduced } else { reduced })
}

/// Hash of a float; integral floats hash like the equal integer.
#[must_use]
pub(crate) fn hash_float(value: f64) -> u64 {
    finish(float_lane(value))
}

/// Hash of a complex number, `hash(re) + 1000003 * hash(im)` in wrapping arithmetic.
///
/// A zero imaginary part contributes nothing, so `complex(2, 0)` hashes like `2`.
#[must_use]
pub(crate) fn hash_complex(re: f64, im: f64) -> u64 {
    let real = float_lane(re) as u64;
    let imag = float_lane(im) as u64;
    finish(real.wrapping_add(IMAG_MULTIPLIER.wrapping_mul(imag)) as i64)
}

/// Hash of an identity-compared object: its identity bits rotated so aligned
/// addresses do not all land in the same buckets.
#[must_use]
pub(crate) fn hash_identity(bits: u64) -> u64 {
    finish(bits.rotate_right(4) as i64)
}

fn float_lane(value: f64) -> i64 {
    if value.is_nan() {
        return 0;
    }
    if value.is_infinite() {
        return if value > 0.0 { INF_HASH } else { -INF_HASH };
    }
    if value.fract() == 0.0 && value.abs() < 9.2e18 {
        let reduced = (value.abs() as u64 % MODULUS) as i64;
        return if value < 0.0 { -reduced } else { reduced };
    }

    // value = mantissa * 2^exponent; fold the mantissa 28 bits at a time,
    // rotating within the 61-bit field, then rotate in the exponent.
    let (mut mantissa, mut exponent) = frexp(value.abs());
    let mut acc: u64 = 0;
    while mantissa > 0.0 {
        acc = ((acc << 28) & MODULUS) | (acc >> (MODULUS_BITS - 28));
        mantissa *= 268_435_456.0;
        exponent -= 28;
        let chunk = mantissa as u64;
        mantissa -= chunk as f64;
        acc += chunk;
        if acc >= MODULUS {
            acc -= MODULUS;
        }
    }
    let shift = exponent.rem_euclid(MODULUS_BITS as i32) as u32;
    acc = ((acc << shift) & MODULUS) | (acc >> (MODULUS_BITS - shift));

    let lane = acc as i64;
    if value < 0.0 { -lane } else { lane }
}

/// Splits a finite, non-zero, non-negative float into `(m, e)` with
/// `value == m * 2^e` and `0.5 <= m < 1`.
fn frexp(value: f64) -> (f64, i32) {
    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    if biased == 0 {
        // subnormal: scale into the normal range first
        let (m, e) = frexp(value * f64::from_bits(0x43f0_0000_0000_0000));
        return (m, e - 64);
    }
    let mantissa = f64::from_bits((bits & !(0x7ff << 52)) | (0x3fe << 52));
    (mantissa, biased - 1022)
}

/// Accumulator for tuple hashes (the xxHash-derived mix CPython uses).
///
/// Feed every element hash with [`TupleHasher::push`], then call [`TupleHasher::finish`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct TupleHasher {
    acc: u64,
    len: u64,
}

impl TupleHasher {
    const PRIME_1: u64 = 11_400_714_785_074_694_791;
    const PRIME_2: u64 = 14_029_467_366_897_019_727;
    const PRIME_5: u64 = 2_870_177_450_012_600_261;

    pub fn new() -> Self {
        Self {
            acc: Self::PRIME_5,
            len: 0,
        }
    }

    pub fn push(&mut self, lane: u64) {
        self.acc = self.acc.wrapping_add(lane.wrapping_mul(Self::PRIME_2));
        self.acc = self.acc.rotate_left(31);
        self.acc = self.acc.wrapping_mul(Self::PRIME_1);
        self.len += 1;
    }

    pub fn finish(self) -> u64 {
        let acc = self.acc.wrapping_add(self.len ^ (Self::PRIME_5 ^ 3_527_539));
        if acc == u64::MAX { 1_546_275_796 } else { acc }
    }
}

/// SipHash-1-3 state keyed with zeros.
struct SipState([u64; 4]);

impl SipState {
    fn new() -> Self {
        Self([
            0x736f_6d65_7073_6575,
            0x646f_7261_6e64_6f6d,
            0x6c79_6765_6e65_7261,
            0x7465_6462_7974_6573,
        ])
    }

    fn digest(mut self, bytes: &[u8]) -> u64 {
        let mut blocks = bytes.chunks_exact(8);
        for block in &mut blocks {
            let mut word = [0_u8; 8];
            word.copy_from_slice(block);
            self.compress(u64::from_le_bytes(word));
        }

        let mut last = (bytes.len() as u64) << 56;
        for (shift, byte) in blocks.remainder().iter().enumerate() {
            last |= u64::from(*byte) << (8 * shift);
        }
        self.compress(last);

        self.0[2] ^= 0xff;
        for _ in 0..3 {
            self.round();
        }
        self.0.iter().fold(0, |acc, v| acc ^ v)
    }

    fn compress(&mut self, word: u64) {
        self.0[3] ^= word;
        self.round();
        self.0[0] ^= word;
    }

    fn round(&mut self) {
        let [v0, v1, v2, v3] = &mut self.0;
        *v0 = v0.wrapping_add(*v1);
        *v1 = v1.rotate_left(13) ^ *v0;
        *v0 = v0.rotate_left(32);
        *v2 = v2.wrapping_add(*v3);
        *v3 = v3.rotate_left(16) ^ *v2;
        *v0 = v0.wrapping_add(*v3);
        *v3 = v3.rotate_left(21) ^ *v0;
        *v2 = v2.wrapping_add(*v1);
        *v1 = v1.rotate_left(17) ^ *v2;
        *v2 = v2.rotate_left(32);
    }
}
