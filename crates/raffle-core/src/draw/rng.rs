// Random sources for the draw engine.
//
// `Mulberry32` is the reproducible generator used for seeded draws. Its state
// is a single u32 and every step uses explicit wrapping arithmetic, so a seed
// string yields the same stream on every platform and in every port that
// follows the same steps.

use rand::Rng;

/// Scale factor turning a u32 into a float in [0, 1).
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Weyl increment added to the state on every step.
const MULBERRY_INCREMENT: u32 = 0x6D2B_79F5;

// ---------------------------------------------------------------------------
// RandomSource
// ---------------------------------------------------------------------------

/// A stream of floats uniformly distributed in `[0, 1)`.
///
/// The draw engine only ever asks for one float per swap, so this is the
/// whole capability it needs. Tests substitute scripted sources.
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;
}

impl<T: RandomSource + ?Sized> RandomSource for &mut T {
    fn next_f64(&mut self) -> f64 {
        (**self).next_f64()
    }
}

// ---------------------------------------------------------------------------
// Mulberry32
// ---------------------------------------------------------------------------

/// Deterministic 32-bit PRNG seeded from a string.
///
/// # Example
///
/// ```
/// use raffle_core::draw::Mulberry32;
///
/// let mut rng = Mulberry32::from_seed("test");
/// assert_eq!(rng.next_u32(), 2_939_769_884);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    /// Fold a seed string into the initial state by summing its UTF-16 code
    /// units modulo 2^32.
    pub fn from_seed(seed: &str) -> Self {
        let state = seed
            .encode_utf16()
            .fold(0u32, |acc, unit| acc.wrapping_add(u32::from(unit)));
        Self { state }
    }

    /// Start from a raw 32-bit state.
    pub fn from_state(state: u32) -> Self {
        Self { state }
    }

    /// Current internal state.
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Advance the generator and return the next 32-bit output.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(MULBERRY_INCREMENT);
        let a = self.state;
        let mut t = (a ^ (a >> 15)).wrapping_mul(a | 1);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61)) ^ t;
        t ^ (t >> 14)
    }
}

impl RandomSource for Mulberry32 {
    #[inline]
    fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / TWO_POW_32
    }
}

// ---------------------------------------------------------------------------
// Non-deterministic sources
// ---------------------------------------------------------------------------

/// The ambient, OS-seeded thread-local generator. No repeatability.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&mut self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Adapter exposing any `rand` generator as a `RandomSource`.
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_f64(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn seed_folds_character_codes() {
        // t(116) + e(101) + s(115) + t(116)
        assert_eq!(Mulberry32::from_seed("test").state(), 448);
        assert_eq!(Mulberry32::from_seed("").state(), 0);
    }

    #[test]
    fn seed_uses_utf16_code_units() {
        // 'ñ' is one unit (241); the emoji is a surrogate pair (0xD83C, 0xDF89).
        let expected = 241u32 + 0xD83C + 0xDF89;
        assert_eq!(Mulberry32::from_seed("ñ🎉").state(), expected);
    }

    #[test]
    fn seed_sum_wraps_at_32_bits() {
        let seed: String = std::iter::repeat('\u{FFFF}').take(70_000).collect();
        let rng = Mulberry32::from_seed(&seed);
        assert_eq!(rng.state(), 292_482_704);
    }

    #[test]
    fn reference_stream_for_test_seed() {
        let mut rng = Mulberry32::from_seed("test");
        let outputs: Vec<u32> = (0..4).map(|_| rng.next_u32()).collect();
        assert_eq!(
            outputs,
            vec![2_939_769_884, 4_252_406_925, 2_343_578_805, 2_648_383_784]
        );
    }

    #[test]
    fn reference_stream_for_single_character() {
        let mut rng = Mulberry32::from_seed("a");
        assert_eq!(rng.next_u32(), 2_429_163_745);
        assert_eq!(rng.next_u32(), 942_745_579);
        assert_eq!(rng.next_u32(), 3_581_792_554);
    }

    #[test]
    fn empty_seed_still_generates() {
        let mut rng = Mulberry32::from_seed("");
        assert_eq!(rng.next_u32(), 1_144_304_738);
    }

    #[test]
    fn wrapped_seed_matches_reference() {
        let seed: String = std::iter::repeat('\u{FFFF}').take(70_000).collect();
        let mut rng = Mulberry32::from_seed(&seed);
        assert_eq!(rng.next_u32(), 2_872_969_718);
        assert_eq!(rng.next_u32(), 2_819_308_500);
    }

    #[test]
    fn floats_are_scaled_outputs() {
        let mut a = Mulberry32::from_seed("scale");
        let mut b = a.clone();
        for _ in 0..100 {
            let f = a.next_f64();
            assert!((0.0..1.0).contains(&f));
            assert_eq!(f, f64::from(b.next_u32()) / TWO_POW_32);
        }
    }

    #[test]
    fn state_advances_by_increment() {
        let mut rng = Mulberry32::from_state(u32::MAX);
        rng.next_u32();
        assert_eq!(rng.state(), MULBERRY_INCREMENT.wrapping_sub(1));
    }

    #[test]
    fn thread_random_stays_in_unit_interval() {
        let mut rng = ThreadRandom;
        for _ in 0..1_000 {
            let f = rng.next_f64();
            assert!((0.0..1.0).contains(&f));
        }
    }

    #[test]
    fn rng_source_wraps_rand_generators() {
        let mut a = RngSource(StdRng::seed_from_u64(7));
        let mut b = RngSource(StdRng::seed_from_u64(7));
        for _ in 0..10 {
            assert_eq!(a.next_f64(), b.next_f64());
        }
    }
}
