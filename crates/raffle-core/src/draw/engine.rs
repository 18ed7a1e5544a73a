// Draw engine: picks an ordered set of distinct winners from a roster.
//
// The roster is borrowed, never mutated. The engine shuffles a vector of
// references with Fisher-Yates and keeps the first `winner_count` entries.
// A non-blank seed makes the result reproducible; otherwise the engine's
// entropy source drives the shuffle.

use thiserror::Error;
use tracing::debug;

use super::rng::{Mulberry32, RandomSource, ThreadRandom};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("number of winners must be between 1 and {available}, got {requested}")]
    InvalidWinnerCount { requested: usize, available: usize },
}

// ---------------------------------------------------------------------------
// DrawEngine
// ---------------------------------------------------------------------------

/// Winner selection with an injectable source for unseeded draws.
#[derive(Debug, Clone, Default)]
pub struct DrawEngine<E = ThreadRandom> {
    entropy: E,
}

impl DrawEngine<ThreadRandom> {
    pub fn new() -> Self {
        Self {
            entropy: ThreadRandom,
        }
    }
}

impl<E: RandomSource> DrawEngine<E> {
    /// Build an engine whose unseeded draws pull from `entropy`.
    pub fn with_entropy(entropy: E) -> Self {
        Self { entropy }
    }

    /// Draw `winner_count` distinct winners from `roster`.
    ///
    /// `seed` selects the path: a seed with any non-whitespace character
    /// seeds a fresh `Mulberry32` from the full, untrimmed string; `None`
    /// or a blank seed uses the engine's entropy source.
    pub fn draw<'a, P>(
        &mut self,
        roster: &'a [P],
        winner_count: usize,
        seed: Option<&str>,
    ) -> Result<Vec<&'a P>, DrawError> {
        check_winner_count(winner_count, roster.len())?;

        match seed.filter(|s| !s.trim().is_empty()) {
            Some(seed) => {
                debug!(roster = roster.len(), winner_count, "seeded draw");
                let mut rng = Mulberry32::from_seed(seed);
                Ok(select(roster, winner_count, &mut rng))
            }
            None => {
                debug!(roster = roster.len(), winner_count, "unseeded draw");
                Ok(select(roster, winner_count, &mut self.entropy))
            }
        }
    }
}

/// Draw with the ambient thread-local generator for unseeded calls.
pub fn draw<'a, P>(
    roster: &'a [P],
    winner_count: usize,
    seed: Option<&str>,
) -> Result<Vec<&'a P>, DrawError> {
    DrawEngine::new().draw(roster, winner_count, seed)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_winner_count(requested: usize, available: usize) -> Result<(), DrawError> {
    if requested == 0 || requested > available {
        return Err(DrawError::InvalidWinnerCount {
            requested,
            available,
        });
    }
    Ok(())
}

/// Shuffle references to the roster and keep the first `winner_count`.
fn select<'a, P, R: RandomSource>(
    roster: &'a [P],
    winner_count: usize,
    rng: &mut R,
) -> Vec<&'a P> {
    let mut shuffled: Vec<&P> = roster.iter().collect();
    shuffle(&mut shuffled, rng);
    shuffled.truncate(winner_count);
    shuffled
}

/// Fisher-Yates, walking from the last index down to 1.
fn shuffle<T, R: RandomSource>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = (rng.next_f64() * (i + 1) as f64).floor() as usize;
        items.swap(i, j.min(i));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::rng::RngSource;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    /// Replays a fixed list of floats, cycling when exhausted.
    struct Scripted {
        values: Vec<f64>,
        index: usize,
    }

    impl Scripted {
        fn new(values: Vec<f64>) -> Self {
            Self { values, index: 0 }
        }
    }

    impl RandomSource for Scripted {
        fn next_f64(&mut self) -> f64 {
            let v = self.values[self.index % self.values.len()];
            self.index += 1;
            v
        }
    }

    fn letters() -> Vec<&'static str> {
        vec!["A", "B", "C", "D", "E"]
    }

    fn copied(winners: Vec<&&'static str>) -> Vec<&'static str> {
        winners.into_iter().copied().collect()
    }

    // ------------------------------------------------------------------
    // Reference scenarios
    // ------------------------------------------------------------------

    #[test]
    fn test_seed_reproduces_reference_sequence() {
        let roster = letters();
        let winners = draw(&roster, 3, Some("test")).unwrap();
        assert_eq!(copied(winners), vec!["A", "C", "B"]);
    }

    #[test]
    fn full_permutation_for_test_seed() {
        let roster = letters();
        let winners = draw(&roster, 5, Some("test")).unwrap();
        assert_eq!(copied(winners), vec!["A", "C", "B", "E", "D"]);
    }

    #[test]
    fn seeds_with_equal_character_sums_collide() {
        let roster = letters();
        let a = draw(&roster, 5, Some("test")).unwrap();
        let b = draw(&roster, 5, Some("tset")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn seed_is_case_sensitive() {
        let roster = letters();
        let winners = draw(&roster, 5, Some("Test")).unwrap();
        assert_eq!(copied(winners), vec!["B", "D", "E", "A", "C"]);
    }

    #[test]
    fn larger_roster_reference() {
        let roster: Vec<String> = (1..=10).map(|i| format!("p{i}")).collect();
        let winners: Vec<&str> = draw(&roster, 4, Some("spring-gala-2024"))
            .unwrap()
            .into_iter()
            .map(String::as_str)
            .collect();
        assert_eq!(winners, vec!["p1", "p8", "p9", "p2"]);
    }

    #[test]
    fn single_participant_always_wins() {
        let roster = vec!["solo"];
        for seed in [Some("anything"), Some("x"), None] {
            let winners = draw(&roster, 1, seed).unwrap();
            assert_eq!(copied(winners), vec!["solo"]);
        }
    }

    #[test]
    fn too_many_winners_is_rejected() {
        let roster = letters();
        let err = draw(&roster, 6, Some("test")).unwrap_err();
        assert_eq!(
            err,
            DrawError::InvalidWinnerCount {
                requested: 6,
                available: 5
            }
        );
    }

    #[test]
    fn zero_winners_is_rejected() {
        let roster = letters();
        let err = draw(&roster, 0, None).unwrap_err();
        assert!(matches!(
            err,
            DrawError::InvalidWinnerCount { requested: 0, .. }
        ));
    }

    #[test]
    fn empty_roster_is_rejected() {
        let roster: Vec<&str> = Vec::new();
        assert!(draw(&roster, 1, Some("seed")).is_err());
    }

    #[test]
    fn error_message_names_bounds() {
        let err = DrawError::InvalidWinnerCount {
            requested: 6,
            available: 5,
        };
        assert_eq!(
            err.to_string(),
            "number of winners must be between 1 and 5, got 6"
        );
    }

    // ------------------------------------------------------------------
    // Entropy path
    // ------------------------------------------------------------------

    #[test]
    fn unseeded_draw_uses_injected_source() {
        let roster = letters();
        // j = 0 on every step rotates the first element to the back.
        let mut engine = DrawEngine::with_entropy(Scripted::new(vec![0.0]));
        let winners = engine.draw(&roster, 5, None).unwrap();
        assert_eq!(copied(winners), vec!["B", "C", "D", "E", "A"]);
    }

    #[test]
    fn values_near_one_keep_roster_order() {
        let roster = letters();
        let mut engine = DrawEngine::with_entropy(Scripted::new(vec![0.999_999]));
        let winners = engine.draw(&roster, 5, None).unwrap();
        assert_eq!(copied(winners), roster);
    }

    #[test]
    fn blank_seed_falls_back_to_entropy() {
        let roster = letters();
        for seed in ["", "   ", "\t\n"] {
            let mut engine = DrawEngine::with_entropy(Scripted::new(vec![0.0]));
            let winners = engine.draw(&roster, 5, Some(seed)).unwrap();
            assert_eq!(copied(winners), vec!["B", "C", "D", "E", "A"], "seed {seed:?}");
        }
    }

    #[test]
    fn seeded_draw_ignores_injected_source() {
        let roster = letters();
        let mut engine = DrawEngine::with_entropy(Scripted::new(vec![0.0]));
        let winners = engine.draw(&roster, 3, Some("test")).unwrap();
        assert_eq!(copied(winners), vec!["A", "C", "B"]);
    }

    #[test]
    fn seed_is_not_trimmed_before_hashing() {
        let roster = letters();
        let padded = draw(&roster, 5, Some(" test")).unwrap();
        let plain = draw(&roster, 5, Some("test")).unwrap();
        assert_ne!(padded, plain);
    }

    #[test]
    fn roster_is_left_untouched() {
        let roster = letters();
        let before = roster.clone();
        let _ = draw(&roster, 3, Some("test")).unwrap();
        let _ = draw(&roster, 5, None).unwrap();
        assert_eq!(roster, before);
    }

    #[test]
    fn distinct_seeds_mostly_differ() {
        let roster: Vec<String> = (0..10).map(|i| format!("p{i}")).collect();
        let outcomes: HashSet<Vec<&String>> = (0..20)
            .map(|i| draw(&roster, 10, Some(format!("seed-{i}").as_str())).unwrap())
            .collect();
        assert!(outcomes.len() >= 18, "only {} distinct outcomes", outcomes.len());
    }

    #[test]
    fn first_place_is_roughly_uniform() {
        let roster = vec!["x", "y", "z"];
        let mut engine = DrawEngine::with_entropy(RngSource(StdRng::seed_from_u64(2024)));
        let mut counts = [0usize; 3];
        for _ in 0..6_000 {
            let winner = engine.draw(&roster, 1, None).unwrap()[0];
            let idx = roster.iter().position(|p| p == winner).unwrap();
            counts[idx] += 1;
        }
        for count in counts {
            assert!((1_800..=2_200).contains(&count), "counts {counts:?}");
        }
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    proptest! {
        #[test]
        fn seeded_draws_are_deterministic(
            size in 1usize..40,
            pick in 0usize..40,
            seed in "\\PC{1,24}",
        ) {
            prop_assume!(!seed.trim().is_empty());
            let roster: Vec<usize> = (0..size).collect();
            let k = pick % size + 1;
            let first = draw(&roster, k, Some(seed.as_str())).unwrap();
            let second = draw(&roster, k, Some(seed.as_str())).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn winners_are_distinct_members(
            size in 1usize..60,
            pick in 0usize..60,
            seed in proptest::option::of("[a-z0-9 ]{0,12}"),
        ) {
            let roster: Vec<usize> = (0..size).map(|i| i * 7).collect();
            let k = pick % size + 1;
            let winners = draw(&roster, k, seed.as_deref()).unwrap();

            prop_assert_eq!(winners.len(), k);
            let unique: HashSet<usize> = winners.iter().map(|w| **w).collect();
            prop_assert_eq!(unique.len(), k);
            for w in &winners {
                prop_assert!(roster.contains(w));
            }
        }

        #[test]
        fn oversize_requests_always_fail(size in 0usize..30, extra in 1usize..10) {
            let roster: Vec<usize> = (0..size).collect();
            let result = draw(&roster, size + extra, Some("seed"));
            prop_assert_eq!(
                result,
                Err(DrawError::InvalidWinnerCount { requested: size + extra, available: size })
            );
        }
    }
}
