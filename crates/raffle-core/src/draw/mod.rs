// Winner selection: seeded PRNG plus the Fisher-Yates draw built on it.

pub mod engine;
pub mod rng;

pub use engine::{draw, DrawEngine, DrawError};
pub use rng::{Mulberry32, RandomSource, RngSource, ThreadRandom};
