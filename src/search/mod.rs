// src/search/mod.rs
//! Shared scaffolding of the two search drivers: result types, the fatal
//! error surface, deterministic per-candidate seeding, and the parallel
//! scoring batch.
//!
//! Scoring one candidate is pure and stateless, so a whole generation is
//! evaluated as an embarrassingly parallel batch; only the subsequent
//! selection/update step, which reads all of the batch's scores, runs
//! serially. Each candidate gets its own RNG seeded from
//! `(run seed, round, index)`, which keeps a run bit-for-bit reproducible
//! regardless of how rayon schedules the batch.

pub mod genetic;
pub mod swarm;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use statrs::statistics::Statistics;
use thiserror::Error;

use crate::config::ConfigError;
use crate::curves::CurveParameters;
use crate::security::{FitnessFunction, FitnessScore};

pub use genetic::GeneticSearch;
pub use swarm::SwarmSearch;

/// Fitness summary of one generation/iteration. `best` is the best score
/// ever recorded up to that round, so the series is non-decreasing; `mean`
/// is the average over the round's population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationStats {
    pub best: f64,
    pub mean: f64,
}

/// Result of a completed run: the best candidate found, its score, and the
/// per-round fitness series for external progress reporting.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: CurveParameters,
    pub best_fitness: FitnessScore,
    pub history: Vec<GenerationStats>,
}

/// Fatal outcomes of a run. Candidate-level pathologies never surface here;
/// they are data handled by the fitness short-circuit.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The configuration failed validation before the run started.
    #[error("invalid search configuration")]
    InvalidConfig(#[from] ConfigError),

    /// The run finished without ever seeing a structurally valid candidate.
    /// Distinct from a successful run that merely failed to improve.
    #[error("no structurally valid candidate found within {rounds} rounds")]
    NoViableCandidate { rounds: usize },
}

/// SplitMix-style mixer deriving one candidate's seed from the run seed, the
/// round number, and the candidate's index in the batch.
pub(crate) fn derive_seed(seed: u64, round: u64, index: u64) -> u64 {
    let mut z = seed
        ^ round.wrapping_mul(0x9e37_79b9_7f4a_7c15)
        ^ index.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Score a whole population in parallel. Candidate order is preserved; the
/// per-candidate seeds make the result independent of scheduling.
pub(crate) fn score_batch(
    fitness: &FitnessFunction,
    candidates: &[CurveParameters],
    seed: u64,
    round: u64,
) -> Vec<FitnessScore> {
    candidates
        .par_iter()
        .enumerate()
        .map(|(index, candidate)| {
            let mut rng = StdRng::seed_from_u64(derive_seed(seed, round, index as u64));
            fitness.score(candidate, &mut rng)
        })
        .collect()
}

/// Mean fitness value of a scored batch.
pub(crate) fn mean_fitness(scores: &[FitnessScore]) -> f64 {
    scores
        .iter()
        .map(|score| score.value)
        .collect::<Vec<f64>>()
        .mean()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::random_curve;
    use crate::security::FitnessWeights;

    #[test]
    fn test_derive_seed_separates_streams() {
        let base = derive_seed(7, 0, 0);
        assert_ne!(base, derive_seed(7, 0, 1), "indices must get distinct seeds");
        assert_ne!(base, derive_seed(7, 1, 0), "rounds must get distinct seeds");
        assert_ne!(base, derive_seed(8, 0, 0), "runs must get distinct seeds");
        assert_eq!(base, derive_seed(7, 0, 0), "derivation must be stable");
    }

    #[test]
    fn test_score_batch_matches_serial_scoring() {
        let mut rng = StdRng::seed_from_u64(11);
        let candidates: Vec<_> = (0..6).map(|_| random_curve(12, 20, &mut rng)).collect();
        let fitness = FitnessFunction::new(FitnessWeights::default(), 20, 128);

        let parallel = score_batch(&fitness, &candidates, 99, 0);
        let serial: Vec<_> = candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| {
                let mut rng = StdRng::seed_from_u64(derive_seed(99, 0, index as u64));
                fitness.score(candidate, &mut rng)
            })
            .collect();

        assert_eq!(
            parallel, serial,
            "parallel scheduling must not change any score"
        );
    }

    #[test]
    fn test_mean_fitness_averages_values() {
        let scores = vec![
            FitnessScore {
                value: 0.2,
                breakdown: None,
            },
            FitnessScore {
                value: 0.6,
                breakdown: None,
            },
        ];
        assert!((mean_fitness(&scores) - 0.4).abs() < 1e-12);
    }
}
