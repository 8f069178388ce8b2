// src/search/swarm.rs
//! Particle-swarm search over curve parameters.
//!
//! Particles move through a continuous relaxation of the 7-dimensional
//! parameter space `[a, b, p, gx, gy, n, h]` under the standard
//! inertia/cognitive/social velocity rule. Because valid parameters are
//! integers under primality and on-curve constraints, every position update
//! is followed by a repair projection — rounding to integers, snapping the
//! modulus to a nearby prime of the configured width, re-deriving a
//! consistent generator, and clamping the order claim into the Hasse
//! window. The repair runs on every iteration; skipping it would silently
//! hand the fitness function invalid curves. Repairing an already-valid
//! position changes nothing.
//!
//! Personal and global bests advance only on strictly higher scores of the
//! repaired, validated position, so ties keep the earlier holder.

use std::sync::atomic::{AtomicBool, Ordering};

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rug::Integer;

use crate::arithmetic::{is_on_curve, miller_rabin, mod_reduce, random_prime, AffinePoint};
use crate::config::SearchConfig;
use crate::curves::{find_generator_from, hasse_window, random_curve, CurveParameters};
use crate::search::{mean_fitness, score_batch, GenerationStats, SearchError, SearchOutcome};
use crate::security::{FitnessFunction, FitnessScore};

const DIMENSIONS: usize = 7;

/// One particle: continuous position and velocity, the repaired candidate
/// standing at that position, and the personal-best record driving the
/// cognitive pull.
struct Particle {
    position: [f64; DIMENSIONS],
    velocity: [f64; DIMENSIONS],
    current: CurveParameters,
    best_position: [f64; DIMENSIONS],
    best_score: Option<FitnessScore>,
}

/// Swarm driver borrowing the run configuration and the shared objective.
pub struct SwarmSearch<'a> {
    config: &'a SearchConfig,
    fitness: &'a FitnessFunction,
}

impl<'a> SwarmSearch<'a> {
    pub fn new(config: &'a SearchConfig, fitness: &'a FitnessFunction) -> Self {
        Self { config, fitness }
    }

    /// Run the full iteration loop and return the best particle found.
    pub fn run(&self) -> Result<SearchOutcome, SearchError> {
        self.run_with_cancel(&AtomicBool::new(false))
    }

    /// Run the iteration loop, checking `cancel` between rounds. A
    /// cancelled run stops requesting further iterations; the best particle
    /// found so far is returned and remains immediately usable.
    pub fn run_with_cancel(&self, cancel: &AtomicBool) -> Result<SearchOutcome, SearchError> {
        self.config.validate()?;
        let config = self.config;
        let mut rng = StdRng::seed_from_u64(config.seed);

        info!(
            "swarm search: {} particles, {} iterations, {}-bit moduli",
            config.population_size, config.rounds, config.bit_width
        );

        let mut particles: Vec<Particle> = (0..config.population_size)
            .map(|_| {
                let params = random_curve(config.bit_width, config.miller_rabin_rounds, &mut rng);
                let position = project(&params);
                let mut velocity = [0.0; DIMENSIONS];
                for component in velocity.iter_mut() {
                    *component = rng.gen::<f64>();
                }
                Particle {
                    position,
                    velocity,
                    current: params,
                    best_position: position,
                    best_score: None,
                }
            })
            .collect();

        let mut global_best: Option<(CurveParameters, FitnessScore, [f64; DIMENSIONS])> = None;
        let mut history = Vec::with_capacity(config.rounds);
        let mut stagnant_rounds = 0usize;

        for iteration in 0..config.rounds {
            if cancel.load(Ordering::Relaxed) {
                info!("cancellation requested, stopping after {iteration} iterations");
                break;
            }
            if iteration > 0 {
                let inertia = self.inertia_at(iteration);
                let global_position = global_best
                    .as_ref()
                    .map(|(_, _, position)| *position)
                    .unwrap_or_else(|| particles[0].best_position);
                for particle in particles.iter_mut() {
                    self.advance(particle, &global_position, inertia, &mut rng);
                }
            }

            let candidates: Vec<CurveParameters> = particles
                .iter()
                .map(|particle| particle.current.clone())
                .collect();
            let scores = score_batch(self.fitness, &candidates, config.seed, iteration as u64);

            // Serial best updates; strict improvement keeps earlier holders
            // on ties.
            let mut improved = false;
            for (particle, score) in particles.iter_mut().zip(&scores) {
                let personal_better = match &particle.best_score {
                    Some(incumbent) => score.value > incumbent.value,
                    None => true,
                };
                if personal_better {
                    particle.best_score = Some(score.clone());
                    particle.best_position = particle.position;
                }

                let global_better = match &global_best {
                    Some((_, incumbent, _)) => score.value > incumbent.value,
                    None => true,
                };
                if global_better {
                    global_best =
                        Some((particle.current.clone(), score.clone(), particle.position));
                    improved = true;
                }
            }
            if improved {
                stagnant_rounds = 0;
            } else {
                stagnant_rounds += 1;
            }

            let best_value = global_best
                .as_ref()
                .map(|(_, score, _)| score.value)
                .unwrap_or(FitnessScore::MINIMUM);
            let mean = mean_fitness(&scores);
            history.push(GenerationStats {
                best: best_value,
                mean,
            });
            info!(
                "iteration {}: best {:.4}, mean {:.4}",
                iteration + 1,
                best_value,
                mean
            );

            if stagnant_rounds >= config.stagnation_limit {
                info!(
                    "stopping after {} iterations without improvement",
                    stagnant_rounds
                );
                break;
            }
        }

        match global_best {
            Some((params, score, _)) if score.is_viable() => Ok(SearchOutcome {
                best: params,
                best_fitness: score,
                history,
            }),
            _ => Err(SearchError::NoViableCandidate {
                rounds: config.rounds,
            }),
        }
    }

    /// Inertia weight at an iteration: linear decay from `inertia_max` to
    /// `inertia_min` over the run.
    fn inertia_at(&self, iteration: usize) -> f64 {
        let config = &self.config.swarm;
        let progress = iteration as f64 / self.config.rounds.max(1) as f64;
        config.inertia_max - (config.inertia_max - config.inertia_min) * progress
    }

    /// One velocity/position update followed by the mandatory repair.
    fn advance(
        &self,
        particle: &mut Particle,
        global_position: &[f64; DIMENSIONS],
        inertia: f64,
        rng: &mut StdRng,
    ) {
        let swarm = &self.config.swarm;
        for dimension in 0..DIMENSIONS {
            let r1 = rng.gen::<f64>();
            let r2 = rng.gen::<f64>();
            let cognitive = swarm.cognitive
                * r1
                * (particle.best_position[dimension] - particle.position[dimension]);
            let social = swarm.social
                * r2
                * (global_position[dimension] - particle.position[dimension]);
            particle.velocity[dimension] =
                inertia * particle.velocity[dimension] + cognitive + social;
            particle.position[dimension] += particle.velocity[dimension];
        }

        particle.current = self.repair(&mut particle.position, rng);
    }

    /// Project a continuous position back onto a well-formed parameter
    /// record and write the repaired coordinates into the position vector.
    ///
    /// Already-valid positions pass through unchanged: integers stay where
    /// they are, a prime modulus of the configured width is kept, an
    /// on-curve generator is kept, and an in-window order claim is kept.
    fn repair(&self, position: &mut [f64; DIMENSIONS], rng: &mut StdRng) -> CurveParameters {
        let config = self.config;

        let rounded: Vec<Integer> = position
            .iter()
            .map(|value| integer_from(value.abs().round()))
            .collect();

        // Modulus: keep a prime of acceptable width, otherwise snap to the
        // next prime above the rounded value, resampling when the position
        // drifted out of the configured width entirely.
        let mut p = rounded[2].clone();
        let p_acceptable = p >= 5
            && p.significant_bits() <= config.bit_width
            && miller_rabin(&p, config.miller_rabin_rounds, rng);
        if !p_acceptable {
            p = if p < 5 || p.significant_bits() > config.bit_width {
                random_prime(config.bit_width, config.miller_rabin_rounds, rng)
            } else {
                let snapped = p.next_prime();
                if snapped.significant_bits() > config.bit_width {
                    random_prime(config.bit_width, config.miller_rabin_rounds, rng)
                } else {
                    snapped
                }
            };
        }

        let a = mod_reduce(&rounded[0], &p);
        let b = mod_reduce(&rounded[1], &p);

        // Generator: keep it when it still satisfies the curve equation,
        // otherwise re-derive the nearest point at or above the rounded x.
        let gx = mod_reduce(&rounded[3], &p);
        let gy = mod_reduce(&rounded[4], &p);
        let candidate_point = AffinePoint::Point {
            x: gx.clone(),
            y: gy.clone(),
        };
        let (gx, gy) = if is_on_curve(&candidate_point, &a, &b, &p) {
            (gx, gy)
        } else {
            match find_generator_from(&a, &b, &p, &gx) {
                Ok(pair) => pair,
                // No nearby point: leave the coordinates; the validator
                // scores this position at the minimum and the swarm moves on.
                Err(_) => (gx, gy),
            }
        };

        // Order claim clamped into the Hasse window.
        let (lower, upper) = hasse_window(&p);
        let mut n = rounded[5].clone();
        if n < lower {
            n = lower.clone();
        } else if n > upper {
            n = upper.clone();
        }

        // Cofactor: at least 1, and reset to 1 when h·n escapes the window
        // (the only consistent value once n itself is inside it).
        let mut h = rounded[6].clone();
        if h < 1 {
            h = Integer::from(1);
        }
        if Integer::from(&h * &n) > upper {
            h = Integer::from(1);
        }

        let repaired = CurveParameters {
            a,
            b,
            p,
            gx,
            gy,
            n,
            h,
        };
        *position = project(&repaired);
        repaired
    }
}

/// Continuous coordinates of a parameter record.
fn project(params: &CurveParameters) -> [f64; DIMENSIONS] {
    [
        params.a.to_f64(),
        params.b.to_f64(),
        params.p.to_f64(),
        params.gx.to_f64(),
        params.gy.to_f64(),
        params.n.to_f64(),
        params.h.to_f64(),
    ]
}

/// Round a non-negative float to an integer; non-finite values collapse to
/// zero and are repaired like any other invalid coordinate.
fn integer_from(value: f64) -> Integer {
    Integer::from_f64(value).unwrap_or_else(Integer::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::FitnessWeights;

    fn small_config(seed: u64) -> SearchConfig {
        SearchConfig {
            bit_width: 12,
            population_size: 8,
            rounds: 5,
            stagnation_limit: 10,
            seed,
            miller_rabin_rounds: 16,
            rho_iteration_cap: 96,
            ..SearchConfig::default()
        }
    }

    fn fitness_for(config: &SearchConfig) -> FitnessFunction {
        FitnessFunction::new(
            FitnessWeights::default(),
            config.miller_rabin_rounds,
            config.rho_iteration_cap,
        )
    }

    #[test]
    fn test_repair_is_identity_on_valid_positions() {
        let config = small_config(5);
        let fitness = fitness_for(&config);
        let search = SwarmSearch::new(&config, &fitness);

        let mut rng = StdRng::seed_from_u64(17);
        let params = random_curve(config.bit_width, config.miller_rabin_rounds, &mut rng);
        let mut position = project(&params);

        let repaired = search.repair(&mut position, &mut rng);
        assert_eq!(
            repaired, params,
            "repairing an already-valid position must change nothing"
        );
        assert_eq!(position, project(&params));
    }

    #[test]
    fn test_repair_snaps_modulus_to_prime() {
        let config = small_config(5);
        let fitness = fitness_for(&config);
        let search = SwarmSearch::new(&config, &fitness);
        let mut rng = StdRng::seed_from_u64(17);

        // 2048 is 12 bits and composite; the repaired modulus must be a
        // prime of at most the configured width.
        let mut position = [3.0, 7.0, 2048.0, 1.0, 1.0, 2000.0, 1.0];
        let repaired = search.repair(&mut position, &mut rng);
        assert!(miller_rabin(&repaired.p, 25, &mut rng));
        assert!(repaired.p.significant_bits() <= config.bit_width);
        assert!(repaired.a < repaired.p && repaired.b < repaired.p);
        let (lower, upper) = hasse_window(&repaired.p);
        assert!(repaired.n >= lower && repaired.n <= upper);
        assert!(repaired.h >= 1);
    }

    #[test]
    fn test_repair_clamps_order_into_hasse_window() {
        let config = small_config(5);
        let fitness = fitness_for(&config);
        let search = SwarmSearch::new(&config, &fitness);
        let mut rng = StdRng::seed_from_u64(23);

        let mut params = random_curve(config.bit_width, config.miller_rabin_rounds, &mut rng);
        params.n = Integer::from(1); // far below the window
        let mut position = project(&params);
        let repaired = search.repair(&mut position, &mut rng);

        let (lower, upper) = hasse_window(&repaired.p);
        assert!(repaired.n >= lower && repaired.n <= upper);
    }

    #[test]
    fn test_run_produces_viable_best() {
        let config = small_config(31);
        let fitness = fitness_for(&config);
        let outcome = SwarmSearch::new(&config, &fitness)
            .run()
            .expect("a seeded small run must find a viable candidate");
        assert!(outcome.best_fitness.is_viable());
        assert!(!outcome.history.is_empty());
        assert!(outcome.history.len() <= config.rounds);
    }

    #[test]
    fn test_best_series_never_regresses() {
        let config = small_config(9);
        let fitness = fitness_for(&config);
        let outcome = SwarmSearch::new(&config, &fitness).run().unwrap();
        for window in outcome.history.windows(2) {
            assert!(
                window[1].best >= window[0].best,
                "the recorded global best must be non-decreasing"
            );
        }
    }

    #[test]
    fn test_run_is_reproducible() {
        let config = small_config(777);
        let first = SwarmSearch::new(&config, &fitness_for(&config)).run().unwrap();
        let second = SwarmSearch::new(&config, &fitness_for(&config)).run().unwrap();
        assert_eq!(first.best, second.best, "same seed, same best particle");
    }

    #[test]
    fn test_inertia_decays_linearly() {
        let config = small_config(0);
        let fitness = fitness_for(&config);
        let search = SwarmSearch::new(&config, &fitness);
        assert!(search.inertia_at(0) > search.inertia_at(config.rounds - 1));
        assert!((search.inertia_at(0) - config.swarm.inertia_max).abs() < 1e-12);
    }
}
