// src/search/genetic.rs
//! Genetic search over curve parameters.
//!
//! An explicit generational state machine: Initialize → {Evaluate → Select →
//! Crossover → Mutate} × G → Terminate. Selection, crossover and mutation
//! are ordinary functions over an owned population — no scheduling framework
//! — and the single best candidate ever seen is carried into every next
//! generation unchanged, so the recorded best score never regresses.
//!
//! Recombination and mutation are free to destroy validity; broken children
//! are simply scored at the minimum by the fitness short-circuit and bred
//! out again. That is the expected texture of this search space, not an
//! error path.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rug::Integer;
use statrs::distribution::Normal;

use crate::arithmetic::{mod_reduce, random_prime};
use crate::config::{SearchConfig, SelectionMethod};
use crate::curves::{find_generator, random_curve, CurveParameters};
use crate::search::{mean_fitness, score_batch, GenerationStats, SearchError, SearchOutcome};
use crate::security::{FitnessFunction, FitnessScore};

/// Genetic driver borrowing the run configuration and the shared objective.
pub struct GeneticSearch<'a> {
    config: &'a SearchConfig,
    fitness: &'a FitnessFunction,
}

impl<'a> GeneticSearch<'a> {
    pub fn new(config: &'a SearchConfig, fitness: &'a FitnessFunction) -> Self {
        Self { config, fitness }
    }

    /// Run the full generational loop and return the best candidate found.
    pub fn run(&self) -> Result<SearchOutcome, SearchError> {
        self.run_with_cancel(&AtomicBool::new(false))
    }

    /// Run the generational loop, checking `cancel` between rounds. A
    /// cancelled run stops requesting further generations; the best
    /// candidate found so far is returned and remains immediately usable.
    pub fn run_with_cancel(&self, cancel: &AtomicBool) -> Result<SearchOutcome, SearchError> {
        self.config.validate()?;
        let config = self.config;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let noise = Normal::new(0.0, config.genetic.mutation_sigma)
            .expect("config validation guarantees a positive, finite mutation sigma");

        info!(
            "genetic search: {} individuals, {} generations, {}-bit moduli",
            config.population_size, config.rounds, config.bit_width
        );

        let mut population: Vec<CurveParameters> = (0..config.population_size)
            .map(|_| random_curve(config.bit_width, config.miller_rabin_rounds, &mut rng))
            .collect();

        let mut best: Option<(CurveParameters, FitnessScore)> = None;
        let mut history = Vec::with_capacity(config.rounds);
        let mut stagnant_rounds = 0usize;

        for generation in 0..config.rounds {
            if cancel.load(Ordering::Relaxed) {
                info!("cancellation requested, stopping after {generation} generations");
                break;
            }
            let scores = score_batch(self.fitness, &population, config.seed, generation as u64);

            // Strict improvement only, so ties keep the earlier holder.
            let mut improved = false;
            for (candidate, score) in population.iter().zip(&scores) {
                let is_better = match &best {
                    Some((_, incumbent)) => score.value > incumbent.value,
                    None => true,
                };
                if is_better {
                    best = Some((candidate.clone(), score.clone()));
                    improved = true;
                }
            }
            if improved {
                stagnant_rounds = 0;
            } else {
                stagnant_rounds += 1;
            }

            let best_value = best
                .as_ref()
                .map(|(_, score)| score.value)
                .unwrap_or(FitnessScore::MINIMUM);
            let mean = mean_fitness(&scores);
            history.push(GenerationStats {
                best: best_value,
                mean,
            });
            info!(
                "generation {}: best {:.4}, mean {:.4}",
                generation + 1,
                best_value,
                mean
            );

            if stagnant_rounds >= config.stagnation_limit {
                info!(
                    "stopping after {} generations without improvement",
                    stagnant_rounds
                );
                break;
            }
            if generation + 1 == config.rounds {
                break;
            }

            population = self.breed(&population, &scores, &best, &noise, &mut rng);
        }

        match best {
            Some((params, score)) if score.is_viable() => Ok(SearchOutcome {
                best: params,
                best_fitness: score,
                history,
            }),
            _ => Err(SearchError::NoViableCandidate {
                rounds: config.rounds,
            }),
        }
    }

    /// Build the next generation: selected, recombined, mutated offspring
    /// plus the untouched elite.
    fn breed(
        &self,
        population: &[CurveParameters],
        scores: &[FitnessScore],
        best: &Option<(CurveParameters, FitnessScore)>,
        noise: &Normal,
        rng: &mut StdRng,
    ) -> Vec<CurveParameters> {
        let config = self.config;
        let elite = best.as_ref().map(|(candidate, _)| candidate.clone());
        let breed_count = config.population_size - usize::from(elite.is_some());

        let mut offspring = Vec::with_capacity(config.population_size);
        while offspring.len() < breed_count {
            let parent_a = select(population, scores, &config.genetic.selection, rng);
            let parent_b = select(population, scores, &config.genetic.selection, rng);

            let (mut child_a, mut child_b) =
                if rng.gen_bool(config.genetic.crossover_probability) {
                    crossover(parent_a, parent_b, rng)
                } else {
                    (parent_a.clone(), parent_b.clone())
                };

            self.mutate(&mut child_a, noise, rng);
            offspring.push(child_a);
            if offspring.len() < breed_count {
                self.mutate(&mut child_b, noise, rng);
                offspring.push(child_b);
            }
        }

        if let Some(candidate) = elite {
            offspring.push(candidate);
        }
        offspring
    }

    /// Per-field mutation. Coefficients and the order get a bounded Gaussian
    /// nudge, the modulus is replaced by a fresh prime, and the generator is
    /// re-derived on the (possibly moved) curve. Any resulting invalidity is
    /// settled by the validator at scoring time.
    fn mutate(&self, candidate: &mut CurveParameters, noise: &Normal, rng: &mut StdRng) {
        let config = self.config;
        let probability = config.genetic.mutation_probability;

        if rng.gen_bool(probability) {
            candidate.p = random_prime(config.bit_width, config.miller_rabin_rounds, rng);
        }
        if rng.gen_bool(probability) {
            candidate.a = perturb_mod(&candidate.a, &candidate.p, noise, rng);
        }
        if rng.gen_bool(probability) {
            candidate.b = perturb_mod(&candidate.b, &candidate.p, noise, rng);
        }
        if rng.gen_bool(probability) {
            match find_generator(&candidate.a, &candidate.b, &candidate.p, rng) {
                Ok((gx, gy)) => {
                    candidate.gx = gx;
                    candidate.gy = gy;
                }
                Err(err) => {
                    // Keep the stale point; the candidate will score minimum
                    // and selection pressure disposes of it.
                    debug!("generator mutation failed: {err}");
                }
            }
        }
        if rng.gen_bool(probability) {
            let shifted = Integer::from(&candidate.n + gaussian_delta(noise, rng));
            candidate.n = if shifted < 1 { Integer::from(1) } else { shifted };
        }
        if rng.gen_bool(probability) {
            let shifted = candidate.h.to_i64().unwrap_or(1) + rng.gen_range(-1i64..=1);
            candidate.h = Integer::from(shifted.max(1));
        }
    }
}

/// Pick a parent according to the configured selection method.
fn select<'p>(
    population: &'p [CurveParameters],
    scores: &[FitnessScore],
    method: &SelectionMethod,
    rng: &mut StdRng,
) -> &'p CurveParameters {
    match method {
        SelectionMethod::Tournament { size } => {
            let mut winner = rng.gen_range(0..population.len());
            for _ in 1..*size {
                let challenger = rng.gen_range(0..population.len());
                if scores[challenger].value > scores[winner].value {
                    winner = challenger;
                }
            }
            &population[winner]
        }
        SelectionMethod::FitnessProportional => {
            let total: f64 = scores.iter().map(|score| score.value).sum();
            if total <= 0.0 {
                // Nothing to weight by yet; fall back to uniform.
                return &population[rng.gen_range(0..population.len())];
            }
            let mut spin = rng.gen::<f64>() * total;
            for (candidate, score) in population.iter().zip(scores) {
                spin -= score.value;
                if spin <= 0.0 {
                    return candidate;
                }
            }
            &population[population.len() - 1]
        }
    }
}

/// Whole-field swap crossover. The generator coordinates travel as one unit
/// so a child never inherits half a point.
fn crossover(
    parent_a: &CurveParameters,
    parent_b: &CurveParameters,
    rng: &mut StdRng,
) -> (CurveParameters, CurveParameters) {
    let mut child_a = parent_a.clone();
    let mut child_b = parent_b.clone();

    if rng.gen_bool(0.5) {
        std::mem::swap(&mut child_a.a, &mut child_b.a);
    }
    if rng.gen_bool(0.5) {
        std::mem::swap(&mut child_a.b, &mut child_b.b);
    }
    if rng.gen_bool(0.5) {
        std::mem::swap(&mut child_a.p, &mut child_b.p);
    }
    if rng.gen_bool(0.5) {
        std::mem::swap(&mut child_a.gx, &mut child_b.gx);
        std::mem::swap(&mut child_a.gy, &mut child_b.gy);
    }
    if rng.gen_bool(0.5) {
        std::mem::swap(&mut child_a.n, &mut child_b.n);
    }
    if rng.gen_bool(0.5) {
        std::mem::swap(&mut child_a.h, &mut child_b.h);
    }

    (child_a, child_b)
}

/// Rounded draw from the Gaussian mutation noise.
fn gaussian_delta(noise: &Normal, rng: &mut StdRng) -> i64 {
    noise.sample(rng).round() as i64
}

/// Field value nudged by Gaussian noise and reduced back into `[0, p)`.
fn perturb_mod(value: &Integer, p: &Integer, noise: &Normal, rng: &mut StdRng) -> Integer {
    mod_reduce(&Integer::from(value + gaussian_delta(noise, rng)), p)
}
