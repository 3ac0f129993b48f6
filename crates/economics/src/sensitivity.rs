//! Monte Carlo sensitivity analysis over uncertain parameters.
//!
//! Each run draws every parameter from its own seeded generator, derived from
//! the study seed and the run index, so the outcome of a run does not depend
//! on which thread executes it or in what order. Runs are independent and are
//! dispatched in parallel; results are summarised only after all have
//! finished.

use rand::{SeedableRng, distributions::Uniform, rngs::StdRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::EconomicsError;

/// Spread of an uncertain parameter around its mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spread {
    Fixed,
    Normal { std_dev: f64 },
    Uniform { half_width: f64 },
}

/// A parameter given as a mean and spread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uncertain {
    pub name: String,
    pub mean: f64,
    pub spread: Spread,
}

impl Uncertain {
    pub fn normal(name: impl Into<String>, mean: f64, std_dev: f64) -> Self {
        Self {
            name: name.into(),
            mean,
            spread: Spread::Normal { std_dev },
        }
    }

    pub fn uniform(name: impl Into<String>, mean: f64, half_width: f64) -> Self {
        Self {
            name: name.into(),
            mean,
            spread: Spread::Uniform { half_width },
        }
    }

    pub fn fixed(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            mean: value,
            spread: Spread::Fixed,
        }
    }

    fn sampler(&self) -> Result<Sampler, EconomicsError> {
        let invalid = |reason: String| EconomicsError::Distribution {
            parameter: self.name.clone(),
            reason,
        };
        if !self.mean.is_finite() {
            return Err(invalid(format!("mean {} is not finite", self.mean)));
        }
        match self.spread {
            Spread::Fixed => Ok(Sampler::Fixed(self.mean)),
            Spread::Normal { std_dev } => Normal::new(self.mean, std_dev)
                .map(Sampler::Normal)
                .map_err(|err| invalid(format!("standard deviation {std_dev}: {err}"))),
            Spread::Uniform { half_width } => {
                if half_width.is_finite() && half_width >= 0.0 {
                    Ok(Sampler::Uniform(Uniform::new_inclusive(
                        self.mean - half_width,
                        self.mean + half_width,
                    )))
                } else {
                    Err(invalid(format!("half width {half_width} must be >= 0")))
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Sampler {
    Fixed(f64),
    Normal(Normal<f64>),
    Uniform(Uniform<f64>),
}

impl Sampler {
    fn sample(&self, rng: &mut StdRng) -> f64 {
        match self {
            Sampler::Fixed(value) => *value,
            Sampler::Normal(normal) => normal.sample(rng),
            Sampler::Uniform(uniform) => uniform.sample(rng),
        }
    }
}

/// Parameter values for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Draw<'a> {
    parameters: &'a [Uncertain],
    values: Vec<f64>,
}

impl Draw<'_> {
    /// The drawn value of the named parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.parameters
            .iter()
            .position(|p| p.name == name)
            .map(|i| self.values[i])
    }

    /// Drawn values in parameter order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// A run whose model returned an error.
#[derive(Debug, Clone, PartialEq)]
pub struct RunFailure<E> {
    pub run: usize,
    pub values: Vec<f64>,
    pub error: E,
}

/// Mean and percentiles of the successful outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
    pub max: f64,
}

impl Summary {
    /// Summarises a set of outcomes, or `None` if it is empty.
    #[must_use]
    pub fn of(outcomes: &[f64]) -> Option<Self> {
        if outcomes.is_empty() {
            return None;
        }
        let mut sorted = outcomes.to_vec();
        sorted.sort_by(f64::total_cmp);

        Some(Self {
            count: sorted.len(),
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            min: sorted[0],
            p5: percentile(&sorted, 0.05),
            p50: percentile(&sorted, 0.50),
            p95: percentile(&sorted, 0.95),
            max: sorted[sorted.len() - 1],
        })
    }
}

/// Linear interpolation between closest ranks of sorted, non-empty values.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Outcomes of every run, in run order.
#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityReport<E> {
    pub outcomes: Vec<(usize, f64)>,
    pub failures: Vec<RunFailure<E>>,
}

impl<E> SensitivityReport<E> {
    /// Summary of the successful runs.
    #[must_use]
    pub fn summary(&self) -> Option<Summary> {
        let values: Vec<f64> = self.outcomes.iter().map(|(_, value)| *value).collect();
        Summary::of(&values)
    }
}

/// A seeded set of runs over uncertain parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityStudy {
    pub parameters: Vec<Uncertain>,
    pub runs: usize,
    pub seed: u64,
}

impl SensitivityStudy {
    /// Runs `model` once per sampled parameter set.
    ///
    /// Failed runs are reported alongside their drawn values.
    ///
    /// # Errors
    ///
    /// Returns [`EconomicsError::Distribution`] if a parameter cannot be
    /// sampled. Model errors never abort the study.
    pub fn run<F, E>(&self, model: F) -> Result<SensitivityReport<E>, EconomicsError>
    where
        F: Fn(&Draw<'_>) -> Result<f64, E> + Sync,
        E: Send,
    {
        let samplers = self
            .parameters
            .iter()
            .map(Uncertain::sampler)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            runs = self.runs,
            parameters = self.parameters.len(),
            seed = self.seed,
            "sensitivity study started"
        );

        let results: Vec<(usize, Result<f64, RunFailure<E>>)> = (0..self.runs)
            .into_par_iter()
            .map(|run| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(run as u64));
                let draw = Draw {
                    parameters: &self.parameters,
                    values: samplers.iter().map(|s| s.sample(&mut rng)).collect(),
                };
                let outcome = model(&draw).map_err(|error| RunFailure {
                    run,
                    values: draw.values.clone(),
                    error,
                });
                (run, outcome)
            })
            .collect();

        let mut report = SensitivityReport {
            outcomes: Vec::with_capacity(results.len()),
            failures: Vec::new(),
        };
        for (run, result) in results {
            match result {
                Ok(value) => report.outcomes.push((run, value)),
                Err(failure) => report.failures.push(failure),
            }
        }

        if !report.failures.is_empty() {
            warn!(
                failed = report.failures.len(),
                runs = self.runs,
                "sensitivity runs failed"
            );
        }

        Ok(report)
    }
}
