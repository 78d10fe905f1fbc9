//! # Random Search
//!
//! Samples hyperparameter configurations from a [`SearchSpace`] and
//! evaluates them in parallel. Sampling is sequential from one seeded
//! generator, so the same seed always yields the same configurations in
//! the same order regardless of thread count.
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use causeway_learn::tuner::{Mode, Param, SearchSpace, Tuner};
//! use causeway_learn::LearnError;
//!
//! let space = SearchSpace::new().with("x", Param::Uniform { low: -1.0, high: 1.0 });
//! let result = Tuner::new(space, 32, 7)
//!     .run(
//!         |config| -> Result<BTreeMap<String, f64>, LearnError> {
//!             let x = config["x"];
//!             Ok(BTreeMap::from([("loss".to_string(), x * x)]))
//!         },
//!         "loss",
//!         Mode::Min,
//!     )
//!     .unwrap();
//! assert!(result.best_trial().config["x"].abs() < 0.5);
//! ```

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::LearnError;

/// Sampled values, by parameter name.
pub type TrialConfig = BTreeMap<String, f64>;

/// Reported metrics, by name.
pub type Metrics = BTreeMap<String, f64>;

/// Distribution of one hyperparameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Param {
    Fixed { value: f64 },
    /// Uniform on `[low, high)`.
    Uniform { low: f64, high: f64 },
    /// Uniform integer on `[low, high)`.
    IntRange { low: i64, high: i64 },
}

impl Param {
    fn sample(&self, name: &str, rng: &mut StdRng) -> Result<f64, LearnError> {
        let invalid = |reason: String| LearnError::InvalidHyperparameter {
            name: name.to_string(),
            reason,
        };
        match *self {
            Param::Fixed { value } => Ok(value),
            Param::Uniform { low, high } => {
                if !(low.is_finite() && high.is_finite()) || low >= high {
                    return Err(invalid(format!("empty range [{}, {})", low, high)));
                }
                Ok(rng.random_range(low..high))
            }
            Param::IntRange { low, high } => {
                if low >= high {
                    return Err(invalid(format!("empty range [{}, {})", low, high)));
                }
                Ok(rng.random_range(low..high) as f64)
            }
        }
    }
}

/// Named parameter distributions, sampled in name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchSpace {
    params: BTreeMap<String, Param>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, param: Param) -> Self {
        self.params.insert(name.into(), param);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, param: Param) {
        self.params.insert(name.into(), param);
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.params.get(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn sample(&self, rng: &mut StdRng) -> Result<TrialConfig, LearnError> {
        self.params
            .iter()
            .map(|(name, p)| Ok((name.clone(), p.sample(name, rng)?)))
            .collect()
    }
}

/// Whether the tuned metric should be maximised or minimised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Max,
    Min,
}

impl Mode {
    /// True when `a` beats `b`. NaN never beats anything and is beaten by
    /// any number.
    fn better(self, a: f64, b: f64) -> bool {
        if a.is_nan() {
            return false;
        }
        if b.is_nan() {
            return true;
        }
        match self {
            Mode::Max => a > b,
            Mode::Min => a < b,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub index: usize,
    pub config: TrialConfig,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuneResult {
    pub trials: Vec<Trial>,
    /// Index into `trials` of the winner.
    pub best: usize,
    pub metric: String,
}

impl TuneResult {
    pub fn best_trial(&self) -> &Trial {
        &self.trials[self.best]
    }

    pub fn best_config(&self) -> &TrialConfig {
        &self.best_trial().config
    }
}

/// Random search over a [`SearchSpace`].
#[derive(Debug, Clone)]
pub struct Tuner {
    space: SearchSpace,
    num_trials: usize,
    seed: u64,
}

impl Tuner {
    pub fn new(space: SearchSpace, num_trials: usize, seed: u64) -> Self {
        Self {
            space,
            num_trials,
            seed,
        }
    }

    /// The configurations `run` would evaluate.
    pub fn configs(&self) -> Result<Vec<TrialConfig>, LearnError> {
        if self.num_trials == 0 {
            return Err(LearnError::InvalidHyperparameter {
                name: "num_trials".into(),
                reason: "must be positive".into(),
            });
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..self.num_trials).map(|_| self.space.sample(&mut rng)).collect()
    }

    /// Evaluate every configuration and pick the best by `metric`. The
    /// first trial wins ties. Any objective error aborts the search.
    pub fn run<F, E>(&self, objective: F, metric: &str, mode: Mode) -> Result<TuneResult, E>
    where
        F: Fn(&TrialConfig) -> Result<Metrics, E> + Sync,
        E: From<LearnError> + Send,
    {
        let configs = self.configs()?;
        info!(trials = configs.len(), params = self.space.len(), metric, "starting random search");
        let trials = configs
            .into_par_iter()
            .enumerate()
            .map(|(index, config)| {
                let metrics = objective(&config)?;
                debug!(index, ?metrics, "trial finished");
                Ok(Trial {
                    index,
                    config,
                    metrics,
                })
            })
            .collect::<Result<Vec<_>, E>>()?;

        let mut best = 0;
        let mut best_value = f64::NAN;
        for trial in &trials {
            let value = *trial.metrics.get(metric).ok_or_else(|| LearnError::MissingMetric {
                trial: trial.index,
                metric: metric.to_string(),
            })?;
            if trial.index == 0 || mode.better(value, best_value) {
                best = trial.index;
                best_value = value;
            }
        }
        info!(best, value = best_value, "random search finished");
        Ok(TuneResult {
            trials,
            best,
            metric: metric.to_string(),
        })
    }
}
