//! # Bayesian Regression Task
//!
//! Bayesian ridge regression of a numeric target on polynomial and
//! categorical expansions of the chosen features, with random-search
//! tuning of the evidence priors.
//!
//! ## Pipeline
//!
//! 1. Validate the frame; critical problems give a `FAILURE` result
//! 2. Resolve coefficient priors by expanded column name
//! 3. Impute and expand the features; rows without a target are predicted
//! 4. Split the labelled rows, tune, refit the best configuration
//! 5. Report coefficient densities, a refit per base column, and tables
//!
//! ## Priors
//!
//! A prior `b0` on coefficient `j` shifts the problem: the model is fit to
//! `y - X·b0` and `b0` is added back to the fitted coefficients.
//!
//! | Prior | Column |
//! |-------|--------|
//! | `{column: "a"}` | `a` |
//! | `{column: "a", degree: 2}` | `a^2` |
//! | `{column: "c", control: "red"}` | `c_red` |

use std::collections::BTreeMap;
use std::time::Instant;

use causeway_causal::Normal;
use causeway_core::{Column, Diagnostics, Frame, Matrix};
use causeway_learn::metrics;
use causeway_learn::split::train_test_split;
use causeway_learn::tuner::{Metrics, Mode, Param, SearchSpace, TrialConfig, Tuner};
use causeway_learn::{BayesianRidge, BayesianRidgeParams, Regressor};
use causeway_prep::{expand_polynomial_categorical, impute_median_mode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use crate::error::TaskError;
use crate::task::{TaskResult, TaskType};

/// Coefficient prior on one expanded column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prior {
    pub column: String,
    /// Level of a categorical column; `None` for numeric columns.
    #[serde(default)]
    pub control: Option<String>,
    #[serde(default = "default_degree")]
    pub degree: usize,
    pub value: f64,
}

fn default_degree() -> usize {
    1
}

impl Prior {
    /// Name of the expanded column this prior applies to.
    pub fn expanded_name(&self) -> Result<String, TaskError> {
        let invalid = |reason: &str| TaskError::InvalidPrior {
            column: self.column.clone(),
            reason: reason.to_string(),
        };
        match (&self.control, self.degree) {
            (_, 0) => Err(invalid("degree must be at least 1")),
            (Some(_), d) if d != 1 => Err(invalid(
                "a prior on a categorical column can only have polynomial degree 1",
            )),
            (Some(level), _) => Ok(format!("{}_{}", self.column, level)),
            (None, 1) => Ok(self.column.clone()),
            (None, d) => Ok(format!("{}^{}", self.column, d)),
        }
    }
}

/// Prior values by expanded column name. Fails on the first invalid prior.
pub fn resolve_priors(priors: &[Prior]) -> Result<BTreeMap<String, f64>, TaskError> {
    priors
        .iter()
        .map(|p| Ok((p.expanded_name()?, p.value)))
        .collect()
}

/// Options of [`BayesianRegressionTask::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BayesianRegressionParams {
    pub features: Vec<String>,
    pub target: String,
    pub priors: Vec<Prior>,
    /// Percentiles of the reported prediction band.
    pub prediction_quantile_low: u32,
    pub prediction_quantile_high: u32,
    /// Random-search samples per fit.
    pub trials: usize,
    pub polynomial_degree: usize,
    /// Percent of labelled rows held out; `0` evaluates on the training rows.
    pub validation_split: u32,
    pub pdf_steps: usize,
    pub predict_steps: usize,
    pub normalize: bool,
    pub seed: u64,
}

impl Default for BayesianRegressionParams {
    fn default() -> Self {
        Self {
            features: Vec::new(),
            target: String::new(),
            priors: Vec::new(),
            prediction_quantile_low: 5,
            prediction_quantile_high: 95,
            trials: 1,
            polynomial_degree: 1,
            validation_split: 20,
            pdf_steps: 100,
            predict_steps: 100,
            normalize: false,
            seed: 0,
        }
    }
}

impl BayesianRegressionParams {
    pub fn new<S: Into<String>>(features: impl IntoIterator<Item = S>, target: impl Into<String>) -> Self {
        Self {
            features: features.into_iter().map(Into::into).collect(),
            target: target.into(),
            ..Self::default()
        }
    }
}

/// Points of a density curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pdf {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Posterior of one coefficient of the full model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientPdf {
    pub name: String,
    pub mean: f64,
    pub std: f64,
    pub pdf: Pdf,
}

/// Refit of the target on the powers of one base column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnivariateResult {
    pub name: String,
    pub x: Vec<f64>,
    pub coeffs: Vec<f64>,
    pub stds: Vec<f64>,
    pub pdfs: Vec<Pdf>,
    pub y_mean: Vec<f64>,
    pub y_std: Vec<f64>,
    pub r2: f64,
    pub rmse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub univariate: Vec<UnivariateResult>,
    pub multivariate: Vec<CoefficientPdf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub r2: f64,
    pub rmse: f64,
}

/// Output of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayesianRegressionData {
    pub coeffs: Coefficients,
    pub intercept: f64,
    /// Posterior covariance of the coefficients, in expanded column order.
    pub sigma: Matrix,
    pub best_config: TrialConfig,
    pub evaluation: Evaluation,
    /// Held-out rows with predictions; absent when `validation_split` is 0.
    pub validation_table: Option<Frame>,
    /// Rows without a target, predicted.
    pub prediction_table: Option<Frame>,
    /// Expanded features plus the target.
    pub computed_table: Frame,
}

/// Hyperparameter space searched for every fit.
pub fn bayesian_ridge_space() -> SearchSpace {
    let precision = || Param::Uniform {
        low: 1e-6,
        high: 1e-2,
    };
    let init = || Param::Uniform { low: 1e-6, high: 1.0 };
    SearchSpace::new()
        .with("n_iter", Param::IntRange { low: 10, high: 300 })
        .with("alpha_1", precision())
        .with("alpha_2", precision())
        .with("lambda_1", precision())
        .with("lambda_2", precision())
        .with("alpha_init", init())
        .with("lambda_init", init())
}

fn sampled(config: &TrialConfig, key: &str) -> Result<f64, TaskError> {
    config
        .get(key)
        .copied()
        .ok_or_else(|| TaskError::parameter(key, "missing from the sampled configuration"))
}

fn ridge_params(config: &TrialConfig) -> Result<BayesianRidgeParams, TaskError> {
    Ok(BayesianRidgeParams {
        n_iter: sampled(config, "n_iter")? as usize,
        alpha_1: sampled(config, "alpha_1")?,
        alpha_2: sampled(config, "alpha_2")?,
        lambda_1: sampled(config, "lambda_1")?,
        lambda_2: sampled(config, "lambda_2")?,
        alpha_init: Some(sampled(config, "alpha_init")?),
        lambda_init: Some(sampled(config, "lambda_init")?),
        ..BayesianRidgeParams::default()
    })
}

/// `n` evenly spaced points from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

fn density(mean: f64, std: f64, steps: usize) -> Result<Pdf, TaskError> {
    let normal = Normal::new(mean, std)?;
    let x = linspace(mean - 5.0 * std, mean + 5.0 * std, steps);
    let y = x.iter().map(|&v| normal.pdf(v)).collect();
    Ok(Pdf { x, y })
}

/// Bayesian ridge with coefficient priors folded back in.
#[derive(Debug, Clone)]
struct PriorAdjusted {
    ridge: BayesianRidge,
    b0: Vec<f64>,
}

impl PriorAdjusted {
    fn predict_with_std(&self, x: &Matrix) -> Result<(Vec<f64>, Vec<f64>), TaskError> {
        let (mean, std) = self.ridge.predict_with_std(x)?;
        let shift = x.matvec(&self.b0)?;
        Ok((mean.iter().zip(shift).map(|(m, s)| m + s).collect(), std))
    }

    fn coef(&self) -> Vec<f64> {
        self.ridge.coef().iter().zip(&self.b0).map(|(c, b)| c + b).collect()
    }

    fn sigma(&self) -> Result<&Matrix, TaskError> {
        self.ridge
            .posterior()
            .map(|p| &p.sigma)
            .ok_or_else(|| TaskError::parameter("model", "not fitted"))
    }

    fn stds(&self) -> Result<Vec<f64>, TaskError> {
        Ok(self.sigma()?.diagonal().into_iter().map(|v| v.max(0.0).sqrt()).collect())
    }
}

struct TrialFit {
    model: PriorAdjusted,
    r2: f64,
    rmse: f64,
    /// On the test rows, priors included.
    y_pred: Vec<f64>,
    y_std: Vec<f64>,
}

/// The labelled data and split shared by every fit of one run.
struct Problem<'a> {
    table: &'a Frame,
    target: &'a Column,
    train: &'a [usize],
    test: &'a [usize],
    priors: &'a BTreeMap<String, f64>,
}

impl Problem<'_> {
    /// Missing cells count as zero.
    fn design(&self, names: &[String], rows: &[usize]) -> Result<Matrix, TaskError> {
        let columns = names
            .iter()
            .map(|n| -> Result<Vec<f64>, TaskError> {
                let column = self.table.column(n)?;
                Ok(rows.iter().map(|&r| column.f64_at(r).unwrap_or(0.0)).collect())
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Matrix::from_columns(rows.len(), &columns)?)
    }

    fn targets(&self, rows: &[usize]) -> Vec<f64> {
        rows.iter()
            .map(|&r| self.target.f64_at(r).unwrap_or(f64::NAN))
            .collect()
    }

    fn fit(&self, names: &[String], config: &TrialConfig) -> Result<TrialFit, TaskError> {
        let b0: Vec<f64> = names
            .iter()
            .map(|n| self.priors.get(n).copied().unwrap_or(0.0))
            .collect();
        let x_train = self.design(names, self.train)?;
        let x_test = self.design(names, self.test)?;
        let shift_train = x_train.matvec(&b0)?;
        let shift_test = x_test.matvec(&b0)?;
        let y_train: Vec<f64> = self
            .targets(self.train)
            .iter()
            .zip(&shift_train)
            .map(|(y, s)| y - s)
            .collect();
        let y_test: Vec<f64> = self
            .targets(self.test)
            .iter()
            .zip(&shift_test)
            .map(|(y, s)| y - s)
            .collect();

        let mut ridge = BayesianRidge::new(ridge_params(config)?);
        ridge.fit(&x_train, &y_train)?;
        let (pred, y_std) = ridge.predict_with_std(&x_test)?;
        let r2 = metrics::r2(&y_test, &pred);
        let rmse = metrics::rmse(&y_test, &pred);
        let y_pred = pred.iter().zip(&shift_test).map(|(p, s)| p + s).collect();
        Ok(TrialFit {
            model: PriorAdjusted { ridge, b0 },
            r2,
            rmse,
            y_pred,
            y_std,
        })
    }

    /// Best configuration by test r².
    fn tune(&self, names: &[String], trials: usize, seed: u64) -> Result<TrialConfig, TaskError> {
        let result = Tuner::new(bayesian_ridge_space(), trials, seed).run(
            |config| -> Result<Metrics, TaskError> {
                let fit = self.fit(names, config)?;
                Ok(BTreeMap::from([
                    ("r2".to_string(), fit.r2),
                    ("rmse".to_string(), fit.rmse),
                ]))
            },
            "r2",
            Mode::Max,
        )?;
        Ok(result.best_config().clone())
    }
}

/// Band columns for a prediction: `_std`, `_low` and `_high`.
fn band_columns(
    target: &str,
    mean: &[f64],
    std: &[f64],
    params: &BayesianRegressionParams,
) -> Result<Vec<Column>, TaskError> {
    let q_low = params.prediction_quantile_low as f64 / 100.0;
    let q_high = params.prediction_quantile_high as f64 / 100.0;
    let mut low = Vec::with_capacity(mean.len());
    let mut high = Vec::with_capacity(mean.len());
    for (&m, &s) in mean.iter().zip(std) {
        let normal = Normal::new(m, s)?;
        low.push(normal.ppf(q_low));
        high.push(normal.ppf(q_high));
    }
    Ok(vec![
        Column::float(format!("{}_std", target), std.to_vec()),
        Column::float(format!("{}_low", target), low),
        Column::float(format!("{}_high", target), high),
    ])
}

fn append(frame: &Frame, extra: Vec<Column>) -> Result<Frame, TaskError> {
    let mut columns = frame.columns().to_vec();
    columns.extend(extra);
    Ok(frame.with_columns(columns)?)
}

/// Checks run before any work; critical findings stop the task.
pub fn check_data(frame: &Frame, params: &BayesianRegressionParams) -> Diagnostics {
    let mut d = Diagnostics::new();
    match frame.get(&params.target) {
        None => d.critical("target_missing", format!("target {} not found", params.target)),
        Some(target) if !target.kind().is_numeric() => d.critical(
            "target_not_numeric",
            format!("target {} is {}, expected numeric", params.target, target.kind()),
        ),
        Some(target) => {
            let labelled = target.len() - target.null_count();
            if labelled < 3 {
                d.critical(
                    "not_enough_rows",
                    format!("{} rows have a target, need at least 3", labelled),
                );
            } else if params.validation_split > 0 && params.validation_split < 100 {
                let held_out = train_test_split(labelled, params.validation_split as f64 / 100.0, params.seed).1;
                if held_out.len() < 2 {
                    d.warn(
                        "validation_too_small",
                        format!(
                            "{} validation row leaves r2 undefined; trials cannot be ranked",
                            held_out.len()
                        ),
                    );
                }
            }
        }
    }
    if params.features.is_empty() {
        d.critical("no_features", "at least one feature is required");
    }
    let missing = frame.missing_columns(params.features.as_slice());
    if !missing.is_empty() {
        d.critical("features_missing", format!("features not found: {:?}", missing));
    }
    if params.features.contains(&params.target) {
        d.critical("target_in_features", format!("{} is both target and feature", params.target));
    }
    if params.polynomial_degree < 1 {
        d.critical("polynomial_degree", "polynomial degree must be at least 1");
    }
    let (low, high) = (params.prediction_quantile_low, params.prediction_quantile_high);
    if !(1..100).contains(&low) || !(1..100).contains(&high) || low >= high {
        d.critical(
            "prediction_quantile",
            format!("quantiles must satisfy 0 < low < high < 100, got {} and {}", low, high),
        );
    }
    if params.validation_split >= 100 {
        d.critical("validation_split", "validation split must be below 100 percent");
    }
    if params.trials == 0 {
        d.critical("trials", "at least one trial is required");
    }
    d
}

/// Runs Bayesian regression over a frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct BayesianRegressionTask;

impl BayesianRegressionTask {
    pub const TASK_TYPE: TaskType = TaskType::BayesianRegression;

    pub fn run(
        &self,
        frame: &Frame,
        params: &BayesianRegressionParams,
    ) -> Result<TaskResult<BayesianRegressionData>, TaskError> {
        let started = Instant::now();
        let _span = info_span!("task", kind = %Self::TASK_TYPE).entered();
        let mut validations = check_data(frame, params);
        if validations.has_critical() {
            info!(checks = validations.len(), "bayesian regression rejected");
            return Ok(TaskResult::failure(validations, started));
        }
        let priors = resolve_priors(&params.priors)?;

        let features = impute_median_mode(&frame.select(params.features.as_slice())?)?;
        let expansion = expand_polynomial_categorical(&features, params.polynomial_degree, params.normalize)?;
        let table = &expansion.frame;
        let names: Vec<String> = table.column_names().into_iter().map(str::to_string).collect();
        for name in priors.keys().filter(|n| !names.contains(*n)) {
            validations.warn("prior_unused", format!("no expanded column named {}", name));
        }

        let target = frame.column(&params.target)?;
        let (labelled, unlabelled): (Vec<usize>, Vec<usize>) =
            (0..frame.n_rows()).partition(|&r| target.f64_at(r).is_some());
        let (train, test) = if params.validation_split > 0 {
            let (train, test) =
                train_test_split(labelled.len(), params.validation_split as f64 / 100.0, params.seed);
            (
                train.into_iter().map(|i| labelled[i]).collect(),
                test.into_iter().map(|i| labelled[i]).collect(),
            )
        } else {
            (labelled.clone(), labelled.clone())
        };
        info!(
            features = names.len(),
            train = train.len(),
            test = test.len(),
            predict = unlabelled.len(),
            trials = params.trials,
            "fitting bayesian regression"
        );

        let problem = Problem {
            table,
            target,
            train: &train,
            test: &test,
            priors: &priors,
        };
        let best_config = problem.tune(&names, params.trials, params.seed)?;
        let best = problem.fit(&names, &best_config)?;
        let model = &best.model;
        let coef = model.coef();
        let stds = model.stds()?;

        let y_test = problem.targets(&test);
        let evaluation = Evaluation {
            r2: best.r2,
            rmse: metrics::rmse(&y_test, &best.y_pred),
        };

        let validation_table = if params.validation_split > 0 {
            let mut extra = vec![Column::float(format!("{}_predicted", params.target), best.y_pred.clone())];
            extra.extend(band_columns(&params.target, &best.y_pred, &best.y_std, params)?);
            Some(append(&frame.take_rows(&test), extra)?)
        } else {
            None
        };

        let prediction_table = if unlabelled.is_empty() {
            None
        } else {
            let (mean, std) = model.predict_with_std(&problem.design(&names, &unlabelled)?)?;
            let mut rows = frame.take_rows(&unlabelled);
            rows.drop_column(&params.target);
            let mut extra = vec![Column::float(params.target.clone(), mean.clone())];
            extra.extend(band_columns(&params.target, &mean, &std, params)?);
            Some(append(&rows, extra)?)
        };

        let multivariate = names
            .iter()
            .enumerate()
            .map(|(j, name)| {
                Ok(CoefficientPdf {
                    name: name.clone(),
                    mean: coef[j],
                    std: stds[j],
                    pdf: density(coef[j], stds[j], params.pdf_steps)?,
                })
            })
            .collect::<Result<Vec<_>, TaskError>>()?;

        let mut univariate = Vec::with_capacity(expansion.base_columns.len());
        for base in &expansion.base_columns {
            univariate.push(self.univariate(&problem, base, &expansion.numeric_columns, params)?);
        }

        let mut computed_table = table.clone();
        computed_table.push_column(target.clone())?;

        Ok(TaskResult::success(
            BayesianRegressionData {
                coeffs: Coefficients {
                    univariate,
                    multivariate,
                },
                intercept: model.ridge.intercept(),
                sigma: model.sigma()?.clone(),
                best_config,
                evaluation,
                validation_table,
                prediction_table,
                computed_table,
            },
            validations,
            started,
        ))
    }

    /// Fit the target on `base`, `base^2`, … up to the task degree (just
    /// `base` for dummies) and evaluate on an even grid over its range.
    fn univariate(
        &self,
        problem: &Problem<'_>,
        base: &str,
        numeric: &[String],
        params: &BayesianRegressionParams,
    ) -> Result<UnivariateResult, TaskError> {
        let powers = if numeric.iter().any(|n| n == base) {
            params.polynomial_degree
        } else {
            1
        };
        let names: Vec<String> = (1..=powers)
            .map(|i| if i == 1 { base.to_string() } else { format!("{}^{}", base, i) })
            .collect();

        let column = problem.table.column(base)?;
        let present: Vec<f64> = (0..column.len()).filter_map(|r| column.f64_at(r)).collect();
        let min = present.iter().copied().fold(f64::INFINITY, f64::min);
        let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let x = if present.is_empty() {
            Vec::new()
        } else {
            linspace(min, max, params.predict_steps)
        };
        let grid = Matrix::from_columns(
            x.len(),
            &(1..=powers)
                .map(|p| x.iter().map(|v| v.powi(p as i32)).collect())
                .collect::<Vec<Vec<f64>>>(),
        )?;

        let config = problem.tune(&names, params.trials, params.seed)?;
        let fit = problem.fit(&names, &config)?;
        let (y_mean, y_std) = fit.model.predict_with_std(&grid)?;
        let coeffs = fit.model.coef();
        let stds = fit.model.stds()?;
        let pdfs = coeffs
            .iter()
            .zip(&stds)
            .map(|(&c, &s)| density(c, s, params.pdf_steps))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(column = base, powers, r2 = fit.r2, "univariate refit");
        Ok(UnivariateResult {
            name: base.to_string(),
            x,
            coeffs,
            stds,
            pdfs,
            y_mean,
            y_std,
            r2: fit.r2,
            rmse: fit.rmse,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prior_names() {
        let numeric = Prior {
            column: "a".into(),
            control: None,
            degree: 2,
            value: 1.0,
        };
        assert_eq!(numeric.expanded_name().unwrap(), "a^2");
        let dummy = Prior {
            column: "c".into(),
            control: Some("red".into()),
            degree: 1,
            value: 1.0,
        };
        assert_eq!(dummy.expanded_name().unwrap(), "c_red");
    }

    #[test]
    fn test_categorical_prior_needs_degree_one() {
        let bad = Prior {
            column: "c".into(),
            control: Some("red".into()),
            degree: 2,
            value: 0.5,
        };
        assert!(matches!(
            resolve_priors(&[bad]),
            Err(TaskError::InvalidPrior { .. })
        ));
    }

    #[test]
    fn test_prior_json_defaults() {
        let p: Prior = serde_json::from_str(r#"{"column": "a", "value": 2.0}"#).unwrap();
        assert_eq!(p.degree, 1);
        assert_eq!(p.control, None);
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_space_bounds() {
        let space = bayesian_ridge_space();
        assert_eq!(space.len(), 7);
        for config in Tuner::new(space, 20, 5).configs().unwrap() {
            assert!((10.0..300.0).contains(&config["n_iter"]));
            assert!(config["alpha_init"] < 1.0);
        }
    }

    #[test]
    fn test_check_data_flags() {
        let frame = Frame::new(vec![
            Column::text("y", ["a", "b", "c"]),
            Column::float("x", vec![1.0, 2.0, 3.0]),
        ])
        .unwrap();
        let d = check_data(&frame, &BayesianRegressionParams::new(["x", "z"], "y"));
        assert!(d.contains("target_not_numeric"));
        assert!(d.contains("features_missing"));
    }
}
