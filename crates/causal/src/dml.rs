//! # Double Machine Learning
//!
//! Both estimators residualize the outcome and the treatment against the
//! covariates with the nuisance models, then regress one residual on the
//! other:
//!
//! ```text
//! Ỹ = Y − E[Y | X]        T̃ = T − E[T | X]
//! ```
//!
//! - **Linear**: OLS of `Ỹ` on `φ(X) ⊗ T̃` with `φ(X) = [1, featurize(X)]`.
//!   The heteroskedasticity-robust (HC1) covariance of the coefficients
//!   gives closed-form effect intervals. Handles any number of treatment
//!   columns.
//! - **Non-parametric**: weighted regression of `Ỹ / T̃` on `featurize(X)`
//!   with weights `T̃²`. Needs a single treatment column and has no
//!   intervals.
//!
//! With `cv > 1` the nuisance predictions are cross-fitted: each fold is
//! predicted by models trained on the other folds.

use causeway_core::{Column, ColumnKind, Frame, Matrix};
use causeway_learn::split::{complement, kfold};
use causeway_learn::{FeatureGenerator, FeatureGeneratorConfig, Regressor, Ridge};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::encoder::TreatmentEncoder;
use crate::error::CausalError;
use crate::gaussian::two_sided_z;
use crate::nuisance::{OutcomeModel, TreatmentModel};

/// Relative ridge added to the linear final stage's normal equations so
/// that collinear dummy columns stay solvable.
pub const LINEAR_STAGE_RIDGE: f64 = 1e-9;

/// Which final stage an estimator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    Linear,
    NonParametric,
}

impl std::fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimatorKind::Linear => write!(f, "linear"),
            EstimatorKind::NonParametric => write!(f, "non-parametric"),
        }
    }
}

/// Choose the estimator. Linear whenever confounders are present, an
/// interval is wanted, or the treatment is categorical with more than two
/// levels.
pub fn build(
    treatment_kind: ColumnKind,
    n_treatment_levels: usize,
    has_confounders: bool,
    want_interval: bool,
) -> EstimatorKind {
    let multi_level = treatment_kind.is_category() && n_treatment_levels > 2;
    if has_confounders || want_interval || multi_level {
        EstimatorKind::Linear
    } else {
        EstimatorKind::NonParametric
    }
}

/// Settings passed to either estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmlSettings {
    /// Cross-fitting folds; `<= 1` fits nuisances on all rows.
    pub cv: usize,
    pub discrete_treatment: bool,
    /// Present only when there are confounders.
    pub featurizer: Option<FeatureGeneratorConfig>,
    pub seed: u64,
}

/// Nuisance templates and the models fitted from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FirstStage {
    model_t: TreatmentModel,
    model_y: OutcomeModel,
    /// One pair per fold.
    fitted: Vec<(TreatmentModel, OutcomeModel)>,
}

impl FirstStage {
    fn new(model_t: TreatmentModel, model_y: OutcomeModel) -> Self {
        Self {
            model_t,
            model_y,
            fitted: Vec::new(),
        }
    }

    fn fit_pair(
        &self,
        x: &Frame,
        t: &Column,
        encoder: &TreatmentEncoder,
        y: &Matrix,
    ) -> Result<(TreatmentModel, OutcomeModel), CausalError> {
        let mut model_t = self.model_t.clone();
        model_t.fit(x, t, encoder)?;
        let mut model_y = self.model_y.clone();
        model_y.fit(x, y)?;
        Ok((model_t, model_y))
    }

    /// Returns `(Ỹ, T̃)`.
    fn residualize(
        &mut self,
        x: &Frame,
        t: &Column,
        encoder: &TreatmentEncoder,
        y: &Matrix,
        settings: &DmlSettings,
    ) -> Result<(Matrix, Matrix), CausalError> {
        let n = x.n_rows();
        let t_encoded = encoder.encode(t)?;
        let (t_hat, y_hat) = if settings.cv <= 1 {
            let (model_t, model_y) = self.fit_pair(x, t, encoder, y)?;
            let predictions = (model_t.predict(x, encoder)?, model_y.predict(x)?);
            self.fitted = vec![(model_t, model_y)];
            predictions
        } else {
            let mut t_hat = Matrix::zeros(n, encoder.width());
            let mut y_hat = Matrix::zeros(n, y.cols());
            self.fitted.clear();
            for (k, held_out) in kfold(n, settings.cv, settings.seed).into_iter().enumerate() {
                let train = complement(n, &held_out);
                if train.is_empty() {
                    return Err(CausalError::validation(format!(
                        "cv = {} leaves no training rows",
                        settings.cv
                    )));
                }
                let (model_t, model_y) =
                    self.fit_pair(&x.take_rows(&train), &t.take(&train), encoder, &y.select_rows(&train))?;
                let x_out = x.take_rows(&held_out);
                let t_fold = model_t.predict(&x_out, encoder)?;
                let y_fold = model_y.predict(&x_out)?;
                for (i, &r) in held_out.iter().enumerate() {
                    for j in 0..t_hat.cols() {
                        t_hat.set(r, j, t_fold.get(i, j));
                    }
                    for j in 0..y_hat.cols() {
                        y_hat.set(r, j, y_fold.get(i, j));
                    }
                }
                debug!(fold = k, train = train.len(), held_out = held_out.len(), "cross-fitted fold");
                self.fitted.push((model_t, model_y));
            }
            (t_hat, y_hat)
        };
        Ok((y.sub(&y_hat)?, t_encoded.sub(&t_hat)?))
    }
}

fn fit_treatment_encoder(t: &Column, settings: &DmlSettings) -> Result<TreatmentEncoder, CausalError> {
    let encoder = TreatmentEncoder::fit(t)?;
    if encoder.is_discrete() != settings.discrete_treatment {
        return Err(CausalError::validation(format!(
            "treatment {} does not match the estimator's discrete flag",
            t.name()
        )));
    }
    Ok(encoder)
}

fn fit_featurizer(x: &Frame, settings: &DmlSettings) -> Result<Option<FeatureGenerator>, CausalError> {
    settings
        .featurizer
        .as_ref()
        .map(|config| FeatureGenerator::fit(x, config))
        .transpose()
        .map_err(CausalError::from)
}

fn featurize(featurizer: &Option<FeatureGenerator>, x: &Frame) -> Result<Matrix, CausalError> {
    match featurizer {
        Some(g) => Ok(g.transform(x)?),
        None => Ok(Matrix::zeros(x.n_rows(), 0)),
    }
}

/// `enc(T1) − enc(T0)`.
fn treatment_delta(
    encoder: &TreatmentEncoder,
    t0: &Column,
    t1: &Column,
) -> Result<Matrix, CausalError> {
    Ok(encoder.encode(t1)?.sub(&encoder.encode(t0)?)?)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LinearFit {
    treatment: TreatmentEncoder,
    featurizer: Option<FeatureGenerator>,
    /// `(q · w) × m`, one column per outcome.
    theta: Matrix,
    /// HC1 covariance of each outcome's coefficients.
    covariances: Vec<Matrix>,
}

/// Linear final stage with closed-form intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearDml {
    settings: DmlSettings,
    first_stage: FirstStage,
    state: Option<LinearFit>,
}

impl LinearDml {
    pub fn new(model_t: TreatmentModel, model_y: OutcomeModel, settings: DmlSettings) -> Self {
        Self {
            settings,
            first_stage: FirstStage::new(model_t, model_y),
            state: None,
        }
    }

    pub fn fit(&mut self, y: &Matrix, t: &Column, x: &Frame) -> Result<(), CausalError> {
        let treatment = fit_treatment_encoder(t, &self.settings)?;
        let featurizer = fit_featurizer(x, &self.settings)?;
        let (y_res, t_res) = self
            .first_stage
            .residualize(x, t, &treatment, y, &self.settings)?;

        let phi = featurize(&featurizer, x)?.with_intercept();
        let z = phi.row_kron(&t_res)?;
        let (n, d) = z.shape();
        let mut normal = z.gram();
        normal.add_diagonal(LINEAR_STAGE_RIDGE * (normal.trace() / d as f64).max(1.0));
        let normal_inv = normal.inverse_spd()?;
        let hc1 = if n > d { n as f64 / (n - d) as f64 } else { 1.0 };

        let mut theta = Matrix::zeros(d, y.cols());
        let mut covariances = Vec::with_capacity(y.cols());
        for j in 0..y.cols() {
            let yj = y_res.column(j);
            let coef = normal_inv.matvec(&z.t_matvec(&yj)?)?;
            let fitted = z.matvec(&coef)?;
            let sq_resid: Vec<f64> = yj.iter().zip(&fitted).map(|(a, b)| (a - b).powi(2)).collect();
            let meat = z.weighted_gram(&sq_resid)?;
            covariances.push(normal_inv.matmul(&meat)?.matmul(&normal_inv)?.scale(hc1));
            for (i, c) in coef.into_iter().enumerate() {
                theta.set(i, j, c);
            }
        }
        info!(rows = n, coefficients = d, outcomes = y.cols(), "linear DML fitted");
        self.state = Some(LinearFit {
            treatment,
            featurizer,
            theta,
            covariances,
        });
        Ok(())
    }

    fn state(&self) -> Result<&LinearFit, CausalError> {
        self.state.as_ref().ok_or(CausalError::NotFitted)
    }

    /// Row design `φ(X) ⊗ (enc(T1) − enc(T0))`.
    fn design(&self, x: &Frame, t0: &Column, t1: &Column) -> Result<Matrix, CausalError> {
        let state = self.state()?;
        let delta = treatment_delta(&state.treatment, t0, t1)?;
        let phi = featurize(&state.featurizer, x)?.with_intercept();
        Ok(phi.row_kron(&delta)?)
    }

    pub fn effect(&self, x: &Frame, t0: &Column, t1: &Column) -> Result<Matrix, CausalError> {
        let design = self.design(x, t0, t1)?;
        Ok(design.matmul(&self.state()?.theta)?)
    }

    /// `(low, high)` at significance `alpha`.
    pub fn effect_interval(
        &self,
        x: &Frame,
        t0: &Column,
        t1: &Column,
        alpha: f64,
    ) -> Result<(Matrix, Matrix), CausalError> {
        check_alpha(alpha)?;
        let state = self.state()?;
        let design = self.design(x, t0, t1)?;
        let effect = design.matmul(&state.theta)?;
        let z = two_sided_z(alpha);
        let (n, m) = effect.shape();
        let mut low = Matrix::zeros(n, m);
        let mut high = Matrix::zeros(n, m);
        for r in 0..n {
            for (j, cov) in state.covariances.iter().enumerate() {
                let half = z * cov.quad_form(design.row(r))?.max(0.0).sqrt();
                low.set(r, j, effect.get(r, j) - half);
                high.set(r, j, effect.get(r, j) + half);
            }
        }
        Ok((low, high))
    }

    /// Final-stage coefficients, one column per outcome.
    pub fn coefficients(&self) -> Option<&Matrix> {
        self.state.as_ref().map(|s| &s.theta)
    }
}

pub(crate) fn check_alpha(alpha: f64) -> Result<(), CausalError> {
    if alpha.is_nan() || alpha <= 0.0 || alpha >= 1.0 {
        return Err(CausalError::validation(format!(
            "significance level must lie in (0, 1), got {}",
            alpha
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct NonParamFit {
    treatment: TreatmentEncoder,
    featurizer: Option<FeatureGenerator>,
}

/// Weighted final stage; point effects only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonParamDml {
    settings: DmlSettings,
    first_stage: FirstStage,
    model_final: Vec<Ridge>,
    state: Option<NonParamFit>,
}

impl NonParamDml {
    pub fn new(
        model_t: TreatmentModel,
        model_y: OutcomeModel,
        model_final: Vec<Ridge>,
        settings: DmlSettings,
    ) -> Self {
        Self {
            settings,
            first_stage: FirstStage::new(model_t, model_y),
            model_final,
            state: None,
        }
    }

    pub fn fit(&mut self, y: &Matrix, t: &Column, x: &Frame) -> Result<(), CausalError> {
        let treatment = fit_treatment_encoder(t, &self.settings)?;
        if treatment.width() != 1 {
            return Err(CausalError::validation(format!(
                "non-parametric DML needs one treatment column, {} has {}",
                t.name(),
                treatment.width()
            )));
        }
        if self.model_final.len() != y.cols() {
            return Err(CausalError::validation(format!(
                "{} final models for {} outcome columns",
                self.model_final.len(),
                y.cols()
            )));
        }
        let featurizer = fit_featurizer(x, &self.settings)?;
        let (y_res, t_res) = self
            .first_stage
            .residualize(x, t, &treatment, y, &self.settings)?;

        let phi = featurize(&featurizer, x)?;
        let t_res = t_res.column(0);
        let weights: Vec<f64> = t_res.iter().map(|t| t * t).collect();
        for (j, model) in self.model_final.iter_mut().enumerate() {
            let target: Vec<f64> = y_res
                .column(j)
                .iter()
                .zip(&t_res)
                .map(|(y, t)| if *t == 0.0 { 0.0 } else { y / t })
                .collect();
            model.fit_weighted(&phi, &target, &weights)?;
        }
        info!(rows = x.n_rows(), outcomes = y.cols(), "non-parametric DML fitted");
        self.state = Some(NonParamFit {
            treatment,
            featurizer,
        });
        Ok(())
    }

    pub fn effect(&self, x: &Frame, t0: &Column, t1: &Column) -> Result<Matrix, CausalError> {
        let state = self.state.as_ref().ok_or(CausalError::NotFitted)?;
        let delta = treatment_delta(&state.treatment, t0, t1)?.column(0);
        let phi = featurize(&state.featurizer, x)?;
        let mut effect = Matrix::zeros(x.n_rows(), self.model_final.len());
        for (j, model) in self.model_final.iter().enumerate() {
            for (r, theta) in model.predict(&phi)?.into_iter().enumerate() {
                effect.set(r, j, theta * delta[r]);
            }
        }
        Ok(effect)
    }
}

/// A fitted or unfitted estimator of either kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CausalEstimator {
    Linear(LinearDml),
    NonParametric(NonParamDml),
}

impl CausalEstimator {
    pub fn kind(&self) -> EstimatorKind {
        match self {
            CausalEstimator::Linear(_) => EstimatorKind::Linear,
            CausalEstimator::NonParametric(_) => EstimatorKind::NonParametric,
        }
    }

    pub fn fit(&mut self, y: &Matrix, t: &Column, x: &Frame) -> Result<(), CausalError> {
        if y.rows() != x.n_rows() || t.len() != x.n_rows() {
            return Err(CausalError::validation(format!(
                "outcome has {} rows, treatment {}, covariates {}",
                y.rows(),
                t.len(),
                x.n_rows()
            )));
        }
        match self {
            CausalEstimator::Linear(e) => e.fit(y, t, x),
            CausalEstimator::NonParametric(e) => e.fit(y, t, x),
        }
    }

    /// Effect of moving every row from `t0` to `t1`, in encoded outcome
    /// space. One column per outcome column.
    pub fn effect(&self, x: &Frame, t0: &Column, t1: &Column) -> Result<Matrix, CausalError> {
        match self {
            CausalEstimator::Linear(e) => e.effect(x, t0, t1),
            CausalEstimator::NonParametric(e) => e.effect(x, t0, t1),
        }
    }

    pub fn effect_interval(
        &self,
        x: &Frame,
        t0: &Column,
        t1: &Column,
        alpha: f64,
    ) -> Result<(Matrix, Matrix), CausalError> {
        match self {
            CausalEstimator::Linear(e) => e.effect_interval(x, t0, t1, alpha),
            CausalEstimator::NonParametric(_) => Err(CausalError::IntervalUnavailable {
                estimator: self.kind().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nuisance::NuisanceFactory;

    #[test]
    fn test_build_rule() {
        use ColumnKind::*;
        assert_eq!(build(Category, 3, false, false), EstimatorKind::Linear);
        assert_eq!(build(Numeric, 0, false, false), EstimatorKind::NonParametric);
        assert_eq!(build(Integer, 0, true, false), EstimatorKind::Linear);
        assert_eq!(build(Numeric, 0, false, true), EstimatorKind::Linear);
        assert_eq!(build(Category, 2, false, false), EstimatorKind::NonParametric);
    }

    fn settings(discrete: bool, cv: usize) -> DmlSettings {
        DmlSettings {
            cv,
            discrete_treatment: discrete,
            featurizer: None,
            seed: 0,
        }
    }

    /// y = 2 t + noise-free wiggle, t independent of the (absent) covariates.
    fn constant_effect(n: usize) -> (Frame, Column, Matrix) {
        let t: Vec<f64> = (0..n).map(|i| (i % 7) as f64).collect();
        let y: Vec<f64> = t.iter().enumerate().map(|(i, t)| 2.0 * t + (i % 3) as f64 * 0.1).collect();
        (Frame::with_rows(n), Column::float("t", t), Matrix::column_vector(y))
    }

    #[test]
    fn test_nonparam_recovers_slope() {
        let (x, t, y) = constant_effect(63);
        let factory = NuisanceFactory::default();
        let mut est = CausalEstimator::NonParametric(NonParamDml::new(
            factory.build_treatment_model(&x, &t),
            factory.build_outcome_model(&y),
            factory.build_final_models(&y),
            settings(false, 1),
        ));
        est.fit(&y, &t, &x).unwrap();
        let effect = est
            .effect(&x, &Column::float("t", vec![1.0; 63]), &Column::float("t", vec![3.0; 63]))
            .unwrap();
        assert!((effect.get(0, 0) - 4.0).abs() < 0.1, "{}", effect.get(0, 0));
        assert!(matches!(
            est.effect_interval(&x, &t, &t, 0.05),
            Err(CausalError::IntervalUnavailable { .. })
        ));
    }

    #[test]
    fn test_linear_interval_contains_effect() {
        let (x, t, y) = constant_effect(70);
        let factory = NuisanceFactory::default();
        let mut est = CausalEstimator::Linear(LinearDml::new(
            factory.build_treatment_model(&x, &t),
            factory.build_outcome_model(&y),
            settings(false, 2),
        ));
        est.fit(&y, &t, &x).unwrap();
        let t0 = Column::float("t", vec![0.0; 70]);
        let t1 = Column::float("t", vec![1.0; 70]);
        let (low, high) = est.effect_interval(&x, &t0, &t1, 0.05).unwrap();
        let effect = est.effect(&x, &t0, &t1).unwrap();
        assert!(low.get(0, 0) <= effect.get(0, 0) && effect.get(0, 0) <= high.get(0, 0));
        assert!((effect.get(0, 0) - 2.0).abs() < 0.1);
    }

    #[test]
    fn test_effect_before_fit() {
        let (x, t, y) = constant_effect(10);
        let factory = NuisanceFactory::default();
        let est = LinearDml::new(
            factory.build_treatment_model(&x, &t),
            factory.build_outcome_model(&y),
            settings(false, 1),
        );
        assert_eq!(est.effect(&x, &t, &t).unwrap_err(), CausalError::NotFitted);
    }

    #[test]
    fn test_discrete_flag_mismatch() {
        let (x, t, y) = constant_effect(10);
        let factory = NuisanceFactory::default();
        let mut est = LinearDml::new(
            factory.build_treatment_model(&x, &t),
            factory.build_outcome_model(&y),
            settings(true, 1),
        );
        assert!(matches!(est.fit(&y, &t, &x), Err(CausalError::Validation(_))));
    }

    #[test]
    fn test_invalid_alpha() {
        assert!(check_alpha(0.0).is_err());
        assert!(check_alpha(1.0).is_err());
        assert!(check_alpha(0.05).is_ok());
    }
}
