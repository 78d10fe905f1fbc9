//! # Feature Generation
//!
//! Turns a frame of covariates into the numeric design matrix the learners
//! consume. Fitting learns everything needed to repeat the transformation
//! on new rows:
//!
//! 1. Impute (median for numbers, mode for categories)
//! 2. Drop columns with at most one distinct value (`drop_useless`)
//! 3. Drop categorical columns whose every value is distinct (`drop_unique`)
//! 4. Standardize numeric columns, one-hot encode categorical ones
//!
//! Timestamps are categories by kind, but with `enable_datetime_features`
//! they are used as numbers (seconds) instead.

use causeway_core::{Column, ColumnData, Frame, Matrix};
use causeway_prep::{FittedImputer, Imputer, OneHotEncoder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LearnError;

/// Options for [`FeatureGenerator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureGeneratorConfig {
    pub enable_numeric_features: bool,
    pub enable_categorical_features: bool,
    pub enable_datetime_features: bool,
    pub drop_unique: bool,
    pub drop_useless: bool,
    pub standardize: bool,
    /// Categorical columns with more levels than this are dropped.
    pub max_categories: usize,
    /// Omit the first level's dummy of each categorical column, so the
    /// encoding stays full rank next to an intercept. Unseen levels then
    /// encode as that first level.
    pub drop_first: bool,
}

impl Default for FeatureGeneratorConfig {
    fn default() -> Self {
        Self {
            enable_numeric_features: true,
            enable_categorical_features: true,
            enable_datetime_features: true,
            drop_unique: true,
            drop_useless: true,
            standardize: true,
            max_categories: 100,
            drop_first: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct NumericFeature {
    name: String,
    mean: f64,
    scale: f64,
}

/// A fitted feature pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureGenerator {
    config: FeatureGeneratorConfig,
    imputer: FittedImputer,
    numeric: Vec<NumericFeature>,
    categorical: Vec<OneHotEncoder>,
    dropped: Vec<String>,
}

fn is_datetime(column: &Column) -> bool {
    matches!(column.data(), ColumnData::Timestamp(_))
}

impl FeatureGenerator {
    /// Learn the transformation from `frame`.
    pub fn fit(frame: &Frame, config: &FeatureGeneratorConfig) -> Result<Self, LearnError> {
        let imputer = Imputer::median_mode().fit(frame)?;
        let filled = imputer.transform(frame)?;
        let n_rows = filled.n_rows();

        let mut numeric = Vec::new();
        let mut categorical = Vec::new();
        let mut dropped = Vec::new();
        for column in filled.columns() {
            let as_number =
                column.kind().is_numeric() || (config.enable_datetime_features && is_datetime(column));
            let enabled = if as_number {
                config.enable_numeric_features
            } else {
                config.enable_categorical_features
            };
            let n_unique = column.n_unique();
            let useless = config.drop_useless && n_unique <= 1;
            let unique = config.drop_unique && !as_number && n_rows > 1 && n_unique == n_rows;
            let too_many = !as_number && n_unique > config.max_categories;
            if !enabled || useless || unique || too_many {
                dropped.push(column.name().to_string());
                continue;
            }

            if as_number {
                let values: Vec<f64> = (0..column.len()).filter_map(|r| column.f64_at(r)).collect();
                let (mean, scale) = if config.standardize && !values.is_empty() {
                    let mean = values.iter().sum::<f64>() / values.len() as f64;
                    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                        / values.len() as f64;
                    (mean, if var > 0.0 { var.sqrt() } else { 1.0 })
                } else {
                    (0.0, 1.0)
                };
                numeric.push(NumericFeature {
                    name: column.name().to_string(),
                    mean,
                    scale,
                });
            } else {
                categorical.push(OneHotEncoder::fit(column));
            }
        }
        debug!(
            numeric = numeric.len(),
            categorical = categorical.len(),
            dropped = dropped.len(),
            "feature generator fitted"
        );
        Ok(Self {
            config: config.clone(),
            imputer,
            numeric,
            categorical,
            dropped,
        })
    }

    /// Build the design matrix for `frame`. The frame must hold every
    /// column used at fit time; extra columns are ignored.
    pub fn transform(&self, frame: &Frame) -> Result<Matrix, LearnError> {
        let filled = self.imputer.transform(frame)?;
        let n = filled.n_rows();
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(self.n_features());
        for feature in &self.numeric {
            let column = filled.column(&feature.name)?;
            columns.push(
                (0..n)
                    .map(|r| {
                        column
                            .f64_at(r)
                            .map_or(0.0, |v| (v - feature.mean) / feature.scale)
                    })
                    .collect(),
            );
        }
        for encoder in &self.categorical {
            let dummies = encoder.transform(filled.column(encoder.column())?);
            for j in self.first_dummy()..dummies.cols() {
                columns.push(dummies.column(j));
            }
        }
        Ok(Matrix::from_columns(n, &columns)?)
    }

    pub fn fit_transform(
        frame: &Frame,
        config: &FeatureGeneratorConfig,
    ) -> Result<(Self, Matrix), LearnError> {
        let generator = Self::fit(frame, config)?;
        let x = generator.transform(frame)?;
        Ok((generator, x))
    }

    pub fn config(&self) -> &FeatureGeneratorConfig {
        &self.config
    }

    pub fn n_features(&self) -> usize {
        let skip = self.first_dummy();
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|e| e.n_categories().saturating_sub(skip))
                .sum::<usize>()
    }

    /// Output column names, in matrix order.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|f| f.name.clone()).collect();
        for encoder in &self.categorical {
            names.extend(encoder.feature_names().into_iter().skip(self.first_dummy()));
        }
        names
    }

    fn first_dummy(&self) -> usize {
        usize::from(self.config.drop_first)
    }

    /// Input columns that produced no features.
    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }
}
