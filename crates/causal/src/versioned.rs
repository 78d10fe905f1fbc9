//! Deployable model envelopes.
//!
//! A deployment stores the model together with the format version it was
//! written with, so a reader can refuse models from an incompatible
//! release.

use causeway_core::{Frame, Matrix};
use causeway_learn::TabularPredictor;
use serde::{Deserialize, Serialize};

use crate::error::CausalError;
use crate::predictor::{EffectTable, InterventionEffectPredictor};

pub const MODEL_DEPLOYMENT_VERSION: u32 = 1;

/// A model tagged with its deployment version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedModel<M> {
    pub version: u32,
    pub model: M,
}

impl<M> VersionedModel<M> {
    /// Wrap at the current version.
    pub fn new(model: M) -> Self {
        Self {
            version: MODEL_DEPLOYMENT_VERSION,
            model,
        }
    }

    pub fn is_current(&self) -> bool {
        self.version == MODEL_DEPLOYMENT_VERSION
    }

    /// The model, if it was written at the current version.
    pub fn into_current(self) -> Result<M, CausalError> {
        if !self.is_current() {
            return Err(CausalError::validation(format!(
                "model version {} is not the deployed version {}",
                self.version, MODEL_DEPLOYMENT_VERSION
            )));
        }
        Ok(self.model)
    }
}

/// A deployed intervention model.
pub type InterventionalModel = VersionedModel<InterventionEffectPredictor>;

/// A tabular predictor shipped together with an intervention model of
/// the same target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularModelInterventional {
    pub version: u32,
    pub predictor: TabularPredictor,
    pub intervention_model: InterventionEffectPredictor,
}

impl TabularModelInterventional {
    pub fn new(predictor: TabularPredictor, intervention_model: InterventionEffectPredictor) -> Self {
        Self {
            version: MODEL_DEPLOYMENT_VERSION,
            predictor,
            intervention_model,
        }
    }

    /// Point predictions of the tabular model.
    pub fn predict(&self, frame: &Frame) -> Result<Vec<f64>, CausalError> {
        Ok(self.predictor.predict(frame)?)
    }

    /// Effects from the intervention model.
    pub fn predict_effect(
        &self,
        frame: &Frame,
        target_proba: Option<&Matrix>,
    ) -> Result<EffectTable, CausalError> {
        self.intervention_model.predict_effect(frame, target_proba)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::InterventionConfig;

    #[test]
    fn test_version_gate() {
        let model = InterventionalModel::new(InterventionEffectPredictor::new(InterventionConfig::default()));
        assert!(model.is_current());
        let old = VersionedModel { version: 0, model: 7 };
        assert!(matches!(old.into_current(), Err(CausalError::Validation(_))));
    }

    #[test]
    fn test_envelope_json_keys() {
        let model = VersionedModel::new("m".to_string());
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["version"], MODEL_DEPLOYMENT_VERSION);
        assert_eq!(json["model"], "m");
    }
}
