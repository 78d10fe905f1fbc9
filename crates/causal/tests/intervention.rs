//! Intervention predictor behaviour on synthetic data.

use causeway_causal::encoder::{Decoded, OutcomeEncoder, LOGIT_MAX_VALUE, LOGIT_MIN_VALUE};
use causeway_causal::artifact::ESTIMATOR_FILE;
use causeway_causal::{
    CausalError, EstimatorKind, InterventionConfig, InterventionEffectPredictor,
    TabularModelInterventional, MODEL_DEPLOYMENT_VERSION,
};
use causeway_core::{Column, Frame, Matrix};
use causeway_learn::{ProblemType, TabularConfig, TabularPredictor};
use proptest::prelude::*;

fn approx(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() < tol
}

// ============================================================================
// Fixtures
// ============================================================================

/// `y = 2 t + 3 x`, `t = x + w`, with `w` balanced within every `x`.
fn confounded(n: usize) -> Frame {
    let x: Vec<f64> = (0..n).map(|i| (i % 10) as f64).collect();
    let w: Vec<f64> = (0..n).map(|i| ((i / 10) % 5) as f64 - 2.0).collect();
    let t: Vec<f64> = x.iter().zip(&w).map(|(x, w)| x + w).collect();
    let t1: Vec<f64> = t.iter().map(|t| t + 1.0).collect();
    let y: Vec<f64> = t.iter().zip(&x).map(|(t, x)| 2.0 * t + 3.0 * x).collect();
    Frame::new(vec![
        Column::float("x", x),
        Column::float("t", t),
        Column::float("t_new", t1),
        Column::float("y", y),
    ])
    .unwrap()
}

/// Numeric dose with a constant slope and no confounders.
fn dose_response(n: usize) -> Frame {
    let dose: Vec<f64> = (0..n).map(|i| (i % 6) as f64).collect();
    let new_dose: Vec<f64> = dose.iter().map(|d| d + 2.0).collect();
    let response: Vec<f64> = dose.iter().map(|d| 1.5 * d - 4.0).collect();
    Frame::new(vec![
        Column::float("dose", dose),
        Column::float("new_dose", new_dose),
        Column::float("response", response),
    ])
    .unwrap()
}

/// `y = 2 t + 5 g`, with `t` shifted by the group and balanced within it.
fn grouped(n: usize) -> Frame {
    let groups = ["a", "b", "c"];
    let g: Vec<&str> = (0..n).map(|i| groups[i % 3]).collect();
    let t: Vec<f64> = (0..n).map(|i| ((i / 3) % 5) as f64 + (i % 3) as f64).collect();
    let t1: Vec<f64> = t.iter().map(|t| t + 1.0).collect();
    let y: Vec<f64> = (0..n).map(|i| 2.0 * t[i] + 5.0 * (i % 3) as f64).collect();
    Frame::new(vec![
        Column::text("g", g),
        Column::float("t", t),
        Column::float("t_new", t1),
        Column::float("y", y),
    ])
    .unwrap()
}

fn dose_config() -> InterventionConfig {
    InterventionConfig::new("response", "dose", "new_dose")
}

// ============================================================================
// Estimator choice
// ============================================================================

#[test]
fn test_three_level_treatment_uses_linear() {
    let n = 60;
    let levels = ["a", "b", "c"];
    let t: Vec<&str> = (0..n).map(|i| levels[i % 3]).collect();
    let y: Vec<f64> = (0..n).map(|i| [0.0, 1.0, 3.0][i % 3]).collect();
    let frame = Frame::new(vec![
        Column::text("plan", t),
        Column::text("new_plan", vec!["c"; n]),
        Column::float("spend", y),
    ])
    .unwrap();

    let mut p = InterventionEffectPredictor::new(InterventionConfig::new("spend", "plan", "new_plan"));
    let report = p.fit(&frame, None).unwrap();
    assert_eq!(report.kind, EstimatorKind::Linear);

    let table = p.predict_effect(&frame, None).unwrap();
    assert!(approx(table.effect.get(0, 0), 3.0, 0.25), "a -> c: {}", table.effect.get(0, 0));
    assert!(approx(table.effect.get(1, 0), 2.0, 0.25), "b -> c: {}", table.effect.get(1, 0));
    assert!(approx(table.effect.get(2, 0), 0.0, 1e-9));
}

#[test]
fn test_numeric_treatment_without_options_uses_nonparametric() {
    let mut p = InterventionEffectPredictor::new(dose_config());
    let report = p.fit(&dose_response(48), None).unwrap();
    assert_eq!(report.kind, EstimatorKind::NonParametric);
    assert!(report.diagnostics.is_empty());
    assert_eq!(p.estimator_kind(), Some(EstimatorKind::NonParametric));
}

#[test]
fn test_interval_request_uses_linear() {
    let mut p = InterventionEffectPredictor::new(dose_config().with_cate_alpha(0.05));
    assert_eq!(p.fit(&dose_response(48), None).unwrap().kind, EstimatorKind::Linear);
}

// ============================================================================
// Fit and predict
// ============================================================================

#[test]
fn test_recovers_effect_under_confounding() {
    let frame = confounded(200);
    let config = InterventionConfig::new("y", "t", "t_new")
        .with_common_causes(["x"])
        .with_cate_alpha(0.05);
    let mut p = InterventionEffectPredictor::new(config);
    assert_eq!(p.fit(&frame, None).unwrap().kind, EstimatorKind::Linear);

    let table = p.predict_effect(&frame, None).unwrap();
    let mean_effect = table.effect.column(0).iter().sum::<f64>() / 200.0;
    assert!(approx(mean_effect, 2.0, 0.3), "mean effect {}", mean_effect);

    let bounds = table.bounds.as_ref().unwrap();
    for r in 0..table.len() {
        assert!(bounds.effect_low[r] <= table.effect.get(r, 0));
        assert!(table.effect.get(r, 0) <= bounds.effect_high[r]);
    }
}

#[test]
fn test_unseen_confounder_level_keeps_effect() {
    let config = InterventionConfig::new("y", "t", "t_new")
        .with_common_causes(["g"])
        .with_cate_alpha(0.05);
    let mut p = InterventionEffectPredictor::new(config);
    assert_eq!(p.fit(&grouped(150), None).unwrap().kind, EstimatorKind::Linear);

    let unseen = Frame::new(vec![
        Column::text("g", ["z", "a"]),
        Column::float("t", vec![1.0, 1.0]),
        Column::float("t_new", vec![2.0, 2.0]),
        Column::float("y", vec![2.0, 2.0]),
    ])
    .unwrap();
    let table = p.predict_effect(&unseen, None).unwrap();
    assert!(approx(table.effect.get(0, 0), 2.0, 0.3), "unseen: {}", table.effect.get(0, 0));
    assert!(approx(table.effect.get(1, 0), 2.0, 0.3), "a: {}", table.effect.get(1, 0));
}

#[test]
fn test_cross_fitting_recovers_slope() {
    let config = InterventionConfig {
        causal_cv: 3,
        ..dose_config()
    };
    let mut p = InterventionEffectPredictor::new(config);
    let frame = dose_response(60);
    p.fit(&frame, None).unwrap();
    let table = p.predict_effect(&frame, None).unwrap();
    assert!(approx(table.effect.get(0, 0), 3.0, 0.2), "{}", table.effect.get(0, 0));
}

#[test]
fn test_output_follows_input_rows() {
    let frame = dose_response(36);
    let mut p = InterventionEffectPredictor::new(dose_config());
    p.fit(&frame, None).unwrap();

    let reversed: Vec<usize> = (0..12).rev().collect();
    let query = frame.take_rows(&reversed);
    let table = p.predict_effect(&query, None).unwrap();
    assert_eq!(table.len(), 12);

    let Decoded::Numeric(intervened) = &table.intervened else {
        panic!("numeric target decoded as labels");
    };
    let response = query.column("response").unwrap();
    for r in 0..12 {
        let expected = response.f64_at(r).unwrap() + table.effect.get(r, 0);
        assert!(approx(intervened[r].unwrap(), expected, 1e-9));
    }
}

#[test]
fn test_categorical_target_decodes_labels() {
    let mut frame = confounded(100);
    let label: Vec<&str> = (0..100)
        .map(|i| if frame.column("y").unwrap().f64_at(i).unwrap() > 20.0 { "hi" } else { "lo" })
        .collect();
    frame.push_column(Column::text("level", label)).unwrap();

    let config = InterventionConfig::new("level", "t", "t_new")
        .with_common_causes(["x"])
        .with_cate_alpha(0.05);
    let mut p = InterventionEffectPredictor::new(config);
    let report = p.fit(&frame, None).unwrap();
    assert!(report.diagnostics.contains("cate_alpha_ignored"));

    let table = p.predict_effect(&frame, None).unwrap();
    assert_eq!(table.effect.shape(), (100, 2));
    assert!(table.bounds.is_none());
    let out = table.to_frame("level").unwrap();
    assert_eq!(
        out.column_names(),
        vec!["level_intervened", "intervention_effect_hi", "intervention_effect_lo"]
    );
    assert!(matches!(table.intervened, Decoded::Labels(ref l) if l.len() == 100));
}

#[test]
fn test_numeric_target_ignores_probabilities() {
    let frame = dose_response(30);
    let mut p = InterventionEffectPredictor::new(dose_config());
    let report = p.fit(&frame, Some(&Matrix::zeros(30, 2))).unwrap();
    assert!(report.diagnostics.contains("target_proba_ignored"));
}

#[test]
fn test_predict_rejects_changed_kinds() {
    let frame = dose_response(30);
    let mut p = InterventionEffectPredictor::new(dose_config());
    p.fit(&frame, None).unwrap();
    let relabelled = Frame::new(vec![
        Column::text("dose", vec!["low"; 30]),
        Column::text("new_dose", vec!["high"; 30]),
        frame.column("response").unwrap().clone(),
    ])
    .unwrap();
    assert!(matches!(
        p.predict_effect(&relabelled, None),
        Err(CausalError::Validation(_))
    ));
}

#[test]
fn test_refit_replaces_estimator() {
    let mut p = InterventionEffectPredictor::new(dose_config());
    p.fit(&dose_response(30), None).unwrap();
    let first = p.predict_effect(&dose_response(30), None).unwrap();

    let doubled = {
        let f = dose_response(30);
        let response: Vec<f64> = (0..30).map(|r| 2.0 * f.column("response").unwrap().f64_at(r).unwrap()).collect();
        let mut f = f;
        f.replace_column(Column::float("response", response)).unwrap();
        f
    };
    p.fit(&doubled, None).unwrap();
    let second = p.predict_effect(&doubled, None).unwrap();
    assert!(approx(second.effect.get(0, 0), 2.0 * first.effect.get(0, 0), 1e-6));
}

// ============================================================================
// Artifacts
// ============================================================================

#[test]
fn test_fit_writes_loadable_artifact() {
    let root = tempfile::tempdir().unwrap();
    let config = InterventionConfig {
        model_directory: Some(root.path().to_path_buf()),
        ..dose_config()
    };
    let frame = dose_response(40);
    let mut p = InterventionEffectPredictor::new(config);
    let report = p.fit(&frame, None).unwrap();
    let dir = report.artifact.unwrap();
    assert!(dir.starts_with(root.path()));

    let restored = InterventionEffectPredictor::load(&dir).unwrap();
    let before = p.predict_effect(&frame, None).unwrap();
    let after = restored.predict_effect(&frame, None).unwrap();
    for r in 0..40 {
        assert!(approx(before.effect.get(r, 0), after.effect.get(r, 0), 1e-9));
    }
}

#[test]
fn test_artifact_from_other_version_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let config = InterventionConfig {
        model_directory: Some(root.path().to_path_buf()),
        ..dose_config()
    };
    let mut p = InterventionEffectPredictor::new(config);
    let dir = p.fit(&dose_response(30), None).unwrap().artifact.unwrap();

    let path = dir.join(ESTIMATOR_FILE);
    let mut json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["version"], MODEL_DEPLOYMENT_VERSION);
    json["version"] = serde_json::json!(MODEL_DEPLOYMENT_VERSION + 1);
    std::fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

    let err = InterventionEffectPredictor::load(&dir).unwrap_err();
    assert!(matches!(err, CausalError::Validation(_)), "{err:?}");
}

#[test]
fn test_tabular_model_ships_with_intervention_model() {
    let frame = dose_response(40);
    let response: Vec<f64> = (0..40)
        .map(|r| frame.column("response").unwrap().f64_at(r).unwrap())
        .collect();
    let mut tabular = TabularPredictor::new(ProblemType::Regression, TabularConfig::default());
    tabular
        .fit_regression(&frame.select(&["dose"]).unwrap(), &response)
        .unwrap();
    let mut intervention = InterventionEffectPredictor::new(dose_config());
    intervention.fit(&frame, None).unwrap();

    let bundle = TabularModelInterventional::new(tabular, intervention);
    assert_eq!(bundle.version, MODEL_DEPLOYMENT_VERSION);
    let predicted = bundle.predict(&frame).unwrap();
    assert_eq!(predicted.len(), 40);
    assert!(approx(predicted[1], -2.5, 0.5), "{}", predicted[1]);
    let table = bundle.predict_effect(&frame, None).unwrap();
    assert!(approx(table.effect.get(0, 0), 3.0, 0.2));
}

#[test]
fn test_no_artifact_without_directory() {
    let mut p = InterventionEffectPredictor::new(dose_config());
    assert!(p.fit(&dose_response(20), None).unwrap().artifact.is_none());
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_numeric_encoding_is_identity(values in prop::collection::vec(prop::option::of(-1e6f64..1e6), 1..40)) {
        let target = Column::float_opt("y", values.clone());
        let (encoder, encoded) = OutcomeEncoder::fit(&target, None).unwrap();
        prop_assert_eq!(encoder.decode(&encoded).unwrap(), Decoded::Numeric(values));
    }

    #[test]
    fn prop_logits_stay_clipped(
        p in prop::collection::vec(prop_oneof![Just(0.0), Just(1.0), 0.0f64..=1.0], 2..30)
    ) {
        let n = p.len();
        let target = Column::text("c", (0..n).map(|i| if i % 2 == 0 { "a" } else { "b" }));
        let proba = Matrix::from_rows(p.iter().map(|&q| vec![q, 1.0 - q]).collect()).unwrap();
        let (_, encoded) = OutcomeEncoder::fit(&target, Some(&proba)).unwrap();
        for v in encoded.data() {
            prop_assert!((LOGIT_MIN_VALUE..=LOGIT_MAX_VALUE).contains(v));
        }
    }

    #[test]
    fn prop_predict_before_fit_fails(n in 0usize..20, shift in -5.0f64..5.0) {
        let frame = Frame::new(vec![
            Column::float("dose", (0..n).map(|i| i as f64).collect()),
            Column::float("new_dose", (0..n).map(|i| i as f64 + shift).collect()),
        ])
        .unwrap();
        let p = InterventionEffectPredictor::new(dose_config());
        prop_assert_eq!(p.predict_effect(&frame, None).unwrap_err(), CausalError::NotFitted);
    }
}
