//! Turning raw model output into a presentable prediction.
//!
use anyhow::{Context, Result};
use common::protocol::{ClassScore, PredictResponse, RankedPredictions};
use image::RgbImage;

use crate::{calibration::Calibrated, catalog, model_store::ModelInfo, nn::InferModel};

/// Round a percentage to two decimals.
fn round2(percent: f32) -> f32 {
    (percent * 100.0).round() / 100.0
}

/// Combine calibrated scores with the catalog entry of the winning class.
pub fn describe(calibrated: &Calibrated, info: &ModelInfo) -> Result<PredictResponse> {
    let top = calibrated.top();
    let disease = catalog::by_index(top.index)
        .with_context(|| format!("model predicted unknown class index {}", top.index))?;

    let scores = calibrated
        .ranking
        .iter()
        .map(|ranked| {
            catalog::by_index(ranked.index).map(|d| ClassScore {
                name: d.name.to_owned(),
                percent: ranked.percent(),
            })
        })
        .collect::<Option<Vec<_>>>()
        .context("model output has more classes than the catalog")?;

    let details = disease.details();
    Ok(PredictResponse {
        success: true,
        predicted_disease: disease.name.to_owned(),
        confidence: round2(top.percent()),
        icon: details.icon,
        severity: details.severity,
        kind: details.kind,
        description: details.description,
        causes: details.causes,
        treatment: details.treatment,
        prevention: details.prevention,
        all_predictions: RankedPredictions(scores),
        model_version: info.version.clone(),
        model_accuracy: info.accuracy.clone(),
    })
}

/// Run the whole pipeline synchronously on one image.
pub fn classify(
    model: &dyn InferModel,
    info: &ModelInfo,
    image: &RgbImage,
) -> Result<PredictResponse> {
    let raw = model.run(image)?;
    let calibrated = info.calibrator.calibrate(&raw)?;
    describe(&calibrated, info)
}
