//! Temperature scaling of softmax outputs and ranking of the calibrated scores.
//!
//! The classifier head was trained with a plain softmax, which leaves it
//! under-confident on clear cases. Dividing the log-probabilities by a temperature
//! below one and renormalizing sharpens the distribution while keeping the order
//! of classes intact.
use itertools::Itertools;
use thiserror::Error;

/// Temperature the classifier was calibrated with.
pub const DEFAULT_TEMPERATURE: f32 = 0.15;

/// Positive additive constant to avoid taking the log of zero.
const LOG_EPS: f64 = 1.0e-10;

#[derive(Debug, Error, PartialEq)]
pub enum CalibrationError {
    #[error("no probabilities to calibrate")]
    Empty,
    #[error("invalid probability {value} at index {index}")]
    InvalidProbability { index: usize, value: f32 },
    #[error("temperature must be finite and positive, got {0}")]
    InvalidTemperature(f32),
}

/// Check that a temperature can be divided by.
pub fn validate_temperature(temperature: f32) -> Result<(), CalibrationError> {
    if temperature.is_finite() && temperature > 0.0 {
        Ok(())
    } else {
        Err(CalibrationError::InvalidTemperature(temperature))
    }
}

/// Rescale a probability vector with temperature `temperature`.
///
/// Computes `exp(ln(p + eps) / T)` for each entry and renormalizes. The maximum is
/// subtracted in log-space first so that small temperatures cannot underflow the sum.
pub fn temperature_scale(probs: &[f32], temperature: f32) -> Result<Vec<f32>, CalibrationError> {
    validate_temperature(temperature)?;
    if probs.is_empty() {
        return Err(CalibrationError::Empty);
    }
    if let Some((index, &value)) = probs
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p < 0.0)
    {
        return Err(CalibrationError::InvalidProbability { index, value });
    }

    let temperature = temperature as f64;
    let logs: Vec<f64> = probs
        .iter()
        .map(|&p| (p as f64 + LOG_EPS).ln() / temperature)
        .collect();
    let max = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logs.iter().map(|l| (l - max).exp()).collect();
    // The maximum contributes exp(0) = 1, so the sum is at least one
    let sum: f64 = exps.iter().sum();

    Ok(exps.into_iter().map(|e| (e / sum) as f32).collect())
}

/// A class index with its probability.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ranked {
    pub index: usize,
    pub probability: f32,
}

impl Ranked {
    pub fn percent(&self) -> f32 {
        self.probability * 100.0
    }
}

/// Sort class indices by descending probability. Ties keep the lower index first.
pub fn rank(probs: &[f32]) -> Vec<Ranked> {
    probs
        .iter()
        .copied()
        .enumerate()
        .sorted_by(|a, b| b.1.total_cmp(&a.1))
        .map(|(index, probability)| Ranked { index, probability })
        .collect()
}

/// Calibrated distribution together with its ranking.
#[derive(Clone, Debug)]
pub struct Calibrated {
    pub probabilities: Vec<f32>,
    pub ranking: Vec<Ranked>,
}

impl Calibrated {
    /// Most likely class.
    pub fn top(&self) -> Ranked {
        // Calibration rejects empty input, so there is always a first entry
        self.ranking[0]
    }
}

/// Applies a fixed temperature to raw model outputs.
#[derive(Clone, Copy, Debug)]
pub struct Calibrator {
    temperature: f32,
}

impl Calibrator {
    pub fn new(temperature: f32) -> Result<Self, CalibrationError> {
        validate_temperature(temperature)?;
        Ok(Self { temperature })
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn calibrate(&self, raw: &[f32]) -> Result<Calibrated, CalibrationError> {
        let probabilities = temperature_scale(raw, self.temperature)?;
        let ranking = rank(&probabilities);
        Ok(Calibrated {
            probabilities,
            ranking,
        })
    }
}

impl Default for Calibrator {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}
