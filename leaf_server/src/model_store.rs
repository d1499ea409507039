//! Locating and loading model artifacts from disk.
//!
//! A model root holds one directory per trained version:
//!
//! ```text
//! saved_models/
//! ├── 6/
//! │   └── model.onnx
//! └── 7/
//!     ├── model.onnx
//!     └── metadata.json
//! ```
use std::{
    fs,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::{
    calibration::{Calibrator, DEFAULT_TEMPERATURE},
    catalog::{self, NUM_CLASSES},
    config::ModelArgs,
    nn::{InferModel, LeafClassifier},
};

pub const WEIGHTS_FILE: &str = "model.onnx";
pub const METADATA_FILE: &str = "metadata.json";

/// Validation accuracy reported when the metadata does not state one.
pub const DEFAULT_ACCURACY: &str = "99.87%";

/// Optional facts about a trained model, read from `metadata.json`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelMetadata {
    pub version: Option<String>,
    pub accuracy: Option<String>,
    pub class_names: Option<Vec<String>>,
    pub temperature: Option<f32>,
}

impl ModelMetadata {
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Fail if the metadata names classes that differ from the built-in catalog.
    pub fn check_classes(&self) -> Result<()> {
        let Some(names) = &self.class_names else {
            return Ok(());
        };
        let expected = catalog::class_names();
        if names.len() != expected.len() || names.iter().zip(expected.iter()).any(|(a, b)| a != b)
        {
            bail!(
                "model classes {:?} do not match the known classes {:?}",
                names,
                expected
            );
        }
        Ok(())
    }
}

/// Files making up one model version.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelArtifacts {
    pub dir: PathBuf,
    pub weights: PathBuf,
    pub metadata: Option<PathBuf>,
}

impl ModelArtifacts {
    fn in_dir(dir: PathBuf) -> Result<Self> {
        let weights = dir.join(WEIGHTS_FILE);
        if !weights.is_file() {
            bail!("model weights not found at {}", weights.display());
        }
        let metadata = Some(dir.join(METADATA_FILE)).filter(|p| p.is_file());

        Ok(Self {
            dir,
            weights,
            metadata,
        })
    }

    /// Version label such as `v7`, derived from the directory name.
    pub fn version_label(&self) -> String {
        let name = self
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match parse_version(&name) {
            Some(n) => format!("v{n}"),
            None => name,
        }
    }
}

/// Version number of a directory name made of ASCII digits only.
fn parse_version(name: &str) -> Option<u64> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

/// Highest purely numeric version directory below `root`.
pub fn latest_version(root: &Path) -> Result<(u64, PathBuf)> {
    let entries =
        fs::read_dir(root).with_context(|| format!("no models found at {}", root.display()))?;

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let version = parse_version(entry.file_name().to_str()?)?;
            Some((version, entry.path()))
        })
        .max_by_key(|(version, _)| *version)
        .with_context(|| format!("no model versions available in {}", root.display()))
}

/// Pick the model directory: an explicit one wins, otherwise the latest version below `root`.
pub fn resolve(explicit: Option<&Path>, root: &Path) -> Result<ModelArtifacts> {
    let dir = match explicit {
        Some(dir) => dir.to_path_buf(),
        None => {
            let (version, dir) = latest_version(root)?;
            log::info!("Using latest model version {} from {}", version, root.display());
            dir
        }
    };
    ModelArtifacts::in_dir(dir)
}

/// Modification time of a metadata file in seconds since the epoch, or `"unknown"`.
pub fn metadata_timestamp(path: Option<&Path>) -> String {
    path.and_then(|p| fs::metadata(p).ok())
        .and_then(|m| m.modified().ok())
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| {
            let secs = d.as_secs_f64();
            if secs.fract() == 0.0 {
                format!("{secs:.1}")
            } else {
                secs.to_string()
            }
        })
        .unwrap_or_else(|| "unknown".into())
}

/// What the server knows about the model once it is loaded.
#[derive(Clone, Debug)]
pub struct ModelInfo {
    pub version: String,
    pub accuracy: String,
    pub metadata_path: Option<PathBuf>,
    pub calibrator: Calibrator,
}

impl ModelInfo {
    pub fn timestamp(&self) -> String {
        metadata_timestamp(self.metadata_path.as_deref())
    }
}

/// A ready-to-run model and its description.
pub struct LoadedModel {
    pub model: Box<dyn InferModel>,
    pub info: ModelInfo,
}

/// Temperature from the command line, else from the metadata, else the default.
pub fn pick_temperature(requested: Option<f32>, metadata: &ModelMetadata) -> f32 {
    requested
        .or(metadata.temperature)
        .unwrap_or(DEFAULT_TEMPERATURE)
}

/// Resolve, validate and load the model selected by `args`.
pub fn load(args: &ModelArgs) -> Result<LoadedModel> {
    let artifacts = resolve(args.model_dir.as_deref(), &args.models_root)?;
    let metadata = match &artifacts.metadata {
        Some(path) => ModelMetadata::read(path)?,
        None => ModelMetadata::default(),
    };
    metadata.check_classes()?;

    let calibrator = Calibrator::new(pick_temperature(args.temperature, &metadata))?;

    let model = LeafClassifier::new(
        &artifacts.weights,
        args.input_layout,
        args.resize_filter,
        NUM_CLASSES,
    )?;

    let info = ModelInfo {
        version: metadata
            .version
            .clone()
            .unwrap_or_else(|| artifacts.version_label()),
        accuracy: metadata
            .accuracy
            .clone()
            .unwrap_or_else(|| DEFAULT_ACCURACY.into()),
        metadata_path: artifacts.metadata.clone(),
        calibrator,
    };
    log::info!(
        "Model {} loaded (temperature {})",
        info.version,
        calibrator.temperature()
    );

    Ok(LoadedModel {
        model: Box::new(model),
        info,
    })
}
