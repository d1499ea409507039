//! Leaf classifier backed by an ONNX export of the Swin-Tiny network and its dense head.
//!
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use image::{imageops::FilterType, RgbImage};
use tract_onnx::prelude::*;

type NnModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Side length of the square network input.
pub const INPUT_SIZE: u32 = 224;

/// Something that turns an RGB image into one score per class.
pub trait InferModel: Send + Sync {
    /// Run the forward pass and return the raw softmax output.
    fn run(&self, input: &RgbImage) -> Result<Vec<f32>>;

    fn num_classes(&self) -> usize;
}

/// Memory layout of the input tensor.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum InputLayout {
    /// `[1, H, W, 3]`, as exported from Keras.
    #[default]
    Nhwc,
    /// `[1, 3, H, W]`, as exported from PyTorch.
    Nchw,
}

impl InputLayout {
    fn shape(&self) -> [usize; 4] {
        let side = INPUT_SIZE as usize;
        match self {
            InputLayout::Nhwc => [1, side, side, 3],
            InputLayout::Nchw => [1, 3, side, side],
        }
    }
}

/// Interpolation used when scaling uploads down to the network input.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    #[default]
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Decode an uploaded image of any supported format into RGB.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    let image = image::load_from_memory(bytes).context("failed to decode image")?;
    Ok(image.to_rgb8())
}

/// Resize an image to the network input and lay it out as a float tensor.
///
/// Pixel values stay in `0..=255`. The backbone normalizes its input itself.
pub fn preprocess(input: &RgbImage, layout: InputLayout, filter: ResizeFilter) -> Tensor {
    let resized: RgbImage =
        image::imageops::resize(input, INPUT_SIZE, INPUT_SIZE, filter.into());
    let side = INPUT_SIZE as usize;

    match layout {
        InputLayout::Nhwc => {
            tract_ndarray::Array4::from_shape_fn((1, side, side, 3), |(_, y, x, c)| {
                resized[(x as _, y as _)][c] as f32
            })
            .into()
        }
        InputLayout::Nchw => {
            tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
                resized[(x as _, y as _)][c] as f32
            })
            .into()
        }
    }
}

pub struct LeafClassifier {
    model: NnModel,
    layout: InputLayout,
    filter: ResizeFilter,
    num_classes: usize,
}

impl LeafClassifier {
    pub fn new(
        path: impl AsRef<Path>,
        layout: InputLayout,
        filter: ResizeFilter,
        num_classes: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading classifier from {}", path.display());
        let model = load_plan(path, layout)
            .with_context(|| format!("failed to load model from {}", path.display()))?;

        Ok(Self {
            model,
            layout,
            filter,
            num_classes,
        })
    }
}

impl InferModel for LeafClassifier {
    fn run(&self, input: &RgbImage) -> Result<Vec<f32>> {
        let valid_input = tvec!(preprocess(input, self.layout, self.filter).into());
        let raw_nn_out = self.model.run(valid_input)?;

        let scores: Vec<f32> = raw_nn_out[0].to_array_view::<f32>()?.iter().copied().collect();
        if scores.len() != self.num_classes {
            bail!(
                "model produced {} scores, expected {}",
                scores.len(),
                self.num_classes
            );
        }

        Ok(scores)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

fn load_plan(path: &Path, layout: InputLayout) -> Result<NnModel> {
    let [n, d1, d2, d3] = layout.shape();
    let input_fact = InferenceFact::dt_shape(f32::datum_type(), tvec!(n, d1, d2, d3));
    let model = tract_onnx::onnx()
        .model_for_path(path)?
        .with_input_fact(0, input_fact)?
        .into_optimized()?
        .into_runnable()?;

    Ok(model)
}
