//! facescan-extract — ONNX-backed descriptor extraction.
//!
//! Adapts an ArcFace-style embedding model to the engine's
//! [`DescriptorExtractor`] seam. Inputs are pre-cropped face photos loaded
//! from disk; detection and alignment happen upstream of this crate.

use async_trait::async_trait;
use facescan_core::Descriptor;
use facescan_engine::{DescriptorExtractor, ExtractionError};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const INPUT_SIZE: usize = 112;
const PIXEL_MEAN: f32 = 127.5;
const PIXEL_STD: f32 = 127.5; // symmetric normalization, not 128.0

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Embedding extractor over a single ONNX session.
///
/// The session is serialized behind a mutex; inference runs on the blocking
/// pool.
#[derive(Debug)]
pub struct OnnxExtractor {
    session: Arc<Mutex<Session>>,
    descriptor_dim: usize,
    model_version: String,
}

impl OnnxExtractor {
    /// Load the embedding model from the given path.
    pub fn load(model_path: &str, descriptor_dim: usize) -> Result<Self, ExtractorError> {
        if !Path::new(model_path).exists() {
            return Err(ExtractorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let model_version = Path::new(model_path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string());

        tracing::info!(
            path = model_path,
            dim = descriptor_dim,
            version = %model_version,
            "embedding model loaded"
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            descriptor_dim,
            model_version,
        })
    }

    /// Convert a 112×112 RGB crop into a NCHW float tensor.
    fn preprocess(rgb: &image::RgbImage) -> Array4<f32> {
        let size = INPUT_SIZE;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

        for y in 0..size {
            for x in 0..size {
                let pixel = rgb.get_pixel(x as u32, y as u32);
                for channel in 0..3 {
                    tensor[[0, channel, y, x]] =
                        (pixel.0[channel] as f32 - PIXEL_MEAN) / PIXEL_STD;
                }
            }
        }

        tensor
    }

    fn infer(
        session: &Mutex<Session>,
        tensor: Array4<f32>,
        expected_dim: usize,
    ) -> Result<Vec<f32>, ExtractionError> {
        let mut session = session.lock();

        let input = TensorRef::from_array_view(tensor.view()).map_err(|e| {
            ExtractionError::Inference {
                reason: e.to_string(),
            }
        })?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| ExtractionError::Inference {
                reason: e.to_string(),
            })?;

        let (_, raw) = outputs[0].try_extract_tensor::<f32>().map_err(|e| {
            ExtractionError::Inference {
                reason: format!("embedding extraction: {e}"),
            }
        })?;
        let raw: Vec<f32> = raw.to_vec();

        if raw.len() != expected_dim {
            return Err(ExtractionError::Inference {
                reason: format!(
                    "expected {expected_dim}-dim embedding, got {}",
                    raw.len()
                ),
            });
        }

        // L2-normalize the embedding.
        let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        Ok(if norm > 0.0 {
            raw.iter().map(|x| x / norm).collect()
        } else {
            raw
        })
    }
}

#[async_trait]
impl DescriptorExtractor for OnnxExtractor {
    async fn extract(&self, image_ref: &str) -> Result<Descriptor, ExtractionError> {
        let path = image_ref.to_string();
        let session = self.session.clone();
        let dim = self.descriptor_dim;
        let model_version = self.model_version.clone();

        tokio::task::spawn_blocking(move || {
            let img = image::open(&path).map_err(|e| ExtractionError::Unreadable {
                reason: e.to_string(),
            })?;
            let resized = img
                .resize_exact(
                    INPUT_SIZE as u32,
                    INPUT_SIZE as u32,
                    image::imageops::FilterType::Triangle,
                )
                .to_rgb8();

            let tensor = Self::preprocess(&resized);
            let values = Self::infer(&session, tensor, dim)?;
            Ok(Descriptor::with_model_version(values, model_version))
        })
        .await
        .map_err(|e| ExtractionError::Inference {
            reason: format!("extraction task: {e}"),
        })?
    }
}
