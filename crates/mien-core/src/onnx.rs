//! ONNX-backed feature extractor.
//!
//! Two models are consumed as black boxes: a face detector producing
//! `[N, 5]` rows of `[x1, y1, x2, y2, score]` in normalized coordinates,
//! and an embedding model producing one fixed-length vector for a face
//! crop. Both run on CPU via ONNX Runtime.

use crate::extractor::{ExtractorError, FeatureExtractor};
use crate::types::{Embedding, FaceRegion};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

const DETECTOR_INPUT_SIZE: u32 = 640;
const DETECTOR_SCORE_THRESHOLD: f32 = 0.5;
const EMBEDDER_INPUT_SIZE: u32 = 112;
const EMBEDDER_MEAN: f32 = 127.5;
const EMBEDDER_STD: f32 = 127.5;

/// Feature extractor backed by a detector and an embedder ONNX session.
pub struct OnnxExtractor {
    detector: Session,
    embedder: Session,
}

impl OnnxExtractor {
    /// Load both models. Fails fast if either file is missing.
    pub fn load(detector_path: &str, embedder_path: &str) -> Result<Self, ExtractorError> {
        for path in [detector_path, embedder_path] {
            if !Path::new(path).exists() {
                return Err(ExtractorError::ModelNotFound(path.to_string()));
            }
        }

        let detector = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(detector_path)?;
        tracing::info!(path = detector_path, "detector model loaded");

        let embedder = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(embedder_path)?;
        tracing::info!(path = embedder_path, "embedder model loaded");

        Ok(Self { detector, embedder })
    }

    /// RGB image → NCHW float tensor scaled to [0, 1].
    fn detector_input(image: &DynamicImage) -> Array4<f32> {
        let size = DETECTOR_INPUT_SIZE;
        let resized = image
            .resize_exact(size, size, FilterType::Triangle)
            .to_rgb8();

        let mut tensor = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
        for (x, y, px) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = px[c] as f32 / 255.0;
            }
        }
        tensor
    }

    /// Face crop → NCHW float tensor with symmetric normalization.
    fn embedder_input(image: &DynamicImage, region: &FaceRegion) -> Array4<f32> {
        let region = region.clamp_to(image.width(), image.height());
        let crop = image
            .crop_imm(region.left, region.top, region.width().max(1), region.height().max(1))
            .resize_exact(EMBEDDER_INPUT_SIZE, EMBEDDER_INPUT_SIZE, FilterType::Triangle)
            .to_rgb8();

        let size = EMBEDDER_INPUT_SIZE as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, px) in crop.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (px[c] as f32 - EMBEDDER_MEAN) / EMBEDDER_STD;
            }
        }
        tensor
    }

}

impl FeatureExtractor for OnnxExtractor {
    fn detect_faces(&mut self, image: &DynamicImage) -> Result<Vec<FaceRegion>, ExtractorError> {
        let input = Self::detector_input(image);

        let outputs = self
            .detector
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExtractorError::InferenceFailed(format!("detector output: {e}")))?;

        Ok(decode_detections(
            data,
            image.width(),
            image.height(),
            DETECTOR_SCORE_THRESHOLD,
        ))
    }

    fn embed(
        &mut self,
        image: &DynamicImage,
        region: &FaceRegion,
    ) -> Result<Embedding, ExtractorError> {
        let input = Self::embedder_input(image, region);

        let outputs = self
            .embedder
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExtractorError::InferenceFailed(format!("embedding output: {e}")))?;

        if raw.is_empty() {
            return Err(ExtractorError::InferenceFailed(
                "embedder produced an empty vector".into(),
            ));
        }

        Ok(Embedding::new(l2_normalize(raw)))
    }
}

/// Decode `[N, 5]` rows of normalized `[x1, y1, x2, y2, score]` into pixel
/// regions, strongest detection first.
fn decode_detections(
    data: &[f32],
    image_width: u32,
    image_height: u32,
    threshold: f32,
) -> Vec<FaceRegion> {
    let mut scored: Vec<(f32, FaceRegion)> = data
        .chunks_exact(5)
        .filter(|row| row[4] > threshold)
        .map(|row| {
            let to_px = |v: f32, extent: u32| {
                (v.clamp(0.0, 1.0) * extent as f32).round() as u32
            };
            let region = FaceRegion {
                left: to_px(row[0], image_width),
                top: to_px(row[1], image_height),
                right: to_px(row[2], image_width),
                bottom: to_px(row[3], image_height),
            };
            (row[4], region)
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(_, region)| region).collect()
}

/// Scale a vector to unit L2 norm. Zero vectors are returned unchanged.
fn l2_normalize(raw: &[f32]) -> Vec<f32> {
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw.to_vec()
    }
}
