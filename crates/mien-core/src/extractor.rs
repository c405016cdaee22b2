//! Feature extraction boundary.
//!
//! The face model is consumed as an opaque capability: a raster image goes
//! in, face regions and a fixed-length embedding vector come out. Everything
//! downstream (liveness, matching, storage) depends only on this trait.

use crate::types::{Embedding, FaceRegion};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// A detected face paired with its embedding.
#[derive(Debug, Clone)]
pub struct FaceFeatures {
    pub region: FaceRegion,
    pub embedding: Embedding,
}

/// Opaque face-analysis capability: locate faces and embed a face region.
///
/// Methods take `&mut self` because inference sessions require exclusive
/// access; callers serialize use through a dedicated thread.
pub trait FeatureExtractor: Send {
    /// Locate faces in the image, strongest detection first. An empty vec
    /// means no face was found — not an error.
    fn detect_faces(&mut self, image: &DynamicImage) -> Result<Vec<FaceRegion>, ExtractorError>;

    /// Produce an embedding for the face in the given region.
    fn embed(
        &mut self,
        image: &DynamicImage,
        region: &FaceRegion,
    ) -> Result<Embedding, ExtractorError>;
}
