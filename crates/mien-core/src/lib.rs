//! mien-core — Biometric matching engine.
//!
//! Decodes client-submitted images, gates them through liveness analysis,
//! extracts face embeddings via ONNX Runtime, and matches probe embeddings
//! against an enrolled gallery.

pub mod codec;
pub mod extractor;
pub mod identity;
pub mod liveness;
pub mod matcher;
pub mod onnx;
pub mod types;

pub use codec::DecodeError;
pub use extractor::{ExtractorError, FaceFeatures, FeatureExtractor};
pub use identity::{IdentityError, IdentityKey};
pub use liveness::{ChallengeAction, LivenessAssessment, LivenessGate};
pub use matcher::{MatchOutcome, Matcher, NearestMatcher, DEFAULT_TOLERANCE};
pub use onnx::OnnxExtractor;
pub use types::{Embedding, FaceRegion};
