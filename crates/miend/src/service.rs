//! Enrollment/verification orchestration.
//!
//! One `FaceService` is constructed at startup with its store, engine
//! handle, and tolerance injected, and shared by all request handlers.
//! Every internal error is recovered here and converted into a structured
//! outcome with a human-readable message; nothing below this layer reaches
//! a client as a transport error.

use mien_core::{
    codec, ChallengeAction, DecodeError, IdentityError, IdentityKey, MatchOutcome, Matcher,
    NearestMatcher,
};
use mien_store::{FaceStore, StoreError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::engine::{EngineError, EngineHandle};

/// Final decision for an enrollment request.
#[derive(Debug, Serialize)]
pub struct RegisterOutcome {
    pub success: bool,
    pub message: String,
}

/// Final decision for a verification request.
#[derive(Debug, Serialize)]
pub struct VerifyOutcome {
    pub matched: bool,
    pub identity: Option<String>,
    pub message: String,
}

#[derive(Error, Debug)]
enum ServiceError {
    #[error(transparent)]
    Validation(#[from] IdentityError),
    #[error("invalid image data: {0}")]
    Decode(#[from] DecodeError),
    #[error("anti-spoofing check failed: {0}")]
    Liveness(String),
    #[error("no face detected in the image")]
    NoFace,
    #[error("multiple faces detected in the image")]
    MultipleFaces,
    #[error("feature extraction failed: {0}")]
    Extraction(String),
    #[error("failed to encode enrollment photo: {0}")]
    Encode(DecodeError),
    #[error("failed to store {what}: {source}")]
    Write {
        what: &'static str,
        #[source]
        source: StoreError,
    },
    #[error("verification is not supported on the active storage backend")]
    Unsupported,
    #[error("storage error: {0}")]
    Store(StoreError),
    #[error("analysis engine unavailable")]
    Engine,
}

impl From<EngineError> for ServiceError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::LivenessFailed(reason) => ServiceError::Liveness(reason),
            EngineError::NoFaceDetected => ServiceError::NoFace,
            EngineError::MultipleFaces => ServiceError::MultipleFaces,
            EngineError::Extractor(e) => ServiceError::Extraction(e.to_string()),
            EngineError::ChannelClosed => ServiceError::Engine,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unsupported => ServiceError::Unsupported,
            other => ServiceError::Store(other),
        }
    }
}

pub struct FaceService {
    engine: EngineHandle,
    store: Arc<dyn FaceStore>,
    matcher: NearestMatcher,
    tolerance: f32,
}

impl FaceService {
    pub fn new(engine: EngineHandle, store: Arc<dyn FaceStore>, tolerance: f32) -> Self {
        Self { engine, store, matcher: NearestMatcher, tolerance }
    }

    /// Enroll a face image under an identity number.
    pub async fn register(
        &self,
        image_data: &str,
        identity: &str,
        evidence: &[ChallengeAction],
    ) -> RegisterOutcome {
        match self.try_register(image_data, identity, evidence).await {
            Ok(identity) => {
                tracing::info!(identity = %identity, "face registered");
                RegisterOutcome {
                    success: true,
                    message: "face registered successfully".into(),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "registration rejected");
                RegisterOutcome { success: false, message: e.to_string() }
            }
        }
    }

    async fn try_register(
        &self,
        image_data: &str,
        identity: &str,
        evidence: &[ChallengeAction],
    ) -> Result<IdentityKey, ServiceError> {
        // Reject malformed keys before any other work
        let identity = IdentityKey::parse(identity)?;
        let image = codec::decode_image(image_data)?;

        let analysis = self
            .engine
            .analyze(image.clone(), evidence.to_vec(), true)
            .await?;

        self.store
            .save_embedding(&identity, &analysis.features.embedding)
            .await
            .map_err(|source| ServiceError::Write { what: "embedding", source })?;

        let jpeg = codec::to_jpeg_bytes(&image).map_err(ServiceError::Encode)?;
        self.store
            .save_image(&identity, &jpeg, 0)
            .await
            .map_err(|source| ServiceError::Write { what: "enrollment photo", source })?;

        Ok(identity)
    }

    /// Match a face image against every enrolled identity.
    pub async fn verify(
        &self,
        image_data: &str,
        evidence: &[ChallengeAction],
        tolerance: Option<f32>,
    ) -> VerifyOutcome {
        match self.try_verify(image_data, evidence, tolerance).await {
            Ok(MatchOutcome::Matched { identity, distance }) => {
                tracing::info!(identity = %identity, distance, "face verified");
                VerifyOutcome {
                    matched: true,
                    identity: Some(identity.to_string()),
                    message: "face verified successfully".into(),
                }
            }
            Ok(MatchOutcome::NoMatch { best_distance }) => {
                tracing::info!(best_distance, "no match within tolerance");
                VerifyOutcome {
                    matched: false,
                    identity: None,
                    message: "no matching face found".into(),
                }
            }
            Ok(MatchOutcome::NoCandidates) => VerifyOutcome {
                matched: false,
                identity: None,
                message: "no registered faces to compare with".into(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "verification rejected");
                VerifyOutcome { matched: false, identity: None, message: e.to_string() }
            }
        }
    }

    async fn try_verify(
        &self,
        image_data: &str,
        evidence: &[ChallengeAction],
        tolerance: Option<f32>,
    ) -> Result<MatchOutcome, ServiceError> {
        let image = codec::decode_image(image_data)?;
        let analysis = self.engine.analyze(image, evidence.to_vec(), false).await?;

        // Fails fast when the backend cannot enumerate
        let gallery = self.store.load_gallery().await?;

        Ok(self.matcher.search(
            &analysis.features.embedding,
            &gallery,
            tolerance.unwrap_or(self.tolerance),
        ))
    }
}
