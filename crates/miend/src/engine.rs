//! Analysis engine — liveness gate and feature extraction on a dedicated
//! OS thread.
//!
//! ONNX sessions require exclusive access, so the extractor lives on one
//! thread and every request flows through a bounded channel. Handlers hold
//! a clone-safe [`EngineHandle`].

use image::DynamicImage;
use mien_core::{ChallengeAction, ExtractorError, FaceFeatures, FeatureExtractor, LivenessGate};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("liveness check failed: {0}")]
    LivenessFailed(String),
    #[error("no face detected in the image")]
    NoFaceDetected,
    #[error("multiple faces detected in the image")]
    MultipleFaces,
    #[error("extractor error: {0}")]
    Extractor(#[from] ExtractorError),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Result of gating and extracting one image.
pub struct Analysis {
    pub features: FaceFeatures,
    /// Why the liveness gate passed, for observability.
    pub liveness_reason: String,
}

enum EngineRequest {
    Analyze {
        image: DynamicImage,
        evidence: Vec<ChallengeAction>,
        require_single_face: bool,
        reply: oneshot::Sender<Result<Analysis, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Gate the image through liveness analysis, then extract features.
    /// The gate runs first; a spoofed image never reaches the extractor.
    ///
    /// With `require_single_face` (enrollment), more than one detected face
    /// is rejected.
    pub async fn analyze(
        &self,
        image: DynamicImage,
        evidence: Vec<ChallengeAction>,
        require_single_face: bool,
    ) -> Result<Analysis, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Analyze {
                image,
                evidence,
                require_single_face,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Spawn the engine on a dedicated OS thread.
pub fn spawn_engine(
    mut extractor: impl FeatureExtractor + 'static,
    gate: LivenessGate,
) -> EngineHandle {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(16);

    std::thread::Builder::new()
        .name("mien-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Analyze {
                        image,
                        evidence,
                        require_single_face,
                        reply,
                    } => {
                        let result = run_analyze(
                            &mut extractor,
                            &gate,
                            &image,
                            &evidence,
                            require_single_face,
                        );
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .expect("failed to spawn engine thread");

    EngineHandle { tx }
}

fn run_analyze(
    extractor: &mut dyn FeatureExtractor,
    gate: &LivenessGate,
    image: &DynamicImage,
    evidence: &[ChallengeAction],
    require_single_face: bool,
) -> Result<Analysis, EngineError> {
    let assessment = gate.assess(image, evidence, extractor)?;
    if !assessment.is_live {
        return Err(EngineError::LivenessFailed(assessment.reason));
    }

    let faces = extractor.detect_faces(image)?;
    let region = match faces.as_slice() {
        [] => return Err(EngineError::NoFaceDetected),
        [only] => *only,
        [strongest, ..] => {
            if require_single_face {
                return Err(EngineError::MultipleFaces);
            }
            *strongest
        }
    };

    let embedding = extractor.embed(image, &region)?;

    Ok(Analysis {
        features: FaceFeatures { region, embedding },
        liveness_reason: assessment.reason,
    })
}
