//! Liveness gate — challenge evidence and passive anti-spoofing analysis.
//!
//! A request either carries completed challenge actions (trusted as asserted
//! by the client; the daemon does not re-verify them against a frame stream)
//! or is subjected to passive analysis of the face crop: a sharpness check
//! that rejects out-of-focus printed photos, and a texture-variance check
//! that rejects the flat surfaces typical of screen or print replays.

use crate::extractor::{ExtractorError, FeatureExtractor};
use image::{DynamicImage, GrayImage};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Variance-of-Laplacian below this means the face crop is too blurry.
const BLUR_THRESHOLD: f64 = 100.0;

/// Default cut for the pixel-intensity-variance texture score.
pub const DEFAULT_TEXTURE_THRESHOLD: f64 = 25.0;

/// Actions a client can be challenged to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeAction {
    Blink,
    Smile,
    TurnHeadLeft,
    TurnHeadRight,
    Nod,
}

pub const CHALLENGE_ACTIONS: [ChallengeAction; 5] = [
    ChallengeAction::Blink,
    ChallengeAction::Smile,
    ChallengeAction::TurnHeadLeft,
    ChallengeAction::TurnHeadRight,
    ChallengeAction::Nod,
];

/// Sample an ordered challenge of 1–2 distinct actions.
pub fn generate_challenge() -> Vec<ChallengeAction> {
    let mut rng = rand::thread_rng();
    let count = rng.gen_range(1..=2);
    CHALLENGE_ACTIONS
        .choose_multiple(&mut rng, count)
        .copied()
        .collect()
}

/// Outcome of a liveness assessment. The reason is surfaced to callers
/// verbatim, so failure causes stay distinguishable in logs and responses.
#[derive(Debug, Clone)]
pub struct LivenessAssessment {
    pub is_live: bool,
    pub reason: String,
}

impl LivenessAssessment {
    fn pass(reason: &str) -> Self {
        Self { is_live: true, reason: reason.to_owned() }
    }

    fn fail(reason: &str) -> Self {
        Self { is_live: false, reason: reason.to_owned() }
    }
}

/// State-free liveness decision function.
pub struct LivenessGate {
    texture_threshold: f64,
}

impl LivenessGate {
    pub fn new(texture_threshold: f64) -> Self {
        Self { texture_threshold }
    }

    /// Decide whether the presented face is live.
    ///
    /// Non-empty evidence short-circuits to a pass. Otherwise the extractor
    /// locates the strongest face region and the grayscale crop is scored
    /// for sharpness and texture. Callers must not proceed past a failed
    /// assessment.
    pub fn assess(
        &self,
        image: &DynamicImage,
        evidence: &[ChallengeAction],
        extractor: &mut dyn FeatureExtractor,
    ) -> Result<LivenessAssessment, ExtractorError> {
        if !evidence.is_empty() {
            return Ok(LivenessAssessment::pass(
                "liveness confirmed through completed challenge actions",
            ));
        }

        let faces = extractor.detect_faces(image)?;
        let Some(region) = faces.first() else {
            return Ok(LivenessAssessment::fail(
                "no face detected for spoofing analysis",
            ));
        };

        let gray = image.to_luma8();
        let region = region.clamp_to(gray.width(), gray.height());
        if region.width() == 0 || region.height() == 0 {
            return Ok(LivenessAssessment::fail("invalid face region for analysis"));
        }

        let crop =
            image::imageops::crop_imm(&gray, region.left, region.top, region.width(), region.height())
                .to_image();

        let sharpness = laplacian_variance(&crop);
        let texture = intensity_variance(&crop);
        tracing::debug!(sharpness, texture, "passive liveness scores");

        if sharpness < BLUR_THRESHOLD {
            return Ok(LivenessAssessment::fail(
                "image too blurry, possible spoofing attempt",
            ));
        }
        if texture < self.texture_threshold {
            return Ok(LivenessAssessment::fail(
                "unusual texture patterns detected, possible spoofing attempt",
            ));
        }

        Ok(LivenessAssessment::pass("image passed anti-spoofing checks"))
    }
}

/// Variance of the 3×3 Laplacian response over a grayscale crop.
///
/// Edge-rich, in-focus crops score high; prints held at spoofing distance
/// lose edge response and score near zero. Crops smaller than 3×3 score 0.
fn laplacian_variance(crop: &GrayImage) -> f64 {
    let (w, h) = (crop.width() as usize, crop.height() as usize);
    if w < 3 || h < 3 {
        return 0.0;
    }

    let px = |x: usize, y: usize| crop.as_raw()[y * w + x] as f64;

    let mut responses = Vec::with_capacity((w - 2) * (h - 2));
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let response =
                px(x - 1, y) + px(x + 1, y) + px(x, y - 1) + px(x, y + 1) - 4.0 * px(x, y);
            responses.push(response);
        }
    }

    variance(&responses)
}

/// Variance of raw pixel intensities over a grayscale crop.
fn intensity_variance(crop: &GrayImage) -> f64 {
    let values: Vec<f64> = crop.as_raw().iter().map(|&p| p as f64).collect();
    variance(&values)
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}
