//! End-to-end tests for the enrollment/verification orchestration, using a
//! deterministic stub extractor: embeddings are derived from the mean
//! intensity of eight horizontal bands, an all-black image contains no
//! face, and a 512-pixel-wide image contains two.

use image::{DynamicImage, GenericImageView, ImageFormat};
use mien_core::{
    codec, ChallengeAction, Embedding, ExtractorError, FaceRegion, FeatureExtractor, LivenessGate,
};
use mien_store::{FaceStore, LocalStore, RemoteStore};
use std::sync::Arc;
use std::time::Duration;

use miend::engine::spawn_engine;
use miend::service::FaceService;

const BANDS: usize = 8;

struct StubExtractor;

impl FeatureExtractor for StubExtractor {
    fn detect_faces(&mut self, image: &DynamicImage) -> Result<Vec<FaceRegion>, ExtractorError> {
        let gray = image.to_luma8();
        if gray.pixels().all(|p| p[0] == 0) {
            return Ok(vec![]);
        }

        let full = FaceRegion {
            top: 0,
            right: image.width(),
            bottom: image.height(),
            left: 0,
        };
        if image.width() >= 512 {
            let half = FaceRegion { right: image.width() / 2, ..full };
            return Ok(vec![half, full]);
        }
        Ok(vec![full])
    }

    fn embed(
        &mut self,
        image: &DynamicImage,
        _region: &FaceRegion,
    ) -> Result<Embedding, ExtractorError> {
        let gray = image.to_luma8();
        let band_height = (gray.height() as usize / BANDS).max(1);

        let mut sums = vec![0.0f64; BANDS];
        let mut counts = vec![0u64; BANDS];
        for (_, y, px) in gray.enumerate_pixels() {
            let band = (y as usize / band_height).min(BANDS - 1);
            sums[band] += px[0] as f64;
            counts[band] += 1;
        }

        let values = sums
            .iter()
            .zip(&counts)
            .map(|(sum, &count)| (sum / count.max(1) as f64 / 255.0) as f32)
            .collect();
        Ok(Embedding::new(values))
    }
}

/// Banded image with a checkerboard overlay: sharp and textured enough to
/// pass passive liveness, with band means untouched by the overlay.
fn textured(bands: [u8; BANDS], width: u32) -> DynamicImage {
    let img = image::GrayImage::from_fn(width, 64, |x, y| {
        let base = bands[(y / 8) as usize] as i16;
        let delta = if (x + y) % 2 == 0 { 20 } else { -20 };
        image::Luma([(base + delta) as u8])
    });
    DynamicImage::ImageLuma8(img)
}

fn face_a() -> DynamicImage {
    textured([230, 230, 230, 230, 40, 40, 40, 40], 64)
}

fn face_a_near_duplicate() -> DynamicImage {
    textured([234, 234, 234, 234, 44, 44, 44, 44], 64)
}

fn face_b() -> DynamicImage {
    textured([40, 40, 40, 40, 230, 230, 230, 230], 64)
}

fn crowd() -> DynamicImage {
    textured([230, 230, 230, 230, 40, 40, 40, 40], 512)
}

/// Smooth vertical ramp: no edge response, fails the sharpness check.
fn blurry() -> DynamicImage {
    DynamicImage::ImageLuma8(image::GrayImage::from_fn(64, 64, |_, y| {
        image::Luma([(y * 4) as u8])
    }))
}

/// All black: the stub reports no face.
fn faceless() -> DynamicImage {
    DynamicImage::ImageLuma8(image::GrayImage::from_pixel(64, 64, image::Luma([0])))
}

fn payload(image: &DynamicImage) -> String {
    codec::encode_image(image, ImageFormat::Png).unwrap()
}

fn evidence() -> Vec<ChallengeAction> {
    vec![ChallengeAction::Blink]
}

async fn local_service(dir: &std::path::Path) -> FaceService {
    let store = Arc::new(LocalStore::open(dir).await.unwrap());
    let engine = spawn_engine(StubExtractor, LivenessGate::new(25.0));
    FaceService::new(engine, store, 0.6)
}

async fn file_count(dir: &std::path::Path) -> usize {
    let mut count = 0;
    let mut entries = tokio::fs::read_dir(dir).await.unwrap();
    while entries.next_entry().await.unwrap().is_some() {
        count += 1;
    }
    count
}

#[tokio::test]
async fn test_register_then_verify_same_image() {
    let dir = tempfile::tempdir().unwrap();
    let service = local_service(dir.path()).await;

    let outcome = service
        .register(&payload(&face_a()), "123456789012", &[])
        .await;
    assert!(outcome.success, "message: {}", outcome.message);

    let outcome = service.verify(&payload(&face_a()), &[], None).await;
    assert!(outcome.matched);
    assert_eq!(outcome.identity.as_deref(), Some("123456789012"));
}

#[tokio::test]
async fn test_verify_near_duplicate_matches() {
    let dir = tempfile::tempdir().unwrap();
    let service = local_service(dir.path()).await;

    service
        .register(&payload(&face_a()), "123456789012", &evidence())
        .await;

    let outcome = service
        .verify(&payload(&face_a_near_duplicate()), &evidence(), None)
        .await;
    assert!(outcome.matched, "message: {}", outcome.message);
    assert_eq!(outcome.identity.as_deref(), Some("123456789012"));
}

#[tokio::test]
async fn test_verify_unrelated_face_no_match() {
    let dir = tempfile::tempdir().unwrap();
    let service = local_service(dir.path()).await;

    service
        .register(&payload(&face_a()), "123456789012", &evidence())
        .await;

    let outcome = service.verify(&payload(&face_b()), &evidence(), None).await;
    assert!(!outcome.matched);
    assert_eq!(outcome.identity, None);
    assert_eq!(outcome.message, "no matching face found");
}

#[tokio::test]
async fn test_verify_empty_store_is_distinct_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let service = local_service(dir.path()).await;

    let outcome = service.verify(&payload(&face_a()), &evidence(), None).await;
    assert!(!outcome.matched);
    assert_eq!(outcome.message, "no registered faces to compare with");
}

#[tokio::test]
async fn test_no_face_rejected_with_no_writes() {
    let dir = tempfile::tempdir().unwrap();
    let service = local_service(dir.path()).await;

    let outcome = service
        .register(&payload(&faceless()), "123456789012", &evidence())
        .await;
    assert!(!outcome.success);
    assert_eq!(outcome.message, "no face detected in the image");
    assert_eq!(file_count(dir.path()).await, 0);

    let outcome = service.verify(&payload(&faceless()), &evidence(), None).await;
    assert!(!outcome.matched);
    assert_eq!(outcome.message, "no face detected in the image");
}

#[tokio::test]
async fn test_blurry_image_fails_liveness_with_no_writes() {
    let dir = tempfile::tempdir().unwrap();
    let service = local_service(dir.path()).await;

    let outcome = service
        .register(&payload(&blurry()), "123456789012", &[])
        .await;
    assert!(!outcome.success);
    assert!(
        outcome.message.contains("blurry"),
        "message: {}",
        outcome.message
    );
    assert_eq!(file_count(dir.path()).await, 0);
}

#[tokio::test]
async fn test_malformed_identity_rejected_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    let service = local_service(dir.path()).await;

    let outcome = service.register(&payload(&face_a()), "12AB", &evidence()).await;
    assert!(!outcome.success);
    assert!(
        outcome.message.contains("12 digits"),
        "message: {}",
        outcome.message
    );
    assert_eq!(file_count(dir.path()).await, 0);
}

#[tokio::test]
async fn test_undecodable_image_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let service = local_service(dir.path()).await;

    let outcome = service
        .register("data:image/png;base64,@@@not-base64@@@", "123456789012", &evidence())
        .await;
    assert!(!outcome.success);
    assert!(
        outcome.message.contains("invalid image data"),
        "message: {}",
        outcome.message
    );
}

#[tokio::test]
async fn test_reregistration_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let service = local_service(dir.path()).await;

    service
        .register(&payload(&face_a()), "123456789012", &evidence())
        .await;
    let outcome = service
        .register(&payload(&face_b()), "123456789012", &evidence())
        .await;
    assert!(outcome.success);

    // The new embedding matches; the original enrollment no longer does
    let outcome = service.verify(&payload(&face_b()), &evidence(), None).await;
    assert!(outcome.matched);
    assert_eq!(outcome.identity.as_deref(), Some("123456789012"));

    let outcome = service.verify(&payload(&face_a()), &evidence(), None).await;
    assert!(!outcome.matched);
    assert_eq!(outcome.message, "no matching face found");
}

#[tokio::test]
async fn test_multiple_faces_rejected_for_enrollment() {
    let dir = tempfile::tempdir().unwrap();
    let service = local_service(dir.path()).await;

    let outcome = service
        .register(&payload(&crowd()), "123456789012", &evidence())
        .await;
    assert!(!outcome.success);
    assert!(
        outcome.message.contains("multiple faces"),
        "message: {}",
        outcome.message
    );
    assert_eq!(file_count(dir.path()).await, 0);
}

#[tokio::test]
async fn test_enrollment_writes_record_and_photo() {
    let dir = tempfile::tempdir().unwrap();
    let service = local_service(dir.path()).await;

    service
        .register(&payload(&face_a()), "123456789012", &evidence())
        .await;

    assert!(dir.path().join("123456789012.json").is_file());
    assert!(dir.path().join("123456789012").join("0.jpg").is_file());
}

#[tokio::test]
async fn test_remote_backend_verification_unsupported() {
    let store = Arc::new(
        RemoteStore::new("http://127.0.0.1:1", "faces", Duration::from_secs(1)).unwrap(),
    );
    let engine = spawn_engine(StubExtractor, LivenessGate::new(25.0));
    let service = FaceService::new(engine, store, 0.6);

    let outcome = service.verify(&payload(&face_a()), &evidence(), None).await;
    assert!(!outcome.matched);
    assert_eq!(
        outcome.message,
        "verification is not supported on the active storage backend"
    );
}
