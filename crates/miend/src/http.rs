//! HTTP boundary — thin JSON routes over the face service.
//!
//! Routing and request parsing stop here; every decision is made by
//! [`FaceService`](crate::service::FaceService).

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use mien_core::liveness::{generate_challenge, ChallengeAction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::service::{FaceService, RegisterOutcome, VerifyOutcome};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Base64 image payload, optionally data-URL prefixed.
    pub image_data: String,
    /// 12-digit identity number.
    pub identity: String,
    /// Challenge actions the client reports as completed.
    #[serde(default)]
    pub completed_actions: Vec<ChallengeAction>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub image_data: String,
    #[serde(default)]
    pub completed_actions: Vec<ChallengeAction>,
    /// Per-request tolerance override.
    pub tolerance: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub actions: Vec<ChallengeAction>,
    pub message: &'static str,
}

pub fn router(service: Arc<FaceService>) -> Router {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/verify", post(verify))
        .route("/api/challenge", get(challenge))
        .with_state(service)
}

async fn register(
    State(service): State<Arc<FaceService>>,
    Json(req): Json<RegisterRequest>,
) -> Json<RegisterOutcome> {
    Json(
        service
            .register(&req.image_data, &req.identity, &req.completed_actions)
            .await,
    )
}

async fn verify(
    State(service): State<Arc<FaceService>>,
    Json(req): Json<VerifyRequest>,
) -> Json<VerifyOutcome> {
    Json(
        service
            .verify(&req.image_data, &req.completed_actions, req.tolerance)
            .await,
    )
}

async fn challenge() -> Json<ChallengeResponse> {
    Json(ChallengeResponse {
        actions: generate_challenge(),
        message: "perform these actions in sequence for liveness verification",
    })
}
