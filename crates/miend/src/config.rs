use std::path::PathBuf;

/// Storage backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    Remote,
}

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// HTTP bind address (default: 0.0.0.0:2020).
    pub listen_addr: String,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Which storage backend to construct.
    pub storage_backend: StorageBackend,
    /// Root directory for the local backend.
    pub faces_dir: PathBuf,
    /// Base URL of the remote object store.
    pub remote_endpoint: String,
    /// Bucket name on the remote object store.
    pub remote_bucket: String,
    /// Timeout in seconds for a remote storage request.
    pub storage_timeout_secs: u64,
    /// Texture-variance threshold for passive liveness analysis.
    pub texture_threshold: f64,
    /// Default maximum embedding distance accepted as a match.
    pub match_tolerance: f32,
}

impl Config {
    /// Load configuration from `MIEN_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let storage_backend = match std::env::var("MIEN_STORAGE_BACKEND").as_deref() {
            Ok("remote") => StorageBackend::Remote,
            _ => StorageBackend::Local,
        };

        Self {
            listen_addr: std::env::var("MIEN_LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:2020".to_string()),
            model_dir: std::env::var("MIEN_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./models")),
            storage_backend,
            faces_dir: std::env::var("MIEN_FACES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./faces")),
            remote_endpoint: std::env::var("MIEN_REMOTE_ENDPOINT").unwrap_or_default(),
            remote_bucket: std::env::var("MIEN_REMOTE_BUCKET").unwrap_or_default(),
            storage_timeout_secs: env_u64("MIEN_STORAGE_TIMEOUT_SECS", 10),
            texture_threshold: env_f64(
                "MIEN_TEXTURE_THRESHOLD",
                mien_core::liveness::DEFAULT_TEXTURE_THRESHOLD,
            ),
            match_tolerance: env_f32("MIEN_MATCH_TOLERANCE", mien_core::DEFAULT_TOLERANCE),
        }
    }

    /// Path to the face detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join("detector.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the embedding model.
    pub fn embedder_model_path(&self) -> String {
        self.model_dir
            .join("embedder.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
