use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mien", about = "Mien face enrollment/verification CLI")]
struct Cli {
    /// Base URL of the miend daemon.
    #[arg(long, default_value = "http://127.0.0.1:2020", env = "MIEN_URL")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a face image under a 12-digit identity number
    Register {
        /// Identity number (12 digits)
        identity: String,
        /// Path to the face image
        image: PathBuf,
        /// Completed challenge actions, comma-separated (e.g. blink,nod)
        #[arg(long, value_delimiter = ',')]
        actions: Vec<String>,
    },
    /// Verify a face image against enrolled identities
    Verify {
        /// Path to the face image
        image: PathBuf,
        /// Completed challenge actions, comma-separated
        #[arg(long, value_delimiter = ',')]
        actions: Vec<String>,
        /// Maximum embedding distance accepted as a match
        #[arg(long)]
        tolerance: Option<f32>,
    },
    /// Request a liveness challenge from the daemon
    Challenge,
}

/// Read an image file and encode it as a data URL the daemon accepts.
fn encode_file(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    };
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(&bytes)))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Register { identity, image, actions } => {
            let body = serde_json::json!({
                "image_data": encode_file(&image)?,
                "identity": identity,
                "completed_actions": actions,
            });
            let response: serde_json::Value = client
                .post(format!("{}/api/register", cli.url))
                .json(&body)
                .send()
                .await
                .context("daemon unreachable")?
                .json()
                .await?;

            let message = response["message"].as_str().unwrap_or("no message");
            if response["success"].as_bool() == Some(true) {
                println!("registered: {message}");
            } else {
                bail!("registration failed: {message}");
            }
        }
        Commands::Verify { image, actions, tolerance } => {
            let body = serde_json::json!({
                "image_data": encode_file(&image)?,
                "completed_actions": actions,
                "tolerance": tolerance,
            });
            let response: serde_json::Value = client
                .post(format!("{}/api/verify", cli.url))
                .json(&body)
                .send()
                .await
                .context("daemon unreachable")?
                .json()
                .await?;

            let message = response["message"].as_str().unwrap_or("no message");
            if response["matched"].as_bool() == Some(true) {
                let identity = response["identity"].as_str().unwrap_or("?");
                println!("matched {identity}: {message}");
            } else {
                bail!("not matched: {message}");
            }
        }
        Commands::Challenge => {
            let response: serde_json::Value = client
                .get(format!("{}/api/challenge", cli.url))
                .send()
                .await
                .context("daemon unreachable")?
                .json()
                .await?;

            let actions: Vec<&str> = response["actions"]
                .as_array()
                .map(|a| a.iter().filter_map(|v| v.as_str()).collect())
                .unwrap_or_default();
            println!("perform in order: {}", actions.join(", "));
        }
    }

    Ok(())
}
