use anyhow::Result;
use facescan_core::MatchThresholds;
use facescan_engine::EngineConfig;
use std::path::PathBuf;

/// CLI configuration, loaded from `FACESCAN_*` environment variables.
pub struct Config {
    /// Path to the ONNX embedding model.
    pub model_path: String,
    /// Path to the SQLite enrollment database.
    pub db_path: PathBuf,
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("facescan");

        let db_path = std::env::var("FACESCAN_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("enrollments.db"));

        let model_path = std::env::var("FACESCAN_MODEL_PATH").unwrap_or_else(|_| {
            data_dir
                .join("models/w600k_r50.onnx")
                .to_string_lossy()
                .into_owned()
        });

        let thresholds = MatchThresholds::new(
            env_f32("FACESCAN_STRONG_THRESHOLD", 0.35),
            env_f32("FACESCAN_WEAK_THRESHOLD", 0.60),
        )?;

        Ok(Self {
            model_path,
            db_path,
            engine: EngineConfig {
                descriptor_dim: env_usize("FACESCAN_DESCRIPTOR_DIM", 512),
                batch_size: env_usize("FACESCAN_BATCH_SIZE", 8),
                eta_window: env_usize("FACESCAN_ETA_WINDOW", 10),
                thresholds,
            },
        })
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
