use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facescan_core::Candidate;
use facescan_db::EnrollmentDb;
use facescan_engine::{JobController, ScanEvent};
use facescan_extract::OnnxExtractor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
use config::Config;

#[derive(Parser)]
#[command(name = "facescan", about = "Face profile matching over photo collections")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a user's face profile from one or more photos
    Enroll {
        #[arg(short, long)]
        user: String,
        /// Enrollment photos (typically five poses: frontal, left, right, up, down)
        images: Vec<PathBuf>,
    },
    /// Scan a directory of photos for the enrolled person
    Scan {
        #[arg(short, long)]
        user: String,
        dir: PathBuf,
    },
    /// Show enrollment status for a user
    Status {
        #[arg(short, long)]
        user: String,
    },
    /// Remove a user's enrollment records
    Forget {
        #[arg(short, long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let db = Arc::new(
        EnrollmentDb::open(&config.db_path.to_string_lossy())
            .await
            .with_context(|| format!("opening {}", config.db_path.display()))?,
    );

    match cli.command {
        Commands::Enroll { user, images } => {
            anyhow::ensure!(!images.is_empty(), "at least one enrollment photo is required");
            let controller = build_controller(&config, db.clone())?;

            let refs: Vec<String> = images
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            let profile = controller.install_profile(&user, refs.clone()).await?;
            db.save_enrollment(&user, &refs).await?;
            println!(
                "enrolled {user} with {} descriptor(s)",
                profile.descriptors.len()
            );
        }
        Commands::Scan { user, dir } => {
            let controller = Arc::new(build_controller(&config, db.clone())?);
            let candidates = collect_candidates(&dir)?;
            anyhow::ensure!(
                !candidates.is_empty(),
                "no images found under {}",
                dir.display()
            );

            let (tx, mut rx) = tokio::sync::mpsc::channel::<ScanEvent>(256);
            let printer = tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    if let Ok(line) = serde_json::to_string(&event) {
                        println!("{line}");
                    }
                }
            });

            // Ctrl-C cancels the running scan; the engine finishes the
            // in-flight photo and stops.
            let canceller = controller.clone();
            let cancel_user = user.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    canceller.cancel_scan(&cancel_user);
                }
            });

            let results = controller.start_scan(&user, candidates, tx).await?;
            let _ = printer.await;

            for result in &results {
                println!(
                    "{}  {:?}  confidence={:.2}  consensus={}",
                    result.photo_id, result.match_type, result.confidence, result.consensus
                );
            }
            println!("{} matching photo(s)", results.len());
        }
        Commands::Status { user } => match db.count(&user).await? {
            0 => println!("{user}: not enrolled"),
            n => println!("{user}: {n} enrollment image(s) on record"),
        },
        Commands::Forget { user } => {
            let removed = db.forget(&user).await?;
            println!("removed {removed} enrollment record(s) for {user}");
        }
    }

    Ok(())
}

fn build_controller(config: &Config, db: Arc<EnrollmentDb>) -> Result<JobController> {
    let extractor = OnnxExtractor::load(&config.model_path, config.engine.descriptor_dim)
        .with_context(|| format!("loading embedding model from {}", config.model_path))?;
    Ok(JobController::new(
        config.engine.clone(),
        Arc::new(extractor),
        db,
    ))
}

/// List image files directly under `dir` as scan candidates, in a stable
/// order.
fn collect_candidates(dir: &Path) -> Result<Vec<Candidate>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image(path))
        .collect();
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| Candidate {
            photo_id: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            image_ref: path.to_string_lossy().into_owned(),
        })
        .collect())
}

fn is_image(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref(),
        Some("jpg" | "jpeg" | "png" | "webp" | "bmp")
    )
}
