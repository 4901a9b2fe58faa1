use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use rust_file_uploader::services::transport::{BackgroundSessionFactory, UploadEvent};
use rust_file_uploader::{UploaderConfig, create_app};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Parser)]
#[command(name = "rust-file-uploader", version, about = "Streamed multipart uploads and de-duplicated downloads")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a JPEG, PNG or QuickTime file and print the JSON response
    Upload {
        endpoint: Url,
        field: String,
        file: PathBuf,
    },
    /// Upload a video to the configured video endpoint and wait for completion
    UploadVideo { file: PathBuf },
    /// Download a remote file into the download directory
    Download { url: Url },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_file_uploader=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = UploaderConfig::from_env();
    info!(
        "⚙️  Chunk Size={}KB, Temp Dir={}, Connect Timeout={:?}, Read Timeout={:?}, JSON Timeout={:?}",
        config.chunk_size / 1024,
        config.temp_dir.display(),
        config.connect_timeout,
        config.read_timeout,
        config.request_timeout
    );

    let app = create_app(config)?;

    match cli.command {
        Command::Upload {
            endpoint,
            field,
            file,
        } => {
            info!("📤 Uploading {} to {}", file.display(), endpoint);
            let json = app.coordinator.upload_media(&endpoint, &field, &file).await?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Command::UploadVideo { file } => {
            let (factory, mut events) = BackgroundSessionFactory::new(app.transport.clone());
            let handle = app.coordinator.submit_video(&file, &factory).await?;
            info!("🎬 Video upload started as task {}", handle.id);

            tokio::select! {
                event = events.recv() => match event {
                    Some(UploadEvent::Completed { task_id, response }) => {
                        info!("✅ Task {} completed with status {}", task_id, response.status);
                        println!("{}", String::from_utf8_lossy(&response.body));
                    }
                    Some(UploadEvent::Failed { task_id, error }) => {
                        error!("❌ Task {} failed: {}", task_id, error);
                        return Err(error.into());
                    }
                    None => warn!("Upload session closed without reporting"),
                },
                _ = signal::ctrl_c() => {
                    info!("⌨️  Ctrl+C received, cancelling task {}", handle.id);
                    handle.cancel();
                    if let Some(event) = events.recv().await {
                        info!("🛑 Task {} stopped", event.task_id());
                    }
                }
            }
        }
        Command::Download { url } => {
            info!("📥 Downloading {}", url);
            let path = app.downloader.download(&url).await?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
