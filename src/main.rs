use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use echonote::audio::{AudioBackendConfig, AudioSource, DefaultBackendFactory};
use echonote::clock::SystemClock;
use echonote::config::{Config, Credentials};
use echonote::http::{create_router, AppState};
use echonote::session::{SessionController, SessionSettings};
use echonote::stt::HttpTranscription;
use echonote::summarize::HttpSummarizer;

#[derive(Parser)]
#[command(name = "echonote", version, about = "Continuous audio capture with transcript grouping")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the capture service with its HTTP control surface
    Serve {
        /// Path to a TOML configuration file
        #[arg(long)]
        config: Option<String>,
    },
    /// List available audio input devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { config } => serve(config).await,
        Command::Devices => devices(),
    }
}

async fn serve(config_path: Option<String>) -> Result<()> {
    let config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    // Fail fast before any capture machinery spins up
    let credentials = Credentials::from_env()?;

    info!("echonote v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", config.service.name);

    let backend_config = AudioBackendConfig {
        device: config.audio.device.clone(),
        sample_rate: config.audio.sample_rate,
        channels: config.audio.channels,
        ..AudioBackendConfig::default()
    };
    let source = match &config.audio.input_file {
        Some(path) => {
            info!("Capturing from file: {}", path);
            AudioSource::File(path.clone())
        }
        None => AudioSource::Microphone,
    };
    let backend_factory = Arc::new(DefaultBackendFactory::new(source, backend_config));
    let transcription = Arc::new(HttpTranscription::new(
        &config.transcription,
        credentials.transcription_key,
    )?);
    let summarizer = Arc::new(HttpSummarizer::new(
        &config.summarization,
        credentials.summarizer_key,
    )?);

    let controller = Arc::new(SessionController::new(
        SessionSettings::from_config(&config),
        backend_factory,
        transcription,
        summarizer,
        Arc::new(SystemClock),
    ));
    let app = create_router(AppState::new(controller));

    let addr = format!("{}:{}", config.service.http.bind, config.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}

fn devices() -> Result<()> {
    #[cfg(feature = "microphone")]
    {
        let devices = echonote::audio::microphone::list_input_devices()?;
        if devices.is_empty() {
            println!("No input devices found");
        }
        for name in devices {
            println!("{}", name);
        }
        Ok(())
    }

    #[cfg(not(feature = "microphone"))]
    {
        anyhow::bail!("built without microphone support")
    }
}
