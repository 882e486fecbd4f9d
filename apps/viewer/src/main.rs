use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    ClientEvent, RasterBuffer, SurfaceHandle, SurfaceOrigin, ViewerClient, ViewerHandle,
};
use image::{ImageFormat, RgbaImage};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod settings;

use settings::{load_settings, DEFAULT_SETTINGS_PATH};

#[derive(Parser, Debug)]
#[command(about = "Follows an SSTV decoder's live channel and browses its history")]
struct Args {
    #[arg(long, default_value = DEFAULT_SETTINGS_PATH)]
    config: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    /// Mode of the images on the live channel.
    #[arg(long)]
    mode: Option<String>,
    #[arg(long)]
    page_size: Option<u32>,
    /// History pages to load at startup.
    #[arg(long, default_value_t = 1)]
    pages: u32,
    /// Write every rendered surface here as PNG.
    #[arg(long)]
    save_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config);
    if let Some(v) = args.server_url {
        settings.server_url = v;
    }
    if let Some(v) = args.mode {
        settings.mode = v;
    }
    if let Some(v) = args.page_size {
        settings.page_size = v;
    }
    if let Some(dir) = &args.save_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create save dir {}", dir.display()))?;
    }

    let client = ViewerClient::spawn(settings.viewer_config(), settings.mode_registry())?;
    let mut events = client.subscribe_events();
    info!(
        server_url = %client.config().server_url,
        mode = %client.config().session_mode,
        "viewer: starting"
    );

    client.connect_live().await?;
    let mut pages_left = args.pages;
    if pages_left > 0 {
        client.load_next_page()?;
        pages_left -= 1;
    }

    let mut file_names: HashMap<SurfaceHandle, String> = HashMap::new();
    loop {
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("viewer: interrupted");
                break;
            }
            event = events.recv() => event,
        };
        let event = match event {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "viewer: event stream lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match event {
            ClientEvent::DecodeStarted { label } => info!(label = %label, "live: decode started"),
            ClientEvent::ProgressChanged { fraction } => {
                debug!(percent = fraction * 100.0, "live: progress");
            }
            ClientEvent::SurfaceAllocated {
                handle,
                origin,
                mode,
                dimensions,
                timestamp,
                ..
            } => {
                let name = match origin {
                    SurfaceOrigin::Live => {
                        format!("live-{}-{}.png", timestamp.format("%Y%m%dT%H%M%S"), handle.0)
                    }
                    SurfaceOrigin::History(id) => format!("image-{id}.png"),
                };
                info!(handle = handle.0, mode = %mode, dimensions = ?dimensions, file = %name, "viewer: surface allocated");
                file_names.insert(handle, name);
            }
            ClientEvent::SurfaceRendered { handle, raster } => {
                let (Some(dir), Some(name)) = (&args.save_dir, file_names.get(&handle)) else {
                    continue;
                };
                let path = dir.join(name);
                match save_png(&raster, &path) {
                    Ok(()) => info!(path = %path.display(), "viewer: saved"),
                    Err(err) => warn!("viewer: {err:#}"),
                }
            }
            ClientEvent::SurfaceFailed { handle, error } => {
                warn!(handle = handle.0, "viewer: surface failed: {error}");
            }
            ClientEvent::HistoryPageLoaded { entries, exhausted } => {
                info!(entries, exhausted, "history: page loaded");
                if !exhausted && pages_left > 0 {
                    client.load_next_page()?;
                    pages_left -= 1;
                }
            }
            ClientEvent::LiveDisconnected(error) => {
                info!("live: {error}");
                break;
            }
            ClientEvent::Error(error) => warn!(code = ?error.code(), "viewer: {error}"),
        }
    }

    Ok(())
}

fn save_png(raster: &RasterBuffer, path: &Path) -> Result<()> {
    let image = RgbaImage::from_raw(raster.width(), raster.height(), raster.as_bytes().to_vec())
        .context("raster does not match its dimensions")?;
    image
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))
}
