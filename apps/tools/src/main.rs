use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::pixels;
use image::{ImageFormat, RgbaImage};
use shared::{domain::ModeName, modes::ModeRegistry};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the built-in modes and their raster sizes.
    Modes,
    /// Turn a raw RGB payload, as served by `/image/<id>`, into a PNG.
    Convert {
        #[arg(long, default_value = "Martin1")]
        mode: String,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .init();
    let cli = Cli::parse();
    let registry = ModeRegistry::builtin();

    match cli.command {
        Command::Modes => {
            for (mode, dimensions) in registry.iter() {
                println!("{mode}\t{dimensions}");
            }
        }
        Command::Convert {
            mode,
            input,
            output,
        } => {
            let dimensions = registry.lookup(&ModeName::new(mode))?;
            let payload = fs::read(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;

            let conversion = pixels::convert(&payload, dimensions);
            if let Some(err) = conversion.shortfall() {
                warn!("convert: {err}");
            }
            let raster = conversion.raster;
            let image = RgbaImage::from_raw(raster.width(), raster.height(), raster.into_bytes())
                .context("raster does not match its dimensions")?;
            image
                .save_with_format(&output, ImageFormat::Png)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!(
                "wrote {} ({dimensions}, {} of {} pixels)",
                output.display(),
                conversion.pixels_written,
                dimensions.pixel_count()
            );
        }
    }

    Ok(())
}

/// `RUST_LOG` directives when they parse, `info` otherwise.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_defaults_to_info() {
        assert_eq!(log_filter(None).to_string(), "info");
    }

    #[test]
    fn log_filter_honours_rust_log_directives() {
        assert_eq!(
            log_filter(Some("tools=debug".into())).to_string(),
            "tools=debug"
        );
    }
}
