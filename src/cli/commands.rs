//! CLI command definitions and handlers.
//!
//! Each subcommand is implemented as a function that takes the parsed arguments
//! and returns an `anyhow::Result<()>`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossbeam_channel::unbounded;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use syncplayer::config;
use syncplayer::cover::{AlbumArt, read_embedded_cover};
use syncplayer::player::{PlaybackResourceManager, ProbeBackend, format_time};
use syncplayer::tags::{Id3Scanner, TagScanner};

/// Syncplayer CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Show the ID3v2 header, frames and embedded pictures of a file
    Inspect {
        /// Path to the audio file
        path: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the embedded album art of a file to disk
    ExtractArt {
        /// Path to the audio file
        path: PathBuf,
        /// Where to write the image
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Load a file into the player and print the resulting state
    Load {
        /// Path to the audio file
        path: PathBuf,
        /// Declared MIME type of the file (e.g. audio/mpeg)
        #[arg(long)]
        mime: Option<String>,
        /// Config file to use instead of the default location
        #[arg(long, env = "SYNCPLAYER_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Write a default config file
    InitConfig {
        /// Destination (default: the OS config directory)
        path: Option<PathBuf>,
    },
}

/// Run the parsed command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Inspect { path, json } => cmd_inspect(path, *json),
        Commands::ExtractArt { path, output } => cmd_extract_art(path, output),
        Commands::Load { path, mime, config } => {
            cmd_load(path, mime.as_deref(), config.as_deref())
        }
        Commands::InitConfig { path } => cmd_init_config(path.clone()),
    }
}

// ============================================================================
// inspect
// ============================================================================

#[derive(Debug, Serialize)]
struct FrameSummary {
    id: String,
    offset: usize,
    size: usize,
}

#[derive(Debug, Serialize)]
struct PictureSummary {
    mime_type: String,
    picture_type: u8,
    description: String,
    size: usize,
}

#[derive(Debug, Serialize)]
struct InspectReport {
    path: PathBuf,
    version: Option<String>,
    tag_size: Option<u32>,
    frames: Vec<FrameSummary>,
    pictures: Vec<PictureSummary>,
    error: Option<String>,
}

fn inspect(path: &Path, bytes: &[u8]) -> InspectReport {
    let mut report = InspectReport {
        path: path.to_path_buf(),
        version: None,
        tag_size: None,
        frames: Vec::new(),
        pictures: Vec::new(),
        error: None,
    };

    let scanner = Id3Scanner::new();
    match scanner.frames(bytes) {
        Ok(Some((header, frames))) => {
            report.version = Some(format!("2.{}.{}", header.version.0, header.version.1));
            report.tag_size = Some(header.tag_size);
            for frame in frames.into_iter().flatten() {
                match frame {
                    Ok(frame) => report.frames.push(FrameSummary {
                        id: frame.header.id_str().to_string(),
                        offset: frame.offset,
                        size: frame.payload.len(),
                    }),
                    Err(e) => report.error = Some(e.to_string()),
                }
            }
        }
        Ok(None) => debug!("No ID3v2 tag in {}", path.display()),
        Err(e) => report.error = Some(e.to_string()),
    }

    match scanner.pictures(bytes) {
        Ok(pictures) => {
            report.pictures = pictures
                .iter()
                .map(|p| PictureSummary {
                    mime_type: AlbumArt::from_apic(p).mime_type,
                    picture_type: p.picture_type,
                    description: p.description.clone(),
                    size: p.image_data.len(),
                })
                .collect();
        }
        Err(e) => {
            report.error.get_or_insert_with(|| e.to_string());
        }
    }

    report
}

fn cmd_inspect(path: &Path, json: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let report = inspect(path, &bytes);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", report.path.display());
    match (&report.version, report.tag_size) {
        (Some(version), Some(size)) => println!("  ID3v{} tag, {} bytes", version, size),
        _ => println!("  No ID3v2 tag"),
    }
    for frame in &report.frames {
        println!("  {:>8}  {}  {} bytes", frame.offset, frame.id, frame.size);
    }
    if report.pictures.is_empty() {
        println!("  No embedded pictures");
    }
    for picture in &report.pictures {
        println!(
            "  Picture: {} type {} \"{}\" ({} bytes)",
            picture.mime_type, picture.picture_type, picture.description, picture.size
        );
    }
    if let Some(error) = &report.error {
        println!("  Tag error: {}", error);
    }
    Ok(())
}

// ============================================================================
// extract-art
// ============================================================================

fn cmd_extract_art(path: &Path, output: &Path) -> anyhow::Result<()> {
    let Some(art) = read_embedded_cover(path)? else {
        anyhow::bail!("{} has no usable embedded album art", path.display());
    };
    std::fs::write(output, &art.data).with_context(|| format!("writing {}", output.display()))?;
    info!(
        "Wrote {} bytes of {} to {}",
        art.len(),
        art.mime_type,
        output.display()
    );
    println!("{} ({} bytes) -> {}", art.mime_type, art.len(), output.display());
    Ok(())
}

// ============================================================================
// load
// ============================================================================

fn cmd_load(path: &Path, mime: Option<&str>, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = match config_path {
        Some(p) => config::load_from(p),
        None => config::load(),
    };
    let (tx, rx) = unbounded();
    let mut player =
        PlaybackResourceManager::new(ProbeBackend::new(tx), Box::new(Id3Scanner::new()), &config);

    // A failed load leaves the player in Error with the cause recorded,
    // which the snapshot below reports.
    match player.load_path(path, mime) {
        Ok(ticket) => debug!("Load {} installed", ticket),
        Err(e) if e.is_playback_error() => debug!("Load failed: {}", e),
        Err(e) => return Err(e.into()),
    }
    let processed = player.drain_events(&rx);
    debug!("Applied {} media events", processed);

    let snapshot = player.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    println!(
        "{} / {} ({})",
        snapshot.position_str(),
        format_time(snapshot.duration),
        snapshot.status
    );

    player.dispose();
    Ok(())
}

// ============================================================================
// init-config
// ============================================================================

fn cmd_init_config(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = match path {
        Some(p) => p,
        None => config::config_path().context("could not determine config directory")?,
    };
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }

    let rt = Runtime::new()?;
    rt.block_on(config::save_async(config::Config::default(), path.clone()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
