use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;

use smart_compressor::{
    CompressionServiceImpl, CompressionSession, CompressorConfig, Notification, NotificationKind,
    Preset, SessionMode, SourceFile,
};

/// Compress an image, video or PDF with a named preset
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File to compress
    #[arg(required_unless_present = "list_presets")]
    input: Option<PathBuf>,

    /// Preset: lz77, rle or bpe
    #[arg(long, default_value = "lz77")]
    preset: Preset,

    /// Accepted file kinds: image, video, pdf or any
    #[arg(long, default_value = "any")]
    mode: SessionMode,

    /// Directory for the output file (defaults to the input's directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Path to the ffmpeg executable
    #[arg(long)]
    ffmpeg: Option<String>,

    /// Target size for compressed images, in MB
    #[arg(long)]
    max_size_mb: Option<f64>,

    /// Longer side limit for compressed images, in pixels
    #[arg(long)]
    max_dimension: Option<u32>,

    /// Print the result as JSON instead of text
    #[arg(long)]
    json: bool,

    /// List available presets and exit
    #[arg(long)]
    list_presets: bool,
}

#[derive(Serialize)]
struct Summary<'a> {
    input: &'a Path,
    output: &'a Path,
    file_name: &'a str,
    preset: Preset,
    original_size: u64,
    compressed_size: u64,
    compression_ratio: f64,
    duration_ms: i64,
}

fn build_config(args: &Args) -> CompressorConfig {
    let mut config = CompressorConfig::from_env();
    if let Some(path) = &args.ffmpeg {
        config.ffmpeg_path = path.clone();
    }
    if let Some(mb) = args.max_size_mb {
        config.image.max_size_bytes = (mb * 1024.0 * 1024.0) as u64;
    }
    if let Some(dim) = args.max_dimension {
        config.image.max_width_or_height = dim;
    }
    config
}

fn print_notifications(rx: &mut UnboundedReceiver<Notification>) {
    while let Ok(notification) = rx.try_recv() {
        let marker = match notification.kind {
            NotificationKind::Success => "✅",
            NotificationKind::Info => "ℹ️ ",
            NotificationKind::Error => "❌",
        };
        eprintln!("{} {}: {}", marker, notification.title, notification.description);
    }
}

fn list_presets(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let presets: Vec<_> = Preset::ALL.iter().map(|p| p.info()).collect();
        println!("{}", serde_json::to_string_pretty(&presets)?);
        return Ok(());
    }

    for preset in Preset::ALL {
        let video = preset.video_settings();
        println!("{:<5} {:<24} {}", preset.as_str(), preset.display_name(), preset.description());
        println!("      image quality {:.2}, video crf {} ({}, {}k max)",
            preset.image_quality(), video.crf, video.encoder_preset, video.max_bitrate_kbps);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    if args.list_presets {
        return list_presets(args.json);
    }
    let input = match &args.input {
        Some(input) => input.clone(),
        None => return Err("an input file is required".into()),
    };

    let config = build_config(&args);
    log::debug!("Using config: {:?}", config);

    let service = Arc::new(CompressionServiceImpl::new(&config));
    let (session, mut notifications) = CompressionSession::new(service, args.mode);

    let file = SourceFile::from_path(&input).await?;
    let selected = session.select_file(file).await;
    print_notifications(&mut notifications);
    selected?;

    session.select_preset(args.preset).await;
    let compressed = session.compress().await;
    print_notifications(&mut notifications);
    let result = compressed?;

    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(".")),
    };
    let saved = session.save_result(&output_dir).await;
    print_notifications(&mut notifications);
    let output = saved?;

    if args.json {
        let summary = Summary {
            input: &input,
            output: &output,
            file_name: &result.file_name,
            preset: result.preset,
            original_size: result.original_size,
            compressed_size: result.compressed_size,
            compression_ratio: result.compression_ratio,
            duration_ms: result.duration_ms,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{} -> {}", input.display(), output.display());
        println!("  {} bytes -> {} bytes ({:.1}%, {} bytes saved) in {} ms",
            result.original_size, result.compressed_size, result.compression_ratio,
            result.space_saved_bytes(), result.duration_ms);
    }

    Ok(())
}
