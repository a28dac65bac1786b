//! Video compression through an external ffmpeg executable

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio::sync::OnceCell;

use crate::errors::{DomainError, DomainResult};
use super::{extension_for_mime, Compressor};
use crate::domains::compression::types::{MediaCategory, Preset, VideoSettings};

/// Process-wide handle to the transcoding engine. Created on the first
/// video request and reused for the life of the process.
static ENGINE: OnceCell<FfmpegEngine> = OnceCell::const_new();

/// A probed, known-good ffmpeg executable
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    pub path: String,
    pub version: String,
}

impl FfmpegEngine {
    async fn probe(path: &str) -> DomainResult<Self> {
        log::info!("Loading video engine from {}", path);

        let output = Command::new(path)
            .arg("-version")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| DomainError::External(format!("Failed to execute ffmpeg at {}: {}", path, e)))?;

        if !output.status.success() {
            return Err(DomainError::External(format!(
                "ffmpeg at {} exited with {}", path, output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("ffmpeg (unknown version)")
            .to_string();
        log::info!("Video engine ready: {}", version);

        Ok(Self { path: path.to_string(), version })
    }
}

/// Get the shared engine, probing `path` if it has not been loaded yet.
/// A failed probe is not cached, so a later call may retry. A path other
/// than the loaded one is probed for this call only.
pub async fn engine(path: &str) -> DomainResult<FfmpegEngine> {
    if let Some(loaded) = ENGINE.get() {
        if loaded.path == path {
            return Ok(loaded.clone());
        }
        log::warn!("Video engine already loaded from {}; using {} uncached", loaded.path, path);
        return FfmpegEngine::probe(path).await;
    }
    ENGINE.get_or_try_init(|| FfmpegEngine::probe(path)).await.cloned()
}

/// Video compressor delegating to ffmpeg with preset-derived encoder settings
pub struct VideoCompressor {
    ffmpeg_path: String,
}

impl VideoCompressor {
    pub fn new(ffmpeg_path: Option<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.unwrap_or_else(|| "ffmpeg".to_string()),
        }
    }

    async fn transcode(&self, data: Vec<u8>, container: &str, settings: &VideoSettings) -> DomainResult<Vec<u8>> {
        let engine = engine(&self.ffmpeg_path).await?;

        let suffix = format!(".{}", container);
        let input_file = tempfile::Builder::new()
            .prefix("smart_compressor_in_")
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| DomainError::Internal(format!("Failed to create temp file: {}", e)))?;
        let output_file: NamedTempFile = tempfile::Builder::new()
            .prefix("smart_compressor_out_")
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| DomainError::Internal(format!("Failed to create output temp file: {}", e)))?;

        tokio::fs::write(input_file.path(), &data)
            .await
            .map_err(|e| DomainError::Internal(format!("Failed to write to temp file: {}", e)))?;

        let args = build_ffmpeg_args(input_file.path(), output_file.path(), container, settings);
        log::debug!("Running {} {}", engine.path, args.join(" "));

        let output = Command::new(&engine.path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DomainError::External(format!("Failed to execute ffmpeg: {}", e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(DomainError::External(format!("ffmpeg error: {}", error.trim())));
        }

        tokio::fs::read(output_file.path())
            .await
            .map_err(|e| DomainError::Internal(format!("Failed to read transcoded video: {}", e)))
    }
}

#[async_trait]
impl Compressor for VideoCompressor {
    async fn can_handle(&self, mime_type: &str, extension: Option<&str>) -> bool {
        matches!(mime_type,
            "video/mp4" | "video/quicktime" | "video/x-msvideo" | "video/webm" |
            "video/x-matroska" | "video/x-m4v"
        ) || (mime_type == "application/octet-stream" && matches!(extension,
            Some("mp4") | Some("mov") | Some("m4v") | Some("avi") | Some("mkv") | Some("webm")
        ))
    }

    async fn compress(
        &self,
        data: Vec<u8>,
        mime_type: &str,
        preset: Preset,
    ) -> DomainResult<Vec<u8>> {
        let settings = preset.video_settings();
        let container = extension_for_mime(mime_type).unwrap_or("mp4");
        log::debug!("Video settings for preset {} ({}): {:?}", preset, container, settings);

        self.transcode(data, container, &settings).await.map_err(|e| {
            log::error!("Video compression failed: {}", e);
            DomainError::Compression("Failed to compress video".to_string())
        })
    }

    fn category(&self) -> MediaCategory {
        MediaCategory::Video
    }

    fn compressor_name(&self) -> &'static str {
        "VideoCompressor"
    }
}

/// Build the ffmpeg command line for one transcode. WebM gets VP9/Opus,
/// every other container H.264/AAC.
pub fn build_ffmpeg_args(input: &Path, output: &Path, container: &str, settings: &VideoSettings) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-y".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
    ];

    if container == "webm" {
        let cpu_used = if settings.encoder_preset == "fast" { "4" } else { "2" };
        args.extend([
            "-c:v".to_string(), "libvpx-vp9".to_string(),
            "-crf".to_string(), settings.crf.to_string(),
            "-b:v".to_string(), format!("{}k", settings.max_bitrate_kbps),
            "-deadline".to_string(), "good".to_string(),
            "-cpu-used".to_string(), cpu_used.to_string(),
            "-c:a".to_string(), "libopus".to_string(),
            "-b:a".to_string(), format!("{}k", settings.audio_bitrate_kbps),
        ]);
    } else {
        args.extend([
            "-c:v".to_string(), "libx264".to_string(),
            "-preset".to_string(), settings.encoder_preset.clone(),
            "-crf".to_string(), settings.crf.to_string(),
            "-maxrate".to_string(), format!("{}k", settings.max_bitrate_kbps),
            "-bufsize".to_string(), format!("{}k", settings.max_bitrate_kbps * 2),
            "-c:a".to_string(), "aac".to_string(),
            "-b:a".to_string(), format!("{}k", settings.audio_bitrate_kbps),
        ]);
        if matches!(container, "mp4" | "mov" | "m4v") {
            args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }
    }

    args.push(output.to_string_lossy().into_owned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(|s| s.as_str())
    }

    #[test]
    fn test_mp4_args_follow_preset() {
        let settings = Preset::Rle.video_settings();
        let args = build_ffmpeg_args(&PathBuf::from("/tmp/in.mp4"), &PathBuf::from("/tmp/out.mp4"), "mp4", &settings);

        assert_eq!(arg_after(&args, "-i"), Some("/tmp/in.mp4"));
        assert_eq!(arg_after(&args, "-c:v"), Some("libx264"));
        assert_eq!(arg_after(&args, "-crf"), Some("23"));
        assert_eq!(arg_after(&args, "-preset"), Some("fast"));
        assert_eq!(arg_after(&args, "-maxrate"), Some("2000k"));
        assert_eq!(arg_after(&args, "-bufsize"), Some("4000k"));
        assert_eq!(arg_after(&args, "-movflags"), Some("+faststart"));
        assert_eq!(args.last().map(|s| s.as_str()), Some("/tmp/out.mp4"));
    }

    #[test]
    fn test_webm_args_use_vp9() {
        let settings = Preset::Lz77.video_settings();
        let args = build_ffmpeg_args(&PathBuf::from("in.webm"), &PathBuf::from("out.webm"), "webm", &settings);

        assert_eq!(arg_after(&args, "-c:v"), Some("libvpx-vp9"));
        assert_eq!(arg_after(&args, "-c:a"), Some("libopus"));
        assert_eq!(arg_after(&args, "-b:v"), Some("1000k"));
        assert!(!args.iter().any(|a| a == "-movflags"));
    }

    /// Stand-in ffmpeg: answers `-version` (logging each call) and writes the
    /// first ten bytes of the `-i` input to the last argument.
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("ffmpeg");
        let body = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
    echo probed >> "$(dirname "$0")/version_calls"
    echo "ffmpeg version 6.0-test"
    exit 0
fi
prev=""
for arg in "$@"; do
    if [ "$prev" = "-i" ]; then input="$arg"; fi
    prev="$arg"
    output="$arg"
done
head -c 10 "$input" > "$output"
"#;
        std::fs::write(&script, body).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_transcode_round_trip_reuses_engine() {
        use crate::config::CompressorConfig;
        use crate::domains::compression::service::{CompressionService, CompressionServiceImpl};
        use crate::domains::compression::types::SourceFile;

        let dir = tempfile::tempdir().unwrap();
        let script = fake_ffmpeg(dir.path());
        let config = CompressorConfig {
            ffmpeg_path: script.to_string_lossy().into_owned(),
            ..CompressorConfig::default()
        };
        let service = CompressionServiceImpl::new(&config);
        let input: Vec<u8> = (0u8..100).collect();
        let file = SourceFile::new("clip.mp4", "video/mp4", input.clone());

        let first = service.compress_file(&file, Preset::Lz77).await.unwrap();
        assert_eq!(first.data, input[..10].to_vec());
        assert_eq!(first.file_name, "compressed_lz77_clip.mp4");
        assert_eq!(first.original_size, 100);
        assert_eq!(first.compressed_size, 10);
        assert_eq!(first.category, MediaCategory::Video);

        let second = service.compress_file(&file, Preset::Rle).await.unwrap();
        assert_eq!(second.file_name, "compressed_rle_clip.mp4");
        assert_eq!(second.data, first.data);

        let probes = std::fs::read_to_string(dir.path().join("version_calls")).unwrap();
        assert_eq!(probes.lines().count(), 1);
        assert_eq!(engine(&config.ffmpeg_path).await.unwrap().version, "ffmpeg version 6.0-test");
    }

    #[tokio::test]
    async fn test_missing_engine_fails_fast() {
        let compressor = VideoCompressor::new(Some("/nonexistent/bin/ffmpeg-missing".to_string()));
        let err = compressor
            .compress(vec![0u8; 64], "video/mp4", Preset::Lz77)
            .await
            .unwrap_err();
        match err {
            DomainError::Compression(msg) => assert_eq!(msg, "Failed to compress video"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
