//! Runtime configuration for the compressors.
//!
//! Values come from environment variables (a `.env` file is honoured) and
//! can be overridden afterwards, e.g. by CLI flags.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

pub const ENV_FFMPEG_PATH: &str = "SMART_COMPRESSOR_FFMPEG_PATH";
pub const ENV_MAX_INPUT_BYTES: &str = "SMART_COMPRESSOR_MAX_INPUT_BYTES";
pub const ENV_IMAGE_MAX_SIZE_BYTES: &str = "SMART_COMPRESSOR_IMAGE_MAX_SIZE_BYTES";
pub const ENV_IMAGE_MAX_DIMENSION: &str = "SMART_COMPRESSOR_IMAGE_MAX_DIMENSION";

/// Limits applied by the image compressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageLimits {
    /// Target upper bound for the encoded output
    pub max_size_bytes: u64,
    /// Longer side of the output never exceeds this
    pub max_width_or_height: u32,
    /// Number of re-encode passes allowed to reach `max_size_bytes`
    pub max_iterations: u32,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_size_bytes: 1024 * 1024, // 1MB
            max_width_or_height: 1920,
            max_iterations: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressorConfig {
    pub ffmpeg_path: String,
    /// Largest input we are willing to load fully into memory
    pub max_input_bytes: u64,
    pub image: ImageLimits,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            max_input_bytes: 2048 * 1024 * 1024, // 2GB
            image: ImageLimits::default(),
        }
    }
}

impl CompressorConfig {
    /// Build a config from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        if let Err(e) = dotenv::dotenv() {
            log::debug!("No .env file loaded: {}", e);
        }

        let mut config = Self::default();

        if let Ok(path) = env::var(ENV_FFMPEG_PATH) {
            if !path.trim().is_empty() {
                config.ffmpeg_path = path;
            }
        }
        if let Some(v) = parse_env::<u64>(ENV_MAX_INPUT_BYTES) {
            config.max_input_bytes = v;
        }
        if let Some(v) = parse_env::<u64>(ENV_IMAGE_MAX_SIZE_BYTES) {
            config.image.max_size_bytes = v;
        }
        if let Some(v) = parse_env::<u32>(ENV_IMAGE_MAX_DIMENSION) {
            config.image.max_width_or_height = v;
        }

        config
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}
