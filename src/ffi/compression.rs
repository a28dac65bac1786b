// src/ffi/compression.rs
// =============================================================================
// COMPRESSION – FFI BINDINGS
// =============================================================================
// JSON in, JSON out. Every returned string is owned by Rust and must be
// released with `smart_compressor_free` exactly once.
//
// JSON CONTRACTS:
// - init:          {"ffmpeg_path"?, "max_input_bytes"?, "image_max_size_bytes"?, "image_max_dimension"?}
// - compress_file: {"path": "/abs/file", "preset"?: "lz77|rle|bpe", "output_dir"?: "/abs/dir"}
// - list_presets:  no input
// -----------------------------------------------------------------------------

use crate::config::CompressorConfig;
use crate::domains::compression::{CompressionSession, Preset, PresetInfo, SessionMode, SourceFile};
use crate::ffi::error::{ErrorCode, FFIError};
use crate::ffi::{handle_json_result, handle_status_result, parse_json_input, FFIResult};
use crate::globals;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};
use uuid::Uuid;

// -----------------------------------------------------------------------------
// DTO Types --------------------------------------------------------------------
// -----------------------------------------------------------------------------

#[derive(Deserialize, Default)]
struct InitRequest {
    ffmpeg_path: Option<String>,
    max_input_bytes: Option<u64>,
    image_max_size_bytes: Option<u64>,
    image_max_dimension: Option<u32>,
}

#[derive(Deserialize)]
struct CompressFileRequest {
    path: String,
    preset: Option<String>,
    output_dir: Option<String>,
}

#[derive(Serialize, Debug)]
struct CompressFileResponse {
    id: Uuid,
    file_name: String,
    output_path: String,
    original_size: u64,
    compressed_size: u64,
    compression_ratio: f64,
    preset: Preset,
    mime_type: String,
    duration_ms: i64,
    completed_at: DateTime<Utc>,
}

impl InitRequest {
    fn into_config(self) -> CompressorConfig {
        let mut config = CompressorConfig::from_env();
        if let Some(path) = self.ffmpeg_path {
            config.ffmpeg_path = path;
        }
        if let Some(v) = self.max_input_bytes {
            config.max_input_bytes = v;
        }
        if let Some(v) = self.image_max_size_bytes {
            config.image.max_size_bytes = v;
        }
        if let Some(v) = self.image_max_dimension {
            config.image.max_width_or_height = v;
        }
        config
    }
}

fn parse_preset(preset: Option<&str>) -> FFIResult<Preset> {
    match preset {
        None => Ok(Preset::default()),
        Some(s) => s.parse::<Preset>().map_err(|_| FFIError::with_details(
            ErrorCode::InvalidArgument,
            "Invalid preset",
            &format!("Expected one of lz77, rle, bpe; got '{}'", s),
        )),
    }
}

/// Store `outcome` as JSON in `*result` and return its status code
unsafe fn respond<T: Serialize>(result: *mut *mut c_char, outcome: FFIResult<T>) -> c_int {
    let code = match &outcome {
        Ok(_) => ErrorCode::Success,
        Err(e) => e.code,
    };
    let json = handle_json_result(|| outcome);
    if json.is_null() {
        return ErrorCode::InternalError as c_int;
    }

    if result.is_null() {
        unsafe { drop(CString::from_raw(json)); }
    } else {
        unsafe { *result = json; }
    }
    code as c_int
}

async fn compress_to_disk(request: CompressFileRequest) -> FFIResult<CompressFileResponse> {
    let preset = parse_preset(request.preset.as_deref())?;
    let input = PathBuf::from(&request.path);
    let output_dir = match request.output_dir {
        Some(dir) => PathBuf::from(dir),
        None => input.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(".")),
    };

    let file = SourceFile::from_path(&input).await?;
    let service = globals::get_compression_service()?;
    let (session, _notifications) = CompressionSession::new(service, SessionMode::Any);

    session.select_file(file).await?;
    session.select_preset(preset).await;
    let result = session.compress().await?;
    let output_path = session.save_result(&output_dir).await?;

    Ok(CompressFileResponse {
        id: result.id,
        file_name: result.file_name.clone(),
        output_path: output_path.to_string_lossy().into_owned(),
        original_size: result.original_size,
        compressed_size: result.compressed_size,
        compression_ratio: result.compression_ratio,
        preset: result.preset,
        mime_type: result.mime_type.clone(),
        duration_ms: result.duration_ms,
        completed_at: result.completed_at,
    })
}

// -----------------------------------------------------------------------------
// FFI Functions ----------------------------------------------------------------
// -----------------------------------------------------------------------------

/// Initialize the library. `config_json` may be null to use the environment.
/// Calling it again after a successful init is a no-op.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn smart_compressor_init(config_json: *const c_char) -> c_int {
    globals::init_logging();
    handle_status_result(|| {
        let request: InitRequest = if config_json.is_null() {
            InitRequest::default()
        } else {
            parse_json_input(config_json)?
        };
        globals::initialize(request.into_config())
    })
}

/// Compress one file on disk and write `compressed_<preset>_<name>` next to
/// it, or into `output_dir` when given.
/// Output: CompressFileResponse JSON, or FFIError JSON on failure
#[unsafe(no_mangle)]
pub unsafe extern "C" fn smart_compressor_compress_file(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    globals::init_logging();
    let outcome = (|| -> FFIResult<CompressFileResponse> {
        let request: CompressFileRequest = parse_json_input(payload_json)?;
        if request.path.trim().is_empty() {
            return Err(FFIError::new(ErrorCode::ValidationFailed, "Field 'path' is required"));
        }
        let rt = globals::get_runtime()?;
        rt.block_on(compress_to_disk(request))
    })();

    unsafe { respond(result, outcome) }
}

/// Output: array of PresetInfo JSON
#[unsafe(no_mangle)]
pub unsafe extern "C" fn smart_compressor_list_presets(result: *mut *mut c_char) -> c_int {
    let presets: Vec<PresetInfo> = Preset::ALL.iter().map(|p| p.info()).collect();
    unsafe { respond(result, Ok(presets)) }
}

/// Free string memory allocated by Rust
/// SAFETY: Must be called exactly once for each string returned from this library
#[unsafe(no_mangle)]
pub unsafe extern "C" fn smart_compressor_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe { let _ = CString::from_raw(ptr); }
    }
}
