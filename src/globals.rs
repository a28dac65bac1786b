use crate::config::CompressorConfig;
use crate::domains::compression::service::{CompressionService, CompressionServiceImpl};
use crate::ffi::error::{ErrorCode, FFIError, FFIResult};
use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;

// Global state definitions
lazy_static! {
    static ref INITIALIZED: AtomicBool = AtomicBool::new(false);
    static ref COMPRESSION_SERVICE: Mutex<Option<Arc<dyn CompressionService>>> = Mutex::new(None);
}

static RUNTIME: OnceCell<Runtime> = OnceCell::new();
static LOGGER: OnceCell<()> = OnceCell::new();

/// Install the env_logger backend once per process
pub fn init_logging() {
    LOGGER.get_or_init(|| {
        // A host may already have installed a logger
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
    });
}

/// Set up the global service from `config`. Later calls are no-ops.
pub fn initialize(config: CompressorConfig) -> FFIResult<()> {
    let mut service_guard = COMPRESSION_SERVICE
        .lock()
        .map_err(|_| FFIError::internal("COMPRESSION_SERVICE lock poisoned".to_string()))?;

    if INITIALIZED.load(Ordering::Acquire) {
        return Ok(());
    }

    log::info!("Initializing compression service (ffmpeg: {})", config.ffmpeg_path);
    let service: Arc<dyn CompressionService> = Arc::new(CompressionServiceImpl::new(&config));
    *service_guard = Some(service);

    INITIALIZED.store(true, Ordering::Release);
    Ok(())
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

/// The global service, initialized from the environment on first use
pub fn get_compression_service() -> FFIResult<Arc<dyn CompressionService>> {
    if !is_initialized() {
        initialize(CompressorConfig::from_env())?;
    }
    COMPRESSION_SERVICE
        .lock()
        .map_err(|_| FFIError::internal("COMPRESSION_SERVICE lock poisoned".to_string()))?
        .clone()
        .ok_or_else(|| FFIError::internal("Compression service not initialized".to_string()))
}

/// Shared runtime for blocking FFI entry points
pub fn get_runtime() -> FFIResult<&'static Runtime> {
    RUNTIME.get_or_try_init(Runtime::new).map_err(|e| {
        FFIError::with_details(ErrorCode::InternalError, "Failed to create async runtime", &e.to_string())
    })
}
