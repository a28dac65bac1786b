// Public modules
pub mod config;
pub mod domains;
pub mod errors;
pub mod ffi;
pub mod globals;

pub use config::{CompressorConfig, ImageLimits};
pub use domains::compression::{
    CompressionResult, CompressionService, CompressionServiceImpl, CompressionSession,
    MediaCategory, Notification, NotificationKind, Preset, SessionMode, SourceFile,
};
pub use errors::{DomainError, DomainResult, ServiceError, ServiceResult, ValidationError};

/// Initialize the library with an explicit configuration.
/// Without this call the first request configures itself from the environment.
pub fn initialize(config: CompressorConfig) -> ffi::FFIResult<()> {
    globals::init_logging();
    globals::initialize(config)
}
