// Declare submodules for the compression domain
pub mod types;
pub mod service;
pub mod session;
pub mod compressors;

// Re-export key types
pub use types::{
    CompressionResult, MediaCategory, Notification, NotificationKind,
    PdfSettings, Preset, PresetInfo, SessionMode, SourceFile, VideoSettings,
};

pub use service::{CompressionService, CompressionServiceImpl};
pub use session::CompressionSession;
pub use compressors::Compressor;
