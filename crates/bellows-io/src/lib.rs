//! Audio output for the bellows harmonium.
//!
//! This crate provides:
//!
//! - **Live output**: [`CpalBackend`] behind the [`AudioBackend`] trait, with
//!   [`ChannelFanout`] spreading the mono instrument across device channels
//! - **Device discovery**: [`list_devices`] and [`default_output_device`]
//! - **WAV files**: [`write_wav`] for offline renders, [`read_wav`] and
//!   [`read_wav_info`] for checking them
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bellows_io::{AudioBackend, BackendStreamConfig, ChannelFanout, CpalBackend};
//!
//! let backend = CpalBackend::new();
//! let config = BackendStreamConfig::default();
//! let mut fanout = ChannelFanout::new(|mono: &mut [f32]| mono.fill(0.0), config.channels, 1024);
//! let stream = backend.build_output_stream(
//!     &config,
//!     Box::new(move |data| fanout.process(data)),
//!     Box::new(|err| tracing::error!(err, "audio stream error")),
//! )?;
//! // Audio plays until `stream` is dropped.
//! ```

pub mod backend;
pub mod cpal_backend;
mod stream;
mod wav;

pub use backend::{AudioBackend, BackendStreamConfig, ErrorCallback, OutputCallback, StreamHandle};
pub use cpal_backend::CpalBackend;
pub use stream::{AudioDevice, ChannelFanout, default_output_device, list_devices};
pub use wav::{WavFormat, WavInfo, WavSpec, read_wav, read_wav_info, write_wav};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio output device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
