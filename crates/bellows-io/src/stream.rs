//! Output device discovery and mono-to-multichannel fanout.

use crate::Result;
use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

/// Fallback when a device does not report a default config.
const FALLBACK_SAMPLE_RATE: u32 = 48000;

/// Extract device name via `description()` (cpal 0.17+).
pub(crate) fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Audio device information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Whether this is the system default output.
    pub is_default: bool,
    /// Default output channel count.
    pub channels: u16,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
}

fn describe(device: &Device, is_default: bool) -> Option<AudioDevice> {
    let name = device_name(device).ok()?;
    let (channels, default_sample_rate) = device
        .default_output_config()
        .map(|c| (c.channels(), c.sample_rate()))
        .unwrap_or((2, FALLBACK_SAMPLE_RATE));
    Some(AudioDevice {
        name,
        is_default,
        channels,
        default_sample_rate,
    })
}

/// List output devices on the default host.
///
/// A host that cannot enumerate devices yields an empty list.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let default_name = host
        .default_output_device()
        .and_then(|d| device_name(&d).ok());

    let mut devices = Vec::new();
    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            let is_default = device_name(&device).ok() == default_name;
            if let Some(info) = describe(&device, is_default)
                && !devices.iter().any(|d: &AudioDevice| d.name == info.name)
            {
                devices.push(info);
            }
        }
    }
    Ok(devices)
}

/// The default output device, if any.
pub fn default_output_device() -> Result<Option<AudioDevice>> {
    let host = cpal::default_host();
    Ok(host
        .default_output_device()
        .and_then(|d| describe(&d, true)))
}

/// Spreads a mono render callback over an interleaved multichannel buffer.
///
/// The scratch buffer is allocated up front; larger device buffers are
/// rendered in several passes, so [`process`](Self::process) never
/// allocates.
///
/// # Example
///
/// ```rust
/// use bellows_io::ChannelFanout;
///
/// let mut n = 0.0;
/// let mut fanout = ChannelFanout::new(
///     move |mono: &mut [f32]| {
///         for s in mono {
///             n += 1.0;
///             *s = n;
///         }
///     },
///     2,
///     4,
/// );
/// let mut out = [0.0; 6];
/// fanout.process(&mut out);
/// assert_eq!(out, [1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
/// ```
pub struct ChannelFanout<F> {
    render: F,
    channels: usize,
    scratch: Vec<f32>,
}

impl<F: FnMut(&mut [f32])> ChannelFanout<F> {
    /// Create a fanout for `channels` outputs rendering up to `max_frames`
    /// frames per pass.
    pub fn new(render: F, channels: u16, max_frames: usize) -> Self {
        Self {
            render,
            channels: usize::from(channels.max(1)),
            scratch: vec![0.0; max_frames.max(1)],
        }
    }

    /// Fill `interleaved` with the mono signal copied to every channel.
    ///
    /// A trailing partial frame is zeroed.
    pub fn process(&mut self, interleaved: &mut [f32]) {
        let channels = self.channels;
        let pass = self.scratch.len() * channels;
        for chunk in interleaved.chunks_mut(pass) {
            let frames = chunk.len() / channels;
            let mono = &mut self.scratch[..frames];
            (self.render)(mono);
            for (frame, &sample) in chunk.chunks_exact_mut(channels).zip(mono.iter()) {
                frame.fill(sample);
            }
            chunk[frames * channels..].fill(0.0);
        }
    }

    /// Number of output channels.
    pub fn channels(&self) -> usize {
        self.channels
    }
}

impl<F> std::fmt::Debug for ChannelFanout<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelFanout")
            .field("channels", &self.channels)
            .field("max_frames", &self.scratch.len())
            .finish_non_exhaustive()
    }
}
