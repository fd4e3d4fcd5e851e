//! Microphone capture using CPAL.
//!
//! Samples are accumulated into fixed-size frames (30ms by default, the size
//! the VAD expects) and handed to a channel. The returned `Stream` must stay
//! alive for capture to continue; drop it to stop.

use crate::error::{VoiceError, VoiceResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Capture configuration.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Sample rate in Hz (default 16000).
    pub sample_rate: u32,
    /// Channel count (default 1, mono).
    pub channels: u16,
    /// Frame size in samples (default 480 = 30ms at 16kHz).
    pub frame_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            frame_size: 480,
        }
    }
}

/// One frame of microphone audio, f32 samples in -1.0..1.0.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub captured_at: std::time::Instant,
}

/// Opens the default input device and streams frames to a channel.
pub struct MicCapture {
    config: FrameConfig,
    device: Device,
    stream_config: StreamConfig,
}

impl MicCapture {
    pub fn new(config: FrameConfig) -> VoiceResult<Self> {
        let device = cpal::default_host().default_input_device().ok_or_else(|| {
            VoiceError::AudioDevice(
                "no input device available (microphone missing or permission refused)".to_string(),
            )
        })?;
        info!(
            "Capture: using input device {} at {}Hz",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            config.sample_rate
        );

        // Probe the default config up front so a denied device fails here,
        // not mid-stream.
        device.default_input_config()?;

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.frame_size as u32),
        };

        Ok(Self {
            config,
            device,
            stream_config,
        })
    }

    /// Start capturing. Frames of exactly `frame_size` samples are sent until
    /// the returned stream is dropped.
    pub fn start(self, frame_tx: mpsc::UnboundedSender<AudioFrame>) -> VoiceResult<Stream> {
        let frame_size = self.config.frame_size;
        let mut pending = Vec::with_capacity(frame_size);

        let stream = self.device.build_input_stream(
            &self.stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for &sample in data {
                    pending.push(sample);
                    if pending.len() >= frame_size {
                        let frame = AudioFrame {
                            samples: std::mem::replace(
                                &mut pending,
                                Vec::with_capacity(frame_size),
                            ),
                            captured_at: std::time::Instant::now(),
                        };
                        if frame_tx.send(frame).is_err() {
                            // Receiver gone; frames are dropped until the
                            // stream itself is torn down.
                        }
                    }
                }
            },
            move |err| {
                warn!("Capture: stream error: {}", err);
            },
            None,
        )?;

        stream.play()?;
        info!("Capture: started ({} sample frames)", frame_size);
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_config_defaults() {
        let c = FrameConfig::default();
        assert_eq!(c.sample_rate, 16000);
        assert_eq!(c.channels, 1);
        assert_eq!(c.frame_size, 480);
    }

    #[test]
    #[ignore] // Requires audio hardware.
    fn opens_default_device() {
        let result = MicCapture::new(FrameConfig::default());
        assert!(result.is_ok());
    }
}
