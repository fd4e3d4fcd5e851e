//! Voice activity detection over WebRTC VAD.

use crate::error::{VoiceError, VoiceResult};
use webrtc_vad::{SampleRate, Vad, VadMode};

/// VAD configuration.
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// Must be 8000, 16000, 32000, or 48000 Hz.
    pub sample_rate: u32,
    /// Aggressiveness 0-3 (3 flags the least audio as speech).
    pub mode: u8,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            mode: 2,
        }
    }
}

fn vad_mode(mode: u8) -> VoiceResult<VadMode> {
    Ok(match mode {
        0 => VadMode::Quality,
        1 => VadMode::LowBitrate,
        2 => VadMode::Aggressive,
        3 => VadMode::VeryAggressive,
        other => {
            return Err(VoiceError::Config(format!(
                "VAD mode must be 0-3, got {}",
                other
            )))
        }
    })
}

fn vad_rate(sample_rate: u32) -> VoiceResult<SampleRate> {
    Ok(match sample_rate {
        8000 => SampleRate::Rate8kHz,
        16000 => SampleRate::Rate16kHz,
        32000 => SampleRate::Rate32kHz,
        48000 => SampleRate::Rate48kHz,
        other => {
            return Err(VoiceError::Config(format!(
                "WebRTC VAD supports 8/16/32/48 kHz, got {} Hz",
                other
            )))
        }
    })
}

/// Per-frame speech detector. Frames must be exactly 30ms of audio at the
/// configured rate. Not `Send`; run it on a dedicated thread.
pub struct SpeechDetector {
    vad: Vad,
    frame_size: usize,
}

impl SpeechDetector {
    pub fn new(config: VadConfig) -> VoiceResult<Self> {
        let mode = vad_mode(config.mode)?;
        let rate = vad_rate(config.sample_rate)?;
        let mut vad = Vad::new();
        vad.set_mode(mode);
        vad.set_sample_rate(rate);
        // 30ms windows, the largest frame WebRTC VAD accepts.
        let frame_size = (config.sample_rate as usize * 30) / 1000;
        Ok(Self { vad, frame_size })
    }

    /// Whether the frame contains speech.
    pub fn is_speech(&mut self, samples: &[f32]) -> VoiceResult<bool> {
        if samples.len() != self.frame_size {
            return Err(VoiceError::Config(format!(
                "expected {} samples per frame, got {}",
                self.frame_size,
                samples.len()
            )));
        }
        let pcm: Vec<i16> = samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
            .collect();
        self.vad
            .is_voice_segment(&pcm)
            .map_err(|e| VoiceError::Config(format!("VAD processing failed: {:?}", e)))
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_size_follows_sample_rate() {
        let d = SpeechDetector::new(VadConfig::default()).unwrap();
        assert_eq!(d.frame_size(), 480);
        let d = SpeechDetector::new(VadConfig {
            sample_rate: 8000,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(d.frame_size(), 240);
    }

    #[test]
    fn rejects_unsupported_rate_and_mode() {
        assert!(SpeechDetector::new(VadConfig {
            sample_rate: 44100,
            mode: 2
        })
        .is_err());
        assert!(SpeechDetector::new(VadConfig {
            sample_rate: 16000,
            mode: 4
        })
        .is_err());
    }

    #[test]
    fn silence_is_not_speech() {
        let mut d = SpeechDetector::new(VadConfig::default()).unwrap();
        let silence = vec![0.0f32; 480];
        assert!(!d.is_speech(&silence).unwrap());
    }

    #[test]
    fn wrong_frame_size_errors() {
        let mut d = SpeechDetector::new(VadConfig::default()).unwrap();
        assert!(d.is_speech(&[0.0; 100]).is_err());
    }
}
