//! Engine and Stream Configuration

use serde::{Deserialize, Serialize};

use crate::snapshot::MAX_SECTIONS;

/// Most channels a stream may carry
pub const MAX_CHANNELS: usize = 8;

/// Highest supported sample rate in Hz
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Largest block a single render callback may deliver
pub const MAX_BLOCK_FRAMES: usize = 8192;

/// Negotiated stream format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamFormat {
    /// Sample rate in Hz (e.g., 44100, 48000, 96000)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Largest block the host will hand to one render call
    pub max_frames: usize,
}

impl Default for StreamFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            max_frames: 512,
        }
    }
}

impl StreamFormat {
    pub fn sample_rate_hz(&self) -> f64 {
        f64::from(self.sample_rate)
    }

    /// Latency of one full block in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.max_frames as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Validate format
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 || self.sample_rate > MAX_SAMPLE_RATE {
            return Err(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.channels == 0 || self.channels as usize > MAX_CHANNELS {
            return Err(format!("Invalid channel count: {}", self.channels));
        }
        if self.max_frames == 0 || self.max_frames > MAX_BLOCK_FRAMES {
            return Err(format!("Invalid block size: {}", self.max_frames));
        }
        Ok(())
    }
}

/// Overall engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Format the host intends to configure the scheduler with
    pub format: StreamFormat,

    /// Biquad sections in the cascade
    pub section_count: usize,

    /// Share of the block duration inference may take before the
    /// arithmetic crusher is used instead
    pub inference_budget: f64,

    /// Consecutive inference deadline misses before a degradation event
    pub miss_warning_threshold: u32,

    /// Capacity of the render → control event ring
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            format: StreamFormat::default(),
            section_count: 1,
            inference_budget: 0.5,
            miss_warning_threshold: 8,
            event_capacity: 64,
        }
    }
}

impl EngineConfig {
    /// Create config optimized for low latency
    pub fn low_latency() -> Self {
        Self {
            format: StreamFormat {
                sample_rate: 48000,
                channels: 2,
                max_frames: 128, // ~2.7ms latency
            },
            inference_budget: 0.3,
            ..Self::default()
        }
    }

    /// Create config optimized for stability
    pub fn stable() -> Self {
        Self {
            format: StreamFormat {
                sample_rate: 48000,
                channels: 2,
                max_frames: 1024, // ~21ms latency
            },
            inference_budget: 0.7,
            miss_warning_threshold: 4,
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.format.validate()?;
        if self.section_count == 0 || self.section_count > MAX_SECTIONS {
            return Err(format!("Invalid section count: {}", self.section_count));
        }
        if !(self.inference_budget > 0.0 && self.inference_budget <= 1.0) {
            return Err(format!("Invalid inference budget: {}", self.inference_budget));
        }
        if self.miss_warning_threshold == 0 {
            return Err("Miss warning threshold must be at least 1".into());
        }
        if self.event_capacity == 0 {
            return Err("Event capacity must be at least 1".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.format.sample_rate, 48000);
        assert_eq!(config.format.channels, 2);
        assert_eq!(config.format.max_frames, 512);
        assert_eq!(config.section_count, 1);
        assert_eq!(config.miss_warning_threshold, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_latency_calculation() {
        let format = StreamFormat {
            sample_rate: 48000,
            channels: 2,
            max_frames: 480, // Exactly 10ms at 48kHz
        };
        assert!((format.latency_ms() - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_format_validation() {
        assert!(StreamFormat::default().validate().is_ok());

        let limits = StreamFormat {
            sample_rate: MAX_SAMPLE_RATE,
            channels: MAX_CHANNELS as u16,
            max_frames: MAX_BLOCK_FRAMES,
        };
        assert!(limits.validate().is_ok());

        let invalid_rate = StreamFormat {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(invalid_rate.validate().is_err());

        let too_fast = StreamFormat {
            sample_rate: MAX_SAMPLE_RATE + 1,
            ..Default::default()
        };
        assert!(too_fast.validate().is_err());

        let invalid_channels = StreamFormat {
            channels: 9,
            ..Default::default()
        };
        assert!(invalid_channels.validate().is_err());

        let invalid_block = StreamFormat {
            max_frames: MAX_BLOCK_FRAMES + 1,
            ..Default::default()
        };
        assert!(invalid_block.validate().is_err());
    }

    #[test]
    fn test_config_validation() {
        let too_many_sections = EngineConfig {
            section_count: MAX_SECTIONS + 1,
            ..Default::default()
        };
        assert!(too_many_sections.validate().is_err());

        let no_budget = EngineConfig {
            inference_budget: 0.0,
            ..Default::default()
        };
        assert!(no_budget.validate().is_err());

        let nan_budget = EngineConfig {
            inference_budget: f64::NAN,
            ..Default::default()
        };
        assert!(nan_budget.validate().is_err());
    }

    #[test]
    fn test_preset_configs() {
        let low_latency = EngineConfig::low_latency();
        let stable = EngineConfig::stable();

        assert!(low_latency.format.max_frames < stable.format.max_frames);
        assert!(low_latency.format.latency_ms() < stable.format.latency_ms());
        assert!(low_latency.validate().is_ok());
        assert!(stable.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::stable();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);

        // Missing fields fall back to defaults
        let partial: EngineConfig =
            serde_json::from_str(r#"{"format": {"channels": 1}, "section_count": 4}"#).unwrap();
        assert_eq!(partial.format.channels, 1);
        assert_eq!(partial.format.sample_rate, 48000);
        assert_eq!(partial.section_count, 4);
    }
}
