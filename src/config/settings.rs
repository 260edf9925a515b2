//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to components
//! at construction time.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::audio::{AudioFormat, ChannelLayout, SampleEncoding, WindowTrigger};

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Format of the live capture stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    pub encoding: SampleEncoding,
    pub channel_layout: ChannelLayout,
}

impl CaptureConfig {
    pub fn format(&self) -> AudioFormat {
        AudioFormat::new(self.encoding, self.channel_layout)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            encoding: SampleEncoding::Int16,
            channel_layout: ChannelLayout::Mono,
        }
    }
}

// ---------------------------------------------------------------------------
// WaveformConfig
// ---------------------------------------------------------------------------

/// Waveform display and extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    /// Live view refresh period; one point is emitted per period.
    pub update_period_ms: u32,
    /// `Exact` emits every `sample_rate × period` samples; `Deferred`
    /// reproduces the legacy one-sample-late trigger.
    pub window_trigger: WindowTrigger,
    /// Points held by each live ring buffer (≈ view width in pixels).
    pub ring_capacity: usize,
    /// Upper bound on points extracted from a file.
    pub max_points: usize,
    /// Bound on every decoder dequeue call.
    pub dequeue_timeout_ms: u64,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            update_period_ms: 10,
            window_trigger: WindowTrigger::Exact,
            ring_capacity: 150,
            max_points: 1000,
            dequeue_timeout_ms: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Top-level settings persisted to `settings.toml`.
///
/// ```rust,no_run
/// use waveform_extract::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// println!("{} points max", config.waveform.max_points);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub waveform: WaveformConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// A default `AppConfig` survives a TOML round trip unchanged.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        // CaptureConfig
        assert_eq!(original.capture.sample_rate, loaded.capture.sample_rate);
        assert_eq!(original.capture.encoding, loaded.capture.encoding);
        assert_eq!(original.capture.channel_layout, loaded.capture.channel_layout);

        // WaveformConfig
        assert_eq!(original.waveform.update_period_ms, loaded.waveform.update_period_ms);
        assert_eq!(original.waveform.window_trigger, loaded.waveform.window_trigger);
        assert_eq!(original.waveform.ring_capacity, loaded.waveform.ring_capacity);
        assert_eq!(original.waveform.max_points, loaded.waveform.max_points);
        assert_eq!(
            original.waveform.dequeue_timeout_ms,
            loaded.waveform.dequeue_timeout_ms
        );
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.capture.sample_rate, 48_000);
        assert_eq!(config.waveform.max_points, 1000);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.capture.sample_rate, 48_000);
        assert_eq!(cfg.capture.encoding, SampleEncoding::Int16);
        assert_eq!(cfg.capture.channel_layout, ChannelLayout::Mono);
        assert_eq!(cfg.waveform.update_period_ms, 10);
        assert_eq!(cfg.waveform.window_trigger, WindowTrigger::Exact);
        assert_eq!(cfg.waveform.ring_capacity, 150);
        assert_eq!(cfg.waveform.max_points, 1000);
        assert_eq!(cfg.waveform.dequeue_timeout_ms, 10);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.capture.sample_rate = 44_100;
        cfg.capture.encoding = SampleEncoding::Float32;
        cfg.capture.channel_layout = ChannelLayout::Stereo;
        cfg.waveform.window_trigger = WindowTrigger::Deferred;
        cfg.waveform.ring_capacity = 320;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(
            loaded.capture.format(),
            AudioFormat::new(SampleEncoding::Float32, ChannelLayout::Stereo)
        );
        assert_eq!(loaded.capture.sample_rate, 44_100);
        assert_eq!(loaded.waveform.window_trigger, WindowTrigger::Deferred);
        assert_eq!(loaded.waveform.ring_capacity, 320);
    }

    /// Sections and fields left out of a hand-edited file keep their defaults.
    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[waveform]\nmax_points = 500\n").expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.waveform.max_points, 500);
        assert_eq!(cfg.waveform.ring_capacity, 150);
        assert_eq!(cfg.capture.sample_rate, 48_000);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[waveform\nmax_points = ").expect("write");
        assert!(AppConfig::load_from(&path).is_err());
    }
}
