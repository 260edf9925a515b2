//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), its capture and waveform
//! sections, `AppPaths` for the platform config directory, and TOML
//! persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, CaptureConfig, WaveformConfig};
