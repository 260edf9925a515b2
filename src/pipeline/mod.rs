//! Waveform pipelines wiring the audio core to its two producers.
//!
//! # Architecture
//!
//! ```text
//! capture callback (capture thread)
//!        │  raw bytes + size
//!        ▼
//! LiveWaveform::on_audio_data ──▶ SharedWaveformBuffer ×2 ──▶ render thread
//!                                  (left, right)              (snapshot)
//!
//! file path (async caller)
//!        │
//!        ▼
//! WaveformLoader::load_path ──▶ spawn_blocking(extract) ──▶ ExtractedWaveform
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use waveform_extract::config::AppConfig;
//! use waveform_extract::pipeline::LiveWaveform;
//!
//! let mut live = LiveWaveform::from_config(&AppConfig::default());
//! let view = live.left(); // hand to the render thread
//!
//! live.start_session();
//! let silence = vec![0u8; 960 * 2]; // 20 ms of 16-bit mono @ 48 kHz
//! assert_eq!(live.on_audio_data(&silence, silence.len()), 2);
//! assert_eq!(view.snapshot().len(), 2);
//! ```

pub mod live;
pub mod loader;

pub use live::LiveWaveform;
pub use loader::WaveformLoader;
