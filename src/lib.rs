//! Waveform extraction: raw PCM buffers → bounded peak-amplitude series.
//!
//! - [`audio`]: sample interpretation, peak aggregation, waveform storage.
//! - [`decode`]: compressed-file extraction and raw PCM file loading.
//! - [`pipeline`]: live-capture glue and background loading.
//! - [`config`]: TOML-persisted settings.

pub mod audio;
pub mod config;
pub mod decode;
pub mod pipeline;
