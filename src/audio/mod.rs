//! Audio core: PCM interpretation → peak aggregation → waveform storage.
//!
//! # Pipeline
//!
//! ```text
//! raw LE bytes + AudioFormat → SampleView → PeakAggregator (policy, trigger)
//!           → sink(WaveformPoint) → WaveformRingBuffer   (live view)
//!                                 → WaveformSeries       (file view)
//! ```
//!
//! Every type here is synchronous and single-threaded except
//! [`SharedWaveformBuffer`], which is the hand-off point between the
//! producing thread and the render thread.
//!
//! # Quick Start
//!
//! ```rust
//! use std::ops::ControlFlow;
//! use waveform_extract::audio::{
//!     processor_for, samples_per_update, AudioFormat, ChannelLayout, PeakPolicy,
//!     SampleEncoding, WaveformRingBuffer, WindowTrigger,
//! };
//!
//! let format = AudioFormat::new(SampleEncoding::Float32, ChannelLayout::Mono);
//! let window = samples_per_update(1_000, 4); // 4 samples per point
//! let mut agg = processor_for(format, window, PeakPolicy::StatefulAlternating, WindowTrigger::Exact);
//!
//! let bytes: Vec<u8> = [0.5f32, 0.1, 0.2, 0.3].iter().flat_map(|s| s.to_le_bytes()).collect();
//! let mut ring = WaveformRingBuffer::new(16);
//! agg.process(&bytes, &mut |p| {
//!     ring.write(p.left);
//!     ControlFlow::Continue(())
//! });
//! assert_eq!(ring.get(0), 0.5);
//! ```

pub mod aggregator;
pub mod buffer;
pub mod format;
pub mod sample_view;
pub mod waveform;

pub use aggregator::{
    processor_for, samples_per_update, AmplitudeProcessor, PeakAggregator, PeakPolicy,
    WindowTrigger,
};
pub use buffer::{SharedWaveformBuffer, WaveformRingBuffer, WaveformSnapshot};
pub use format::{AudioFormat, ChannelLayout, PcmFileParams, SampleEncoding};
pub use sample_view::{normalize_i16, Float32Le, Frame, Int16Le, SampleDecode, SampleView};
pub use waveform::{WaveformPoint, WaveformSeries};
