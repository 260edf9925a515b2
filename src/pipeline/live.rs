//! Live-capture glue: capture callback → aggregator → per-channel rings.
//!
//! [`LiveWaveform`] lives on the capture thread.  Each hardware callback
//! hands it one raw buffer; completed windows are written into two
//! [`SharedWaveformBuffer`]s (left and right) that the render thread reads
//! through snapshots.  Mono streams write the same value to both rings.

use crate::audio::{
    processor_for, samples_per_update, AmplitudeProcessor, AudioFormat, PeakPolicy,
    SharedWaveformBuffer,
};
use crate::config::{AppConfig, WaveformConfig};

/// Per-recording waveform state for the live view.
pub struct LiveWaveform {
    format: AudioFormat,
    sample_rate: u32,
    config: WaveformConfig,
    processor: Box<dyn AmplitudeProcessor>,
    left: SharedWaveformBuffer,
    right: SharedWaveformBuffer,
    // reused across callbacks so the capture path does not allocate
    scratch_left: Vec<f32>,
    scratch_right: Vec<f32>,
}

impl LiveWaveform {
    /// A `ring_capacity` of zero is raised to one point.
    pub fn new(format: AudioFormat, sample_rate: u32, config: &WaveformConfig) -> Self {
        let mut config = config.clone();
        if config.ring_capacity == 0 {
            log::warn!("waveform ring_capacity is 0; using 1");
            config.ring_capacity = 1;
        }
        let processor = Self::build_processor(format, sample_rate, &config);
        Self {
            format,
            sample_rate,
            left: SharedWaveformBuffer::new(config.ring_capacity),
            right: SharedWaveformBuffer::new(config.ring_capacity),
            config,
            processor,
            scratch_left: Vec::new(),
            scratch_right: Vec::new(),
        }
    }

    /// Live view for the configured capture format.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.capture.format(), config.capture.sample_rate, &config.waveform)
    }

    fn build_processor(
        format: AudioFormat,
        sample_rate: u32,
        config: &WaveformConfig,
    ) -> Box<dyn AmplitudeProcessor> {
        let window = samples_per_update(sample_rate, config.update_period_ms);
        log::debug!("live waveform: {format:?} @ {sample_rate} Hz, {window} samples per point");
        processor_for(
            format,
            window,
            PeakPolicy::StatefulAlternating,
            config.window_trigger,
        )
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Handle the render thread reads the left channel from.
    pub fn left(&self) -> SharedWaveformBuffer {
        self.left.clone()
    }

    /// Right channel (mirrors the left one for mono capture).
    pub fn right(&self) -> SharedWaveformBuffer {
        self.right.clone()
    }

    /// Process the first `size` bytes of one capture buffer.  Returns the
    /// number of points written.
    pub fn on_audio_data(&mut self, buffer: &[u8], size: usize) -> usize {
        let data = &buffer[..size.min(buffer.len())];
        self.scratch_left.clear();
        self.scratch_right.clear();

        let (left, right) = (&mut self.scratch_left, &mut self.scratch_right);
        let _ = self.processor.process(data, &mut |point| {
            left.push(point.left);
            right.push(point.right_or_left());
            std::ops::ControlFlow::Continue(())
        });

        if !self.scratch_left.is_empty() {
            self.left.write_all(&self.scratch_left);
            self.right.write_all(&self.scratch_right);
        }
        self.scratch_left.len()
    }

    /// Start a new recording: drop the pending window and clear both rings.
    pub fn start_session(&mut self) {
        self.processor.reset();
        self.left.clear();
        self.right.clear();
    }

    /// Follow a layout change of the view.  Zero is ignored.
    pub fn resize(&self, points: usize) {
        if points == 0 {
            log::debug!("ignoring resize to zero points");
            return;
        }
        self.left.resize(points);
        self.right.resize(points);
    }

    /// Switch to a new capture format; the rings keep their history.
    pub fn reconfigure(&mut self, format: AudioFormat, sample_rate: u32) {
        if format == self.format && sample_rate == self.sample_rate {
            return;
        }
        self.format = format;
        self.sample_rate = sample_rate;
        self.processor = Self::build_processor(format, sample_rate, &self.config);
    }
}
