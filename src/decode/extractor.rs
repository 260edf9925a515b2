//! Bounded-length waveform extraction from compressed audio files.
//!
//! [`CompressedAudioExtractor`] runs the demux → decode → drain loop, feeds
//! every decoded 16-bit PCM buffer through a [`PeakAggregator`] using
//! [`PeakPolicy::IndexDerivedAlternating`] and collects at most
//! `max_points` points.
//!
//! # Window size
//!
//! ```text
//! total_samples     = duration_us × sample_rate / 1 000 000
//! samples_per_point = max(1, total_samples / max_points)
//! ```
//!
//! An unknown duration gives `samples_per_point = 1`; the cap still holds,
//! the waveform then only covers the start of the file.
//!
//! # Failure model
//!
//! [`extract`](CompressedAudioExtractor::extract) never fails loudly: any
//! error (no audio track, I/O, codec) is logged and turned into `None`, and
//! points gathered before the error are discarded.  The demuxer and decoder
//! are released on every exit path.

use std::path::Path;
use std::time::Duration;

use crate::audio::{
    AmplitudeProcessor, Int16Le, PeakAggregator, PeakPolicy, WaveformSeries, WindowTrigger,
};
use crate::config::WaveformConfig;

use super::backend::SymphoniaDemuxer;
use super::{
    CancelToken, DecodeError, Demuxer, FrameDecoder, InputUnit, OutputEvent, ReleaseGuard,
    TrackFormat,
};

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

/// Tunables for one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Upper bound on emitted points; `0` is treated as `1`.
    pub max_points: usize,
    /// Bound on every `dequeue_input` / `dequeue_output` call.
    pub dequeue_timeout: Duration,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_points: 1000,
            dequeue_timeout: Duration::from_millis(10),
        }
    }
}

impl From<&WaveformConfig> for ExtractOptions {
    fn from(config: &WaveformConfig) -> Self {
        Self {
            max_points: config.max_points,
            dequeue_timeout: Duration::from_millis(config.dequeue_timeout_ms),
        }
    }
}

/// Stream properties reported alongside the extracted points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channel_count: usize,
    /// Frames per channel derived from the declared duration (`0` if unknown).
    pub total_samples: u64,
    pub duration_ms: u64,
}

/// Per-channel waveform of a decoded file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedWaveform {
    pub left: Vec<f32>,
    /// `None` for mono files.
    pub right: Option<Vec<f32>>,
    pub info: AudioInfo,
}

impl ExtractedWaveform {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CompressedAudioExtractor
// ---------------------------------------------------------------------------

/// Drives a [`Demuxer`] / [`FrameDecoder`] pair to a capped waveform.
///
/// ```rust,no_run
/// use waveform_extract::decode::{CompressedAudioExtractor, ExtractOptions};
///
/// let extractor = CompressedAudioExtractor::new(ExtractOptions::default());
/// if let Some(waveform) = extractor.extract_file("song.mp3") {
///     println!("{} points @ {} Hz", waveform.len(), waveform.info.sample_rate);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CompressedAudioExtractor {
    options: ExtractOptions,
    cancel: CancelToken,
}

impl CompressedAudioExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self::with_cancel_token(options, CancelToken::new())
    }

    /// Extractor that stops as soon as `cancel` is triggered.
    pub fn with_cancel_token(options: ExtractOptions, cancel: CancelToken) -> Self {
        Self { options, cancel }
    }

    pub fn options(&self) -> ExtractOptions {
        self.options
    }

    /// Handle that stops an extraction running on another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Open `path` with the symphonia backend and extract its waveform.
    pub fn extract_file(&self, path: impl AsRef<Path>) -> Option<ExtractedWaveform> {
        let path = path.as_ref();
        match SymphoniaDemuxer::open(path) {
            Ok(demuxer) => self.extract(demuxer),
            Err(e) => {
                log::warn!("cannot open {}: {e}", path.display());
                None
            }
        }
    }

    /// Extract the waveform of the first audio track, or `None` on failure
    /// or cancellation.
    pub fn extract<D: Demuxer>(&self, demuxer: D) -> Option<ExtractedWaveform> {
        match self.try_extract(demuxer) {
            Ok(waveform) => Some(waveform),
            Err(DecodeError::Cancelled) => {
                log::debug!("waveform extraction cancelled");
                None
            }
            Err(e) => {
                log::warn!("waveform extraction failed: {e}");
                None
            }
        }
    }

    /// Like [`extract`](Self::extract) but keeps the error.
    pub fn try_extract<D: Demuxer>(&self, demuxer: D) -> Result<ExtractedWaveform, DecodeError> {
        let mut demuxer = ReleaseGuard::new(demuxer);

        let (track, format) = find_audio_track(&*demuxer)?;
        demuxer.select_track(track)?;

        let max_points = self.options.max_points.max(1);
        let total_samples = format.duration_us.map_or(0, |us| {
            u64::try_from(u128::from(us) * u128::from(format.sample_rate) / 1_000_000)
                .unwrap_or(u64::MAX)
        });
        let samples_per_point =
            usize::try_from(total_samples / max_points as u64).unwrap_or(usize::MAX).max(1);
        let info = AudioInfo {
            sample_rate: format.sample_rate,
            channel_count: format.channel_count,
            total_samples,
            duration_ms: format.duration_us.unwrap_or(0) / 1000,
        };
        log::debug!(
            "track {track} ({}): {} Hz, {} ch, {total_samples} samples → {samples_per_point} per point",
            format.mime,
            format.sample_rate,
            format.channel_count
        );

        let mut channels = format.channel_count.max(1);
        let mut processor = int16_processor(channels, samples_per_point);
        let mut series = WaveformSeries::with_cap(channels > 1, max_points);

        let mut decoder = ReleaseGuard::new(demuxer.open_decoder(track)?);
        let timeout = self.options.dequeue_timeout;
        let mut input_eos = false;

        loop {
            if self.cancel.is_cancelled() {
                return Err(DecodeError::Cancelled);
            }

            if !input_eos {
                if let Some(index) = decoder.dequeue_input(timeout)? {
                    let buf = decoder.input_buffer(index)?;
                    match demuxer.read_sample(buf)? {
                        Some(unit) => decoder.queue_input(index, InputUnit::Data(unit))?,
                        None => {
                            decoder.queue_input(index, InputUnit::EndOfStream)?;
                            input_eos = true;
                        }
                    }
                }
            }

            match decoder.dequeue_output(timeout)? {
                OutputEvent::TryAgain => continue,
                OutputEvent::FormatChanged(output) => {
                    let fresh = series.is_empty() && processor.pending() == 0;
                    if output.channel_count > 0 && output.channel_count != channels && fresh {
                        log::debug!("decoder output has {} channels", output.channel_count);
                        channels = output.channel_count;
                        processor = int16_processor(channels, samples_per_point);
                        series = WaveformSeries::with_cap(channels > 1, max_points);
                    } else if output.channel_count != channels {
                        log::warn!(
                            "ignoring mid-stream change to {} channels",
                            output.channel_count
                        );
                    }
                }
                OutputEvent::Buffer {
                    index,
                    size,
                    end_of_stream,
                } => {
                    if size > 0 {
                        let data = decoder.output_buffer(index)?;
                        let data = &data[..size.min(data.len())];
                        let _ = processor.process(data, &mut |point| {
                            if series.push(point) && !series.is_full() {
                                std::ops::ControlFlow::Continue(())
                            } else {
                                std::ops::ControlFlow::Break(())
                            }
                        });
                    }
                    decoder.release_output(index)?;
                    if end_of_stream || series.is_full() {
                        break;
                    }
                }
            }
        }

        if !series.is_full() {
            if let Some(point) = processor.flush() {
                series.push(point);
            }
        }
        log::debug!("extracted {} waveform points", series.len());

        let (left, right) = series.into_channels();
        Ok(ExtractedWaveform { left, right, info })
    }
}

fn find_audio_track<D: Demuxer>(demuxer: &D) -> Result<(usize, TrackFormat), DecodeError> {
    for index in 0..demuxer.track_count() {
        let format = demuxer.track_format(index)?;
        if format.is_audio() {
            return Ok((index, format));
        }
    }
    Err(DecodeError::NoAudioTrack)
}

/// Aggregator for interleaved 16-bit decoder output; streams with more than
/// two channels contribute their first two.
fn int16_processor(channels: usize, samples_per_point: usize) -> Box<dyn AmplitudeProcessor> {
    const POLICY: PeakPolicy = PeakPolicy::IndexDerivedAlternating;
    const TRIGGER: WindowTrigger = WindowTrigger::Exact;
    match channels {
        0 | 1 => Box::new(PeakAggregator::<Int16Le, 1>::new(samples_per_point, POLICY, TRIGGER)),
        _ => Box::new(PeakAggregator::<Int16Le, 2>::with_stride(
            samples_per_point,
            channels,
            POLICY,
            TRIGGER,
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
