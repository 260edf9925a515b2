//! Incremental peak aggregation (windowed downsampling).
//!
//! [`PeakAggregator`] consumes raw PCM buffers one at a time, tracks a
//! windowed extremum per channel and hands one [`WaveformPoint`] to a
//! caller-supplied sink every time a window completes.  Window count,
//! running extrema and polarity are carried across calls, so a stream can be
//! delivered in arbitrarily small chunks (one hardware callback at a time)
//! without changing the output.
//!
//! The aggregator is generic over the sample encoding (`S`) and the number
//! of channels it tracks (`N`, 1 or 2).  [`processor_for`] picks the right
//! monomorphisation for a runtime [`AudioFormat`] and returns it behind the
//! object-safe [`AmplitudeProcessor`] trait.
//!
//! # Policies
//!
//! | Policy | Per-sample update | On window completion |
//! |--------|-------------------|----------------------|
//! | [`Extremum`](PeakPolicy::Extremum) | keep the signed sample with the largest magnitude | clamp |
//! | [`StatefulAlternating`](PeakPolicy::StatefulAlternating) | `max` while positive, `min` while negative | project onto the half-plane, clamp, flip |
//! | [`IndexDerivedAlternating`](PeakPolicy::IndexDerivedAlternating) | as above, polarity = even/odd output index | project onto the half-plane, clamp |
//!
//! # Example
//!
//! ```rust
//! use std::ops::ControlFlow;
//! use waveform_extract::audio::{Int16Le, PeakAggregator, PeakPolicy, WindowTrigger};
//!
//! let mut agg = PeakAggregator::<Int16Le, 1>::new(4, PeakPolicy::StatefulAlternating, WindowTrigger::Exact);
//! let bytes: Vec<u8> = [1000i16, -30000, 500, 32767, -5000, -6000, -7000, -8000]
//!     .iter()
//!     .flat_map(|s| s.to_le_bytes())
//!     .collect();
//!
//! let mut points = Vec::new();
//! agg.process(&bytes, &mut |p| {
//!     points.push(p.left);
//!     ControlFlow::Continue(())
//! });
//! assert_eq!(points.len(), 2);
//! assert!(points[0] > 0.999);
//! assert!((points[1] + 0.2441).abs() < 1e-4);
//! ```

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use super::format::{AudioFormat, ChannelLayout, SampleEncoding};
use super::sample_view::{Float32Le, Int16Le, SampleDecode, SampleView};
use super::waveform::WaveformPoint;

// ---------------------------------------------------------------------------
// Configuration enums
// ---------------------------------------------------------------------------

/// How the running extremum of a window is tracked and emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakPolicy {
    /// Signed sample with the greatest magnitude in the window.
    Extremum,
    /// Alternating half-plane peaks; polarity is a toggle flipped on every
    /// emission and carried across buffers.
    StatefulAlternating,
    /// Alternating half-plane peaks; polarity is positive when the number of
    /// points emitted so far is even.
    IndexDerivedAlternating,
}

/// When a window is considered complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowTrigger {
    /// Emit after exactly `samples_per_window` samples.
    Exact,
    /// Legacy post-increment comparison (`count++ >= samples_per_window`):
    /// emits one sample late, i.e. every `samples_per_window + 1` samples.
    Deferred,
}

impl Default for WindowTrigger {
    fn default() -> Self {
        Self::Exact
    }
}

/// Window size for a display refresh period: `sample_rate × period_ms /
/// 1000`, never less than one sample.
///
/// ```rust
/// use waveform_extract::audio::samples_per_update;
///
/// assert_eq!(samples_per_update(48_000, 10), 480);
/// assert_eq!(samples_per_update(8_000, 0), 1);
/// ```
pub fn samples_per_update(sample_rate: u32, update_period_ms: u32) -> usize {
    let n = u64::from(sample_rate) * u64::from(update_period_ms) / 1000;
    usize::try_from(n).unwrap_or(usize::MAX).max(1)
}

// ---------------------------------------------------------------------------
// AmplitudeProcessor
// ---------------------------------------------------------------------------

/// Object-safe interface over every `PeakAggregator` monomorphisation.
///
/// The sink is called once per completed window; returning
/// `ControlFlow::Break(())` stops processing of the current buffer right
/// after that point (the remaining samples are discarded).
pub trait AmplitudeProcessor: Send {
    /// Feed one raw little-endian buffer.  Trailing partial frames are
    /// ignored.
    fn process(
        &mut self,
        data: &[u8],
        sink: &mut dyn FnMut(WaveformPoint) -> ControlFlow<()>,
    ) -> ControlFlow<()>;

    /// Emit the partially accumulated window as-is (clamped, not projected
    /// onto a polarity half-plane).  `None` when nothing is pending.
    fn flush(&mut self) -> Option<WaveformPoint>;

    /// Drop pending state and restart polarity from positive.
    fn reset(&mut self);

    /// Samples accumulated in the current, incomplete window.
    fn pending(&self) -> usize;

    /// Points emitted since construction or the last reset.
    fn emitted(&self) -> u64;
}

/// Build the aggregator variant matching `format`.
pub fn processor_for(
    format: AudioFormat,
    samples_per_window: usize,
    policy: PeakPolicy,
    trigger: WindowTrigger,
) -> Box<dyn AmplitudeProcessor> {
    match (format.encoding, format.channel_layout) {
        (SampleEncoding::Int16, ChannelLayout::Mono) => Box::new(
            PeakAggregator::<Int16Le, 1>::new(samples_per_window, policy, trigger),
        ),
        (SampleEncoding::Int16, ChannelLayout::Stereo) => Box::new(
            PeakAggregator::<Int16Le, 2>::new(samples_per_window, policy, trigger),
        ),
        (SampleEncoding::Float32, ChannelLayout::Mono) => Box::new(
            PeakAggregator::<Float32Le, 1>::new(samples_per_window, policy, trigger),
        ),
        (SampleEncoding::Float32, ChannelLayout::Stereo) => Box::new(
            PeakAggregator::<Float32Le, 2>::new(samples_per_window, policy, trigger),
        ),
    }
}

// ---------------------------------------------------------------------------
// PeakAggregator
// ---------------------------------------------------------------------------

/// Stateful windowed peak tracker for `N` channels of `S`-encoded samples.
///
/// `N` is the number of tracked channels; the stream may carry more
/// (see [`with_stride`](Self::with_stride)), in which case only the first
/// `N` channels of every frame are read.
#[derive(Debug, Clone)]
pub struct PeakAggregator<S, const N: usize> {
    samples_per_window: usize,
    policy: PeakPolicy,
    trigger: WindowTrigger,
    /// Channels interleaved in each input frame (`>= N`).
    stride: usize,
    accumulated: usize,
    running: [f32; N],
    polarity_positive: bool,
    emitted: u64,
    _encoding: std::marker::PhantomData<S>,
}

impl<S: SampleDecode, const N: usize> PeakAggregator<S, N> {
    /// Aggregator whose input frames carry exactly `N` channels.
    ///
    /// `samples_per_window` is raised to 1 if zero.
    pub fn new(samples_per_window: usize, policy: PeakPolicy, trigger: WindowTrigger) -> Self {
        Self::with_stride(samples_per_window, N, policy, trigger)
    }

    /// Aggregator reading the first `N` channels of `stride`-channel frames.
    ///
    /// # Panics
    ///
    /// Panics if `N == 0` or `stride < N`.
    pub fn with_stride(
        samples_per_window: usize,
        stride: usize,
        policy: PeakPolicy,
        trigger: WindowTrigger,
    ) -> Self {
        assert!(N > 0, "PeakAggregator must track at least one channel");
        assert!(stride >= N, "stride {stride} is smaller than tracked channels {N}");
        Self {
            samples_per_window: samples_per_window.max(1),
            policy,
            trigger,
            stride,
            accumulated: 0,
            running: [0.0; N],
            polarity_positive: true,
            emitted: 0,
            _encoding: std::marker::PhantomData,
        }
    }

    pub fn samples_per_window(&self) -> usize {
        self.samples_per_window
    }

    pub fn policy(&self) -> PeakPolicy {
        self.policy
    }

    /// Half-plane the current window is constrained to.
    pub fn polarity_is_positive(&self) -> bool {
        match self.policy {
            PeakPolicy::IndexDerivedAlternating => self.emitted % 2 == 0,
            _ => self.polarity_positive,
        }
    }

    /// Feed one buffer; see [`AmplitudeProcessor::process`].
    pub fn process<F>(&mut self, data: &[u8], sink: &mut F) -> ControlFlow<()>
    where
        F: FnMut(WaveformPoint) -> ControlFlow<()> + ?Sized,
    {
        let view = SampleView::<S>::new(data, self.stride);
        let mut positive = self.polarity_is_positive();

        for frame in view.frames() {
            for (c, running) in self.running.iter_mut().enumerate() {
                let s = frame.channel(c);
                *running = match self.policy {
                    PeakPolicy::Extremum => {
                        if s.abs() > running.abs() {
                            s
                        } else {
                            *running
                        }
                    }
                    _ if positive => s.max(*running),
                    _ => s.min(*running),
                };
            }

            if self.advance() {
                let point = self.complete_window();
                positive = self.polarity_is_positive();
                if sink(point).is_break() {
                    return ControlFlow::Break(());
                }
            }
        }

        ControlFlow::Continue(())
    }

    /// Count one frame; returns `true` when the window just completed.
    fn advance(&mut self) -> bool {
        match self.trigger {
            WindowTrigger::Exact => {
                self.accumulated += 1;
                self.accumulated >= self.samples_per_window
            }
            WindowTrigger::Deferred => {
                let reached = self.accumulated >= self.samples_per_window;
                self.accumulated += 1;
                reached
            }
        }
    }

    fn complete_window(&mut self) -> WaveformPoint {
        let positive = self.polarity_is_positive();
        let mut values = [0.0_f32; N];
        for (out, running) in values.iter_mut().zip(self.running.iter()) {
            *out = match self.policy {
                PeakPolicy::Extremum => *running,
                _ if positive => running.max(0.0),
                _ => running.min(0.0),
            };
        }

        self.start_next_window();
        if self.policy == PeakPolicy::StatefulAlternating {
            self.polarity_positive = !self.polarity_positive;
        }
        WaveformPoint::from_channels(&values)
    }

    fn start_next_window(&mut self) {
        self.accumulated = 0;
        self.running = [0.0; N];
        self.emitted += 1;
    }
}

impl<S: SampleDecode + Send, const N: usize> AmplitudeProcessor for PeakAggregator<S, N> {
    fn process(
        &mut self,
        data: &[u8],
        sink: &mut dyn FnMut(WaveformPoint) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        PeakAggregator::<S, N>::process(self, data, sink)
    }

    fn flush(&mut self) -> Option<WaveformPoint> {
        if self.accumulated == 0 {
            return None;
        }
        let point = WaveformPoint::from_channels(&self.running);
        self.start_next_window();
        if self.policy == PeakPolicy::StatefulAlternating {
            self.polarity_positive = !self.polarity_positive;
        }
        Some(point)
    }

    fn reset(&mut self) {
        self.accumulated = 0;
        self.running = [0.0; N];
        self.polarity_positive = true;
        self.emitted = 0;
    }

    fn pending(&self) -> usize {
        self.accumulated
    }

    fn emitted(&self) -> u64 {
        self.emitted
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
