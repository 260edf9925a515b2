//! Waveform points and the append-only series built from them.
//!
//! A [`WaveformPoint`] is what a peak aggregator emits once per completed
//! window: a left amplitude and, for stereo sources, a right amplitude.
//! [`WaveformSeries`] collects points for file playback views and can be
//! capped so that it never grows past a caller-chosen length.
//!
//! # Example
//!
//! ```rust
//! use waveform_extract::audio::{WaveformPoint, WaveformSeries};
//!
//! let mut series = WaveformSeries::with_cap(true, 2);
//! assert!(series.push(WaveformPoint::stereo(0.5, 0.25)));
//! assert!(series.push(WaveformPoint::stereo(-0.5, -0.25)));
//! assert!(!series.push(WaveformPoint::stereo(0.1, 0.1))); // cap reached
//! assert_eq!(series.len(), 2);
//! ```

// ---------------------------------------------------------------------------
// WaveformPoint
// ---------------------------------------------------------------------------

/// One emitted amplitude per channel, each within `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformPoint {
    pub left: f32,
    /// `None` for mono sources.
    pub right: Option<f32>,
}

impl WaveformPoint {
    /// Mono point; `left` is clamped to `[-1.0, 1.0]`.
    pub fn mono(left: f32) -> Self {
        Self {
            left: left.clamp(-1.0, 1.0),
            right: None,
        }
    }

    /// Stereo point; both values are clamped to `[-1.0, 1.0]`.
    pub fn stereo(left: f32, right: f32) -> Self {
        Self {
            left: left.clamp(-1.0, 1.0),
            right: Some(right.clamp(-1.0, 1.0)),
        }
    }

    /// Build from per-channel values; only the first two channels are used.
    pub(crate) fn from_channels(values: &[f32]) -> Self {
        match values {
            [left] => Self::mono(*left),
            [left, right, ..] => Self::stereo(*left, *right),
            [] => Self::mono(0.0),
        }
    }

    /// Right amplitude, or the left one for mono points.
    pub fn right_or_left(&self) -> f32 {
        self.right.unwrap_or(self.left)
    }
}

// ---------------------------------------------------------------------------
// WaveformSeries
// ---------------------------------------------------------------------------

/// Upper bound on the slots [`WaveformSeries::with_cap`] reserves eagerly.
pub const PREALLOC_POINTS: usize = 4096;

/// Ordered, append-only sequence of [`WaveformPoint`]s stored per channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformSeries {
    left: Vec<f32>,
    right: Option<Vec<f32>>,
    cap: Option<usize>,
}

impl WaveformSeries {
    /// Unbounded series.  `stereo` decides whether a right channel is kept.
    pub fn new(stereo: bool) -> Self {
        Self {
            left: Vec::new(),
            right: stereo.then(Vec::new),
            cap: None,
        }
    }

    /// Series that refuses points once it holds `cap` entries.
    ///
    /// Storage grows on demand; at most [`PREALLOC_POINTS`] slots are
    /// reserved up front whatever the cap.
    pub fn with_cap(stereo: bool, cap: usize) -> Self {
        let reserve = cap.min(PREALLOC_POINTS);
        Self {
            left: Vec::with_capacity(reserve),
            right: stereo.then(|| Vec::with_capacity(reserve)),
            cap: Some(cap),
        }
    }

    /// Append `point`.  Returns `false` (and drops the point) when the cap
    /// has already been reached.
    ///
    /// A stereo series fed a mono point duplicates the left value into the
    /// right channel; a mono series ignores the right value.
    pub fn push(&mut self, point: WaveformPoint) -> bool {
        if self.is_full() {
            return false;
        }
        self.left.push(point.left);
        if let Some(right) = self.right.as_mut() {
            right.push(point.right_or_left());
        }
        true
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Returns `true` when there are no points.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Returns `true` when the cap is set and reached.
    pub fn is_full(&self) -> bool {
        self.cap.is_some_and(|cap| self.left.len() >= cap)
    }

    pub fn cap(&self) -> Option<usize> {
        self.cap
    }

    pub fn left(&self) -> &[f32] {
        &self.left
    }

    pub fn right(&self) -> Option<&[f32]> {
        self.right.as_deref()
    }

    /// Point at `index`, if present.
    pub fn get(&self, index: usize) -> Option<WaveformPoint> {
        let left = *self.left.get(index)?;
        let right = match &self.right {
            Some(r) => Some(*r.get(index)?),
            None => None,
        };
        Some(WaveformPoint { left, right })
    }

    /// Split into `(left, right)` channel vectors.
    pub fn into_channels(self) -> (Vec<f32>, Option<Vec<f32>>) {
        (self.left, self.right)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
