//! Typed, zero-copy view over a raw little-endian PCM byte buffer.
//!
//! [`SampleView`] is generic over a [`SampleDecode`] marker ([`Int16Le`] or
//! [`Float32Le`]) and a runtime stride (channels per frame).  Any trailing
//! partial frame is ignored; the view never reads past the end of the
//! slice it was built from.
//!
//! # Example
//!
//! ```rust
//! use waveform_extract::audio::{Int16Le, SampleView};
//!
//! // two stereo frames: (16384, -16384), (32767, -32768)
//! let bytes: Vec<u8> = [16384i16, -16384, 32767, -32768]
//!     .iter()
//!     .flat_map(|s| s.to_le_bytes())
//!     .collect();
//!
//! let view = SampleView::<Int16Le>::new(&bytes, 2);
//! assert_eq!(view.frame_count(), 2);
//! assert_eq!(view.sample(0, 0), 0.5);
//! assert_eq!(view.sample(1, 1), -1.0);
//! ```

use std::marker::PhantomData;

// ---------------------------------------------------------------------------
// SampleDecode
// ---------------------------------------------------------------------------

/// Decodes one little-endian sample into an `f32`.
pub trait SampleDecode {
    /// Width of one encoded sample in bytes.
    const WIDTH: usize;

    /// Decode `raw` (exactly [`Self::WIDTH`] bytes).
    fn decode(raw: &[u8]) -> f32;
}

/// Signed 16-bit samples, normalised by `1 / 32768`.
#[derive(Debug, Clone, Copy)]
pub struct Int16Le;

impl SampleDecode for Int16Le {
    const WIDTH: usize = 2;

    #[inline]
    fn decode(raw: &[u8]) -> f32 {
        normalize_i16(i16::from_le_bytes([raw[0], raw[1]]))
    }
}

/// 32-bit float samples, taken verbatim (no re-clamping).
#[derive(Debug, Clone, Copy)]
pub struct Float32Le;

impl SampleDecode for Float32Le {
    const WIDTH: usize = 4;

    #[inline]
    fn decode(raw: &[u8]) -> f32 {
        f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
    }
}

/// Map a signed 16-bit sample into `[-1.0, 1.0)`.
///
/// `-32768` maps to exactly `-1.0`; `32767` maps to `32767 / 32768`.
#[inline]
pub fn normalize_i16(sample: i16) -> f32 {
    sample as f32 / 32_768.0
}

// ---------------------------------------------------------------------------
// SampleView
// ---------------------------------------------------------------------------

/// Interleaved PCM frames interpreted through the encoding `S`.
#[derive(Debug, Clone, Copy)]
pub struct SampleView<'a, S> {
    data: &'a [u8],
    channels: usize,
    _encoding: PhantomData<S>,
}

impl<'a, S: SampleDecode> SampleView<'a, S> {
    /// Wrap `data`, interpreting it as frames of `channels` samples each.
    ///
    /// # Panics
    ///
    /// Panics if `channels == 0`.
    pub fn new(data: &'a [u8], channels: usize) -> Self {
        assert!(channels > 0, "SampleView needs at least one channel");
        Self {
            data,
            channels,
            _encoding: PhantomData,
        }
    }

    /// Number of channels interleaved in each frame.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Bytes per frame.
    pub fn frame_width(&self) -> usize {
        S::WIDTH * self.channels
    }

    /// Number of complete frames; a trailing partial frame is not counted.
    pub fn frame_count(&self) -> usize {
        self.data.len() / self.frame_width()
    }

    /// Decoded sample at (`frame`, `channel`).
    ///
    /// # Panics
    ///
    /// Panics if `frame >= frame_count()` or `channel >= channels()`.
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        assert!(
            frame < self.frame_count() && channel < self.channels,
            "sample ({frame}, {channel}) out of range"
        );
        let offset = frame * self.frame_width() + channel * S::WIDTH;
        S::decode(&self.data[offset..offset + S::WIDTH])
    }

    /// Iterate over complete frames in order.
    pub fn frames(&self) -> impl Iterator<Item = Frame<'a, S>> {
        self.data
            .chunks_exact(S::WIDTH * self.channels)
            .map(|raw| Frame {
                raw,
                _encoding: PhantomData,
            })
    }
}

/// One interleaved frame borrowed from a [`SampleView`].
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a, S> {
    raw: &'a [u8],
    _encoding: PhantomData<S>,
}

impl<S: SampleDecode> Frame<'_, S> {
    /// Decoded sample for `channel`.
    #[inline]
    pub fn channel(&self, channel: usize) -> f32 {
        let offset = channel * S::WIDTH;
        S::decode(&self.raw[offset..offset + S::WIDTH])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
