//! Compressed-file decoding: demux → decode → drain → peak aggregation.
//!
//! # Overview
//!
//! The extraction loop talks to a container/codec engine through two
//! request/drain traits:
//!
//! - [`Demuxer`] enumerates tracks and hands out compressed access units.
//! - [`FrameDecoder`] accepts access units into indexed input slots and
//!   returns decoded 16-bit PCM from indexed output slots, every dequeue
//!   bounded by a timeout.
//!
//! [`SymphoniaDemuxer`] / [`SymphoniaDecoder`] are the production backend.
//! [`CompressedAudioExtractor`] drives either through the loop and reduces
//! the result to at most `max_points` waveform points.
//! [`load_pcm_waveform`] covers raw `.pcm` recordings, which need no decoder.
//!
//! Both handles implement [`Release`]; wrap them in a [`ReleaseGuard`] so the
//! native resources are freed on every exit path.

pub mod backend;
pub mod extractor;
pub mod pcm;

#[cfg(test)]
pub(crate) mod mock;

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

pub use backend::{SymphoniaDecoder, SymphoniaDemuxer};
pub use extractor::{AudioInfo, CompressedAudioExtractor, ExtractOptions, ExtractedWaveform};
pub use pcm::{load_pcm_file, load_pcm_waveform};

// ---------------------------------------------------------------------------
// DecodeError
// ---------------------------------------------------------------------------

/// Everything that can abort a decode session.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No track declares an `audio/*` MIME type.
    #[error("No audio track found")]
    NoAudioTrack,

    #[error("Track index {0} out of range")]
    InvalidTrack(usize),

    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// Container-level failure (probe, packet read, seek).
    #[error("Demux error: {0}")]
    Demux(String),

    /// Codec-level failure that cannot be skipped.
    #[error("Decoder error: {0}")]
    Decoder(String),

    /// A buffer index that the decoder never handed out, or already took back.
    #[error("Invalid buffer index {0}")]
    InvalidBuffer(usize),

    #[error("Extraction cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Stream descriptors
// ---------------------------------------------------------------------------

/// Format of one container track, or of the decoder's PCM output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFormat {
    /// e.g. `audio/mp3`, `audio/vorbis`, `video/h264`.
    pub mime: String,
    pub sample_rate: u32,
    pub channel_count: usize,
    /// `None` when the container does not declare a length.
    pub duration_us: Option<u64>,
}

impl TrackFormat {
    pub fn is_audio(&self) -> bool {
        self.mime.starts_with("audio/")
    }
}

/// Metadata of one compressed access unit copied into an input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessUnit {
    /// Bytes written into the input buffer.
    pub size: usize,
    /// Presentation timestamp in track time-base units.
    pub timestamp: u64,
    pub duration: u64,
}

/// What gets queued into a decoder input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputUnit {
    Data(AccessUnit),
    /// No more input will follow.
    EndOfStream,
}

/// Result of one [`FrameDecoder::dequeue_output`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    /// Output slot `index` holds `size` bytes of interleaved 16-bit LE PCM.
    /// It must be handed back with [`FrameDecoder::release_output`].
    Buffer {
        index: usize,
        size: usize,
        end_of_stream: bool,
    },
    /// The PCM layout changed; applies to every following buffer.
    FormatChanged(TrackFormat),
    /// Nothing ready within the timeout; call again.
    TryAgain,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Explicit release of a native handle.  Must be idempotent.
pub trait Release {
    fn release(&mut self);
}

/// Container reader.
pub trait Demuxer: Release {
    type Decoder: FrameDecoder;

    fn track_count(&self) -> usize;

    fn track_format(&self, index: usize) -> Result<TrackFormat, DecodeError>;

    /// Restrict [`read_sample`](Self::read_sample) to track `index`.
    fn select_track(&mut self, index: usize) -> Result<(), DecodeError>;

    /// Replace the contents of `buf` with the next access unit of the
    /// selected track.  `Ok(None)` at end of stream.
    fn read_sample(&mut self, buf: &mut Vec<u8>) -> Result<Option<AccessUnit>, DecodeError>;

    /// Create a decoder configured for track `index`.
    fn open_decoder(&self, index: usize) -> Result<Self::Decoder, DecodeError>;
}

/// Request/drain codec interface with indexed buffers.
pub trait FrameDecoder: Release {
    /// Index of a free input slot, or `None` if none frees up within
    /// `timeout`.
    fn dequeue_input(&mut self, timeout: Duration) -> Result<Option<usize>, DecodeError>;

    /// Writable storage behind a dequeued input slot.
    fn input_buffer(&mut self, index: usize) -> Result<&mut Vec<u8>, DecodeError>;

    /// Submit a filled input slot (or the end-of-stream marker).
    fn queue_input(&mut self, index: usize, unit: InputUnit) -> Result<(), DecodeError>;

    fn dequeue_output(&mut self, timeout: Duration) -> Result<OutputEvent, DecodeError>;

    /// PCM bytes behind an output slot returned by `dequeue_output`.
    fn output_buffer(&self, index: usize) -> Result<&[u8], DecodeError>;

    fn release_output(&mut self, index: usize) -> Result<(), DecodeError>;
}

// ---------------------------------------------------------------------------
// ReleaseGuard
// ---------------------------------------------------------------------------

/// Owns a [`Release`] handle and releases it when dropped.
pub struct ReleaseGuard<T: Release> {
    inner: T,
}

impl<T: Release> ReleaseGuard<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T: Release> Deref for ReleaseGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: Release> DerefMut for ReleaseGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: Release> Drop for ReleaseGuard<T> {
    fn drop(&mut self) {
        self.inner.release();
    }
}

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// Cooperative stop flag shared between a decode thread and its owner.
///
/// ```rust
/// use waveform_extract::decode::CancelToken;
///
/// let token = CancelToken::new();
/// let worker_side = token.clone();
/// token.cancel();
/// assert!(worker_side.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the flag so the token can be reused for the next load.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Handle<'a> {
        released: &'a std::cell::Cell<u32>,
    }

    impl Release for Handle<'_> {
        fn release(&mut self) {
            self.released.set(self.released.get() + 1);
        }
    }

    #[test]
    fn guard_releases_on_drop() {
        let released = std::cell::Cell::new(0);
        {
            let _guard = ReleaseGuard::new(Handle { released: &released });
            assert_eq!(released.get(), 0);
        }
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn guard_releases_on_early_return() {
        fn fails(released: &std::cell::Cell<u32>) -> Result<(), DecodeError> {
            let _guard = ReleaseGuard::new(Handle { released });
            Err(DecodeError::NoAudioTrack)
        }

        let released = std::cell::Cell::new(0);
        assert!(fails(&released).is_err());
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn cancel_token_is_shared_and_resettable() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
        other.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn audio_mime_detection() {
        let mut format = TrackFormat {
            mime: "audio/mp3".into(),
            sample_rate: 44_100,
            channel_count: 2,
            duration_us: None,
        };
        assert!(format.is_audio());
        format.mime = "video/h264".into();
        assert!(!format.is_audio());
    }
}
