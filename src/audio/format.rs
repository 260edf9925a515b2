//! Audio format descriptors.
//!
//! [`AudioFormat`] pairs a [`SampleEncoding`] with a [`ChannelLayout`] and is
//! fixed for the lifetime of a recording or decoding session.  It determines
//! the sample width (2 or 4 bytes) and the frame width (sample width ×
//! channel count) used by [`crate::audio::SampleView`].
//!
//! [`PcmFileParams`] recovers the format of a raw `.pcm` recording from its
//! file name, e.g. `oboe_stereo_48000Hz_float_20240101_120000.pcm`.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SampleEncoding
// ---------------------------------------------------------------------------

/// On-the-wire encoding of a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleEncoding {
    /// Signed 16-bit little-endian integer.
    Int16,
    /// IEEE-754 32-bit little-endian float.
    Float32,
}

impl SampleEncoding {
    /// Width of one sample in bytes.
    pub fn sample_width(self) -> usize {
        match self {
            SampleEncoding::Int16 => 2,
            SampleEncoding::Float32 => 4,
        }
    }
}

impl Default for SampleEncoding {
    fn default() -> Self {
        Self::Int16
    }
}

// ---------------------------------------------------------------------------
// ChannelLayout
// ---------------------------------------------------------------------------

/// Channel arrangement of the interleaved stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelLayout {
    Mono,
    /// Interleaved left/right pairs.
    Stereo,
}

impl ChannelLayout {
    pub fn channel_count(self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self::Mono
    }
}

// ---------------------------------------------------------------------------
// AudioFormat
// ---------------------------------------------------------------------------

/// Immutable `(encoding, channel layout)` pair describing a PCM stream.
///
/// ```rust
/// use waveform_extract::audio::{AudioFormat, ChannelLayout, SampleEncoding};
///
/// let format = AudioFormat::new(SampleEncoding::Int16, ChannelLayout::Stereo);
/// assert_eq!(format.sample_width(), 2);
/// assert_eq!(format.frame_width(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AudioFormat {
    pub encoding: SampleEncoding,
    pub channel_layout: ChannelLayout,
}

impl AudioFormat {
    pub fn new(encoding: SampleEncoding, channel_layout: ChannelLayout) -> Self {
        Self {
            encoding,
            channel_layout,
        }
    }

    pub fn sample_width(&self) -> usize {
        self.encoding.sample_width()
    }

    pub fn channel_count(&self) -> usize {
        self.channel_layout.channel_count()
    }

    /// Bytes per frame (one sample for every channel).
    pub fn frame_width(&self) -> usize {
        self.sample_width() * self.channel_count()
    }
}

// ---------------------------------------------------------------------------
// PcmFileParams
// ---------------------------------------------------------------------------

/// Playback parameters encoded in a raw PCM recording's file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFileParams {
    pub format: AudioFormat,
    pub sample_rate: u32,
}

impl Default for PcmFileParams {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            sample_rate: 48_000,
        }
    }
}

impl PcmFileParams {
    /// Parse the `_`-separated tags of a recording file name.
    ///
    /// Recognised tags are `mono` / `stereo`, `short` / `float` and
    /// `<rate>Hz`.  Unknown tags are ignored and missing ones keep their
    /// defaults (mono, 16-bit, 48 kHz).  The extension is stripped first.
    ///
    /// ```rust
    /// use waveform_extract::audio::{ChannelLayout, PcmFileParams, SampleEncoding};
    ///
    /// let p = PcmFileParams::from_file_name("oboe_stereo_44100Hz_float_20240101.pcm");
    /// assert_eq!(p.format.channel_layout, ChannelLayout::Stereo);
    /// assert_eq!(p.format.encoding, SampleEncoding::Float32);
    /// assert_eq!(p.sample_rate, 44_100);
    /// ```
    pub fn from_file_name(name: &str) -> Self {
        let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
        let mut params = Self::default();

        for tag in stem.split('_') {
            match tag {
                "stereo" => params.format.channel_layout = ChannelLayout::Stereo,
                "mono" => params.format.channel_layout = ChannelLayout::Mono,
                "float" => params.format.encoding = SampleEncoding::Float32,
                "short" => params.format.encoding = SampleEncoding::Int16,
                _ => {
                    if let Some(rate) = tag.strip_suffix("Hz").and_then(|r| r.parse().ok()) {
                        params.sample_rate = rate;
                    }
                }
            }
        }

        params
    }

    /// Render the tags back in file-name order: `<layout>_<rate>Hz_<encoding>`.
    pub fn tags(&self) -> String {
        let layout = match self.format.channel_layout {
            ChannelLayout::Mono => "mono",
            ChannelLayout::Stereo => "stereo",
        };
        let encoding = match self.format.encoding {
            SampleEncoding::Int16 => "short",
            SampleEncoding::Float32 => "float",
        };
        format!("{layout}_{}Hz_{encoding}", self.sample_rate)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_for_every_format() {
        let cases = [
            (SampleEncoding::Int16, ChannelLayout::Mono, 2, 2),
            (SampleEncoding::Int16, ChannelLayout::Stereo, 2, 4),
            (SampleEncoding::Float32, ChannelLayout::Mono, 4, 4),
            (SampleEncoding::Float32, ChannelLayout::Stereo, 4, 8),
        ];
        for (enc, layout, sample, frame) in cases {
            let f = AudioFormat::new(enc, layout);
            assert_eq!(f.sample_width(), sample, "{f:?}");
            assert_eq!(f.frame_width(), frame, "{f:?}");
        }
    }

    #[test]
    fn file_name_defaults_when_no_tags() {
        let p = PcmFileParams::from_file_name("recording.pcm");
        assert_eq!(p, PcmFileParams::default());
    }

    #[test]
    fn file_name_with_all_tags() {
        let p = PcmFileParams::from_file_name("audiorecord_mono_16000Hz_short_20250101_101010.pcm");
        assert_eq!(p.format, AudioFormat::new(SampleEncoding::Int16, ChannelLayout::Mono));
        assert_eq!(p.sample_rate, 16_000);
    }

    #[test]
    fn malformed_rate_tag_is_ignored() {
        let p = PcmFileParams::from_file_name("oboe_stereo_abcHz_float.pcm");
        assert_eq!(p.sample_rate, 48_000);
        assert_eq!(p.format.channel_layout, ChannelLayout::Stereo);
    }

    #[test]
    fn tags_parse_back_to_same_params() {
        let p = PcmFileParams {
            format: AudioFormat::new(SampleEncoding::Float32, ChannelLayout::Stereo),
            sample_rate: 96_000,
        };
        assert_eq!(p.tags(), "stereo_96000Hz_float");
        assert_eq!(PcmFileParams::from_file_name(&format!("oboe_{}.pcm", p.tags())), p);
    }
}
