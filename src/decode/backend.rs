//! symphonia-backed [`Demuxer`] and [`FrameDecoder`].
//!
//! symphonia decodes synchronously, so the request/drain protocol is
//! emulated on top of it: one input slot, one output slot, and the packet
//! queued in the input slot is decoded lazily on the next
//! `dequeue_output`.  Decoded audio of any sample type is converted to
//! interleaved 16-bit little-endian PCM.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use super::{
    AccessUnit, DecodeError, Demuxer, FrameDecoder, InputUnit, OutputEvent, Release, TrackFormat,
};

impl From<SymphoniaError> for DecodeError {
    fn from(e: SymphoniaError) -> Self {
        match e {
            SymphoniaError::IoError(io) => DecodeError::Io(io),
            SymphoniaError::Unsupported(what) => DecodeError::UnsupportedCodec(what.to_string()),
            SymphoniaError::DecodeError(msg) => DecodeError::Decoder(msg.to_string()),
            other => DecodeError::Demux(other.to_string()),
        }
    }
}

fn is_end_of_stream(e: &SymphoniaError) -> bool {
    matches!(e, SymphoniaError::IoError(io) if io.kind() == ErrorKind::UnexpectedEof)
}

/// MIME type, rate, channels and duration declared by a track.
fn describe(params: &CodecParameters) -> TrackFormat {
    let mime = if params.codec == CODEC_TYPE_NULL {
        "application/octet-stream".to_string()
    } else {
        match get_codecs().get_codec(params.codec) {
            Some(descriptor) => format!("audio/{}", descriptor.short_name),
            None => "audio/x-unknown".to_string(),
        }
    };
    let sample_rate = params.sample_rate.unwrap_or(0);
    let duration_us = match (params.n_frames, sample_rate) {
        (Some(frames), rate) if rate > 0 => {
            u64::try_from(u128::from(frames) * 1_000_000 / u128::from(rate)).ok()
        }
        _ => None,
    };

    TrackFormat {
        mime,
        sample_rate,
        channel_count: params.channels.map_or(0, |c| c.count()),
        duration_us,
    }
}

// ---------------------------------------------------------------------------
// SymphoniaDemuxer
// ---------------------------------------------------------------------------

struct Track {
    id: u32,
    params: CodecParameters,
    format: TrackFormat,
}

/// Container reader over any format symphonia can probe.
pub struct SymphoniaDemuxer {
    reader: Option<Box<dyn FormatReader>>,
    tracks: Vec<Track>,
    selected: Option<u32>,
}

impl SymphoniaDemuxer {
    /// Probe `path`; the file extension is used as a format hint.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let reader = probed.format;

        let tracks: Vec<Track> = reader
            .tracks()
            .iter()
            .map(|t| Track {
                id: t.id,
                params: t.codec_params.clone(),
                format: describe(&t.codec_params),
            })
            .collect();
        log::debug!("opened {} with {} track(s)", path.display(), tracks.len());

        Ok(Self {
            reader: Some(reader),
            tracks,
            selected: None,
        })
    }

    fn track(&self, index: usize) -> Result<&Track, DecodeError> {
        self.tracks.get(index).ok_or(DecodeError::InvalidTrack(index))
    }
}

impl Release for SymphoniaDemuxer {
    fn release(&mut self) {
        self.reader = None;
    }
}

impl Demuxer for SymphoniaDemuxer {
    type Decoder = SymphoniaDecoder;

    fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn track_format(&self, index: usize) -> Result<TrackFormat, DecodeError> {
        Ok(self.track(index)?.format.clone())
    }

    fn select_track(&mut self, index: usize) -> Result<(), DecodeError> {
        self.selected = Some(self.track(index)?.id);
        Ok(())
    }

    fn read_sample(&mut self, buf: &mut Vec<u8>) -> Result<Option<AccessUnit>, DecodeError> {
        let track_id = self
            .selected
            .ok_or_else(|| DecodeError::Demux("no track selected".into()))?;
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| DecodeError::Demux("demuxer already released".into()))?;

        loop {
            let packet = match reader.next_packet() {
                Ok(packet) => packet,
                Err(e) if is_end_of_stream(&e) => return Ok(None),
                Err(SymphoniaError::ResetRequired) => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != track_id {
                continue;
            }

            buf.clear();
            buf.extend_from_slice(packet.buf());
            return Ok(Some(AccessUnit {
                size: buf.len(),
                timestamp: packet.ts(),
                duration: packet.dur(),
            }));
        }
    }

    fn open_decoder(&self, index: usize) -> Result<SymphoniaDecoder, DecodeError> {
        let track = self.track(index)?;
        let decoder = get_codecs().make(&track.params, &DecoderOptions::default())?;
        Ok(SymphoniaDecoder::new(decoder, track.id))
    }
}

// ---------------------------------------------------------------------------
// SymphoniaDecoder
// ---------------------------------------------------------------------------

const SLOT: usize = 0;

/// Single-slot request/drain adapter over a symphonia codec.
pub struct SymphoniaDecoder {
    decoder: Option<Box<dyn Decoder>>,
    track_id: u32,
    input: Vec<u8>,
    input_dequeued: bool,
    queued: Option<AccessUnit>,
    input_eos: bool,
    output: Vec<u8>,
    /// Decoded bytes waiting behind a pending `FormatChanged`.
    ready: Option<usize>,
    output_held: bool,
    eos_sent: bool,
    announced: Option<TrackFormat>,
    sample_buf: Option<(SignalSpec, u64, SampleBuffer<i16>)>,
}

impl SymphoniaDecoder {
    fn new(decoder: Box<dyn Decoder>, track_id: u32) -> Self {
        Self {
            decoder: Some(decoder),
            track_id,
            input: Vec::new(),
            input_dequeued: false,
            queued: None,
            input_eos: false,
            output: Vec::new(),
            ready: None,
            output_held: false,
            eos_sent: false,
            announced: None,
            sample_buf: None,
        }
    }

    /// Decode the queued access unit into `output`.  `Ok(None)` when the
    /// packet produced no audio or was skipped as corrupt.
    fn decode_queued(&mut self, unit: AccessUnit) -> Result<Option<SignalSpec>, DecodeError> {
        let decoder = self
            .decoder
            .as_mut()
            .ok_or_else(|| DecodeError::Decoder("decoder already released".into()))?;

        let data = &self.input[..unit.size.min(self.input.len())];
        let packet = Packet::new_from_slice(self.track_id, unit.timestamp, unit.duration, data);

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("skipping undecodable packet at ts {}: {msg}", unit.timestamp);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if decoded.frames() == 0 {
            return Ok(None);
        }

        let spec = *decoded.spec();
        let frames = decoded.capacity() as u64;
        let reuse = matches!(&self.sample_buf, Some((s, cap, _)) if *s == spec && *cap >= frames);
        if !reuse {
            self.sample_buf = Some((spec, frames, SampleBuffer::<i16>::new(frames, spec)));
        }
        let Some((_, _, sample_buf)) = self.sample_buf.as_mut() else {
            return Ok(None);
        };
        sample_buf.copy_interleaved_ref(decoded);

        self.output.clear();
        self.output
            .extend(sample_buf.samples().iter().flat_map(|s| s.to_le_bytes()));
        Ok(Some(spec))
    }

    fn take_output(&mut self, size: usize) -> OutputEvent {
        self.output_held = true;
        OutputEvent::Buffer {
            index: SLOT,
            size,
            end_of_stream: false,
        }
    }
}

impl Release for SymphoniaDecoder {
    fn release(&mut self) {
        self.decoder = None;
        self.sample_buf = None;
    }
}

impl FrameDecoder for SymphoniaDecoder {
    fn dequeue_input(&mut self, _timeout: Duration) -> Result<Option<usize>, DecodeError> {
        if self.decoder.is_none() {
            return Err(DecodeError::Decoder("decoder already released".into()));
        }
        if self.input_eos || self.input_dequeued || self.queued.is_some() {
            return Ok(None);
        }
        self.input_dequeued = true;
        Ok(Some(SLOT))
    }

    fn input_buffer(&mut self, index: usize) -> Result<&mut Vec<u8>, DecodeError> {
        if index != SLOT || !self.input_dequeued {
            return Err(DecodeError::InvalidBuffer(index));
        }
        Ok(&mut self.input)
    }

    fn queue_input(&mut self, index: usize, unit: InputUnit) -> Result<(), DecodeError> {
        if index != SLOT || !self.input_dequeued {
            return Err(DecodeError::InvalidBuffer(index));
        }
        self.input_dequeued = false;
        match unit {
            InputUnit::Data(au) => self.queued = Some(au),
            InputUnit::EndOfStream => self.input_eos = true,
        }
        Ok(())
    }

    fn dequeue_output(&mut self, _timeout: Duration) -> Result<OutputEvent, DecodeError> {
        if self.output_held {
            return Err(DecodeError::Decoder("output buffer not released".into()));
        }

        if let Some(size) = self.ready.take() {
            return Ok(self.take_output(size));
        }

        if let Some(unit) = self.queued.take() {
            let Some(spec) = self.decode_queued(unit)? else {
                return Ok(OutputEvent::TryAgain);
            };
            let format = TrackFormat {
                mime: "audio/raw".into(),
                sample_rate: spec.rate,
                channel_count: spec.channels.count(),
                duration_us: None,
            };
            if self.announced.as_ref() != Some(&format) {
                self.announced = Some(format.clone());
                self.ready = Some(self.output.len());
                return Ok(OutputEvent::FormatChanged(format));
            }
            let size = self.output.len();
            return Ok(self.take_output(size));
        }

        if self.input_eos && !self.eos_sent {
            self.eos_sent = true;
            self.output.clear();
            self.output_held = true;
            return Ok(OutputEvent::Buffer {
                index: SLOT,
                size: 0,
                end_of_stream: true,
            });
        }

        Ok(OutputEvent::TryAgain)
    }

    fn output_buffer(&self, index: usize) -> Result<&[u8], DecodeError> {
        if index != SLOT || !self.output_held {
            return Err(DecodeError::InvalidBuffer(index));
        }
        Ok(&self.output)
    }

    fn release_output(&mut self, index: usize) -> Result<(), DecodeError> {
        if index != SLOT || !self.output_held {
            return Err(DecodeError::InvalidBuffer(index));
        }
        self.output_held = false;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{CompressedAudioExtractor, ExtractOptions};
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    fn write_wav(dir: &TempDir, name: &str, channels: u16, rate: u32, samples: &[i16]) -> PathBuf {
        let path = dir.path().join(name);
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
        for &s in samples {
            writer.write_sample(s).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
        path
    }

    fn options(max_points: usize) -> ExtractOptions {
        ExtractOptions {
            max_points,
            ..ExtractOptions::default()
        }
    }

    // ---- Demuxer -----------------------------------------------------------

    #[test]
    fn wav_track_is_described() {
        let dir = tempdir().expect("temp dir");
        let path = write_wav(&dir, "tone.wav", 2, 8_000, &[0; 16_000]);

        let demuxer = SymphoniaDemuxer::open(&path).expect("open");
        assert_eq!(demuxer.track_count(), 1);
        let format = demuxer.track_format(0).expect("track 0");
        assert!(format.is_audio(), "mime {}", format.mime);
        assert_eq!(format.sample_rate, 8_000);
        assert_eq!(format.channel_count, 2);
        assert_eq!(format.duration_us, Some(1_000_000));
        assert!(matches!(demuxer.track_format(1), Err(DecodeError::InvalidTrack(1))));
    }

    #[test]
    fn read_before_select_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = write_wav(&dir, "a.wav", 1, 8_000, &[0; 100]);
        let mut demuxer = SymphoniaDemuxer::open(&path).expect("open");
        let mut buf = Vec::new();
        assert!(demuxer.read_sample(&mut buf).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().expect("temp dir");
        let result = SymphoniaDemuxer::open(dir.path().join("nope.mp3"));
        assert!(matches!(result, Err(DecodeError::Io(_))));
    }

    // ---- Decoder protocol --------------------------------------------------

    #[test]
    fn format_change_precedes_first_buffer() {
        let dir = tempdir().expect("temp dir");
        let path = write_wav(&dir, "a.wav", 1, 8_000, &[1_234; 800]);
        let mut demuxer = SymphoniaDemuxer::open(&path).expect("open");
        demuxer.select_track(0).expect("select");
        let mut decoder = demuxer.open_decoder(0).expect("decoder");
        let timeout = Duration::from_millis(10);

        let index = decoder.dequeue_input(timeout).expect("dequeue").expect("slot");
        assert_eq!(decoder.dequeue_input(timeout).expect("dequeue"), None);
        let unit = demuxer
            .read_sample(decoder.input_buffer(index).expect("buffer"))
            .expect("read")
            .expect("packet");
        decoder.queue_input(index, InputUnit::Data(unit)).expect("queue");

        match decoder.dequeue_output(timeout).expect("output") {
            OutputEvent::FormatChanged(f) => {
                assert_eq!(f.channel_count, 1);
                assert_eq!(f.sample_rate, 8_000);
            }
            other => panic!("expected FormatChanged, got {other:?}"),
        }
        match decoder.dequeue_output(timeout).expect("output") {
            OutputEvent::Buffer { index, size, end_of_stream } => {
                assert!(size > 0 && size % 2 == 0);
                assert!(!end_of_stream);
                let bytes = decoder.output_buffer(index).expect("bytes");
                assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 1_234);
                decoder.release_output(index).expect("release");
            }
            other => panic!("expected Buffer, got {other:?}"),
        }
    }

    #[test]
    fn released_decoder_rejects_requests() {
        let dir = tempdir().expect("temp dir");
        let path = write_wav(&dir, "a.wav", 1, 8_000, &[0; 100]);
        let demuxer = SymphoniaDemuxer::open(&path).expect("open");
        let mut decoder = demuxer.open_decoder(0).expect("decoder");
        decoder.release();
        decoder.release(); // idempotent
        assert!(decoder.dequeue_input(Duration::ZERO).is_err());
    }

    // ---- End to end --------------------------------------------------------

    #[test]
    fn extracts_mono_wav() {
        let dir = tempdir().expect("temp dir");
        // 1 s at 8 kHz, constant half-scale → 80 samples per point
        let path = write_wav(&dir, "mono.wav", 1, 8_000, &[16_384; 8_000]);

        let waveform = CompressedAudioExtractor::new(options(100))
            .extract_file(&path)
            .expect("waveform");
        assert_eq!(waveform.len(), 100);
        assert!(waveform.right.is_none());
        assert_eq!(waveform.info.total_samples, 8_000);
        assert_eq!(waveform.info.duration_ms, 1_000);
        assert_eq!(waveform.left[0], 0.5);
        assert_eq!(waveform.left[1], 0.0);
        assert!(waveform.left.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn extracts_stereo_wav() {
        let dir = tempdir().expect("temp dir");
        let frames: Vec<i16> = [8_192i16, -8_192].repeat(4_000);
        let path = write_wav(&dir, "stereo.wav", 2, 4_000, &frames);

        let waveform = CompressedAudioExtractor::new(options(40))
            .extract_file(&path)
            .expect("waveform");
        assert_eq!(waveform.len(), 40);
        let right = waveform.right.expect("stereo");
        assert_eq!(right.len(), 40);
        assert_eq!((waveform.left[0], right[0]), (0.25, 0.0));
        assert_eq!((waveform.left[1], right[1]), (0.0, -0.25));
    }

    #[test]
    fn silent_wav_is_all_zero() {
        let dir = tempdir().expect("temp dir");
        let path = write_wav(&dir, "silence.wav", 1, 8_000, &[0; 4_000]);
        let waveform = CompressedAudioExtractor::new(options(50))
            .extract_file(&path)
            .expect("waveform");
        assert_eq!(waveform.len(), 50);
        assert!(waveform.left.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn garbage_file_is_absent() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("noise.mp3");
        std::fs::write(&path, b"definitely not an mp3 stream").expect("write");
        assert!(CompressedAudioExtractor::default().extract_file(&path).is_none());
    }
}
