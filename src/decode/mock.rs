//! In-memory [`Demuxer`] / [`FrameDecoder`] pair for exercising the
//! extraction loop without a real codec.
//!
//! Packets are raw 16-bit PCM already, and the decoder passes them through
//! unchanged, one access unit per output buffer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{
    AccessUnit, CancelToken, DecodeError, Demuxer, FrameDecoder, InputUnit, OutputEvent, Release,
    TrackFormat,
};

/// Release and read counts observable after the handles are gone.
#[derive(Debug, Default)]
pub(crate) struct MockCounters {
    pub demuxer_releases: AtomicUsize,
    pub decoder_releases: AtomicUsize,
    pub packets_read: AtomicUsize,
}

impl MockCounters {
    pub fn demuxer_releases(&self) -> usize {
        self.demuxer_releases.load(Ordering::SeqCst)
    }

    pub fn decoder_releases(&self) -> usize {
        self.decoder_releases.load(Ordering::SeqCst)
    }

    pub fn packets_read(&self) -> usize {
        self.packets_read.load(Ordering::SeqCst)
    }
}

/// Encode samples as little-endian bytes.
pub(crate) fn i16_packet(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

#[derive(Debug, Clone, Default)]
struct DecoderBehaviour {
    try_again_between_outputs: bool,
    format_change: Option<TrackFormat>,
    cancel_after: Option<(usize, CancelToken)>,
    fail_at_output: Option<usize>,
}

// ---------------------------------------------------------------------------
// MockDemuxer
// ---------------------------------------------------------------------------

pub(crate) struct MockDemuxer {
    tracks: Vec<TrackFormat>,
    packets: VecDeque<Vec<u8>>,
    /// Served forever once `packets` is exhausted.
    repeat: Option<Vec<u8>>,
    selected: Option<usize>,
    fail_read_at: Option<usize>,
    behaviour: DecoderBehaviour,
    counters: Arc<MockCounters>,
}

impl MockDemuxer {
    /// Single `audio/raw` track carrying `packets`.
    pub fn pcm(
        sample_rate: u32,
        channel_count: usize,
        duration_us: Option<u64>,
        packets: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            tracks: vec![TrackFormat {
                mime: "audio/raw".into(),
                sample_rate,
                channel_count,
                duration_us,
            }],
            packets: packets.into(),
            repeat: None,
            selected: None,
            fail_read_at: None,
            behaviour: DecoderBehaviour::default(),
            counters: Arc::new(MockCounters::default()),
        }
    }

    pub fn with_tracks(mut self, tracks: Vec<TrackFormat>) -> Self {
        self.tracks = tracks;
        self
    }

    pub fn repeating(mut self, packet: Vec<u8>) -> Self {
        self.repeat = Some(packet);
        self
    }

    /// `read_sample` fails on the `n`-th call (0-based).
    pub fn fail_read_at(mut self, n: usize) -> Self {
        self.fail_read_at = Some(n);
        self
    }

    pub fn try_again_between_outputs(mut self) -> Self {
        self.behaviour.try_again_between_outputs = true;
        self
    }

    pub fn format_change(mut self, format: TrackFormat) -> Self {
        self.behaviour.format_change = Some(format);
        self
    }

    /// Cancel `token` right after the `n`-th data buffer is handed out.
    pub fn cancel_after(mut self, n: usize, token: CancelToken) -> Self {
        self.behaviour.cancel_after = Some((n, token));
        self
    }

    /// `dequeue_output` fails instead of returning the `n`-th data buffer.
    pub fn fail_decoder_at(mut self, n: usize) -> Self {
        self.behaviour.fail_at_output = Some(n);
        self
    }

    pub fn counters(&self) -> Arc<MockCounters> {
        Arc::clone(&self.counters)
    }
}

impl Release for MockDemuxer {
    fn release(&mut self) {
        self.counters.demuxer_releases.fetch_add(1, Ordering::SeqCst);
    }
}

impl Demuxer for MockDemuxer {
    type Decoder = MockDecoder;

    fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn track_format(&self, index: usize) -> Result<TrackFormat, DecodeError> {
        self.tracks.get(index).cloned().ok_or(DecodeError::InvalidTrack(index))
    }

    fn select_track(&mut self, index: usize) -> Result<(), DecodeError> {
        if index >= self.tracks.len() {
            return Err(DecodeError::InvalidTrack(index));
        }
        self.selected = Some(index);
        Ok(())
    }

    fn read_sample(&mut self, buf: &mut Vec<u8>) -> Result<Option<AccessUnit>, DecodeError> {
        if self.selected.is_none() {
            return Err(DecodeError::Demux("no track selected".into()));
        }
        let n = self.counters.packets_read.fetch_add(1, Ordering::SeqCst);
        if self.fail_read_at == Some(n) {
            return Err(DecodeError::Demux("corrupt packet".into()));
        }

        let Some(packet) = self.packets.pop_front().or_else(|| self.repeat.clone()) else {
            return Ok(None);
        };
        buf.clear();
        buf.extend_from_slice(&packet);
        Ok(Some(AccessUnit {
            size: packet.len(),
            timestamp: n as u64,
            duration: 1,
        }))
    }

    fn open_decoder(&self, index: usize) -> Result<MockDecoder, DecodeError> {
        self.track_format(index)?;
        Ok(MockDecoder {
            behaviour: self.behaviour.clone(),
            counters: Arc::clone(&self.counters),
            input: Vec::new(),
            pending: VecDeque::new(),
            held: None,
            input_eos: false,
            eos_sent: false,
            outputs: 0,
            try_again_next: false,
        })
    }
}

// ---------------------------------------------------------------------------
// MockDecoder
// ---------------------------------------------------------------------------

pub(crate) struct MockDecoder {
    behaviour: DecoderBehaviour,
    counters: Arc<MockCounters>,
    input: Vec<u8>,
    pending: VecDeque<Vec<u8>>,
    held: Option<Vec<u8>>,
    input_eos: bool,
    eos_sent: bool,
    outputs: usize,
    try_again_next: bool,
}

impl Release for MockDecoder {
    fn release(&mut self) {
        self.counters.decoder_releases.fetch_add(1, Ordering::SeqCst);
    }
}

impl FrameDecoder for MockDecoder {
    fn dequeue_input(&mut self, _timeout: Duration) -> Result<Option<usize>, DecodeError> {
        Ok((!self.input_eos).then_some(0))
    }

    fn input_buffer(&mut self, index: usize) -> Result<&mut Vec<u8>, DecodeError> {
        match index {
            0 => Ok(&mut self.input),
            _ => Err(DecodeError::InvalidBuffer(index)),
        }
    }

    fn queue_input(&mut self, index: usize, unit: InputUnit) -> Result<(), DecodeError> {
        if index != 0 {
            return Err(DecodeError::InvalidBuffer(index));
        }
        match unit {
            InputUnit::Data(au) => {
                let data = self.input[..au.size.min(self.input.len())].to_vec();
                self.pending.push_back(data);
            }
            InputUnit::EndOfStream => self.input_eos = true,
        }
        Ok(())
    }

    fn dequeue_output(&mut self, _timeout: Duration) -> Result<OutputEvent, DecodeError> {
        if let Some(format) = self.behaviour.format_change.take() {
            return Ok(OutputEvent::FormatChanged(format));
        }
        if self.behaviour.try_again_between_outputs {
            self.try_again_next = !self.try_again_next;
            if self.try_again_next {
                return Ok(OutputEvent::TryAgain);
            }
        }
        if self.held.is_some() {
            return Err(DecodeError::Decoder("output buffer not released".into()));
        }

        if let Some(data) = self.pending.pop_front() {
            if self.behaviour.fail_at_output == Some(self.outputs) {
                return Err(DecodeError::Decoder("codec exception".into()));
            }
            self.outputs += 1;
            if let Some((n, token)) = &self.behaviour.cancel_after {
                if self.outputs >= *n {
                    token.cancel();
                }
            }
            let size = data.len();
            self.held = Some(data);
            return Ok(OutputEvent::Buffer {
                index: 0,
                size,
                end_of_stream: false,
            });
        }

        if self.input_eos && !self.eos_sent {
            self.eos_sent = true;
            self.held = Some(Vec::new());
            return Ok(OutputEvent::Buffer {
                index: 0,
                size: 0,
                end_of_stream: true,
            });
        }

        Ok(OutputEvent::TryAgain)
    }

    fn output_buffer(&self, index: usize) -> Result<&[u8], DecodeError> {
        match (&self.held, index) {
            (Some(data), 0) => Ok(data),
            _ => Err(DecodeError::InvalidBuffer(index)),
        }
    }

    fn release_output(&mut self, index: usize) -> Result<(), DecodeError> {
        match (self.held.take(), index) {
            (Some(_), 0) => Ok(()),
            _ => Err(DecodeError::InvalidBuffer(index)),
        }
    }
}
