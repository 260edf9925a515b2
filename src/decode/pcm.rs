//! Waveform of a raw interleaved PCM recording.
//!
//! Raw recordings carry no header; their format comes from the file name
//! (see [`PcmFileParams::from_file_name`]).  The file is streamed in
//! window-aligned chunks through a
//! [`StatefulAlternating`](PeakPolicy::StatefulAlternating) aggregator.
//! A trailing partial window is dropped.  The cancel token is checked
//! before every chunk read.

use std::fs::File;
use std::io::Read;
use std::ops::ControlFlow;
use std::path::Path;

use crate::audio::{processor_for, PcmFileParams, PeakPolicy, WaveformSeries, WindowTrigger};

use super::extractor::{AudioInfo, ExtractedWaveform};
use super::{CancelToken, DecodeError};

/// Frames read per chunk, rounded up to whole windows.
const CHUNK_FRAMES: usize = 4096;

/// Reduce the PCM file at `path` to at most `max_points` points
/// (`0` is treated as `1`).  Returns [`DecodeError::Cancelled`] once
/// `cancel` is set.
pub fn load_pcm_waveform(
    path: impl AsRef<Path>,
    params: PcmFileParams,
    max_points: usize,
    cancel: &CancelToken,
) -> Result<WaveformSeries, DecodeError> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let total_bytes = file.metadata()?.len();

    let max_points = max_points.max(1);
    let frame_width = params.format.frame_width();
    let total_frames = total_bytes / frame_width as u64;
    let window = usize::try_from(total_frames / max_points as u64)
        .unwrap_or(usize::MAX)
        .max(1);
    log::debug!(
        "{}: {total_frames} frames ({}) → {window} per point",
        path.display(),
        params.tags()
    );

    let mut processor =
        processor_for(params.format, window, PeakPolicy::StatefulAlternating, WindowTrigger::Exact);
    let mut series = WaveformSeries::with_cap(params.format.channel_count() > 1, max_points);

    let windows_per_chunk = CHUNK_FRAMES.div_ceil(window).max(1);
    let chunk_bytes = (windows_per_chunk.saturating_mul(window)).saturating_mul(frame_width);
    let chunk_bytes = chunk_bytes.min(16 * 1024 * 1024);
    let mut buf = Vec::with_capacity(chunk_bytes);

    loop {
        if cancel.is_cancelled() {
            log::debug!("{}: load cancelled after {} points", path.display(), series.len());
            return Err(DecodeError::Cancelled);
        }
        buf.clear();
        let n = (&mut file).take(chunk_bytes as u64).read_to_end(&mut buf)?;
        if n == 0 {
            break;
        }
        let flow = processor.process(&buf, &mut |point| {
            if series.push(point) && !series.is_full() {
                ControlFlow::Continue(())
            } else {
                ControlFlow::Break(())
            }
        });
        if flow.is_break() || n < chunk_bytes {
            break;
        }
    }

    log::debug!("{} waveform points from {}", series.len(), path.display());
    Ok(series)
}

/// Load a recording whose format is encoded in its file name, reporting
/// the same stream summary as the compressed-file extractor.
pub fn load_pcm_file(
    path: impl AsRef<Path>,
    max_points: usize,
    cancel: &CancelToken,
) -> Result<ExtractedWaveform, DecodeError> {
    let path = path.as_ref();
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let params = PcmFileParams::from_file_name(name);

    let total_samples = std::fs::metadata(path)?.len() / params.format.frame_width() as u64;
    let series = load_pcm_waveform(path, params, max_points, cancel)?;
    let (left, right) = series.into_channels();

    Ok(ExtractedWaveform {
        left,
        right,
        info: AudioInfo {
            sample_rate: params.sample_rate,
            channel_count: params.format.channel_count(),
            total_samples,
            duration_ms: total_samples * 1000 / u64::from(params.sample_rate.max(1)),
        },
    })
}
