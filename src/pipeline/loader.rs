//! Background waveform loading for the file playback view.
//!
//! Decoding is blocking work, so [`WaveformLoader`] pushes it onto
//! `tokio::task::spawn_blocking` and awaits the result.  Starting a new load
//! cancels the one in flight: the playback waveform is replaced wholesale on
//! every reload.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::decode::{
    load_pcm_file, CancelToken, CompressedAudioExtractor, DecodeError, Demuxer, ExtractOptions,
    ExtractedWaveform,
};

/// Runs waveform extraction off the async runtime.
///
/// ```rust,no_run
/// use waveform_extract::decode::ExtractOptions;
/// use waveform_extract::pipeline::WaveformLoader;
///
/// #[tokio::main]
/// async fn main() {
///     let loader = WaveformLoader::new(ExtractOptions::default());
///     if let Some(waveform) = loader.load_path("take_01.flac").await {
///         println!("{} points", waveform.len());
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct WaveformLoader {
    options: ExtractOptions,
    current: Arc<Mutex<CancelToken>>,
}

impl WaveformLoader {
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            current: Arc::new(Mutex::new(CancelToken::new())),
        }
    }

    /// Stop the load in flight, if any.
    pub fn cancel(&self) {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    /// Cancel the previous load and hand out a fresh token for the next.
    fn begin(&self) -> CancelToken {
        let token = CancelToken::new();
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.cancel();
        *current = token.clone();
        token
    }

    /// Token of the most recently started load.
    pub fn cancel_token(&self) -> CancelToken {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Load `path`: `.pcm` files go through the raw loader (format from the
    /// file name), everything else through the compressed-audio extractor.
    pub async fn load_path(&self, path: impl AsRef<Path>) -> Option<ExtractedWaveform> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let is_raw = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pcm"));

        if is_raw {
            let max_points = self.options.max_points;
            let token = self.begin();
            return run_blocking(move || match load_pcm_file(&path, max_points, &token) {
                Ok(waveform) if !token.is_cancelled() => Some(waveform),
                Ok(_) | Err(DecodeError::Cancelled) => {
                    log::debug!("load of {} cancelled", path.display());
                    None
                }
                Err(e) => {
                    log::warn!("cannot load {}: {e}", path.display());
                    None
                }
            })
            .await;
        }

        let extractor = CompressedAudioExtractor::with_cancel_token(self.options, self.begin());
        run_blocking(move || extractor.extract_file(&path)).await
    }

    /// Extract from an already opened demuxer.
    pub async fn load_with<D>(&self, demuxer: D) -> Option<ExtractedWaveform>
    where
        D: Demuxer + Send + 'static,
    {
        let extractor = CompressedAudioExtractor::with_cancel_token(self.options, self.begin());
        run_blocking(move || extractor.extract(demuxer)).await
    }
}

async fn run_blocking<F>(job: F) -> Option<ExtractedWaveform>
where
    F: FnOnce() -> Option<ExtractedWaveform> + Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(result) => result,
        Err(e) => {
            log::error!("waveform loader task failed: {e}");
            None
        }
    }
}
