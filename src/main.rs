//! Command-line entry point.
//!
//! ```text
//! waveform-extract <file> [max_points] [--dump]
//! ```
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Parse arguments; `max_points` overrides the configured cap.
//! 4. Load the waveform on tokio's blocking pool and print a summary
//!    (and every point with `--dump`).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use waveform_extract::{config::AppConfig, decode::ExtractOptions, pipeline::WaveformLoader};

struct Args {
    file: PathBuf,
    max_points: Option<usize>,
    dump: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut file = None;
    let mut max_points = None;
    let mut dump = false;

    for arg in args {
        match arg.as_str() {
            "--dump" => dump = true,
            _ if file.is_none() => file = Some(PathBuf::from(arg)),
            _ if max_points.is_none() => {
                let n = arg
                    .parse()
                    .with_context(|| format!("invalid max_points {arg:?}"))?;
                max_points = Some(n);
            }
            _ => bail!("unexpected argument {arg:?}"),
        }
    }

    let Some(file) = file else {
        bail!("usage: waveform-extract <file> [max_points] [--dump]");
    };
    Ok(Args {
        file,
        max_points,
        dump,
    })
}

async fn run(args: Args, config: AppConfig) -> Result<()> {
    let mut options = ExtractOptions::from(&config.waveform);
    if let Some(n) = args.max_points {
        options.max_points = n;
    }

    let loader = WaveformLoader::new(options);
    let waveform = loader
        .load_path(&args.file)
        .await
        .with_context(|| format!("no waveform extracted from {}", args.file.display()))?;

    let info = waveform.info;
    println!("file:         {}", args.file.display());
    println!("sample rate:  {} Hz", info.sample_rate);
    println!("channels:     {}", info.channel_count);
    println!("samples:      {}", info.total_samples);
    println!("duration:     {} ms", info.duration_ms);
    println!(
        "points:       {}{}",
        waveform.len(),
        if waveform.right.is_some() { " (stereo)" } else { "" }
    );

    if args.dump {
        match &waveform.right {
            Some(right) => {
                for (l, r) in waveform.left.iter().zip(right) {
                    println!("{l:.6},{r:.6}");
                }
            }
            None => {
                for l in &waveform.left {
                    println!("{l:.6}");
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Config
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Arguments
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::from(2);
        }
    };

    // 4. Extraction
    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
