//! Clipping pipeline binary.
//!
//! Reads a clip-list JSON produced by the upstream selection pipeline and
//! extracts the requested clips from a source video.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reframe_media::AnalyzerCommand;
use reframe_models::ClipSpec;
use reframe_pipeline::{ClippingPipeline, RunOptions};

/// A record in the upstream pipeline's output JSON.
#[derive(Debug, Deserialize)]
struct ShortRecord {
    title: String,
    start_time: f64,
    end_time: f64,
}

/// The clip list is either a bare array of records or wrapped in an object
/// with a `shorts` field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClipList {
    Wrapped { shorts: Vec<ShortRecord> },
    Bare(Vec<ShortRecord>),
}

impl ClipList {
    fn into_specs(self) -> Vec<ClipSpec> {
        let records = match self {
            ClipList::Wrapped { shorts } => shorts,
            ClipList::Bare(records) => records,
        };
        records
            .into_iter()
            .map(|r| ClipSpec::new(r.title, r.start_time, r.end_time))
            .collect()
    }
}

#[derive(Debug)]
struct CliArgs {
    video: PathBuf,
    clips_file: PathBuf,
    out_dir: PathBuf,
    portrait: bool,
    active_speaker: bool,
    analyzer: AnalyzerCommand,
    encode_timeout_secs: Option<u64>,
}

const USAGE: &str = "usage: reframe <video> --clips <shorts.json> [--out <dir>] \
    [--portrait] [--active-speaker] [--analyzer \"<program> <args...>\"]";

fn parse_args() -> Result<CliArgs> {
    let mut video = None;
    let mut clips_file = None;
    let mut out_dir =
        std::env::var("REFRAME_OUT_DIR").unwrap_or_else(|_| "clips".to_string());
    let mut portrait = false;
    let mut active_speaker = false;
    let mut analyzer_cmd = std::env::var("REFRAME_ANALYZER")
        .unwrap_or_else(|_| "python3 scripts/face_analysis.py".to_string());

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--clips" => clips_file = args.next(),
            "--out" => {
                out_dir = args.next().context("--out requires a value")?;
            }
            "--portrait" => portrait = true,
            "--active-speaker" => active_speaker = true,
            "--analyzer" => {
                analyzer_cmd = args.next().context("--analyzer requires a value")?;
            }
            "--help" | "-h" => bail!("{USAGE}"),
            other if other.starts_with("--") => bail!("unknown flag {other}\n{USAGE}"),
            other => video = Some(other.to_string()),
        }
    }

    let video = video.context(USAGE)?;
    let clips_file = clips_file.context(USAGE)?;

    let mut analyzer_parts = analyzer_cmd.split_whitespace().map(str::to_string);
    let program = analyzer_parts
        .next()
        .context("analyzer command is empty")?;
    let analyzer = AnalyzerCommand::new(program, analyzer_parts.collect());

    let encode_timeout_secs = std::env::var("REFRAME_ENCODE_TIMEOUT")
        .ok()
        .and_then(|s| s.parse().ok());

    Ok(CliArgs {
        video: PathBuf::from(video),
        clips_file: PathBuf::from(clips_file),
        out_dir: PathBuf::from(out_dir),
        portrait,
        active_speaker,
        analyzer,
        encode_timeout_secs,
    })
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("reframe=info".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = parse_args()?;

    let clips_json = std::fs::read_to_string(&args.clips_file)
        .with_context(|| format!("cannot read clip list {}", args.clips_file.display()))?;
    let clip_list: ClipList =
        serde_json::from_str(&clips_json).context("cannot parse clip list JSON")?;
    let specs = clip_list.into_specs();

    if specs.is_empty() {
        bail!("clip list contains no clips");
    }

    info!(
        video = %args.video.display(),
        clips = specs.len(),
        portrait = args.portrait,
        active_speaker = args.active_speaker,
        "Starting clipping run"
    );

    let mut options = RunOptions::new(&args.out_dir, args.analyzer)
        .with_portrait_crop(args.portrait)
        .with_active_speaker_crop(args.active_speaker);
    if let Some(secs) = args.encode_timeout_secs {
        options = options.with_encode_timeout(secs);
    }

    let pipeline = ClippingPipeline::new(options);
    let run = pipeline
        .run(
            &args.video,
            &specs,
            |progress| {
                info!(
                    "[{}/{}] {}",
                    progress.current, progress.total, progress.title
                );
            },
            None,
        )
        .await?;

    for clip in &run.clips {
        if clip.success {
            info!(
                "ok  {} ({:.1}s-{:.1}s)",
                clip.clip_path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                clip.start_secs,
                clip.end_secs
            );
        } else {
            warn!(
                "failed  {} ({:.1}s-{:.1}s): {}",
                clip.title,
                clip.start_secs,
                clip.end_secs,
                clip.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    info!(
        "Run complete: {} succeeded, {} failed, clips in {}",
        run.succeeded(),
        run.failed(),
        run.clips_dir.display()
    );

    if run.succeeded() == 0 {
        bail!("no clips were produced");
    }

    Ok(())
}
