//! Application entry point: headless verse player.
//!
//! ```text
//! verse-player <chapter.json | chapter-id> [verse]
//! ```
//!
//! A bare chapter id is looked up in [`AppPaths::chapters_dir`].  Every
//! snapshot is printed to stdout as one JSON line.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk; on first run, write the defaults back.
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Load the chapter named on the command line.
//! 5. Build the reciter catalog and the streaming media backend.
//! 6. Spawn the playback engine with a caption synthesizer.
//! 7. Play the chapter (or a single verse) until it ends or Ctrl-C.
//! 8. Dispose the engine; exit non-zero when the run ended with an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use verse_player::{
    chapter::Chapter,
    config::{AppConfig, AppPaths},
    media::StreamingBackend,
    playback::{PlaybackEngine, PlaybackSnapshot, PlaybackState},
    resolver::{ReciterCatalog, SourceResolver},
    speech::CaptionSynthesizer,
};

const USAGE: &str = "usage: verse-player <chapter.json | chapter-id> [verse]";

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

struct Args {
    chapter: PathBuf,
    verse: Option<u32>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let Some(chapter) = args.next() else {
        bail!(USAGE);
    };
    let verse = match args.next() {
        Some(v) => Some(
            v.parse::<u32>()
                .with_context(|| format!("invalid verse number '{v}'"))?,
        ),
        None => None,
    };
    if args.next().is_some() {
        bail!(USAGE);
    }

    Ok(Args {
        chapter: chapter_path(&chapter),
        verse,
    })
}

/// An existing path is used as-is; a bare number names a chapter file in the
/// data directory.
fn chapter_path(arg: &str) -> PathBuf {
    let path = Path::new(arg);
    if path.exists() {
        return path.to_path_buf();
    }
    match arg.parse::<u32>() {
        Ok(id) => AppPaths::new().chapter_file(id),
        Err(_) => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

async fn play(config: AppConfig, chapter: Chapter, verse: Option<u32>) -> Result<()> {
    let catalog = ReciterCatalog::from_config(&config.resolver).unwrap_or_else(|e| {
        log::warn!("Invalid reciter catalog in settings ({e}); using built-in catalog");
        ReciterCatalog::default()
    });
    let reciter = config.reciter_id();
    if !catalog.contains(&reciter) {
        log::warn!(
            "Unknown reciter '{reciter}'; falling back to '{}'",
            catalog.default_reciter()
        );
    }

    let backend = Arc::new(StreamingBackend::from_config(&config.network));
    let engine = PlaybackEngine::new(
        SourceResolver::new(backend, catalog),
        Arc::new(CaptionSynthesizer::stdout()),
        config.engine_options(),
    );

    let (snap_tx, mut snap_rx) = mpsc::unbounded_channel::<PlaybackSnapshot>();
    let _subscription = engine.subscribe(move |snap| {
        match serde_json::to_string(snap) {
            Ok(line) => println!("{line}"),
            Err(e) => log::warn!("Could not serialise snapshot: {e}"),
        }
        let _ = snap_tx.send(snap.clone());
    });

    log::info!(
        "Playing chapter {} ({} verses) with reciter '{reciter}'",
        chapter.id(),
        chapter.len()
    );
    match verse {
        Some(number) => engine.play_verse(chapter, number, reciter).await?,
        None => engine.play_chapter_from_start(chapter, reciter).await?,
    }

    // The run ends on the first Idle snapshot after play.
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let outcome = loop {
        tokio::select! {
            snap = snap_rx.recv() => match snap {
                Some(snap) if snap.state == PlaybackState::Idle => break snap.error,
                Some(_) => {}
                None => break None,
            },
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    log::warn!("Ctrl-C handler failed: {e}");
                }
                log::info!("Interrupted; stopping playback");
                engine.stop().await;
                break None;
            }
        }
    };

    engine.dispose().await;

    match outcome {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn run() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Verse player starting up");

    // 2. Configuration
    let first_run = AppConfig::is_first_run();
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    if first_run {
        log::info!(
            "First run: writing default settings to {}",
            AppPaths::new().settings_file.display()
        );
        if let Err(e) = config.save() {
            log::warn!("Could not save default settings: {e:#}");
        }
    }

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Chapter
    let args = parse_args(std::env::args().skip(1))?;
    let chapter = Chapter::load_from(&args.chapter)
        .with_context(|| format!("failed to load chapter from {}", args.chapter.display()))?;

    // 5–8. Engine and playback
    rt.block_on(play(config, chapter, args.verse))
}

fn main() {
    if let Err(e) = run() {
        log::error!("{e:#}");
        eprintln!("verse-player: {e:#}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
