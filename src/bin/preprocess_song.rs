//! Align a song's Genius annotations to its LRCLib lyrics and write the result.
//!
//! Usage: cargo run --bin preprocess_song -- <song_id> [--data-dir PATH] [--min-score 0.6] [--max-span 8]
//!
//! Pass `--all` instead of a song id to process every song directory.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use song2quiz::alignment::SongInput;
use song2quiz::config::Config;
use song2quiz::storage::{ProcessedSong, SongStore};
use song2quiz::types::SongId;
use song2quiz::{align_songs, AlignedSong};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag).and_then(|i| args.get(i + 1)).cloned()
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut config = Config::load()?;
    if let Some(dir) = arg_value(&args, "--data-dir") {
        config.data_dir = PathBuf::from(shellexpand::tilde(&dir).to_string());
    }
    if let Some(raw) = arg_value(&args, "--min-score") {
        let min_score: f64 = raw.parse().with_context(|| format!("Invalid --min-score {raw:?}"))?;
        config.alignment = config.alignment.with_min_score(min_score);
    }
    if let Some(raw) = arg_value(&args, "--max-span") {
        let lines: usize = raw.parse().with_context(|| format!("Invalid --max-span {raw:?}"))?;
        config.alignment = config.alignment.with_max_span_lines(lines);
    }
    config.alignment.validate()?;

    let store = SongStore::from_config(&config);
    let song_ids: Vec<SongId> = if args.iter().any(|a| a == "--all") {
        store.list_songs()?
    } else {
        let Some(raw) = args.first().filter(|a| !a.starts_with("--")) else {
            bail!("Usage: preprocess_song <song_id> [--data-dir PATH] [--min-score X] [--max-span N]");
        };
        vec![raw.parse().with_context(|| format!("Invalid song id {raw:?}"))?]
    };

    let (loaded, load_failures) = store.load_songs(&song_ids);
    for (song_id, e) in &load_failures {
        eprintln!("Song {song_id}: {e}");
    }
    let mut failures = load_failures.len();

    let (jobs, sources): (Vec<SongInput>, Vec<String>) =
        loaded.into_iter().map(|song| (song.input, song.lyrics_source)).unzip();

    for ((song_id, result), source) in align_songs(&jobs, &config.alignment).into_iter().zip(sources) {
        match result {
            Ok(aligned) => {
                report(song_id, &aligned);
                let processed = ProcessedSong::new(song_id, source, aligned);
                if let Err(e) = store.save_processed(&processed) {
                    eprintln!("Song {song_id}: {e}");
                    failures += 1;
                    continue;
                }
                match store.update_catalog(&processed) {
                    Ok(true) => {}
                    Ok(false) => tracing::warn!("Processing metadata for song {song_id} not recorded in catalog"),
                    Err(e) => tracing::warn!("Failed to update catalog for song {song_id}: {e}"),
                }
            }
            Err(e) => {
                eprintln!("Song {song_id}: {e}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} song(s) failed to load, align or save");
    }
    Ok(())
}

fn report(song_id: SongId, aligned: &AlignedSong) {
    let stats = &aligned.stats;
    println!(
        "Song {song_id}: {}/{} annotations matched ({:.0}%), {} lines, timestamps: {}",
        stats.matched,
        stats.total_annotations,
        stats.match_rate() * 100.0,
        aligned.lines.len(),
        aligned.has_timestamps
    );
    for (kind, count) in &stats.by_kind {
        println!("  {kind:?}: {count}");
    }
    for unmatched in &aligned.unmatched {
        println!(
            "  unmatched {} ({:?}, best {:.2})",
            unmatched.annotation_id, unmatched.reason, unmatched.best_score
        );
    }
}
