//! Entry point for the wordbeam reading assistant.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load user configuration from `conf/config.toml`.
//! - Open the word→image dictionary store.
//! - Dispatch to the read-aloud session or a dictionary command.

mod config;
mod dictionary;
mod encoding;
mod error;
mod image_search;
mod session;
mod text_utils;
mod tts;
mod word_filter;

use crate::config::{AppConfig, load_config};
use crate::dictionary::{DictionaryStore, ImportMode};
use crate::error::WordbeamError;
use crate::session::{ReadingSession, SessionEvent};
use crate::session::runtime::SessionRuntime;
use crate::tts::{PacedEngine, SpeechParams};
use anyhow::{Context, Result, anyhow};
use std::env;
use std::fs;
use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "Usage:
  wordbeam read <text-file | ->
  wordbeam read --transcript <recording>
  wordbeam dict add <word> [--image <file>]
  wordbeam dict image <word> <file-or-url>
  wordbeam dict remove <word>
  wordbeam dict list [filter]
  wordbeam dict stats
  wordbeam dict export <path>
  wordbeam dict import <json-file> [--replace]
  wordbeam dict clear";

/// Shown when `read -` gets an empty stdin, so the tool still demonstrates
/// itself out of the box.
const SAMPLE_TEXT: &str = "The Read Aloud tool is designed to help children \
with dyslexia overcome reading challenges. Our text-to-speech feature \
converts written text into spoken words, allowing children to hear the text \
while following along visually.";

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let config = load_config(Path::new("conf/config.toml"));
    set_log_level(reload_handle, config.log_level.as_filter_str());

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("read") if args.get(1).map(String::as_str) == Some("--transcript") => {
            let recording = args.get(2).ok_or_else(|| anyhow!("{USAGE}"))?;
            cmd_read_transcript(&config, Path::new(recording))
        }
        Some("read") => cmd_read(&config, args.get(1).map(String::as_str)),
        Some("dict") => cmd_dict(&config, &args[1..]),
        _ => Err(anyhow!("{USAGE}")),
    }
}

/// Spoken input feeds the same pipeline as typed text, when a recognizer is
/// present in the runtime.
fn cmd_read_transcript(config: &AppConfig, recording: &Path) -> Result<()> {
    match tts::transcript_source() {
        Ok(recognizer) => {
            let text = recognizer.transcribe(recording)?;
            read_text(config, text)
        }
        Err(WordbeamError::CapabilityUnavailable(what)) => {
            warn!("{what} is unavailable; transcript input is inert");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn open_store(config: &AppConfig) -> DictionaryStore {
    DictionaryStore::open(Path::new(&config.dictionary_path))
}

fn cmd_read(config: &AppConfig, source: Option<&str>) -> Result<()> {
    let source = source.ok_or_else(|| anyhow!("{USAGE}"))?;
    let text = load_text(source)?;
    read_text(config, text)
}

fn read_text(config: &AppConfig, text: String) -> Result<()> {
    let engine = match PacedEngine::from_config(config) {
        Ok(engine) => engine,
        Err(WordbeamError::CapabilityUnavailable(what)) => {
            // Spoken playback cannot run, but this must not crash anything.
            warn!("{what} is unavailable; playback controls are inert");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let dictionary = open_store(config);
    let images = image_search::provider_from_config(config);
    let mut runtime = SessionRuntime::new(Box::new(engine), images);
    let mut session = ReadingSession::new(text, SpeechParams::from_config(config));

    let stop_tx = runtime.event_sender();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(SessionEvent::Stop);
    })
    .context("Installing Ctrl-C handler")?;
    spawn_control_reader(config, runtime.event_sender());

    info!(
        words = session.spans().len(),
        rate = session.params().rate,
        "Reading aloud; controls: {}=pause {}=resume {}=stop {}/{}=rate",
        config.keys.pause,
        config.keys.resume,
        config.keys.stop,
        config.keys.faster,
        config.keys.slower,
    );
    runtime.run(&mut session, &dictionary)?;
    Ok(())
}

/// Map stdin lines to control events for the running session.
fn spawn_control_reader(config: &AppConfig, events: std::sync::mpsc::Sender<SessionEvent>) {
    let keys = config.keys.clone();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let command = line.trim();
            let event = if command == keys.pause {
                SessionEvent::Pause
            } else if command == keys.resume {
                SessionEvent::Resume
            } else if command == keys.stop {
                SessionEvent::Stop
            } else if command == keys.faster {
                SessionEvent::NudgeRate(0.25)
            } else if command == keys.slower {
                SessionEvent::NudgeRate(-0.25)
            } else if let Some(voice) = command.strip_prefix("voice ") {
                SessionEvent::SetVoice(Some(voice.to_string()))
            } else {
                continue;
            };
            if events.send(event).is_err() {
                break;
            }
        }
    });
}

fn load_text(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Reading text from stdin")?;
        if text.trim().is_empty() {
            info!("No text on stdin; using the sample paragraph");
            return Ok(SAMPLE_TEXT.to_string());
        }
        return Ok(text);
    }
    let path = PathBuf::from(source);
    if !path.exists() {
        return Err(anyhow!("File not found: {}", path.display()));
    }
    fs::read_to_string(&path).with_context(|| format!("Reading {}", path.display()))
}

fn cmd_dict(config: &AppConfig, args: &[String]) -> Result<()> {
    let mut store = open_store(config);
    match args.first().map(String::as_str) {
        Some("add") => {
            let word = args.get(1).ok_or_else(|| anyhow!("{USAGE}"))?;
            let image = match args.get(2).map(String::as_str) {
                Some("--image") => {
                    let file = args.get(3).ok_or_else(|| anyhow!("{USAGE}"))?;
                    Some(encoding::file_to_data_uri(Path::new(file))?)
                }
                Some(other) => return Err(anyhow!("Unknown option: {other}\n{USAGE}")),
                None => None,
            };
            store.save_word(word, image.as_deref())?;
            match image {
                Some(_) => println!("Added \"{word}\" with image"),
                None => println!("Added \"{word}\" (no image yet)"),
            }
        }
        Some("image") => {
            let word = args.get(1).ok_or_else(|| anyhow!("{USAGE}"))?;
            let source = args.get(2).ok_or_else(|| anyhow!("{USAGE}"))?;
            let payload = if source.starts_with("http://") || source.starts_with("https://") {
                encoding::url_to_data_uri(source)?
            } else {
                encoding::file_to_data_uri(Path::new(source))?
            };
            store.save_word(word, Some(&payload))?;
            println!("Updated image for \"{word}\"");
        }
        Some("remove") => {
            let word = args.get(1).ok_or_else(|| anyhow!("{USAGE}"))?;
            store.delete_word(word)?;
            println!("Removed \"{word}\"");
        }
        Some("list") => {
            let filter = args.get(1).map(|f| f.to_lowercase());
            let mut shown = 0usize;
            for (word, entry) in store.words() {
                if let Some(filter) = &filter {
                    if !word.contains(filter.as_str()) {
                        continue;
                    }
                }
                let image = if entry.image_data.is_some() {
                    "image"
                } else {
                    "no image"
                };
                println!("{word}\t[{image}]\tadded {}", entry.date_added);
                shown += 1;
            }
            if shown == 0 {
                println!("No matching words");
            }
        }
        Some("stats") => {
            let stats = store.stats();
            println!(
                "{} words, {} bytes ({} KiB) on disk",
                stats.word_count,
                stats.estimated_size_bytes,
                stats.estimated_size_kib(),
            );
        }
        Some("export") => {
            let target = args.get(1).ok_or_else(|| anyhow!("{USAGE}"))?;
            let path = export_path(Path::new(target))?;
            store.export_to(&path)?;
            println!("Exported to {}", path.display());
        }
        Some("import") => {
            let file = args.get(1).ok_or_else(|| anyhow!("{USAGE}"))?;
            let mode = match args.get(2).map(String::as_str) {
                Some("--replace") => ImportMode::Replace,
                Some(other) => return Err(anyhow!("Unknown option: {other}\n{USAGE}")),
                None => ImportMode::Merge,
            };
            let payload = fs::read_to_string(file).with_context(|| format!("Reading {file}"))?;
            store.import_str(&payload, mode)?;
            println!("Imported {file} ({mode:?} mode)");
        }
        Some("clear") => {
            store.clear()?;
            println!("Dictionary cleared");
        }
        _ => return Err(anyhow!("{USAGE}")),
    }
    Ok(())
}

/// Directories get a timestamped default filename; anything else is used
/// as-is.
fn export_path(target: &Path) -> Result<PathBuf> {
    if target.is_dir() {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);
        Ok(target.join(format!("wordbeam-dictionary-{seconds}.json")))
    } else {
        Ok(target.to_path_buf())
    }
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    }
}
