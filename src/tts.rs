//! Speech engine capability.
//!
//! The engine is consumed through a narrow trait so platform synthesizers
//! can be swapped in without touching playback logic. Word boundaries are
//! reported as byte offsets into the text handed to `speak`; the session
//! rebases them when an utterance starts mid-text.

use crate::config::AppConfig;
use crate::error::{Result, WordbeamError};
use crate::text_utils::word_spans;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

pub const MIN_RATE: f32 = 0.25;
pub const MAX_RATE: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechParams {
    pub voice: Option<String>,
    pub rate: f32,
    pub pitch: f32,
}

impl SpeechParams {
    pub fn from_config(config: &AppConfig) -> Self {
        SpeechParams {
            voice: config.voice.clone(),
            rate: config.rate,
            pitch: config.pitch,
        }
        .clamped()
    }

    pub fn clamped(mut self) -> Self {
        self.rate = self.rate.clamp(MIN_RATE, MAX_RATE);
        self
    }
}

/// Events emitted by an active utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// The engine reached a word; `offset` is a byte offset into the spoken
    /// text.
    WordBoundary { offset: usize },
    Finished,
    Error(String),
}

/// Control surface of a live utterance.
pub trait SpeechHandle: Send {
    fn pause(&self);
    fn resume(&self);
    fn cancel(&self);
}

pub trait SpeechEngine {
    /// Start speaking `text`, delivering events on `events` until the
    /// utterance finishes or is cancelled.
    fn speak(
        &self,
        text: &str,
        params: &SpeechParams,
        events: Sender<SpeechEvent>,
    ) -> Result<Box<dyn SpeechHandle>>;
}

/// Optional speech-to-text collaborator; a transcript feeds the same text
/// pipeline as typed input.
pub trait TranscriptSource {
    fn transcribe(&self, recording: &Path) -> Result<String>;
}

/// Resolve the recognition capability for this runtime. None is bundled, so
/// callers report the absence instead of crashing.
pub fn transcript_source() -> Result<Box<dyn TranscriptSource>> {
    Err(WordbeamError::CapabilityUnavailable("speech recognition"))
}

/// Timer-paced engine: walks the words of the utterance at a cadence derived
/// from words-per-minute and rate, emitting a boundary per word. Stands in
/// for a native synthesizer where none is wired up.
pub struct PacedEngine {
    words_per_minute: u32,
}

impl PacedEngine {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        if !config.speech_enabled {
            return Err(WordbeamError::CapabilityUnavailable("speech engine"));
        }
        let words_per_minute = config.words_per_minute.max(30);
        info!(words_per_minute, "Paced speech engine ready");
        Ok(PacedEngine { words_per_minute })
    }
}

struct PacedHandle {
    paused: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
}

impl SpeechHandle for PacedHandle {
    fn pause(&self) {
        debug!("Pausing utterance");
        self.paused.store(true, Ordering::Release);
    }

    fn resume(&self) {
        debug!("Resuming utterance");
        self.paused.store(false, Ordering::Release);
    }

    fn cancel(&self) {
        debug!("Cancelling utterance");
        self.cancelled.store(true, Ordering::Release);
    }
}

impl SpeechEngine for PacedEngine {
    fn speak(
        &self,
        text: &str,
        params: &SpeechParams,
        events: Sender<SpeechEvent>,
    ) -> Result<Box<dyn SpeechHandle>> {
        let params = params.clone().clamped();
        let spans = word_spans(text);
        let paused = Arc::new(AtomicBool::new(false));
        let cancelled = Arc::new(AtomicBool::new(false));
        let base_ms = 60_000.0 / (self.words_per_minute as f32 * params.rate);

        debug!(
            words = spans.len(),
            rate = params.rate,
            voice = ?params.voice,
            "Starting paced utterance"
        );

        let worker_paused = Arc::clone(&paused);
        let worker_cancelled = Arc::clone(&cancelled);
        thread::spawn(move || {
            for span in &spans {
                while worker_paused.load(Ordering::Acquire) {
                    if worker_cancelled.load(Ordering::Acquire) {
                        return;
                    }
                    thread::sleep(Duration::from_millis(25));
                }
                if worker_cancelled.load(Ordering::Acquire) {
                    return;
                }
                if events
                    .send(SpeechEvent::WordBoundary { offset: span.start })
                    .is_err()
                {
                    return;
                }
                // Longer words take longer to say; scale around a five-letter
                // baseline.
                let scale = (span.word.chars().count() as f32 / 5.0).clamp(0.6, 2.0);
                thread::sleep(Duration::from_millis((base_ms * scale) as u64));
            }
            if !worker_cancelled.load(Ordering::Acquire) {
                let _ = events.send(SpeechEvent::Finished);
            }
        });

        Ok(Box::new(PacedHandle { paused, cancelled }))
    }
}
