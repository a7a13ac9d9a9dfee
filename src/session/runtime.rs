//! Event loop wiring a session to the speech engine and image provider.
//!
//! One channel fans in everything that can happen: engine events (tagged
//! with their utterance number by a forwarder thread), image-search results
//! from detached fetch threads, and control events from whoever holds a
//! sender clone. The single consumer loop keeps all state transitions on
//! one thread.

use super::{Effect, Lifecycle, ReadingSession, SessionEvent};
use crate::dictionary::DictionaryStore;
use crate::error::Result;
use crate::image_search::ImageProvider;
use crate::tts::{SpeechEngine, SpeechEvent, SpeechHandle};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use tracing::{debug, info};

pub struct SessionRuntime {
    engine: Box<dyn SpeechEngine>,
    images: Arc<dyn ImageProvider>,
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
    handle: Option<Box<dyn SpeechHandle>>,
}

impl SessionRuntime {
    pub fn new(engine: Box<dyn SpeechEngine>, images: Arc<dyn ImageProvider>) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        SessionRuntime {
            engine,
            images,
            events_tx,
            events_rx,
            handle: None,
        }
    }

    /// Sender for external control events (stdin commands, Ctrl-C).
    pub fn event_sender(&self) -> Sender<SessionEvent> {
        self.events_tx.clone()
    }

    /// Run one session until it returns to idle (finished or stopped).
    pub fn run(
        &mut self,
        session: &mut ReadingSession,
        dictionary: &DictionaryStore,
    ) -> Result<()> {
        let effects = session.start();
        if effects.is_empty() {
            return Ok(());
        }
        self.apply_effects(session, effects)?;

        let mut shown_word: Option<usize> = None;
        let mut shown_visual: Option<String> = None;
        while session.lifecycle() != Lifecycle::Idle {
            let Ok(event) = self.events_rx.recv() else {
                break;
            };
            let effects = session.handle_event(event, dictionary);
            self.apply_effects(session, effects)?;

            // Narrate transitions; this is the presentation surface.
            if session.current_word() != shown_word {
                shown_word = session.current_word();
                if let Some(word) = session.current_word_text() {
                    info!(word, progress = session.progress(), "Speaking");
                }
            }
            let visual = session.current_visual().map(|visual| visual.image.clone());
            if visual != shown_visual {
                if let Some(visual) = session.current_visual() {
                    info!(word = %visual.word, source = ?visual.source, "Visual updated");
                }
                shown_visual = visual;
            }
        }

        self.cancel_active();
        info!("Session over");
        Ok(())
    }

    fn apply_effects(&mut self, session: &ReadingSession, effects: Vec<Effect>) -> Result<()> {
        for effect in effects {
            match effect {
                Effect::StartUtterance {
                    utterance,
                    from_offset,
                } => self.start_utterance(session, utterance, from_offset)?,
                Effect::CancelSpeech => self.cancel_active(),
                Effect::PauseSpeech => {
                    if let Some(handle) = &self.handle {
                        handle.pause();
                    }
                }
                Effect::ResumeSpeech => {
                    if let Some(handle) = &self.handle {
                        handle.resume();
                    }
                }
                Effect::FetchVisual {
                    word,
                    word_index,
                    request_id,
                } => self.fetch_visual(word, word_index, request_id),
            }
        }
        Ok(())
    }

    fn start_utterance(
        &mut self,
        session: &ReadingSession,
        utterance: u64,
        from_offset: usize,
    ) -> Result<()> {
        self.cancel_active();
        let (speech_tx, speech_rx) = mpsc::channel();
        let handle = self
            .engine
            .speak(session.utterance_text(from_offset), session.params(), speech_tx)?;
        self.handle = Some(handle);

        // Tag engine events with their utterance number so stragglers from a
        // cancelled utterance are recognizable.
        let forward = self.events_tx.clone();
        thread::spawn(move || {
            for event in speech_rx {
                let mapped = match event {
                    SpeechEvent::WordBoundary { offset } => {
                        SessionEvent::Boundary { utterance, offset }
                    }
                    SpeechEvent::Finished => SessionEvent::Finished { utterance },
                    SpeechEvent::Error(message) => {
                        SessionEvent::EngineError { utterance, message }
                    }
                };
                if forward.send(mapped).is_err() {
                    return;
                }
            }
        });
        Ok(())
    }

    fn fetch_visual(&self, word: String, word_index: usize, request_id: u64) {
        let provider = Arc::clone(&self.images);
        let reply = self.events_tx.clone();
        thread::spawn(move || {
            let image = match provider.search(&word) {
                Ok(hit) => hit,
                Err(err) => {
                    // Network trouble is a miss, never fatal to playback.
                    debug!(word = %word, "Image search failed: {err}");
                    None
                }
            };
            let _ = reply.send(SessionEvent::VisualResolved {
                request_id,
                word_index,
                image,
            });
        });
    }

    fn cancel_active(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}
