//! Reading session state and the reducer driving playback.
//!
//! The session is ephemeral: it exists for one text, is advanced exclusively
//! by events, and is discarded on stop. Handlers never touch the engine or
//! the network directly; they return [`Effect`]s for the runtime to execute,
//! which keeps every transition unit-testable.

pub mod runtime;

use crate::dictionary::DictionaryStore;
use crate::text_utils::{self, WordSpan};
use crate::tts::{MAX_RATE, MIN_RATE, SpeechParams};
use crate::word_filter;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualSource {
    Dictionary,
    Search,
}

/// The image shown for the word being spoken: a stored data URI or a search
/// result URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Visual {
    pub word: String,
    pub image: String,
    pub source: VisualSource,
}

/// Everything that can advance a session. Boundary, finish, and error events
/// carry the utterance number they belong to so stragglers from a cancelled
/// utterance are ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Boundary { utterance: u64, offset: usize },
    Finished { utterance: u64 },
    EngineError { utterance: u64, message: String },
    VisualResolved {
        request_id: u64,
        word_index: usize,
        image: Option<String>,
    },
    Pause,
    Resume,
    Stop,
    SetRate(f32),
    NudgeRate(f32),
    SetVoice(Option<String>),
}

/// Work the runtime performs on the session's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartUtterance { utterance: u64, from_offset: usize },
    CancelSpeech,
    PauseSpeech,
    ResumeSpeech,
    FetchVisual {
        word: String,
        word_index: usize,
        request_id: u64,
    },
}

pub struct ReadingSession {
    text: String,
    spans: Vec<WordSpan>,
    lifecycle: Lifecycle,
    current_word: Option<usize>,
    current_visual: Option<Visual>,
    progress: f32,
    /// Offset of the active utterance's first byte within `text`; boundary
    /// offsets are relative to the utterance and get rebased by this.
    base_offset: usize,
    utterance_seq: u64,
    request_seq: u64,
    params: SpeechParams,
}

impl ReadingSession {
    pub fn new(text: String, params: SpeechParams) -> Self {
        let spans = text_utils::word_spans(&text);
        ReadingSession {
            text,
            spans,
            lifecycle: Lifecycle::Idle,
            current_word: None,
            current_visual: None,
            progress: 0.0,
            base_offset: 0,
            utterance_seq: 0,
            request_seq: 0,
            params: params.clamped(),
        }
    }

    pub fn spans(&self) -> &[WordSpan] {
        &self.spans
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn current_word(&self) -> Option<usize> {
        self.current_word
    }

    pub fn current_word_text(&self) -> Option<&str> {
        self.current_word.map(|idx| self.spans[idx].word.as_str())
    }

    pub fn current_visual(&self) -> Option<&Visual> {
        self.current_visual.as_ref()
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn params(&self) -> &SpeechParams {
        &self.params
    }

    /// Text of the utterance starting at `from_offset`.
    pub fn utterance_text(&self, from_offset: usize) -> &str {
        &self.text[from_offset..]
    }

    /// Begin a fresh playback over the whole text.
    pub fn start(&mut self) -> Vec<Effect> {
        if self.spans.is_empty() {
            warn!("Nothing to read");
            return Vec::new();
        }
        self.base_offset = 0;
        self.current_word = None;
        self.current_visual = None;
        self.progress = 0.0;
        self.lifecycle = Lifecycle::Playing;
        self.utterance_seq += 1;
        info!(words = self.spans.len(), "Starting read-aloud session");
        vec![Effect::StartUtterance {
            utterance: self.utterance_seq,
            from_offset: 0,
        }]
    }

    pub fn handle_event(
        &mut self,
        event: SessionEvent,
        dictionary: &DictionaryStore,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            SessionEvent::Boundary { utterance, offset } => {
                self.handle_boundary(utterance, offset, dictionary, &mut effects);
            }
            SessionEvent::Finished { utterance } => {
                if utterance == self.utterance_seq {
                    self.handle_finished();
                }
            }
            SessionEvent::EngineError { utterance, message } => {
                if utterance == self.utterance_seq {
                    warn!("Speech engine error: {message}");
                    self.handle_finished();
                }
            }
            SessionEvent::VisualResolved {
                request_id,
                word_index,
                image,
            } => self.handle_visual_resolved(request_id, word_index, image),
            SessionEvent::Pause => {
                if self.lifecycle == Lifecycle::Playing {
                    info!("Paused");
                    self.lifecycle = Lifecycle::Paused;
                    effects.push(Effect::PauseSpeech);
                }
            }
            SessionEvent::Resume => {
                if self.lifecycle == Lifecycle::Paused {
                    info!("Resumed");
                    self.lifecycle = Lifecycle::Playing;
                    effects.push(Effect::ResumeSpeech);
                }
            }
            SessionEvent::Stop => self.handle_stop(&mut effects),
            SessionEvent::SetRate(rate) => self.handle_set_rate(rate, &mut effects),
            SessionEvent::NudgeRate(delta) => {
                self.handle_set_rate(self.params.rate + delta, &mut effects);
            }
            SessionEvent::SetVoice(voice) => self.handle_set_voice(voice, &mut effects),
        }
        effects
    }

    fn handle_boundary(
        &mut self,
        utterance: u64,
        offset: usize,
        dictionary: &DictionaryStore,
        effects: &mut Vec<Effect>,
    ) {
        if utterance != self.utterance_seq {
            debug!(utterance, current = self.utterance_seq, "Ignoring stale boundary");
            return;
        }
        if self.lifecycle != Lifecycle::Playing {
            return;
        }

        let absolute = self.base_offset + offset;
        let Some(idx) = text_utils::span_at(&self.spans, absolute) else {
            debug!(offset = absolute, "Boundary fell outside any word span");
            return;
        };

        self.progress = text_utils::progress(absolute, self.text.len());
        if self.current_word != Some(idx) {
            self.current_word = Some(idx);
            debug!(word = %self.spans[idx].word, idx, progress = self.progress, "Highlight advanced");
        }

        // Repeated boundaries for the same word re-run resolution; lookups
        // are idempotent so the worst case is a duplicate fetch.
        let candidate = &self.spans[idx].word;
        if !word_filter::wants_visual(candidate) {
            return;
        }
        let key = text_utils::normalize_word(candidate);
        if let Some(image) = dictionary.get_image(&key) {
            debug!(word = %key, "Visual served from dictionary");
            self.current_visual = Some(Visual {
                word: key,
                image,
                source: VisualSource::Dictionary,
            });
            return;
        }
        self.request_seq += 1;
        effects.push(Effect::FetchVisual {
            word: key,
            word_index: idx,
            request_id: self.request_seq,
        });
    }

    fn handle_visual_resolved(
        &mut self,
        request_id: u64,
        word_index: usize,
        image: Option<String>,
    ) {
        if request_id != self.request_seq {
            debug!(request_id, current = self.request_seq, "Discarding stale visual");
            return;
        }
        if self.current_word != Some(word_index) {
            debug!(word_index, "Visual arrived for a word no longer current");
            return;
        }
        match image {
            Some(image) => {
                let word = text_utils::normalize_word(&self.spans[word_index].word);
                debug!(word = %word, "Visual served from image search");
                self.current_visual = Some(Visual {
                    word,
                    image,
                    source: VisualSource::Search,
                });
            }
            // A miss keeps the previous visual on screen; no flicker to blank.
            None => debug!("Image search missed; keeping previous visual"),
        }
    }

    fn handle_finished(&mut self) {
        info!("Utterance finished");
        self.lifecycle = Lifecycle::Idle;
        self.current_word = None;
        self.current_visual = None;
        self.progress = 0.0;
        self.base_offset = 0;
    }

    fn handle_stop(&mut self, effects: &mut Vec<Effect>) {
        if self.lifecycle == Lifecycle::Idle {
            return;
        }
        info!("Stopping playback");
        effects.push(Effect::CancelSpeech);
        self.lifecycle = Lifecycle::Idle;
        self.current_word = None;
        self.current_visual = None;
        self.progress = 0.0;
        self.base_offset = 0;
        // Orphan any in-flight image fetch.
        self.request_seq += 1;
    }

    fn handle_set_rate(&mut self, rate: f32, effects: &mut Vec<Effect>) {
        let clamped = rate.clamp(MIN_RATE, MAX_RATE);
        if (clamped - self.params.rate).abs() <= f32::EPSILON {
            return;
        }
        self.params.rate = clamped;
        info!(rate = clamped, "Adjusted speech rate");
        self.rebuild_utterance(effects);
    }

    fn handle_set_voice(&mut self, voice: Option<String>, effects: &mut Vec<Effect>) {
        if voice == self.params.voice {
            return;
        }
        self.params.voice = voice;
        info!(voice = ?self.params.voice, "Switched voice");
        self.rebuild_utterance(effects);
    }

    /// The engine cannot change rate or voice on a live utterance, so the
    /// utterance is rebuilt from the current word's start and boundary
    /// offsets are rebased there. The current highlight stays put until the
    /// next boundary fires.
    fn rebuild_utterance(&mut self, effects: &mut Vec<Effect>) {
        if self.lifecycle != Lifecycle::Playing {
            return;
        }
        let from_offset = self
            .current_word
            .map(|idx| self.spans[idx].start)
            .unwrap_or(self.base_offset);
        self.base_offset = from_offset;
        self.utterance_seq += 1;
        debug!(from_offset, utterance = self.utterance_seq, "Rebuilding utterance");
        effects.push(Effect::CancelSpeech);
        effects.push(Effect::StartUtterance {
            utterance: self.utterance_seq,
            from_offset,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{Effect, Lifecycle, ReadingSession, SessionEvent, VisualSource};
    use crate::dictionary::DictionaryStore;
    use crate::tts::SpeechParams;
    use tempfile::TempDir;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn params() -> SpeechParams {
        SpeechParams {
            voice: None,
            rate: 1.0,
            pitch: 1.0,
        }
    }

    fn empty_dictionary(dir: &TempDir) -> DictionaryStore {
        DictionaryStore::open(&dir.path().join("dictionary.json"))
    }

    fn boundary(utterance: u64, offset: usize) -> SessionEvent {
        SessionEvent::Boundary { utterance, offset }
    }

    #[test]
    fn start_on_empty_text_stays_idle() {
        let mut session = ReadingSession::new("   ".to_string(), params());
        assert!(session.start().is_empty());
        assert_eq!(session.lifecycle(), Lifecycle::Idle);
    }

    #[test]
    fn boundary_resolves_word_and_progress() {
        let dir = TempDir::new().unwrap();
        let dictionary = empty_dictionary(&dir);
        let mut session = ReadingSession::new("cat     sat".to_string(), params());
        session.start();

        session.handle_event(boundary(1, 9), &dictionary);
        assert_eq!(session.current_word_text(), Some("sat"));
        assert!(session.progress() > 0.0);
    }

    #[test]
    fn content_word_miss_emits_fetch_effect() {
        let dir = TempDir::new().unwrap();
        let dictionary = empty_dictionary(&dir);
        let mut session = ReadingSession::new("the elephant".to_string(), params());
        session.start();

        // Stop word: highlight moves, no fetch.
        let effects = session.handle_event(boundary(1, 0), &dictionary);
        assert!(effects.is_empty());
        assert_eq!(session.current_word_text(), Some("the"));

        let effects = session.handle_event(boundary(1, 4), &dictionary);
        assert_eq!(
            effects,
            vec![Effect::FetchVisual {
                word: "elephant".to_string(),
                word_index: 1,
                request_id: 1,
            }]
        );
    }

    #[test]
    fn dictionary_hit_skips_the_search() {
        let dir = TempDir::new().unwrap();
        let mut dictionary = empty_dictionary(&dir);
        dictionary.save_word("elephant", Some(PIXEL)).unwrap();

        let mut session = ReadingSession::new("elephant".to_string(), params());
        session.start();
        let effects = session.handle_event(boundary(1, 0), &dictionary);

        assert!(effects.is_empty());
        let visual = session.current_visual().expect("visual should be set");
        assert_eq!(visual.source, VisualSource::Dictionary);
        assert_eq!(visual.image, PIXEL);
    }

    #[test]
    fn repeated_boundary_on_same_word_refetches() {
        let dir = TempDir::new().unwrap();
        let dictionary = empty_dictionary(&dir);
        let mut session = ReadingSession::new("elephant".to_string(), params());
        session.start();

        let first = session.handle_event(boundary(1, 0), &dictionary);
        let second = session.handle_event(boundary(1, 2), &dictionary);
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1, "same-word boundary still resolves images");
        assert_ne!(first, second, "each fetch carries a fresh request id");
        assert_eq!(session.current_word(), Some(0));
    }

    #[test]
    fn resolved_visual_applies_to_current_word() {
        let dir = TempDir::new().unwrap();
        let dictionary = empty_dictionary(&dir);
        let mut session = ReadingSession::new("elephant".to_string(), params());
        session.start();
        session.handle_event(boundary(1, 0), &dictionary);

        session.handle_event(
            SessionEvent::VisualResolved {
                request_id: 1,
                word_index: 0,
                image: Some("https://img.example/elephant.jpg".to_string()),
            },
            &dictionary,
        );
        let visual = session.current_visual().unwrap();
        assert_eq!(visual.source, VisualSource::Search);
        assert_eq!(visual.word, "elephant");
    }

    #[test]
    fn stale_visual_is_discarded() {
        let dir = TempDir::new().unwrap();
        let dictionary = empty_dictionary(&dir);
        let mut session = ReadingSession::new("elephant giraffe".to_string(), params());
        session.start();

        session.handle_event(boundary(1, 0), &dictionary); // request 1
        session.handle_event(boundary(1, 9), &dictionary); // request 2

        session.handle_event(
            SessionEvent::VisualResolved {
                request_id: 1,
                word_index: 0,
                image: Some("https://img.example/elephant.jpg".to_string()),
            },
            &dictionary,
        );
        assert!(session.current_visual().is_none(), "stale result must not apply");
    }

    #[test]
    fn miss_retains_previous_visual() {
        let dir = TempDir::new().unwrap();
        let dictionary = empty_dictionary(&dir);
        let mut session = ReadingSession::new("elephant".to_string(), params());
        session.start();
        session.handle_event(boundary(1, 0), &dictionary);
        session.handle_event(
            SessionEvent::VisualResolved {
                request_id: 1,
                word_index: 0,
                image: Some("https://img.example/elephant.jpg".to_string()),
            },
            &dictionary,
        );

        session.handle_event(boundary(1, 3), &dictionary); // request 2, same word
        session.handle_event(
            SessionEvent::VisualResolved {
                request_id: 2,
                word_index: 0,
                image: None,
            },
            &dictionary,
        );
        assert!(session.current_visual().is_some(), "miss keeps the old visual");
    }

    #[test]
    fn stop_clears_everything() {
        let dir = TempDir::new().unwrap();
        let dictionary = empty_dictionary(&dir);
        let mut session = ReadingSession::new("elephant".to_string(), params());
        session.start();
        session.handle_event(boundary(1, 0), &dictionary);

        let effects = session.handle_event(SessionEvent::Stop, &dictionary);
        assert!(effects.contains(&Effect::CancelSpeech));
        assert_eq!(session.lifecycle(), Lifecycle::Idle);
        assert_eq!(session.current_word(), None);
        assert!(session.current_visual().is_none());
        assert_eq!(session.progress(), 0.0);

        // A fetch issued before the stop must not apply afterwards.
        session.handle_event(
            SessionEvent::VisualResolved {
                request_id: 1,
                word_index: 0,
                image: Some("https://img.example/late.jpg".to_string()),
            },
            &dictionary,
        );
        assert!(session.current_visual().is_none());
    }

    #[test]
    fn pause_and_resume_keep_position() {
        let dir = TempDir::new().unwrap();
        let dictionary = empty_dictionary(&dir);
        let mut session = ReadingSession::new("elephant giraffe".to_string(), params());
        session.start();
        session.handle_event(boundary(1, 0), &dictionary);

        let effects = session.handle_event(SessionEvent::Pause, &dictionary);
        assert_eq!(effects, vec![Effect::PauseSpeech]);
        assert_eq!(session.lifecycle(), Lifecycle::Paused);
        assert_eq!(session.current_word(), Some(0));

        let effects = session.handle_event(SessionEvent::Resume, &dictionary);
        assert_eq!(effects, vec![Effect::ResumeSpeech]);
        assert_eq!(session.lifecycle(), Lifecycle::Playing);
    }

    #[test]
    fn rate_change_rebuilds_from_current_word_and_keeps_highlight() {
        let dir = TempDir::new().unwrap();
        let dictionary = empty_dictionary(&dir);
        let mut session = ReadingSession::new("cat     sat mat".to_string(), params());
        session.start();
        session.handle_event(boundary(1, 9), &dictionary); // "sat", span start 8

        let effects = session.handle_event(SessionEvent::SetRate(1.5), &dictionary);
        assert_eq!(
            effects,
            vec![
                Effect::CancelSpeech,
                Effect::StartUtterance {
                    utterance: 2,
                    from_offset: 8,
                },
            ]
        );
        // Highlight survives until the new utterance's first boundary.
        assert_eq!(session.current_word_text(), Some("sat"));

        // Boundaries from the cancelled utterance are ignored now.
        session.handle_event(boundary(1, 12), &dictionary);
        assert_eq!(session.current_word_text(), Some("sat"));

        // The new utterance's offsets are rebased: offset 0 is "sat" again,
        // offset 4 is "mat".
        session.handle_event(boundary(2, 4), &dictionary);
        assert_eq!(session.current_word_text(), Some("mat"));
    }

    #[test]
    fn rate_change_while_idle_only_updates_params() {
        let dir = TempDir::new().unwrap();
        let dictionary = empty_dictionary(&dir);
        let mut session = ReadingSession::new("cat".to_string(), params());
        let effects = session.handle_event(SessionEvent::SetRate(0.5), &dictionary);
        assert!(effects.is_empty());
        assert_eq!(session.params().rate, 0.5);
    }

    #[test]
    fn finished_resets_the_session() {
        let dir = TempDir::new().unwrap();
        let dictionary = empty_dictionary(&dir);
        let mut session = ReadingSession::new("elephant".to_string(), params());
        session.start();
        session.handle_event(boundary(1, 0), &dictionary);

        session.handle_event(SessionEvent::Finished { utterance: 1 }, &dictionary);
        assert_eq!(session.lifecycle(), Lifecycle::Idle);
        assert_eq!(session.current_word(), None);

        // A Finished from an utterance that was already replaced is ignored.
        let mut session = ReadingSession::new("cat     sat".to_string(), params());
        session.start();
        session.handle_event(boundary(1, 0), &dictionary);
        session.handle_event(SessionEvent::SetRate(2.0), &dictionary); // utterance 2
        session.handle_event(SessionEvent::Finished { utterance: 1 }, &dictionary);
        assert_eq!(session.lifecycle(), Lifecycle::Playing);
    }
}
