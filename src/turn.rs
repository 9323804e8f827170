//! Turn orchestration
//!
//! A turn is one full cycle from a sealed audio segment through
//! transcription, interpretation, action and spoken reply. The engine
//! enforces the single-turn-in-flight rule: segments sealed while a turn is
//! running are dropped, never queued. Failures short-circuit the turn and
//! listening resumes — partial side effects (a user message already appended
//! to the conversation, a saved note) are kept, never rolled back.

use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::chat::ChatClient;
use crate::config::SessionSettings;
use crate::context::{ConversationContext, Message, Role};
use crate::interpret::{Interpretation, interpret};
use crate::notes::NoteStore;
use crate::sinks::{ChatLogSink, StatusSink};
use crate::voice::{AudioSegment, EncodedAudio, SpeechToText, TextToSpeech};
use crate::Result;

/// Reply spoken when a note command completes
const NOTE_CONFIRMATION: &str = "Your note has been saved.";

/// Phase of the turn state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Not listening
    Idle,
    /// VAD active, no open segment, no turn in flight
    Monitoring,
    /// Segment open, audio accumulating
    Recording,
    /// Segment sealed, transcription in flight
    Transcribing,
    /// Transcript being matched against wake/end/note rules
    Interpreting,
    /// Note being saved or chat completion in flight
    Acting,
    /// Reply being synthesized or played
    Speaking,
}

/// Transcribes a sealed audio segment
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Transcribe the segment to text
    async fn transcribe(&self, segment: &AudioSegment) -> Result<String>;
}

/// Completes a conversation with the assistant's next reply
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Produce a reply to the ordered message history
    async fn complete(&self, messages: &[Message]) -> Result<String>;
}

/// Synthesizes reply text to playable audio
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Synthesize `text` with the given voice
    async fn synthesize(&self, text: &str, voice: &str) -> Result<EncodedAudio>;
}

#[async_trait]
impl TranscriptionService for SpeechToText {
    async fn transcribe(&self, segment: &AudioSegment) -> Result<String> {
        let wav = segment.to_wav()?;
        self.transcribe(wav).await
    }
}

#[async_trait]
impl ChatService for ChatClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        self.complete(messages).await
    }
}

#[async_trait]
impl SpeechService for TextToSpeech {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<EncodedAudio> {
        self.synthesize(text, voice).await
    }
}

/// Single-turn-in-flight gate with drop accounting
#[derive(Debug, Default)]
pub struct TurnGate {
    in_flight: AtomicBool,
    started: AtomicU64,
    dropped: AtomicU64,
}

impl TurnGate {
    /// Claim the turn slot; false if a turn is already in flight
    pub fn try_begin(&self) -> bool {
        let claimed = self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if claimed {
            self.started.fetch_add(1, Ordering::Relaxed);
        }
        claimed
    }

    /// Release the turn slot
    pub fn finish(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    /// Record a segment dropped because a turn was in flight
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Whether a turn is in flight
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Turns started over the gate's lifetime
    pub fn turns_started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    /// Segments dropped over the gate's lifetime
    pub fn segments_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Spoken reply produced by a completed turn
#[derive(Debug)]
pub struct TurnReply {
    /// Reply text (already recorded in conversation/notes state)
    pub text: String,
    /// Synthesized audio; `None` when synthesis failed (the reply is kept)
    pub audio: Option<EncodedAudio>,
}

/// Runs turns against the injected services and session state
///
/// Cheap to clone; clones share conversation context, notes, sinks and the
/// turn gate.
#[derive(Clone)]
pub struct TurnEngine {
    stt: Arc<dyn TranscriptionService>,
    chat: Arc<dyn ChatService>,
    tts: Arc<dyn SpeechService>,
    context: Arc<Mutex<ConversationContext>>,
    notes: Arc<Mutex<NoteStore>>,
    status: Arc<dyn StatusSink>,
    chat_log: Arc<dyn ChatLogSink>,
    settings: Arc<SessionSettings>,
    gate: Arc<TurnGate>,
    phase: Arc<StdMutex<TurnPhase>>,
}

impl TurnEngine {
    /// Create an engine over the given services and session state
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stt: Arc<dyn TranscriptionService>,
        chat: Arc<dyn ChatService>,
        tts: Arc<dyn SpeechService>,
        context: Arc<Mutex<ConversationContext>>,
        notes: Arc<Mutex<NoteStore>>,
        status: Arc<dyn StatusSink>,
        chat_log: Arc<dyn ChatLogSink>,
        settings: Arc<SessionSettings>,
    ) -> Self {
        Self {
            stt,
            chat,
            tts,
            context,
            notes,
            status,
            chat_log,
            settings,
            gate: Arc::new(TurnGate::default()),
            phase: Arc::new(StdMutex::new(TurnPhase::Idle)),
        }
    }

    /// The gate enforcing single-turn-in-flight
    #[must_use]
    pub fn gate(&self) -> &TurnGate {
        &self.gate
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> TurnPhase {
        self.phase.lock().map_or(TurnPhase::Idle, |p| *p)
    }

    /// Set the phase (the session loop drives Monitoring/Recording)
    pub fn set_phase(&self, phase: TurnPhase) {
        if let Ok(mut p) = self.phase.lock() {
            *p = phase;
        }
    }

    /// Offer a sealed segment: claim the gate or drop the segment
    ///
    /// Returns true if the caller now owns a turn and must run it.
    pub fn offer_segment(&self) -> bool {
        if self.gate.try_begin() {
            return true;
        }
        self.gate.record_dropped();
        tracing::debug!(
            phase = ?self.phase(),
            dropped = self.gate.segments_dropped(),
            "segment dropped: turn already in flight"
        );
        false
    }

    /// Release the turn slot and return to monitoring
    pub fn finish_turn(&self) {
        self.gate.finish();
        self.set_phase(TurnPhase::Monitoring);
        self.status.set("Listening for wake word…");
    }

    /// Run one turn over a sealed segment
    ///
    /// Returns the reply to speak, or `None` when the turn ended early
    /// (transcription failure, wake word missing, chat failure). The caller
    /// must call [`TurnEngine::finish_turn`] afterwards, whatever the
    /// outcome.
    pub async fn run_turn(&self, segment: AudioSegment) -> Option<TurnReply> {
        self.set_phase(TurnPhase::Transcribing);
        self.status.set("Transcribing…");

        let transcript = match self.stt.transcribe(&segment).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed, resuming listening");
                self.status.set("Transcription error. Listening…");
                return None;
            }
        };

        self.set_phase(TurnPhase::Interpreting);
        let parsed = match interpret(
            &transcript,
            &self.settings.wake_word,
            &self.settings.end_word,
        ) {
            Interpretation::NotWoken => {
                tracing::debug!(transcript, "wake word missing, transcript discarded");
                self.status.set("Wake word not detected. Listening…");
                return None;
            }
            Interpretation::Woken(parsed) => parsed,
        };

        self.set_phase(TurnPhase::Acting);
        self.chat_log.append(Role::User, &parsed.payload);

        let reply_text = if parsed.is_note {
            self.status.set("Saving your note…");
            if let Err(e) = self.notes.lock().await.append(&parsed.payload) {
                tracing::warn!(error = %e, "note file append failed, note kept in memory");
            }
            tracing::info!(note = %parsed.payload, "note captured");
            NOTE_CONFIRMATION.to_string()
        } else {
            self.status.set("Generating answer…");
            let messages = {
                let mut ctx = self.context.lock().await;
                ctx.append(Message::new(Role::User, parsed.payload.clone()));
                ctx.messages().to_vec()
            };

            match self.chat.complete(&messages).await {
                Ok(reply) => {
                    self.context
                        .lock()
                        .await
                        .append(Message::new(Role::Assistant, reply.clone()));
                    reply
                }
                Err(e) => {
                    // The user message stays in the context: forward
                    // recovery only, no transactional undo.
                    tracing::warn!(error = %e, "chat completion failed, resuming listening");
                    self.status.set("Chat error. Listening…");
                    return None;
                }
            }
        };

        self.chat_log.append(Role::Assistant, &reply_text);

        self.set_phase(TurnPhase::Speaking);
        self.status.set("Speaking…");
        let audio = match self
            .tts
            .synthesize(&reply_text, &self.settings.voice)
            .await
        {
            Ok(audio) => Some(audio),
            Err(e) => {
                // The computed reply is already in the history; failing to
                // speak it does not lose it.
                tracing::warn!(error = %e, "speech synthesis failed, reply not spoken");
                None
            }
        };

        Some(TurnReply {
            text: reply_text,
            audio,
        })
    }
}
