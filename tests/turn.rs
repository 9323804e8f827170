//! Turn machine integration tests
//!
//! Drives the turn engine with mock services through the public trait
//! seams, without audio hardware or network access.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::sync::Mutex;

use lectern::config::{SessionSettings, VadConfig};
use lectern::context::{ConversationContext, Message, Role};
use lectern::notes::NoteStore;
use lectern::sinks::{ChatLogSink, StatusSink};
use lectern::turn::{ChatService, SpeechService, TranscriptionService, TurnEngine, TurnPhase};
use lectern::voice::{AudioFormat, AudioSegment, EncodedAudio, SAMPLE_RATE, SegmentRecorder};
use lectern::{Error, Result};

mod common;

struct FixedStt(String);

#[async_trait]
impl TranscriptionService for FixedStt {
    async fn transcribe(&self, _segment: &AudioSegment) -> Result<String> {
        Ok(self.0.clone())
    }
}

struct EchoChat;

#[async_trait]
impl ChatService for EchoChat {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let last = messages.last().map_or("", |m| m.content.as_str());
        Ok(format!("echo: {last}"))
    }
}

struct FailingChat;

#[async_trait]
impl ChatService for FailingChat {
    async fn complete(&self, _messages: &[Message]) -> Result<String> {
        Err(Error::Chat("upstream unavailable".to_string()))
    }
}

struct SilentTts;

#[async_trait]
impl SpeechService for SilentTts {
    async fn synthesize(&self, _text: &str, _voice: &str) -> Result<EncodedAudio> {
        Ok(EncodedAudio {
            bytes: vec![0u8; 16],
            format: AudioFormat::Wav,
        })
    }
}

struct CapturedStatus(StdMutex<Vec<String>>);

impl StatusSink for CapturedStatus {
    fn set(&self, status: &str) {
        if let Ok(mut v) = self.0.lock() {
            v.push(status.to_string());
        }
    }
}

struct NullChatLog;

impl ChatLogSink for NullChatLog {
    fn append(&self, _role: Role, _text: &str) {}
}

fn test_settings() -> Arc<SessionSettings> {
    Arc::new(SessionSettings {
        api_key: "sk-test".to_string(),
        wake_word: "computer".to_string(),
        end_word: "thank you".to_string(),
        voice: "alloy".to_string(),
        system_prompt: "You are a helpful assistant.".to_string(),
        model: "gpt-4o-mini".to_string(),
        stt_model: "whisper-1".to_string(),
        tts_model: "tts-1".to_string(),
        tts_speed: 1.0,
        tts_format: "wav".to_string(),
        vad: VadConfig {
            threshold: 0.03,
            silence_hold_ms: 500,
        },
    })
}

/// Seal a short real segment through the recorder
fn sealed_segment() -> AudioSegment {
    let mut recorder = SegmentRecorder::new(SAMPLE_RATE);
    recorder.on_speech_started();
    recorder.push_chunk(common::sine_samples(440.0, 0.5, 0.5));
    recorder.on_speech_ended().expect("segment should seal")
}

fn engine_with(
    stt: Arc<dyn TranscriptionService>,
    chat: Arc<dyn ChatService>,
    context: Arc<Mutex<ConversationContext>>,
    status: Arc<CapturedStatus>,
) -> TurnEngine {
    TurnEngine::new(
        stt,
        chat,
        Arc::new(SilentTts),
        context,
        Arc::new(Mutex::new(NoteStore::in_memory())),
        status,
        Arc::new(NullChatLog),
        test_settings(),
    )
}

#[tokio::test]
async fn full_query_turn_produces_spoken_reply() {
    let context = Arc::new(Mutex::new(ConversationContext::with_system_prompt(
        "You are a helpful assistant.",
    )));
    let status = Arc::new(CapturedStatus(StdMutex::new(Vec::new())));
    let engine = engine_with(
        Arc::new(FixedStt("Computer, what time is it?".to_string())),
        Arc::new(EchoChat),
        Arc::clone(&context),
        Arc::clone(&status),
    );

    assert!(engine.offer_segment());
    let reply = engine.run_turn(sealed_segment()).await;
    engine.finish_turn();

    let reply = reply.expect("woken query should produce a reply");
    assert_eq!(reply.text, "echo: what time is it?");
    assert!(reply.audio.is_some());

    let ctx = context.lock().await;
    let roles: Vec<Role> = ctx.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);

    let statuses = status.0.lock().unwrap();
    assert!(statuses.iter().any(|s| s == "Generating answer…"));
    assert!(statuses.iter().any(|s| s == "Speaking…"));
    assert_eq!(statuses.last().unwrap(), "Listening for wake word…");
}

#[tokio::test]
async fn chat_failure_recovers_without_rolling_back_context() {
    let context = Arc::new(Mutex::new(ConversationContext::with_system_prompt(
        "You are a helpful assistant.",
    )));
    let status = Arc::new(CapturedStatus(StdMutex::new(Vec::new())));
    let engine = engine_with(
        Arc::new(FixedStt("Computer, what's the weather?".to_string())),
        Arc::new(FailingChat),
        Arc::clone(&context),
        Arc::clone(&status),
    );

    assert!(engine.offer_segment());
    let reply = engine.run_turn(sealed_segment()).await;
    engine.finish_turn();

    assert!(reply.is_none());

    // The user message stays; no transactional undo
    let ctx = context.lock().await;
    let roles: Vec<Role> = ctx.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::System, Role::User]);
    drop(ctx);

    // The gate is free again: the next segment starts a new turn
    assert!(!engine.gate().is_in_flight());
    assert!(engine.offer_segment());
}

#[tokio::test]
async fn second_segment_during_turn_is_dropped() {
    let context = Arc::new(Mutex::new(ConversationContext::default()));
    let status = Arc::new(CapturedStatus(StdMutex::new(Vec::new())));
    let engine = engine_with(
        Arc::new(FixedStt("Computer, hello".to_string())),
        Arc::new(EchoChat),
        context,
        status,
    );

    assert!(engine.offer_segment());
    assert!(!engine.offer_segment());
    assert!(!engine.offer_segment());
    assert_eq!(engine.gate().segments_dropped(), 2);
    assert_eq!(engine.gate().turns_started(), 1);

    engine.finish_turn();
    assert!(engine.offer_segment());
    assert_eq!(engine.gate().turns_started(), 2);
}

#[tokio::test]
async fn note_turn_does_not_touch_conversation_context() {
    let context = Arc::new(Mutex::new(ConversationContext::with_system_prompt(
        "You are a helpful assistant.",
    )));
    let status = Arc::new(CapturedStatus(StdMutex::new(Vec::new())));
    let engine = engine_with(
        Arc::new(FixedStt("Computer, take a note water the plants".to_string())),
        Arc::new(EchoChat),
        Arc::clone(&context),
        Arc::clone(&status),
    );

    assert!(engine.offer_segment());
    let reply = engine.run_turn(sealed_segment()).await;
    engine.finish_turn();

    let reply = reply.expect("note turn should confirm");
    assert_eq!(reply.text, "Your note has been saved.");

    // A note is not a chat turn
    let ctx = context.lock().await;
    assert_eq!(ctx.len(), 1);
    assert_eq!(ctx.messages()[0].role, Role::System);
}

#[tokio::test]
async fn phase_returns_to_monitoring_after_finish() {
    let context = Arc::new(Mutex::new(ConversationContext::default()));
    let status = Arc::new(CapturedStatus(StdMutex::new(Vec::new())));
    let engine = engine_with(
        Arc::new(FixedStt("no wake word here".to_string())),
        Arc::new(EchoChat),
        context,
        status,
    );

    assert!(engine.offer_segment());
    let reply = engine.run_turn(sealed_segment()).await;
    engine.finish_turn();

    assert!(reply.is_none());
    assert_eq!(engine.phase(), TurnPhase::Monitoring);
}
