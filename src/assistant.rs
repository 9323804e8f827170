//! The assistant session loop
//!
//! Wires capture, VAD, segment recording, the turn engine and playback into
//! one listening session. The loop ticks every 100ms: it drains the capture
//! buffer, meters loudness, advances the VAD and feeds any open segment.
//! Network-bound turn work runs as a spawned task so detection of the next
//! utterance continues while a turn is in flight; segments sealed during
//! that window are dropped by the turn gate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::chat::ChatClient;
use crate::config::{Config, SettingsProvider};
use crate::context::ConversationContext;
use crate::notes::NoteStore;
use crate::sinks::{ChatLogSink, StatusSink, TraceChatLog, TraceStatus};
use crate::turn::{TurnEngine, TurnPhase, TurnReply};
use crate::voice::{
    AudioCapture, AudioFormat, AudioPlayback, SAMPLE_RATE, SegmentRecorder, SpeechToText,
    TextToSpeech, VadEdge, VoiceActivityDetector, meter,
};
use crate::Result;

/// Tick interval for the VAD sampling loop
const TICK_MS: u64 = 100;

/// The lectern assistant
pub struct Assistant {
    config: Config,
    status: Arc<dyn StatusSink>,
    chat_log: Arc<dyn ChatLogSink>,
}

impl Assistant {
    /// Create an assistant with tracing-backed sinks
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            status: Arc::new(TraceStatus),
            chat_log: Arc::new(TraceChatLog),
        }
    }

    /// Run one listening session until shutdown
    ///
    /// Settings are snapshotted once at session start; configuration changes
    /// apply to the next session. Device acquisition failures are fatal to
    /// the session and surface before any listening begins.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Device`] if the microphone or speaker cannot
    /// be acquired, or [`crate::Error::Config`] for missing settings
    // Runs on the calling thread: cpal streams aren't Send
    #[allow(clippy::future_not_send, clippy::too_many_lines)]
    pub async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) -> Result<()> {
        let settings = Arc::new(self.config.session_settings()?);
        let tts_format = AudioFormat::parse(&settings.tts_format)?;

        let stt = SpeechToText::new(settings.api_key.clone(), settings.stt_model.clone())?;
        let chat = ChatClient::new(settings.api_key.clone(), settings.model.clone())?;
        let tts = TextToSpeech::new(
            settings.api_key.clone(),
            settings.tts_model.clone(),
            settings.tts_speed,
            tts_format,
        )?;

        let context = Arc::new(Mutex::new(ConversationContext::with_system_prompt(
            &settings.system_prompt,
        )));
        let notes = Arc::new(Mutex::new(NoteStore::new(&self.config.data_dir)));

        let engine = TurnEngine::new(
            Arc::new(stt),
            Arc::new(chat),
            Arc::new(tts),
            context,
            notes,
            Arc::clone(&self.status),
            Arc::clone(&self.chat_log),
            Arc::clone(&settings),
        );

        let mut vad = VoiceActivityDetector::new(settings.vad);
        let mut recorder = SegmentRecorder::new(SAMPLE_RATE);

        let mut capture = AudioCapture::new()?;
        let playback = AudioPlayback::new()?;
        capture.start()?;

        engine.set_phase(TurnPhase::Monitoring);
        self.status.set("Listening for wake word…");
        tracing::info!(
            wake_word = %settings.wake_word,
            threshold = settings.vad.threshold,
            silence_hold_ms = settings.vad.silence_hold_ms,
            "listening session started"
        );

        let mut cadence = tokio::time::interval(Duration::from_millis(TICK_MS));
        cadence.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut turn: Option<JoinHandle<Option<TurnReply>>> = None;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                res = async { turn.as_mut().expect("guarded by is_some").await }, if turn.is_some() => {
                    turn = None;
                    match res {
                        Ok(Some(reply)) => {
                            if let Some(audio) = &reply.audio {
                                // Playback blocks until the reply has been
                                // heard; block_in_place keeps the runtime's
                                // other tasks (ctrl-c handler) running.
                                let played = tokio::task::block_in_place(|| {
                                    playback.play_encoded(audio)
                                });
                                if let Err(e) = played {
                                    tracing::warn!(error = %e, "playback failed, reply not spoken");
                                }
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "turn task failed");
                        }
                    }
                    engine.finish_turn();
                }
                _ = cadence.tick() => {
                    let chunk = capture.drain();
                    // No samples arrived: don't advance the VAD on a
                    // phantom silence reading (device warm-up).
                    if chunk.is_empty() {
                        continue;
                    }

                    let loudness = meter::rms(&chunk);
                    let edge = vad.tick(loudness, Instant::now());

                    if edge == Some(VadEdge::SpeechStarted) {
                        recorder.on_speech_started();
                        if !engine.gate().is_in_flight() {
                            engine.set_phase(TurnPhase::Recording);
                        }
                    }

                    if recorder.is_recording() {
                        recorder.push_chunk(chunk);
                    }

                    if edge == Some(VadEdge::SpeechEnded) {
                        if let Some(segment) = recorder.on_speech_ended() {
                            dispatch_segment(segment, &engine, &mut turn);
                        }
                    }
                }
            }
        }

        // Stop: release the device, discard anything mid-flight, and make
        // sure no in-flight result is applied to state afterwards.
        if let Some(handle) = turn.take() {
            handle.abort();
        }
        recorder.discard();
        capture.stop();
        engine.set_phase(TurnPhase::Idle);
        self.status.set("Stopped.");
        tracing::info!(
            turns = engine.gate().turns_started(),
            dropped_segments = engine.gate().segments_dropped(),
            "listening session ended"
        );

        Ok(())
    }

}

/// Start a turn for a sealed segment, or drop it
fn dispatch_segment(
    segment: crate::voice::AudioSegment,
    engine: &TurnEngine,
    turn: &mut Option<JoinHandle<Option<TurnReply>>>,
) {
    if segment.is_empty() {
        tracing::debug!("empty segment, skipped");
        if !engine.gate().is_in_flight() {
            engine.set_phase(TurnPhase::Monitoring);
        }
        return;
    }

    if engine.offer_segment() {
        tracing::debug!(
            duration_ms = segment.duration_ms(),
            samples = segment.sample_count(),
            "turn started"
        );
        let task_engine = engine.clone();
        *turn = Some(tokio::spawn(async move { task_engine.run_turn(segment).await }));
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::Result;
    use crate::config::{SessionSettings, VadConfig};
    use crate::context::Message;
    use crate::turn::{ChatService, SpeechService, TranscriptionService};
    use crate::voice::{AudioSegment, EncodedAudio};

    struct NullStt;

    #[async_trait]
    impl TranscriptionService for NullStt {
        async fn transcribe(&self, _segment: &AudioSegment) -> Result<String> {
            Ok(String::new())
        }
    }

    struct NullChat;

    #[async_trait]
    impl ChatService for NullChat {
        async fn complete(&self, _messages: &[Message]) -> Result<String> {
            Ok(String::new())
        }
    }

    struct NullTts;

    #[async_trait]
    impl SpeechService for NullTts {
        async fn synthesize(&self, _text: &str, _voice: &str) -> Result<EncodedAudio> {
            Ok(EncodedAudio {
                bytes: Vec::new(),
                format: AudioFormat::Wav,
            })
        }
    }

    fn test_engine() -> TurnEngine {
        TurnEngine::new(
            Arc::new(NullStt),
            Arc::new(NullChat),
            Arc::new(NullTts),
            Arc::new(Mutex::new(ConversationContext::default())),
            Arc::new(Mutex::new(NoteStore::in_memory())),
            Arc::new(TraceStatus),
            Arc::new(TraceChatLog),
            Arc::new(SessionSettings {
                api_key: "test".to_string(),
                wake_word: "computer".to_string(),
                end_word: String::new(),
                voice: "alloy".to_string(),
                system_prompt: String::new(),
                model: "gpt-4o-mini".to_string(),
                stt_model: "whisper-1".to_string(),
                tts_model: "tts-1".to_string(),
                tts_speed: 1.0,
                tts_format: "wav".to_string(),
                vad: VadConfig::default(),
            }),
        )
    }

    fn empty_segment() -> AudioSegment {
        let mut rec = SegmentRecorder::new(SAMPLE_RATE);
        rec.on_speech_started();
        rec.on_speech_ended().expect("open segment seals")
    }

    #[tokio::test]
    async fn empty_segment_mid_turn_leaves_phase_alone() {
        let engine = test_engine();
        assert!(engine.offer_segment());
        engine.set_phase(TurnPhase::Transcribing);

        let mut turn = None;
        dispatch_segment(empty_segment(), &engine, &mut turn);

        assert!(turn.is_none());
        assert_eq!(engine.phase(), TurnPhase::Transcribing);
        assert_eq!(engine.gate().turns_started(), 1);
    }

    #[tokio::test]
    async fn empty_segment_with_no_turn_returns_to_monitoring() {
        let engine = test_engine();
        engine.set_phase(TurnPhase::Recording);

        let mut turn = None;
        dispatch_segment(empty_segment(), &engine, &mut turn);

        assert!(turn.is_none());
        assert_eq!(engine.phase(), TurnPhase::Monitoring);
        assert_eq!(engine.gate().turns_started(), 0);
    }
}
