//! Energy-threshold voice activity detection
//!
//! A two-state machine over a stream of loudness samples. Speech starts on
//! the first sample above the threshold — responsiveness wins over
//! false-positive rejection, so there is no start debounce. Speech ends once
//! loudness has stayed at or below the threshold for the silence-hold
//! duration.

use std::time::Instant;

use crate::config::VadConfig;

/// Edge emitted by a VAD tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadEdge {
    /// Loudness crossed above the threshold while idle
    SpeechStarted,
    /// Sustained silence confirmed the end of an utterance
    SpeechEnded,
}

/// Detector state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VadState {
    Idle,
    Speaking,
}

/// Energy-based voice activity detector
///
/// Threshold and hold duration are fixed at construction; configuration
/// changes take effect on the next listening session, never mid-utterance.
#[derive(Debug)]
pub struct VoiceActivityDetector {
    threshold: f32,
    silence_hold_ms: u64,
    state: VadState,
    silence_since: Option<Instant>,
}

impl VoiceActivityDetector {
    /// Create a detector from session VAD configuration
    #[must_use]
    pub const fn new(config: VadConfig) -> Self {
        Self {
            threshold: config.threshold,
            silence_hold_ms: config.silence_hold_ms,
            state: VadState::Idle,
            silence_since: None,
        }
    }

    /// Consume one loudness sample; emit an edge on state transition
    ///
    /// Each call is O(1) arithmetic and never blocks. Ticks only arrive
    /// while the assistant is listening; a stopped session produces none.
    pub fn tick(&mut self, loudness: f32, now: Instant) -> Option<VadEdge> {
        match self.state {
            VadState::Idle => {
                if loudness > self.threshold {
                    self.state = VadState::Speaking;
                    self.silence_since = None;
                    return Some(VadEdge::SpeechStarted);
                }
                None
            }
            VadState::Speaking => {
                if loudness > self.threshold {
                    self.silence_since = None;
                    return None;
                }

                let since = *self.silence_since.get_or_insert(now);
                if now.duration_since(since).as_millis() > u128::from(self.silence_hold_ms) {
                    self.state = VadState::Idle;
                    self.silence_since = None;
                    return Some(VadEdge::SpeechEnded);
                }
                None
            }
        }
    }

    /// Whether the detector currently considers the user to be speaking
    #[must_use]
    pub const fn is_speaking(&self) -> bool {
        matches!(self.state, VadState::Speaking)
    }
}
