//! Lectern - hands-free voice assistant
//!
//! This library provides the core functionality for the lectern assistant:
//! - Continuous loudness monitoring and voice activity detection
//! - Automatic recording boundaries around spoken utterances
//! - Wake-phrase recognition and note-vs-query routing
//! - STT, chat completion and TTS over the OpenAI API
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │                    Microphone                       │
//! └────────────────────┬───────────────────────────────┘
//!                      │ 100ms chunks
//! ┌────────────────────▼───────────────────────────────┐
//! │   Meter  →  VAD  →  Segment Recorder  →  Gate      │
//! └────────────────────┬───────────────────────────────┘
//!                      │ one sealed segment at a time
//! ┌────────────────────▼───────────────────────────────┐
//! │   STT  →  Interpret  →  Note / Chat  →  TTS        │
//! └────────────────────┬───────────────────────────────┘
//!                      │
//! ┌────────────────────▼───────────────────────────────┐
//! │                     Speaker                         │
//! └────────────────────────────────────────────────────┘
//! ```

pub mod assistant;
pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod interpret;
pub mod notes;
pub mod sinks;
pub mod turn;
pub mod voice;

pub use assistant::Assistant;
pub use config::{Config, SessionSettings, SettingsProvider};
pub use context::{ConversationContext, Message, Role};
pub use error::{Error, Result};
pub use interpret::{Interpretation, ParsedUtterance, interpret};
pub use turn::{TurnEngine, TurnGate, TurnPhase};
