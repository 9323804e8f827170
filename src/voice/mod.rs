//! Voice pipeline: capture, loudness metering, VAD, segment recording,
//! transcription, synthesis, playback

pub mod capture;
pub mod meter;
pub mod playback;
pub mod recorder;
pub mod stt;
pub mod tts;
pub mod vad;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use playback::AudioPlayback;
pub use recorder::{AudioSegment, SegmentRecorder};
pub use stt::SpeechToText;
pub use tts::{AudioFormat, EncodedAudio, TextToSpeech};
pub use vad::{VadEdge, VoiceActivityDetector};
