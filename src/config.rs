//! Configuration management for lectern
//!
//! Settings come from a TOML file in the XDG config directory with
//! environment-variable overrides. The assistant never reads configuration
//! ambiently: it takes a [`SettingsProvider`] and snapshots a
//! [`SessionSettings`] once per listening session, so changes apply on the
//! next session only.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Default wake phrase
const DEFAULT_WAKE_WORD: &str = "computer";

/// Default end phrase (optional utterance terminator)
const DEFAULT_END_WORD: &str = "thank you";

/// Default chat model
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default assistant prompt
const DEFAULT_PROMPT: &str = "You are a helpful voice companion for an audiobook \
listener. Answer questions about the book briefly and clearly, in a tone suited \
to being read aloud.";

/// Lectern configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (notes log)
    pub data_dir: PathBuf,

    /// OpenAI API key (from `OPENAI_API_KEY`)
    pub api_key: Option<String>,

    /// Assistant behavior configuration
    pub assistant: AssistantConfig,

    /// Voice service configuration
    pub voice: VoiceConfig,

    /// Voice activity detection configuration
    pub vad: VadConfig,
}

/// Assistant behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Wake phrase required at the start of every utterance
    pub wake_word: String,

    /// Optional end phrase stripped from the utterance tail; empty disables
    pub end_word: String,

    /// System prompt seeding the conversation
    pub system_prompt: String,

    /// Chat model identifier
    pub model: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            wake_word: DEFAULT_WAKE_WORD.to_string(),
            end_word: DEFAULT_END_WORD.to_string(),
            system_prompt: DEFAULT_PROMPT.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Voice service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f64,

    /// TTS response format: "wav" or "mp3"
    pub tts_format: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
            tts_format: "wav".to_string(),
        }
    }
}

/// Voice activity detection configuration
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    /// RMS loudness separating silence from speech, in [0, 1]
    pub threshold: f32,

    /// Sustained sub-threshold duration confirming end of speech
    pub silence_hold_ms: u64,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            threshold: 0.03,
            silence_hold_ms: 500,
        }
    }
}

/// On-disk configuration file shape
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    assistant: AssistantConfig,
    voice: VoiceConfig,
    vad: VadConfig,
}

/// Return the XDG data directory for lectern, creating it if needed
#[must_use]
pub fn data_dir() -> PathBuf {
    let dir = directories::ProjectDirs::from("app", "lectern", "lectern").map_or_else(
        || PathBuf::from(".lectern"),
        |d| d.data_dir().to_path_buf(),
    );

    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(path = %dir.display(), error = %e, "failed to create data directory");
    }

    dir
}

/// Default config file path (`lectern.toml` in the XDG config dir)
#[must_use]
pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("app", "lectern", "lectern").map_or_else(
        || PathBuf::from("lectern.toml"),
        |d| d.config_dir().join("lectern.toml"),
    )
}

impl Config {
    /// Load configuration from the default location
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be parsed
    pub fn load() -> Result<Self> {
        Self::load_from(&default_config_path())
    }

    /// Load configuration from an explicit path
    ///
    /// A missing file is not an error — defaults apply. Environment
    /// variables override file values.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load_from(path: &Path) -> Result<Self> {
        let file = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str::<ConfigFile>(&raw)?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            ConfigFile::default()
        };

        let mut assistant = file.assistant;
        if let Ok(v) = std::env::var("LECTERN_WAKE_WORD") {
            assistant.wake_word = v;
        }
        if let Ok(v) = std::env::var("LECTERN_END_WORD") {
            assistant.end_word = v;
        }
        if let Ok(v) = std::env::var("LECTERN_MODEL") {
            assistant.model = v;
        }
        if let Ok(v) = std::env::var("LECTERN_PROMPT") {
            assistant.system_prompt = v;
        }

        let mut voice = file.voice;
        if let Ok(v) = std::env::var("LECTERN_VOICE") {
            voice.tts_voice = v;
        }

        let config = Self {
            data_dir: data_dir(),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            assistant,
            voice,
            vad: file.vad,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.assistant.wake_word.trim().is_empty() {
            return Err(Error::Config("wake_word must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.vad.threshold) {
            return Err(Error::Config(format!(
                "vad.threshold {} out of range [0, 1]",
                self.vad.threshold
            )));
        }
        if !(0.25..=4.0).contains(&self.voice.tts_speed) {
            return Err(Error::Config(format!(
                "voice.tts_speed {} out of range [0.25, 4.0]",
                self.voice.tts_speed
            )));
        }
        Ok(())
    }
}

/// Immutable per-session settings snapshot
///
/// Taken once when a listening session starts; mid-session configuration
/// changes are observed only by the next session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// OpenAI API key
    pub api_key: String,
    /// Wake phrase, lowercased at match time
    pub wake_word: String,
    /// End phrase; empty disables suffix stripping
    pub end_word: String,
    /// TTS voice identifier
    pub voice: String,
    /// System prompt seeding the conversation
    pub system_prompt: String,
    /// Chat model
    pub model: String,
    /// STT model
    pub stt_model: String,
    /// TTS model
    pub tts_model: String,
    /// TTS speed multiplier
    pub tts_speed: f64,
    /// TTS response format
    pub tts_format: String,
    /// VAD parameters for this session
    pub vad: VadConfig,
}

/// Read-only source of per-session settings
///
/// Injected into the assistant at session start rather than read ambiently.
pub trait SettingsProvider {
    /// Snapshot the settings for one listening session
    ///
    /// # Errors
    ///
    /// Returns error if required settings (API key) are missing
    fn session_settings(&self) -> Result<SessionSettings>;
}

impl SettingsProvider for Config {
    fn session_settings(&self) -> Result<SessionSettings> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("OPENAI_API_KEY not set".to_string()))?;

        Ok(SessionSettings {
            api_key,
            wake_word: self.assistant.wake_word.clone(),
            end_word: self.assistant.end_word.clone(),
            voice: self.voice.tts_voice.clone(),
            system_prompt: self.assistant.system_prompt.clone(),
            model: self.assistant.model.clone(),
            stt_model: self.voice.stt_model.clone(),
            tts_model: self.voice.tts_model.clone(),
            tts_speed: self.voice.tts_speed,
            tts_format: self.voice.tts_format.clone(),
            vad: self.vad,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_parses_with_partial_sections() {
        let raw = r#"
            [assistant]
            wake_word = "athena"

            [vad]
            threshold = 0.05
        "#;
        let file: ConfigFile = toml::from_str(raw).unwrap();
        assert_eq!(file.assistant.wake_word, "athena");
        assert_eq!(file.assistant.model, DEFAULT_MODEL);
        assert!((file.vad.threshold - 0.05).abs() < f32::EPSILON);
        assert_eq!(file.vad.silence_hold_ms, 500);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let file: ConfigFile = toml::from_str("").unwrap();
        assert_eq!(file.assistant.wake_word, DEFAULT_WAKE_WORD);
        assert_eq!(file.voice.tts_voice, "alloy");
    }

    #[test]
    fn session_settings_requires_api_key() {
        let config = Config {
            data_dir: PathBuf::from("."),
            api_key: None,
            assistant: AssistantConfig::default(),
            voice: VoiceConfig::default(),
            vad: VadConfig::default(),
        };
        assert!(config.session_settings().is_err());
    }
}
