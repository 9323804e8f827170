//! Text-to-speech via the OpenAI audio API

use crate::{Error, Result};

/// Encoding of synthesized audio bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// 16-bit PCM WAV
    Wav,
    /// MP3
    Mp3,
}

impl AudioFormat {
    /// API `response_format` value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }

    /// Parse a configured format name
    ///
    /// # Errors
    ///
    /// Returns error for unsupported formats
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "wav" => Ok(Self::Wav),
            "mp3" => Ok(Self::Mp3),
            other => Err(Error::Config(format!(
                "unsupported tts_format {other:?} (expected \"wav\" or \"mp3\")"
            ))),
        }
    }
}

/// Synthesized audio bytes plus their encoding
#[derive(Debug, Clone)]
pub struct EncodedAudio {
    /// Raw encoded bytes
    pub bytes: Vec<u8>,
    /// Encoding of `bytes`
    pub format: AudioFormat,
}

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: String,
    model: String,
    speed: f64,
    format: AudioFormat,
}

impl TextToSpeech {
    /// Create a new TTS instance
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: String, model: String, speed: f64, format: AudioFormat) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for speech synthesis".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            speed,
            format,
        })
    }

    /// Synthesize `text` with the given voice
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tts`] if the request fails
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<EncodedAudio> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f64,
            response_format: &'a str,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice,
            speed: self.speed,
            response_format: self.format.as_str(),
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Tts(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("TTS API error {status}: {body}")));
        }

        let audio = response.bytes().await.map_err(|e| Error::Tts(e.to_string()))?;
        tracing::debug!(bytes = audio.len(), format = self.format.as_str(), "speech synthesized");

        Ok(EncodedAudio {
            bytes: audio.to_vec(),
            format: self.format,
        })
    }
}
