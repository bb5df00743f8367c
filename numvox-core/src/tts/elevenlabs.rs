//! ElevenLabs text-to-speech implementation

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::error::{classify_http_failure, classify_send_failure, TtsError};
use super::provider::TextToSpeech;
use super::types::{AudioData, SpeechRequest, Voice};

pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io/v1";
pub const DEFAULT_MODEL_ID: &str = "eleven_monolingual_v1";
pub const SUPPORTED_MODELS: [&str; 3] = [
    "eleven_monolingual_v1",
    "eleven_multilingual_v1",
    "eleven_multilingual_v2",
];

const SAMPLE_RATE: u32 = 16000;

/// Tuning sent with every synthesis call so all numbers sound alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceTuning {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceTuning {
    fn default() -> Self {
        Self {
            stability: 0.7,
            similarity_boost: 0.8,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    pub voice_id: Option<String>,
    pub model_id: String,
    pub tuning: VoiceTuning,
    pub base_url: String,
}

impl ElevenLabsConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            voice_id: None,
            model_id: DEFAULT_MODEL_ID.to_string(),
            tuning: VoiceTuning::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

pub struct ElevenLabs {
    config: ElevenLabsConfig,
    client: Client,
}

impl ElevenLabs {
    pub fn new(config: ElevenLabsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    fn synthesize_url(&self, voice_id: &str) -> String {
        format!(
            "{}/text-to-speech/{}?output_format=pcm_{}",
            self.config.base_url, voice_id, SAMPLE_RATE
        )
    }
}

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: &'a VoiceTuning,
}

#[derive(Deserialize)]
struct VoicesResponse {
    voices: Vec<VoiceData>,
}

#[derive(Deserialize)]
struct VoiceData {
    voice_id: String,
    name: String,
    #[serde(default)]
    category: Option<String>,
}

#[async_trait]
impl TextToSpeech for ElevenLabs {
    fn name(&self) -> &'static str {
        "ElevenLabs"
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioData, TtsError> {
        let voice_id = self.config.voice_id.as_deref().ok_or_else(|| {
            TtsError::Terminal(anyhow::anyhow!("No ElevenLabs voice selected"))
        })?;

        let body = SynthesizeRequest {
            text: &request.text,
            model_id: &self.config.model_id,
            voice_settings: &self.config.tuning,
        };

        let response = self
            .client
            .post(self.synthesize_url(voice_id))
            .header("xi-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                debug!(?e, "ElevenLabs synthesis call failed");
                classify_send_failure(self.name(), e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "ElevenLabs synthesis returned error");
            return Err(classify_http_failure(self.name(), status, &body, &["quota"]));
        }

        let bytes = response.bytes().await.map_err(|e| {
            TtsError::Retryable(anyhow::anyhow!("Failed to read audio bytes: {e}"))
        })?;

        Ok(AudioData::pcm(bytes.to_vec(), SAMPLE_RATE, 1))
    }

    async fn list_voices(&self) -> Result<Vec<Voice>, TtsError> {
        let response = self
            .client
            .get(format!("{}/voices", self.config.base_url))
            .header("xi-api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| classify_send_failure(self.name(), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_failure(self.name(), status, &body, &["quota"]));
        }

        let text = response
            .text()
            .await
            .map_err(|e| TtsError::Retryable(anyhow::anyhow!("Failed to read voices: {e}")))?;
        parse_voices(&text)
    }
}

fn parse_voices(body: &str) -> Result<Vec<Voice>, TtsError> {
    let voices_response: VoicesResponse = serde_json::from_str(body)?;

    Ok(voices_response
        .voices
        .into_iter()
        .map(|v| Voice {
            id: v.voice_id,
            name: v.name,
            language_code: "en".to_string(),
            category: v.category,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_voices() {
        let body = r#"{
            "voices": [
                {"voice_id": "21m00Tcm4TlvDq8ikWAM", "name": "Rachel", "category": "premade"},
                {"voice_id": "abc", "name": "Clone"}
            ]
        }"#;

        let voices = parse_voices(body).unwrap();
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].id, "21m00Tcm4TlvDq8ikWAM");
        assert_eq!(voices[0].category.as_deref(), Some("premade"));
        assert_eq!(voices[1].category, None);
    }

    #[test]
    fn test_parse_voices_rejects_garbage() {
        assert!(matches!(parse_voices("<html>"), Err(TtsError::Terminal(_))));
    }

    #[test]
    fn test_request_body() {
        let tuning = VoiceTuning::default();
        let body = SynthesizeRequest {
            text: "eight thousand",
            model_id: DEFAULT_MODEL_ID,
            voice_settings: &tuning,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["text"], "eight thousand");
        assert_eq!(json["model_id"], "eleven_monolingual_v1");
        assert_eq!(json["voice_settings"]["use_speaker_boost"], true);
        assert!((json["voice_settings"]["stability"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_synthesize_url_requests_pcm() {
        let speech = ElevenLabs::new(ElevenLabsConfig::new("key".to_string())).unwrap();
        assert_eq!(
            speech.synthesize_url("v1"),
            "https://api.elevenlabs.io/v1/text-to-speech/v1?output_format=pcm_16000"
        );
    }

    #[tokio::test]
    async fn test_synthesize_without_voice_is_terminal() {
        let speech = ElevenLabs::new(ElevenLabsConfig::new("key".to_string())).unwrap();
        let result = speech.synthesize(&SpeechRequest::new("one")).await;
        assert!(matches!(result, Err(TtsError::Terminal(_))));
    }

    #[tokio::test]
    #[ignore = "requires ELEVENLABS_API_KEY"]
    async fn test_elevenlabs_live_voices() {
        let api_key = std::env::var("ELEVENLABS_API_KEY").unwrap();
        let speech = ElevenLabs::new(ElevenLabsConfig::new(api_key)).unwrap();
        let voices = speech.list_voices().await.unwrap();
        assert!(!voices.is_empty());
    }
}
