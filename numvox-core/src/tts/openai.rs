//! OpenAI text-to-speech implementation

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{debug, warn};

use super::error::{classify_http_failure, classify_send_failure, TtsError};
use super::provider::TextToSpeech;
use super::types::{AudioData, SpeechRequest, Voice};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
    EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OpenAiVoice {
    Alloy,
    Echo,
    Fable,
    Onyx,
    #[default]
    Nova,
    Shimmer,
}

impl OpenAiVoice {
    pub fn description(&self) -> &'static str {
        match self {
            OpenAiVoice::Alloy => "neutral",
            OpenAiVoice::Echo => "male",
            OpenAiVoice::Fable => "british",
            OpenAiVoice::Onyx => "deep",
            OpenAiVoice::Nova => "young female",
            OpenAiVoice::Shimmer => "soft female",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
    EnumIter, AsRefStr,
)]
pub enum OpenAiModel {
    #[default]
    #[serde(rename = "tts-1")]
    #[strum(to_string = "tts-1")]
    Tts1,
    #[serde(rename = "tts-1-hd")]
    #[strum(to_string = "tts-1-hd")]
    Tts1Hd,
    #[serde(rename = "gpt-4o-mini-tts")]
    #[strum(to_string = "gpt-4o-mini-tts")]
    Gpt4oMiniTts,
}

impl OpenAiModel {
    /// Only the instruction-following model accepts a delivery prompt.
    pub fn supports_instructions(&self) -> bool {
        matches!(self, OpenAiModel::Gpt4oMiniTts)
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub voice: OpenAiVoice,
    pub model: OpenAiModel,
    pub base_url: String,
}

impl OpenAiConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            voice: OpenAiVoice::default(),
            model: OpenAiModel::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

pub struct OpenAiSpeech {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiSpeech {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    fn build_request(&self, request: &SpeechRequest) -> SynthesizeRequest {
        let instructions = match &request.style {
            Some(style) if self.config.model.supports_instructions() => Some(style.clone()),
            Some(_) => {
                debug!(model = %self.config.model, "Dropping style prompt unsupported by model");
                None
            }
            None => None,
        };

        SynthesizeRequest {
            model: self.config.model.to_string(),
            voice: self.config.voice.to_string(),
            input: request.text.clone(),
            response_format: "wav".to_string(),
            instructions,
        }
    }
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest {
    model: String,
    voice: String,
    input: String,
    response_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
}

#[async_trait]
impl TextToSpeech for OpenAiSpeech {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn supports_style(&self) -> bool {
        self.config.model.supports_instructions()
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioData, TtsError> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(format!("{}/audio/speech", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                debug!(?e, "OpenAI speech call failed");
                classify_send_failure(self.name(), e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "OpenAI speech call returned error");
            return Err(classify_http_failure(self.name(), status, &body, &[]));
        }

        let bytes = response.bytes().await.map_err(|e| {
            TtsError::Retryable(anyhow::anyhow!("Failed to read audio bytes: {e}"))
        })?;

        Ok(AudioData::Wav(bytes.to_vec()))
    }

    async fn list_voices(&self) -> Result<Vec<Voice>, TtsError> {
        Ok(OpenAiVoice::iter()
            .map(|voice| Voice {
                id: voice.to_string(),
                name: format!("{voice} ({})", voice.description()),
                language_code: "en".to_string(),
                category: None,
            })
            .collect())
    }
}
