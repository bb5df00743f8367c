use async_trait::async_trait;

use super::error::TtsError;
use super::types::{AudioData, SpeechRequest, Voice};

/// Trait for text-to-speech providers
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether `SpeechRequest::style` changes the delivery with the current
    /// model.
    fn supports_style(&self) -> bool {
        false
    }

    /// Synthesize text to speech audio
    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioData, TtsError>;

    /// List the voices available to this account
    async fn list_voices(&self) -> Result<Vec<Voice>, TtsError>;
}
