pub mod elevenlabs;
pub mod error;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod types;

#[cfg(feature = "polly")]
pub mod aws_polly;

use anyhow::{bail, Context, Result};
use std::str::FromStr;
use std::time::Duration;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::settings::Settings;
use elevenlabs::ElevenLabs;
use openai::{OpenAiModel, OpenAiSpeech, OpenAiVoice};

pub use error::TtsError;
pub use provider::TextToSpeech;
pub use types::*;

/// Hosted speech services the generator can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
pub enum ProviderKind {
    #[default]
    #[strum(to_string = "openai")]
    OpenAi,
    #[strum(to_string = "elevenlabs")]
    ElevenLabs,
    #[strum(to_string = "polly")]
    AwsPolly,
}

impl ProviderKind {
    /// Pause between consecutive requests when none is given on the command
    /// line.
    pub fn default_delay(&self, settings: &Settings) -> Duration {
        let secs = match self {
            ProviderKind::OpenAi => settings.openai.delay_secs,
            ProviderKind::ElevenLabs => settings.elevenlabs.delay_secs,
            ProviderKind::AwsPolly => settings.aws_polly.delay_secs,
        };
        Duration::from_secs(secs)
    }

    /// ElevenLabs has no default voice; one must be picked before synthesis.
    pub fn needs_voice_selection(&self, settings: &Settings, choice: &VoiceChoice) -> bool {
        *self == ProviderKind::ElevenLabs
            && choice.voice.is_none()
            && settings.elevenlabs.voice_id.is_none()
    }
}

/// Per-run voice and model picked on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceChoice {
    pub voice: Option<String>,
    pub model: Option<String>,
}

/// Build the provider for `kind` from the settings file plus command-line
/// overrides. Fails when credentials are missing or the voice/model is not one
/// the provider offers.
pub async fn build_provider(
    kind: ProviderKind,
    settings: &Settings,
    choice: &VoiceChoice,
) -> Result<Box<dyn TextToSpeech>> {
    match kind {
        ProviderKind::OpenAi => {
            let mut config = settings.openai_config()?;
            if let Some(voice) = &choice.voice {
                config.voice = parse_choice::<OpenAiVoice>("voice", voice)?;
            }
            if let Some(model) = &choice.model {
                config.model = parse_choice::<OpenAiModel>("model", model)?;
            }
            Ok(Box::new(OpenAiSpeech::new(config)?))
        }
        ProviderKind::ElevenLabs => {
            let mut config = settings.elevenlabs_config()?;
            if let Some(voice) = &choice.voice {
                config.voice_id = Some(voice.clone());
            }
            if let Some(model) = &choice.model {
                if !elevenlabs::SUPPORTED_MODELS.contains(&model.as_str()) {
                    bail!(
                        "unsupported ElevenLabs model '{model}', expected one of: {}",
                        elevenlabs::SUPPORTED_MODELS.join(", ")
                    );
                }
                config.model_id = model.clone();
            }
            Ok(Box::new(ElevenLabs::new(config)?))
        }
        #[cfg(feature = "polly")]
        ProviderKind::AwsPolly => {
            let mut config = settings.aws_polly_config();
            if let Some(voice) = &choice.voice {
                config.voice_id = voice.clone();
            }
            if choice.model.is_some() {
                tracing::warn!("AWS Polly always uses the neural engine; --model is ignored");
            }
            let polly = aws_polly::AwsPolly::new(config)
                .await
                .context("Failed to initialise AWS Polly")?;
            Ok(Box::new(polly))
        }
        #[cfg(not(feature = "polly"))]
        ProviderKind::AwsPolly => {
            bail!("numvox was built without AWS Polly support (feature `polly`)")
        }
    }
}

fn parse_choice<T>(what: &str, value: &str) -> Result<T>
where
    T: FromStr + IntoEnumIterator + std::fmt::Display,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(value).with_context(|| {
        let options: Vec<String> = T::iter().map(|option| option.to_string()).collect();
        format!("unsupported {what} '{value}', expected one of: {}", options.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_keys() -> Settings {
        let mut settings = Settings::default();
        settings.openai.api_key = Some("sk-test".to_string());
        settings.elevenlabs.api_key = Some("xi-test".to_string());
        settings
    }

    #[test]
    fn test_provider_kind_names() {
        assert_eq!(ProviderKind::from_str("openai").unwrap(), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::from_str("polly").unwrap(), ProviderKind::AwsPolly);
        assert_eq!(ProviderKind::ElevenLabs.to_string(), "elevenlabs");
    }

    #[test]
    fn test_default_delays() {
        let settings = Settings::default();
        assert_eq!(
            ProviderKind::OpenAi.default_delay(&settings),
            Duration::from_secs(20)
        );
        assert_eq!(
            ProviderKind::ElevenLabs.default_delay(&settings),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_needs_voice_selection() {
        let mut settings = Settings::default();
        let none = VoiceChoice::default();
        let chosen = VoiceChoice {
            voice: Some("abc".to_string()),
            model: None,
        };

        assert!(ProviderKind::ElevenLabs.needs_voice_selection(&settings, &none));
        assert!(!ProviderKind::ElevenLabs.needs_voice_selection(&settings, &chosen));
        assert!(!ProviderKind::OpenAi.needs_voice_selection(&settings, &none));

        settings.elevenlabs.voice_id = Some("from-file".to_string());
        assert!(!ProviderKind::ElevenLabs.needs_voice_selection(&settings, &none));
    }

    #[tokio::test]
    async fn test_build_openai_rejects_unknown_voice() {
        let choice = VoiceChoice {
            voice: Some("robot".to_string()),
            model: None,
        };
        let err = build_provider(ProviderKind::OpenAi, &settings_with_keys(), &choice)
            .await
            .err()
            .unwrap();
        let message = format!("{err:#}");
        assert!(message.contains("unsupported voice 'robot'"));
        assert!(message.contains("shimmer"));
    }

    #[tokio::test]
    async fn test_build_openai_style_support_follows_model() {
        let choice = VoiceChoice {
            voice: Some("alloy".to_string()),
            model: Some("gpt-4o-mini-tts".to_string()),
        };
        let provider = build_provider(ProviderKind::OpenAi, &settings_with_keys(), &choice)
            .await
            .unwrap();
        assert_eq!(provider.name(), "OpenAI");
        assert!(provider.supports_style());
    }

    #[tokio::test]
    async fn test_build_elevenlabs_rejects_unknown_model() {
        let choice = VoiceChoice {
            voice: Some("abc".to_string()),
            model: Some("eleven_v9".to_string()),
        };
        let result = build_provider(ProviderKind::ElevenLabs, &settings_with_keys(), &choice).await;
        assert!(result.is_err());
    }
}
