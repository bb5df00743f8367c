//! AWS Polly text-to-speech implementation

use anyhow::anyhow;
use async_trait::async_trait;
use aws_sdk_polly::config::Region;
use aws_sdk_polly::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_polly::types::{Engine, OutputFormat, VoiceId};
use aws_sdk_polly::Client;

use super::error::TtsError;
use super::provider::TextToSpeech;
use super::types::{AudioData, SpeechRequest, Voice};

const SAMPLE_RATE: u32 = 16000;

const AUTH_ERROR_CODES: [&str; 5] = [
    "UnrecognizedClientException",
    "InvalidSignatureException",
    "AccessDeniedException",
    "ExpiredTokenException",
    "MissingAuthenticationTokenException",
];

/// Configuration for AWS Polly
#[derive(Debug, Clone)]
pub struct AwsPollyConfig {
    pub profile: Option<String>,
    pub region: String,
    pub voice_id: String,
}

impl Default for AwsPollyConfig {
    fn default() -> Self {
        Self {
            profile: None,
            region: "us-east-1".to_string(),
            voice_id: "Amy".to_string(),
        }
    }
}

/// AWS Polly text-to-speech provider
pub struct AwsPolly {
    client: Client,
    voice_id: VoiceId,
}

impl AwsPolly {
    /// Create a new AWS Polly client
    pub async fn new(config: AwsPollyConfig) -> anyhow::Result<Self> {
        let voice_id = Self::parse_voice_id(&config.voice_id)?;

        let mut aws_config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(profile) = &config.profile {
            aws_config_loader = aws_config_loader.profile_name(profile);
        }

        aws_config_loader = aws_config_loader.region(Region::new(config.region));

        let aws_config = aws_config_loader.load().await;
        let client = Client::new(&aws_config);

        Ok(Self { client, voice_id })
    }

    fn parse_voice_id(voice_id: &str) -> anyhow::Result<VoiceId> {
        match VoiceId::from(voice_id) {
            VoiceId::Unknown(_) => anyhow::bail!("unknown voice id: {voice_id}"),
            known => Ok(known),
        }
    }
}

fn classify_sdk_error<E, R>(error: SdkError<E, R>) -> TtsError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    if matches!(
        error,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) | SdkError::ResponseError(_)
    ) {
        return TtsError::Retryable(anyhow!("Polly transport error: {error:?}"));
    }

    let code = error.code().unwrap_or_default().to_string();
    let message = error.message().unwrap_or_default().to_string();
    let wrapped = anyhow!("Polly error {code}: {message}");

    if code == "ThrottlingException" {
        TtsError::RateLimited(wrapped)
    } else if AUTH_ERROR_CODES.contains(&code.as_str()) {
        TtsError::Unauthorized(wrapped)
    } else if code == "ServiceFailureException" {
        TtsError::Retryable(wrapped)
    } else {
        TtsError::Terminal(wrapped)
    }
}

#[async_trait]
impl TextToSpeech for AwsPolly {
    fn name(&self) -> &'static str {
        "AWS Polly"
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioData, TtsError> {
        let response = self
            .client
            .synthesize_speech()
            .text(&request.text)
            .voice_id(self.voice_id.clone())
            .output_format(OutputFormat::Pcm)
            .engine(Engine::Neural)
            .sample_rate(SAMPLE_RATE.to_string())
            .send()
            .await
            .map_err(classify_sdk_error)?;

        let bytes = response
            .audio_stream
            .collect()
            .await
            .map_err(|e| TtsError::Retryable(anyhow!("Failed to collect audio stream: {e}")))?
            .into_bytes()
            .to_vec();

        Ok(AudioData::pcm(bytes, SAMPLE_RATE, 1))
    }

    async fn list_voices(&self) -> Result<Vec<Voice>, TtsError> {
        let response = self
            .client
            .describe_voices()
            .engine(Engine::Neural)
            .language_code(aws_sdk_polly::types::LanguageCode::EnUs)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        let voices = response
            .voices
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| {
                let id = v.id?.to_string();
                let name = v.name?;
                let language_code = v.language_code?.to_string();
                Some(Voice {
                    id,
                    name,
                    language_code,
                    category: v.gender.map(|g| g.as_str().to_string()),
                })
            })
            .collect();

        Ok(voices)
    }
}
