use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::dispatch::RetryPolicy;
use crate::settings::env_file::env_lookup;
use crate::tts::elevenlabs::{self, ElevenLabsConfig, VoiceTuning};
use crate::tts::openai::{self, OpenAiConfig, OpenAiModel, OpenAiVoice};

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const ELEVENLABS_API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrySettings {
    /// Provider calls allowed per number before it is recorded as failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_secs")]
    pub initial_backoff_secs: u64,

    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    /// Follow-up passes over failed numbers after the main batch
    #[serde(default = "default_retry_rounds")]
    pub retry_rounds: u32,

    #[serde(default = "default_retry_pause_ms")]
    pub retry_pause_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_secs() -> u64 {
    60
}

fn default_max_backoff_secs() -> u64 {
    3600
}

fn default_retry_rounds() -> u32 {
    3
}

fn default_retry_pause_ms() -> u64 {
    500
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_secs: default_initial_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            retry_rounds: default_retry_rounds(),
            retry_pause_ms: default_retry_pause_ms(),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_secs(self.initial_backoff_secs),
            max_backoff: Duration::from_secs(self.max_backoff_secs),
            multiplier: 2.0,
        }
    }

    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenAiSettings {
    /// Falls back to the OPENAI_API_KEY environment variable when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub voice: OpenAiVoice,

    #[serde(default)]
    pub model: OpenAiModel,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_openai_delay_secs")]
    pub delay_secs: u64,
}

fn default_openai_base_url() -> String {
    openai::DEFAULT_BASE_URL.to_string()
}

fn default_openai_delay_secs() -> u64 {
    20
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            voice: OpenAiVoice::default(),
            model: OpenAiModel::default(),
            base_url: default_openai_base_url(),
            delay_secs: default_openai_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElevenLabsSettings {
    /// Falls back to the ELEVENLABS_API_KEY environment variable when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub voice_id: Option<String>,

    #[serde(default = "default_elevenlabs_model")]
    pub model_id: String,

    #[serde(default)]
    pub tuning: VoiceTuning,

    #[serde(default = "default_short_delay_secs")]
    pub delay_secs: u64,
}

fn default_elevenlabs_model() -> String {
    elevenlabs::DEFAULT_MODEL_ID.to_string()
}

fn default_short_delay_secs() -> u64 {
    1
}

impl Default for ElevenLabsSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            voice_id: None,
            model_id: default_elevenlabs_model(),
            tuning: VoiceTuning::default(),
            delay_secs: default_short_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AwsPollySettings {
    #[serde(default)]
    pub profile: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_polly_voice")]
    pub voice_id: String,

    #[serde(default = "default_short_delay_secs")]
    pub delay_secs: u64,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_polly_voice() -> String {
    "Amy".to_string()
}

impl Default for AwsPollySettings {
    fn default() -> Self {
        Self {
            profile: None,
            region: default_region(),
            voice_id: default_polly_voice(),
            delay_secs: default_short_delay_secs(),
        }
    }
}

/// Settings file contents. Command-line flags override these per run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Directory the numbered WAV files are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub openai: OpenAiSettings,

    #[serde(default)]
    pub elevenlabs: ElevenLabsSettings,

    #[serde(default)]
    pub aws_polly: AwsPollySettings,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("number_audio_files")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            retry: RetrySettings::default(),
            openai: OpenAiSettings::default(),
            elevenlabs: ElevenLabsSettings::default(),
            aws_polly: AwsPollySettings::default(),
        }
    }
}

impl Settings {
    pub fn openai_config(&self) -> Result<OpenAiConfig> {
        self.openai_config_with_env(env_lookup())
    }

    pub fn openai_config_with_env(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<OpenAiConfig> {
        let Some(api_key) =
            resolve_api_key(self.openai.api_key.as_deref(), OPENAI_API_KEY_ENV, env)
        else {
            bail!(
                "OpenAI API key not found. Set the {OPENAI_API_KEY_ENV} environment variable, \
                 add {OPENAI_API_KEY_ENV}=... to config.env, or add api_key under [openai] in \
                 the settings file"
            );
        };

        Ok(OpenAiConfig {
            api_key,
            voice: self.openai.voice,
            model: self.openai.model,
            base_url: self.openai.base_url.clone(),
        })
    }

    pub fn elevenlabs_config(&self) -> Result<ElevenLabsConfig> {
        self.elevenlabs_config_with_env(env_lookup())
    }

    pub fn elevenlabs_config_with_env(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ElevenLabsConfig> {
        let Some(api_key) = resolve_api_key(
            self.elevenlabs.api_key.as_deref(),
            ELEVENLABS_API_KEY_ENV,
            env,
        ) else {
            bail!(
                "ElevenLabs API key not found. Set the {ELEVENLABS_API_KEY_ENV} environment \
                 variable, add {ELEVENLABS_API_KEY_ENV}=... to config.env, or add api_key under \
                 [elevenlabs] in the settings file"
            );
        };

        Ok(ElevenLabsConfig {
            api_key,
            voice_id: self.elevenlabs.voice_id.clone(),
            model_id: self.elevenlabs.model_id.clone(),
            tuning: self.elevenlabs.tuning.clone(),
            base_url: elevenlabs::DEFAULT_BASE_URL.to_string(),
        })
    }

    #[cfg(feature = "polly")]
    pub fn aws_polly_config(&self) -> crate::tts::aws_polly::AwsPollyConfig {
        crate::tts::aws_polly::AwsPollyConfig {
            profile: self.aws_polly.profile.clone(),
            region: self.aws_polly.region.clone(),
            voice_id: self.aws_polly.voice_id.clone(),
        }
    }
}

/// `env` (config.env, then the process environment) first, settings file
/// second. Blank values count as missing.
fn resolve_api_key(
    configured: Option<&str>,
    env_var: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env(env_var)
        .filter(|key| !key.trim().is_empty())
        .or_else(|| {
            configured
                .filter(|key| !key.trim().is_empty())
                .map(str::to_string)
        })
        .map(|key| key.trim().to_string())
}
