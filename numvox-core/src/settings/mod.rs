pub mod config;
pub mod env_file;
pub mod manager;


pub use config::{AwsPollySettings, ElevenLabsSettings, OpenAiSettings, RetrySettings, Settings};
pub use manager::SettingsManager;
