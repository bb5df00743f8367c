use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::error::TtsError;
use super::provider::TextToSpeech;
use super::types::{AudioData, SpeechRequest, Voice};

/// Mock behavior for the mock provider
#[derive(Debug, Clone, Default)]
pub enum MockBehavior {
    /// Return a short silent clip
    #[default]
    Success,
    /// Return a rate-limit error N times, then succeed
    RateLimitedThenSuccess { remaining_errors: usize },
    /// Return a network error N times, then succeed
    TransientThenSuccess { remaining_errors: usize },
    /// Always return a rate-limit error
    AlwaysRateLimited,
    /// Always return a non-retryable error
    AlwaysTerminal,
    /// Always reject the credentials
    Unauthorized,
    /// Fail with a non-retryable error for these texts only
    TerminalFor { texts: Vec<String> },
    /// Reject the credentials once `remaining_successes` calls have succeeded
    UnauthorizedAfter { remaining_successes: usize },
}

/// Mock TTS provider for testing
#[derive(Clone)]
pub struct MockProvider {
    behavior: Arc<Mutex<MockBehavior>>,
    call_count: Arc<Mutex<usize>>,
    captured_requests: Arc<Mutex<Vec<SpeechRequest>>>,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior: Arc::new(Mutex::new(behavior)),
            call_count: Arc::new(Mutex::new(0)),
            captured_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn captured_requests(&self) -> Vec<SpeechRequest> {
        self.captured_requests.lock().unwrap().clone()
    }

    /// Texts requested so far, in call order.
    pub fn requested_texts(&self) -> Vec<String> {
        self.captured_requests()
            .into_iter()
            .map(|request| request.text)
            .collect()
    }

    fn silent_clip() -> AudioData {
        AudioData::pcm(vec![0; 320], 16000, 1)
    }
}

#[async_trait]
impl TextToSpeech for MockProvider {
    fn name(&self) -> &'static str {
        "Mock"
    }

    fn supports_style(&self) -> bool {
        true
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioData, TtsError> {
        *self.call_count.lock().unwrap() += 1;
        self.captured_requests.lock().unwrap().push(request.clone());

        let mut behavior = self.behavior.lock().unwrap();
        match &mut *behavior {
            MockBehavior::Success => Ok(Self::silent_clip()),
            MockBehavior::RateLimitedThenSuccess { remaining_errors } => {
                if *remaining_errors > 0 {
                    *remaining_errors -= 1;
                    Err(TtsError::RateLimited(anyhow::anyhow!(
                        "Mock rate limit (429)"
                    )))
                } else {
                    Ok(Self::silent_clip())
                }
            }
            MockBehavior::TransientThenSuccess { remaining_errors } => {
                if *remaining_errors > 0 {
                    *remaining_errors -= 1;
                    Err(TtsError::Retryable(anyhow::anyhow!(
                        "Mock connection reset"
                    )))
                } else {
                    Ok(Self::silent_clip())
                }
            }
            MockBehavior::AlwaysRateLimited => Err(TtsError::RateLimited(anyhow::anyhow!(
                "Mock rate limit (429)"
            ))),
            MockBehavior::AlwaysTerminal => {
                Err(TtsError::Terminal(anyhow::anyhow!("Mock terminal error")))
            }
            MockBehavior::Unauthorized => {
                Err(TtsError::Unauthorized(anyhow::anyhow!("Mock invalid API key")))
            }
            MockBehavior::TerminalFor { texts } => {
                if texts.iter().any(|text| *text == request.text) {
                    Err(TtsError::Terminal(anyhow::anyhow!(
                        "Mock rejected text: {}",
                        request.text
                    )))
                } else {
                    Ok(Self::silent_clip())
                }
            }
            MockBehavior::UnauthorizedAfter {
                remaining_successes,
            } => {
                if *remaining_successes > 0 {
                    *remaining_successes -= 1;
                    Ok(Self::silent_clip())
                } else {
                    Err(TtsError::Unauthorized(anyhow::anyhow!("Mock key revoked")))
                }
            }
        }
    }

    async fn list_voices(&self) -> Result<Vec<Voice>, TtsError> {
        Ok(vec![Voice {
            id: "mock".to_string(),
            name: "Mock".to_string(),
            language_code: "en".to_string(),
            category: Some("test".to_string()),
        }])
    }
}
