use anyhow::Context;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::events::{BatchEvent, EventSender};
use crate::layout::NumberRequest;
use crate::tts::{AudioData, SpeechRequest, TextToSpeech, TtsError};

/// Bounded exponential backoff applied to rate-limit and transient failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Provider calls per request, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(60),
            max_backoff: Duration::from_secs(3600),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Wait after the `failed_attempt`-th (1-based) failed call.
    pub fn backoff_for(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1) as i32;
        let backoff = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(backoff)
            .map(|backoff| backoff.min(self.max_backoff))
            .unwrap_or(self.max_backoff)
    }
}

/// Sends one number at a time to the provider and writes the audio file.
pub struct Dispatcher {
    provider: Box<dyn TextToSpeech>,
    policy: RetryPolicy,
    style: Option<String>,
    events: EventSender,
}

impl Dispatcher {
    pub fn new(provider: Box<dyn TextToSpeech>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy,
            style: None,
            events: EventSender::disconnected(),
        }
    }

    pub fn with_style(mut self, style: Option<String>) -> Self {
        self.style = style;
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    /// Synthesize `request.text` and write it to `request.output_path`.
    pub async fn dispatch(&self, request: &NumberRequest) -> Result<(), TtsError> {
        let speech = SpeechRequest::new(request.text.clone()).with_style(self.style.clone());
        let audio = self.synthesize_with_retry(request.index, &speech).await?;

        write_audio(&request.output_path, audio)
            .await
            .map_err(TtsError::Terminal)?;

        debug!(index = request.index, path = ?request.output_path, "Wrote audio");
        Ok(())
    }

    async fn synthesize_with_retry(
        &self,
        index: u32,
        speech: &SpeechRequest,
    ) -> Result<AudioData, TtsError> {
        let max_attempts = self.policy.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match self.provider.synthesize(speech).await {
                Ok(audio) => {
                    if attempt > 1 {
                        info!(index, attempt, "Request succeeded after retries");
                    }
                    return Ok(audio);
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Err(error);
            }

            if attempt >= max_attempts {
                warn!(index, attempt, error = %error, "Giving up after {attempt} attempts");
                return Err(exhausted(error, attempt));
            }

            let backoff = self.policy.backoff_for(attempt);
            self.events.send(BatchEvent::RetryAttempt {
                index,
                attempt,
                max_attempts,
                error: error.to_string(),
                backoff,
            });

            warn!(
                index,
                attempt,
                max_attempts,
                backoff_secs = backoff.as_secs_f64(),
                error = %error,
                "Request failed, retrying after backoff"
            );

            sleep(backoff).await;
        }
    }
}

fn exhausted(error: TtsError, attempts: u32) -> TtsError {
    let note = format!("gave up after {attempts} attempts");
    match error {
        TtsError::RateLimited(e) => TtsError::RateLimited(e.context(note)),
        TtsError::Retryable(e) => TtsError::Retryable(e.context(note)),
        other => other,
    }
}

/// Write through a `.part` file so an interrupted write never looks like a
/// finished one.
async fn write_audio(path: &Path, audio: AudioData) -> anyhow::Result<()> {
    let bytes = audio.into_wav_bytes()?;
    let partial = path.with_extension("wav.part");

    tokio::fs::write(&partial, bytes)
        .await
        .with_context(|| format!("Failed to write {partial:?}"))?;
    tokio::fs::rename(&partial, path)
        .await
        .with_context(|| format!("Failed to move {partial:?} into place"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventSender;
    use crate::layout::OutputLayout;
    use crate::tts::mock::{MockBehavior, MockProvider};
    use tempfile::TempDir;
    use tokio::time::Instant;

    fn dispatcher(provider: &MockProvider) -> Dispatcher {
        Dispatcher::new(Box::new(provider.clone()), RetryPolicy::default())
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(60),
            max_backoff: Duration::from_secs(300),
            multiplier: 2.0,
        };
        assert_eq!(policy.backoff_for(1), Duration::from_secs(60));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(120));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(240));
        assert_eq!(policy.backoff_for(4), Duration::from_secs(300));
    }

    #[test]
    fn test_backoff_saturates_at_huge_settings() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(u64::MAX),
            max_backoff: Duration::from_secs(u64::MAX),
            multiplier: 2.0,
        };
        assert_eq!(policy.backoff_for(1), Duration::from_secs(u64::MAX));
        assert_eq!(policy.backoff_for(4), Duration::from_secs(u64::MAX));

        let capped = RetryPolicy {
            max_backoff: Duration::from_secs(3600),
            ..policy
        };
        assert_eq!(capped.backoff_for(2), Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_writes_wav() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());
        let provider = MockProvider::new(MockBehavior::Success);

        let request = layout.request_for(101);
        dispatcher(&provider).dispatch(&request).await.unwrap();

        let bytes = std::fs::read(layout.path_for(101)).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert!(!temp.path().join("00101.wav.part").exists());
        assert_eq!(provider.requested_texts(), vec!["one oh one".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retried_with_backoff() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());
        let provider = MockProvider::new(MockBehavior::RateLimitedThenSuccess {
            remaining_errors: 2,
        });
        let (events, mut rx) = EventSender::new();

        let started = Instant::now();
        dispatcher(&provider)
            .with_events(events)
            .dispatch(&layout.request_for(7))
            .await
            .unwrap();

        assert_eq!(provider.get_call_count(), 3);
        assert!(layout.already_generated(7));
        assert!(started.elapsed() >= Duration::from_secs(180));
        assert!(started.elapsed() < Duration::from_secs(181));

        let mut backoffs = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let BatchEvent::RetryAttempt {
                index,
                backoff,
                max_attempts,
                ..
            } = event
            {
                assert_eq!(index, 7);
                assert_eq!(max_attempts, 5);
                backoffs.push(backoff);
            }
        }
        assert_eq!(
            backoffs,
            vec![Duration::from_secs(60), Duration::from_secs(120)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_gives_up_at_cap() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());
        let provider = MockProvider::new(MockBehavior::AlwaysRateLimited);

        let started = Instant::now();
        let err = dispatcher(&provider)
            .dispatch(&layout.request_for(3))
            .await
            .unwrap_err();

        assert!(matches!(err, TtsError::RateLimited(_)));
        assert!(format!("{err:#}").contains("gave up after 5 attempts"));
        assert_eq!(provider.get_call_count(), 5);
        assert!(!layout.already_generated(3));
        // 60 + 120 + 240 + 480, no wait after the final attempt
        assert!(started.elapsed() < Duration::from_secs(901));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_cap() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());
        let provider = MockProvider::new(MockBehavior::AlwaysRateLimited);
        let policy = RetryPolicy {
            max_attempts: 2,
            ..RetryPolicy::default()
        };

        let result = Dispatcher::new(Box::new(provider.clone()), policy)
            .dispatch(&layout.request_for(3))
            .await;

        assert!(result.is_err());
        assert_eq!(provider.get_call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_retried() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());
        let provider = MockProvider::new(MockBehavior::TransientThenSuccess {
            remaining_errors: 1,
        });

        dispatcher(&provider)
            .dispatch(&layout.request_for(9))
            .await
            .unwrap();
        assert_eq!(provider.get_call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_error_not_retried() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());
        let provider = MockProvider::new(MockBehavior::AlwaysTerminal);

        let err = dispatcher(&provider)
            .dispatch(&layout.request_for(9))
            .await
            .unwrap_err();
        assert!(matches!(err, TtsError::Terminal(_)));
        assert_eq!(provider.get_call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_not_retried() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());
        let provider = MockProvider::new(MockBehavior::Unauthorized);

        let err = dispatcher(&provider)
            .dispatch(&layout.request_for(9))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(provider.get_call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_style_forwarded() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());
        let provider = MockProvider::new(MockBehavior::Success);

        dispatcher(&provider)
            .with_style(Some("Speak with excitement".to_string()))
            .dispatch(&layout.request_for(1))
            .await
            .unwrap();

        let captured = provider.captured_requests();
        assert_eq!(captured[0].style.as_deref(), Some("Speak with excitement"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_is_terminal() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path().join("missing"));
        let provider = MockProvider::new(MockBehavior::Success);

        let err = dispatcher(&provider)
            .dispatch(&layout.request_for(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TtsError::Terminal(_)));
    }
}
