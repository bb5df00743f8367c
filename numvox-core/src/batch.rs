use anyhow::Result;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::dispatch::Dispatcher;
use crate::events::{BatchEvent, EventSender};
use crate::layout::OutputLayout;
use crate::range::NumberRange;
use crate::tts::TtsError;

/// Outcome for one number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub index: u32,
    pub success: bool,
    pub error: Option<String>,
    /// Satisfied by a file left from an earlier run
    pub resumed: bool,
}

impl GenerationResult {
    pub fn generated(index: u32) -> Self {
        Self {
            index,
            success: true,
            error: None,
            resumed: false,
        }
    }

    pub fn resumed(index: u32) -> Self {
        Self {
            index,
            success: true,
            error: None,
            resumed: true,
        }
    }

    pub fn failed(index: u32, error: String) -> Self {
        Self {
            index,
            success: false,
            error: Some(error),
            resumed: false,
        }
    }
}

/// Results of a batch in processing order, one per index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub results: Vec<GenerationResult>,
}

impl BatchSummary {
    pub fn processed(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }

    pub fn resumed(&self) -> usize {
        self.results.iter().filter(|r| r.resumed).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &GenerationResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn failed_indices(&self) -> Vec<u32> {
        self.failures().map(|r| r.index).collect()
    }

    fn replace(&mut self, result: GenerationResult) {
        if let Some(slot) = self.results.iter_mut().find(|r| r.index == result.index) {
            *slot = result;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Pause after each provider request, except after the last number
    pub delay: Duration,
    /// Follow-up passes over failed numbers
    pub retry_rounds: u32,
    /// Pause between items during a follow-up pass
    pub retry_pause: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(20),
            retry_rounds: 3,
            retry_pause: Duration::from_millis(500),
        }
    }
}

/// Sequential generation loop over a range of numbers.
pub struct BatchRunner {
    dispatcher: Dispatcher,
    layout: OutputLayout,
    options: BatchOptions,
    events: EventSender,
}

impl BatchRunner {
    pub fn new(dispatcher: Dispatcher, layout: OutputLayout, options: BatchOptions) -> Self {
        Self {
            dispatcher,
            layout,
            options,
            events: EventSender::disconnected(),
        }
    }

    /// Report progress on `events`; the dispatcher's retry events go to the
    /// same channel.
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.dispatcher = self.dispatcher.with_events(events.clone());
        self.events = events;
        self
    }

    /// Generate every number in `range` that has no file yet. Individual
    /// failures are recorded; an authentication failure aborts the run.
    pub async fn run(&self, range: NumberRange) -> Result<BatchSummary> {
        self.layout.ensure()?;

        info!(%range, "Generating audio");
        info!(
            delay_secs = self.options.delay.as_secs_f64(),
            "Delay between requests to respect rate limits"
        );
        self.events.send(BatchEvent::Started { total: range.len() });

        let mut summary = BatchSummary::default();
        for index in range {
            if self.layout.already_generated(index) {
                debug!(index, "File already exists, skipping");
                self.events.send(BatchEvent::Resumed { index });
                summary.results.push(GenerationResult::resumed(index));
                continue;
            }

            let result = self.generate(index).await?;
            summary.results.push(result);

            if index < range.end() {
                sleep(self.options.delay).await;
            }
        }

        info!(
            succeeded = summary.succeeded(),
            total = summary.processed(),
            "Batch complete: {}/{} successful",
            summary.succeeded(),
            summary.processed()
        );
        self.events.send(BatchEvent::Finished {
            succeeded: summary.succeeded(),
            failed: summary.failed(),
        });
        Ok(summary)
    }

    /// Re-dispatch failed numbers for up to `retry_rounds` passes, updating
    /// `summary` in place.
    pub async fn retry_failed(&self, summary: &mut BatchSummary) -> Result<()> {
        let max_rounds = self.options.retry_rounds;

        for round in 1..=max_rounds {
            let pending = summary.failed_indices();
            if pending.is_empty() {
                break;
            }

            info!(round, max_rounds, pending = pending.len(), "Retrying failed numbers");
            self.events.send(BatchEvent::RetryRound {
                round,
                max_rounds,
                pending: pending.len(),
            });

            for index in pending {
                let result = self.generate(index).await?;
                summary.replace(result);
                sleep(self.options.retry_pause).await;
            }
        }

        Ok(())
    }

    async fn generate(&self, index: u32) -> Result<GenerationResult> {
        let request = self.layout.request_for(index);

        match self.dispatcher.dispatch(&request).await {
            Ok(()) => {
                debug!(index, "Generated audio");
                self.events.send(BatchEvent::Generated { index });
                Ok(GenerationResult::generated(index))
            }
            Err(e @ TtsError::Unauthorized(_)) => {
                error!(index, error = %e, "Authentication failed, aborting batch");
                Err(e.into())
            }
            Err(e) => {
                error!(index, error = %e, "Error generating audio");
                let message = e.to_string();
                self.events.send(BatchEvent::Failed {
                    index,
                    error: message.clone(),
                });
                Ok(GenerationResult::failed(index, message))
            }
        }
    }
}
