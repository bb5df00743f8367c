use std::time::Duration;
use tokio::sync::mpsc;

/// `BatchEvent`s report progress out of the batch runner. The CLI renders
/// them as progress bars; tests collect them to assert on retry behaviour.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    Resumed {
        index: u32,
    },
    Generated {
        index: u32,
    },
    Failed {
        index: u32,
        error: String,
    },
    RetryAttempt {
        index: u32,
        attempt: u32,
        max_attempts: u32,
        error: String,
        backoff: Duration,
    },
    RetryRound {
        round: u32,
        max_rounds: u32,
        pending: usize,
    },
    Finished {
        succeeded: usize,
        failed: usize,
    },
}

/// Cloneable sending half. Events sent with no listener are dropped.
#[derive(Debug, Clone, Default)]
pub struct EventSender {
    event_tx: Option<mpsc::UnboundedSender<BatchEvent>>,
}

impl EventSender {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BatchEvent>) {
        let (event_tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                event_tx: Some(event_tx),
            },
            rx,
        )
    }

    pub fn disconnected() -> Self {
        Self { event_tx: None }
    }

    pub fn send(&self, event: BatchEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}
