use numvox_core::{
    batch::{BatchOptions, BatchRunner},
    dispatch::{Dispatcher, RetryPolicy},
    events::{BatchEvent, EventSender},
    layout::OutputLayout,
    tts::mock::{MockBehavior, MockProvider},
};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

pub struct Fixture {
    pub runner: BatchRunner,
    pub event_rx: mpsc::UnboundedReceiver<BatchEvent>,
    pub workspace_dir: TempDir,
    pub layout: OutputLayout,
    mock_provider: MockProvider,
}

impl Fixture {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::with_mock_behavior(MockBehavior::Success)
    }

    #[allow(dead_code)]
    pub fn with_mock_behavior(behavior: MockBehavior) -> Self {
        Self::with_options(behavior, Self::fast_options())
    }

    #[allow(dead_code)]
    pub fn with_options(behavior: MockBehavior, options: BatchOptions) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let workspace_dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(workspace_dir.path().join("number_audio_files"));

        let mock_provider = MockProvider::new(behavior);
        let (events, event_rx) = EventSender::new();
        let dispatcher = Dispatcher::new(Box::new(mock_provider.clone()), RetryPolicy::default());
        let runner = BatchRunner::new(dispatcher, layout.clone(), options).with_events(events);

        Self {
            runner,
            event_rx,
            workspace_dir,
            layout,
            mock_provider,
        }
    }

    /// No inter-request delay; backoff still uses the default policy.
    #[allow(dead_code)]
    pub fn fast_options() -> BatchOptions {
        BatchOptions {
            delay: Duration::ZERO,
            retry_rounds: 3,
            retry_pause: Duration::ZERO,
        }
    }

    #[allow(dead_code)]
    pub fn provider(&self) -> &MockProvider {
        &self.mock_provider
    }

    #[allow(dead_code)]
    pub fn set_mock_behavior(&self, behavior: MockBehavior) {
        self.mock_provider.set_behavior(behavior);
    }

    /// Pretend an earlier run already produced these files.
    #[allow(dead_code)]
    pub fn seed_files(&self, indices: &[u32]) {
        self.layout.ensure().unwrap();
        for index in indices {
            std::fs::write(self.layout.path_for(*index), b"RIFF-existing").unwrap();
        }
    }

    #[allow(dead_code)]
    pub fn drain_events(&mut self) -> Vec<BatchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }
}
