pub mod archive;
pub mod batch;
pub mod dispatch;
pub mod events;
pub mod layout;
pub mod range;
pub mod report;
pub mod settings;
pub mod tts;
pub mod vibes;
pub mod words;

pub use archive::{create_archive, ArchiveReport};
pub use batch::{BatchOptions, BatchRunner, BatchSummary, GenerationResult};
pub use dispatch::{Dispatcher, RetryPolicy};
pub use events::{BatchEvent, EventSender};
pub use layout::{NumberRequest, OutputLayout};
pub use range::NumberRange;
pub use report::SummaryReport;
pub use settings::{Settings, SettingsManager};
pub use tts::{build_provider, ProviderKind, TextToSpeech, TtsError, VoiceChoice};
pub use words::number_to_words;
