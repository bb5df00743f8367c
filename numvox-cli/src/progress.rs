use indicatif::{ProgressBar, ProgressStyle};
use numvox_core::events::BatchEvent;
use tokio::sync::mpsc;

const TEMPLATE: &str = "{prefix:>12} [{bar:40}] {pos}/{len} ({eta}) {msg}";

fn new_bar(len: usize, prefix: String) -> ProgressBar {
    let style = ProgressStyle::with_template(TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    let bar = ProgressBar::new(len as u64).with_style(style);
    bar.set_prefix(prefix);
    bar
}

/// Draw batch progress until every sender is dropped.
pub async fn render(mut events: mpsc::UnboundedReceiver<BatchEvent>) {
    let mut bar: Option<ProgressBar> = None;

    while let Some(event) = events.recv().await {
        match event {
            BatchEvent::Started { total } => {
                bar = Some(new_bar(total, "Generating".to_string()));
            }
            BatchEvent::Resumed { .. } | BatchEvent::Generated { .. } => {
                if let Some(bar) = &bar {
                    bar.set_message("");
                    bar.inc(1);
                }
            }
            BatchEvent::Failed { index, .. } => {
                if let Some(bar) = &bar {
                    bar.set_message(format!("{index} failed"));
                    bar.inc(1);
                }
            }
            BatchEvent::RetryAttempt {
                index,
                attempt,
                max_attempts,
                backoff,
                ..
            } => {
                if let Some(bar) = &bar {
                    bar.set_message(format!(
                        "{index}: retry {attempt}/{max_attempts} in {}s",
                        backoff.as_secs()
                    ));
                }
            }
            BatchEvent::RetryRound {
                round,
                max_rounds,
                pending,
            } => {
                if let Some(previous) = bar.take() {
                    previous.finish();
                }
                bar = Some(new_bar(pending, format!("Retry {round}/{max_rounds}")));
            }
            BatchEvent::Finished { succeeded, failed } => {
                if let Some(bar) = bar.take() {
                    bar.finish_with_message(format!("{succeeded} ok, {failed} failed"));
                }
            }
        }
    }

    if let Some(bar) = bar {
        bar.finish();
    }
}
