//! Live progress bar for the scheduler's ramp.

use cargar::Progress;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::watch;

/// Render scheduler progress as a terminal bar until the run completes.
///
/// Returns a task handle; the bar is finished and cleared when the
/// scheduler drops its sender side.
pub fn spawn_progress_bar(
    mut rx: watch::Receiver<Progress>,
    total: Duration,
) -> tokio::task::JoinHandle<()> {
    let bar = ProgressBar::new(total.as_secs().max(1));
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}s/{len}s {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░"),
    );

    tokio::spawn(async move {
        loop {
            let progress = *rx.borrow_and_update();
            bar.set_position(progress.elapsed.as_secs().min(total.as_secs()));
            bar.set_message(format!(
                "VUs: {}/{}",
                progress.live_vus, progress.target_vus
            ));
            if rx.changed().await.is_err() {
                break;
            }
        }
        bar.finish_and_clear();
    })
}
