//! Startup progress while the initial cache walk runs.
//!
//! Example output:
//! ```text
//!   ⠋ Caching apps (3 failed)
//!   ██████░░░░░░░░░░░░░░  1204/3981
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use oxserve_cache::{BuildSummary, CacheProgress, ProgressSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const TICK: Duration = Duration::from_millis(100);

/// Renders [`CacheProgress`] counters as a progress bar.
pub struct StartupProgress {
    bar: ProgressBar,
    ticker: JoinHandle<()>,
}

impl StartupProgress {
    /// Start polling `progress`. A hidden bar draws nothing.
    pub fn start(progress: Arc<CacheProgress>, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };

        let style = ProgressStyle::default_bar()
            .template("  {spinner} {msg}\n  {bar:40}  {pos}/{len}")
            .map_or_else(|_| ProgressStyle::default_bar(), |style| {
                style
                    .progress_chars("█▓░")
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            });
        bar.set_style(style);
        bar.set_message("Caching files");
        bar.enable_steady_tick(TICK);

        let ticker = tokio::spawn({
            let bar = bar.clone();
            async move {
                let mut interval = tokio::time::interval(TICK);
                loop {
                    interval.tick().await;
                    render(&bar, &progress.snapshot());
                }
            }
        });

        Self { bar, ticker }
    }

    /// Stop polling and leave a one-line summary.
    pub fn finish(self, summary: &BuildSummary) {
        self.ticker.abort();
        self.bar.finish_with_message(format!(
            "Cached {} files in {} folders ({} failed)",
            summary.files, summary.folders, summary.failed
        ));
    }

    /// Stop polling and erase the bar.
    pub fn abandon(self) {
        self.ticker.abort();
        self.bar.finish_and_clear();
    }
}

fn render(bar: &ProgressBar, snapshot: &ProgressSnapshot) {
    bar.set_length(snapshot.discovered);
    bar.set_position(snapshot.processed);
    if snapshot.failed > 0 {
        bar.set_message(format!("Caching files ({} failed)", snapshot.failed));
    }
}
