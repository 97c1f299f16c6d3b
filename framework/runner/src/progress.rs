use indicatif::{ProgressBar, ProgressStyle};

/// Displays a progress bar of confirmed job completions while the sweep is running.
#[derive(Debug, Clone)]
pub struct SweepProgress {
    bar: ProgressBar,
}

impl SweepProgress {
    pub fn new(total_runs: usize, hidden: bool) -> Self {
        if hidden {
            return Self::hidden();
        }

        let bar = ProgressBar::new(total_runs as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} runs completed [{elapsed_precise}]",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn job_completed(&self) {
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        log::trace!("Progress bar finished");
        self.bar.finish_and_clear();
    }
}
