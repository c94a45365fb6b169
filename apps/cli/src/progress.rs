//! Terminal progress bar fed by upload progress callbacks.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use taskdeck_upload::{ProgressCallback, UploadProgress};

/// Bar resolution: one tick per tenth of a percent.
const TICKS: u64 = 1000;

/// `indicatif` bar showing the aggregate percentage of one upload.
pub struct UploadBar {
    bar: ProgressBar,
}

impl UploadBar {
    /// Creates a bar labelled `name`. A quiet bar draws nothing.
    pub fn new(name: &str, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(TICKS)
        };
        bar.set_style(
            ProgressStyle::with_template(
                "{msg} {wide_bar:.cyan/dim} {percent:>3}% {prefix} [{elapsed_precise}]",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
        );
        bar.set_message(name.to_string());
        Self { bar }
    }

    /// Callback that moves the bar. Part numbers go to the message.
    pub fn callback(&self) -> ProgressCallback {
        let bar = self.bar.clone();
        Arc::new(move |p: &UploadProgress| {
            bar.set_position(ticks(p.percent));
            if let Some(part) = p.current_part {
                if p.part_count > 1 {
                    bar.set_prefix(format!("{part}/{}", p.part_count));
                }
            }
        })
    }

    /// Rewinds the bar before an upload is started again.
    pub fn restart(&self, attempt: u32) {
        self.bar.reset();
        self.bar.println(format!("retrying (attempt {attempt})"));
    }

    pub fn finish(&self) {
        self.bar.finish();
    }

    /// Leaves the bar where it stopped.
    pub fn abandon(&self) {
        self.bar.abandon();
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

fn ticks(percent: f64) -> u64 {
    ((percent.clamp(0.0, 100.0) / 100.0) * TICKS as f64).round() as u64
}
