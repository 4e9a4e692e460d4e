use events::{EventSink, Phase, PhaseEvent, PhaseStatus, TracingSink};
use indicatif::{ProgressBar, ProgressStyle};

/// Advances a progress bar once per finished window and hands every other
/// event to `tracing`.
pub struct ProgressSink {
    bar: ProgressBar,
    inner: TracingSink,
}

impl ProgressSink {
    pub fn new(total_windows: u64) -> anyhow::Result<Self> {
        let bar = ProgressBar::new(total_windows);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                .progress_chars("#>-"),
        );
        Ok(Self {
            bar,
            inner: TracingSink,
        })
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Simulation complete.");
    }
}

impl EventSink for ProgressSink {
    fn emit(&self, event: PhaseEvent) {
        match (event.phase, event.status) {
            (Phase::WindowWeights, PhaseStatus::Finish) => self.bar.inc(1),
            (Phase::WindowWeights, PhaseStatus::Failed) => {
                self.bar.inc(1);
                self.bar.suspend(|| self.inner.emit(event));
            }
            (Phase::WindowWeights, PhaseStatus::Start) => {}
            (Phase::VariableSetup, PhaseStatus::Start) => {
                self.bar.set_message(event.message.clone());
                self.bar.suspend(|| self.inner.emit(event));
            }
            _ => self.bar.suspend(|| self.inner.emit(event)),
        }
    }
}
