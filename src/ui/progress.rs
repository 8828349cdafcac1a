use crate::output::is_quiet;
use crate::ui::progress_message::{ProgressMessage, ProgressPhase};
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, MultiProgress, ProgressBar, ProgressDrawTarget};
use owo_colors::OwoColorize;
use std::thread;
use std::time::Duration;

fn visible() -> bool {
    !is_quiet() && console::Term::stderr().is_term()
}

/// Progress bars for an index run, fed from worker threads over a channel
pub struct ProgressManager {
    mp: MultiProgress,
    handle: Option<thread::JoinHandle<()>>,
}

impl ProgressManager {
    pub fn new(total_files: usize) -> (Self, crossbeam::channel::Sender<ProgressMessage>) {
        let (tx, rx) = crossbeam::channel::unbounded::<ProgressMessage>();

        let mp = MultiProgress::with_draw_target(if visible() {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        });

        let parsing = mp.add(ProgressBar::new(total_files as u64).with_message("Parsing documents"));
        let declaring = mp.add(ProgressBar::new_spinner().with_message("Declaring symbols"));
        let linking = mp.add(ProgressBar::new(0).with_message("Linking relationships"));

        let handle = thread::spawn(move || {
            for msg in rx {
                let bar = |phase: ProgressPhase| match phase {
                    ProgressPhase::Parsing => &parsing,
                    ProgressPhase::Declaring => &declaring,
                    ProgressPhase::Linking => &linking,
                };
                match msg {
                    ProgressMessage::Started { phase, total } => {
                        let pb = bar(phase);
                        if total > 0 {
                            pb.set_length(total as u64);
                        }
                        pb.enable_steady_tick(Duration::from_millis(100));
                    }
                    ProgressMessage::Progress { phase, current, file } => {
                        let pb = bar(phase);
                        pb.set_position(current as u64);
                        if let Some(ref f) = file {
                            pb.set_message(format!("{}: {}", phase.label(), f));
                        }
                    }
                    ProgressMessage::Finished { phase } => {
                        bar(phase).finish_with_message("Done");
                    }
                }
            }
        });

        (
            Self {
                mp,
                handle: Some(handle),
            },
            tx,
        )
    }

    /// Wait for the drawing thread; every sender must be dropped first
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::debug!("progress thread panicked");
            }
        }
        self.mp.clear().ok();
    }

    pub fn finish_with_summary(&mut self, duration: Duration, files: usize, symbols: usize, edges: usize) {
        self.join();
        if is_quiet() {
            return;
        }
        eprintln!();
        eprintln!(
            "{} {}",
            Icons::CHECK.style(theme().success.clone()),
            format!("Complete in {}", HumanDuration(duration)).style(theme().success.clone())
        );
        eprintln!(
            "  {} {}  {} {}  {} {}",
            Icons::FILE.style(theme().accent.clone()),
            files,
            Icons::PACKAGE.style(theme().accent.clone()),
            symbols,
            Icons::LINK.style(theme().accent.clone()),
            edges
        );
    }
}

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = if visible() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }
}
