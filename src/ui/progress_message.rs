/// Stages of an index run that report progress
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressPhase {
    Parsing,
    Declaring,
    Linking,
}

impl ProgressPhase {
    pub fn label(&self) -> &'static str {
        match self {
            ProgressPhase::Parsing => "Parsing",
            ProgressPhase::Declaring => "Declaring",
            ProgressPhase::Linking => "Linking",
        }
    }
}

/// Sent by parser and binder workers to the progress thread
#[derive(Clone, Debug)]
pub enum ProgressMessage {
    Started {
        phase: ProgressPhase,
        total: usize,
    },
    /// `current` documents done; `file` is the last one finished
    Progress {
        phase: ProgressPhase,
        current: usize,
        file: Option<String>,
    },
    Finished {
        phase: ProgressPhase,
    },
}
