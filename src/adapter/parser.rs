//! Parallel document parsing
//!
//! Documents are fed to a pool of worker threads over a crossbeam channel.
//! Each worker owns one tree-sitter parser. Results are put back in
//! discovery order so everything downstream is deterministic.

use std::fs;

use crossbeam::channel::{self, Sender};

use super::framework::{LanguageAdapter, SourceDocument};
use crate::ui::{ProgressMessage, ProgressPhase};
use crate::workspace::{DiagnosticKind, DocumentRef, WorkspaceDiagnostic};
use crate::{Error, Result};

/// Parsed documents plus the problems met on the way
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub documents: Vec<SourceDocument>,
    pub diagnostics: Vec<WorkspaceDiagnostic>,
}

/// Parse every document with `jobs` workers.
///
/// Unreadable documents and syntax errors are diagnostics; only failing to
/// set up a parser at all is an error.
pub fn parse_documents<A: LanguageAdapter>(
    adapter: &A,
    documents: &[DocumentRef],
    jobs: usize,
    progress: Option<&Sender<ProgressMessage>>,
) -> Result<ParseOutcome> {
    // Fail early if the grammar cannot be loaded
    adapter.parser()?;

    if let Some(tx) = progress {
        let _ = tx.send(ProgressMessage::Started {
            phase: ProgressPhase::Parsing,
            total: documents.len(),
        });
    }

    let jobs = jobs.clamp(1, documents.len().max(1));
    let (work_tx, work_rx) = channel::unbounded::<(usize, DocumentRef)>();
    for item in documents.iter().cloned().enumerate() {
        let _ = work_tx.send(item);
    }
    drop(work_tx);

    let (result_tx, result_rx) = channel::unbounded::<(usize, std::result::Result<SourceDocument, String>)>();

    let slots = crossbeam::thread::scope(|s| {
        for _ in 0..jobs {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            s.spawn(move |_| {
                let mut parser = match adapter.parser() {
                    Ok(parser) => parser,
                    Err(e) => {
                        tracing::error!("Parser worker failed to start: {}", e);
                        return;
                    }
                };
                for (index, document) in work_rx.iter() {
                    let outcome = fs::read_to_string(&document.path)
                        .map_err(|e| e.to_string())
                        .and_then(|source| {
                            let path = document.path.to_string_lossy().to_string();
                            SourceDocument::parse(&mut parser, path, document.project, source)
                                .map_err(|e| e.to_string())
                        });
                    if result_tx.send((index, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut slots: Vec<Option<std::result::Result<SourceDocument, String>>> =
            (0..documents.len()).map(|_| None).collect();
        for (count, (index, outcome)) in result_rx.iter().enumerate() {
            if let Some(tx) = progress {
                let _ = tx.send(ProgressMessage::Progress {
                    phase: ProgressPhase::Parsing,
                    current: count + 1,
                    file: documents[index].path.file_name().map(|n| n.to_string_lossy().to_string()),
                });
            }
            slots[index] = Some(outcome);
        }
        slots
    })
    .map_err(|_| Error::Worker("parser worker panicked".to_string()))?;

    if let Some(tx) = progress {
        let _ = tx.send(ProgressMessage::Finished {
            phase: ProgressPhase::Parsing,
        });
    }

    let mut outcome = ParseOutcome::default();
    for (slot, reference) in slots.into_iter().zip(documents) {
        match slot {
            Some(Ok(document)) => {
                if document.has_syntax_errors() {
                    tracing::warn!("Syntax errors in {}", document.path);
                    outcome.diagnostics.push(WorkspaceDiagnostic {
                        kind: DiagnosticKind::SyntaxError,
                        path: reference.path.clone(),
                        message: "document has syntax errors; extraction continues on the partial tree".to_string(),
                    });
                }
                outcome.documents.push(document);
            }
            Some(Err(reason)) => {
                tracing::warn!("Cannot read {}: {}", reference.path.display(), reason);
                outcome.diagnostics.push(WorkspaceDiagnostic {
                    kind: DiagnosticKind::UnreadableDocument,
                    path: reference.path.clone(),
                    message: reason,
                });
            }
            None => {
                tracing::warn!("Document was not parsed: {}", reference.path.display());
                outcome.diagnostics.push(WorkspaceDiagnostic {
                    kind: DiagnosticKind::UnreadableDocument,
                    path: reference.path.clone(),
                    message: "no parser worker processed this document".to_string(),
                });
            }
        }
    }

    Ok(outcome)
}
