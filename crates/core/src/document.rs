//! Annotated document session
//!
//! Ties one open document to its annotation store and command history, and
//! implements the save/restore cycle of a session.

use std::path::{Path, PathBuf};

use crate::command::{Command, HighlightCommand};
use crate::config::EngineConfig;
use crate::error::AnnotatorResult;
use crate::geometry::{try_selection_regions, HitUnit, SelectionRange};
use crate::history::CommandHistory;
use crate::session::{self, DecodeCount};
use crate::store::{AnnotationRecord, AnnotationStore};
use doc_model::{Color, SessionFile};

/// Opens a document and reports how many pages it has.
pub trait DocumentOpener {
    fn open(&self, path: &Path) -> AnnotatorResult<u32>;
}

/// Writes annotations into an output document.
pub trait AnnotationSink {
    fn commit(&mut self, records: &[AnnotationRecord], target: &Path) -> AnnotatorResult<()>;
}

/// What to do when a new edit would discard redo history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchPolicy {
    /// Discard the redo history and apply the edit.
    #[default]
    Discard,
    /// Leave everything untouched and ask the caller to confirm first.
    Confirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Applied,
    /// Nothing was changed; resubmit with [`BranchPolicy::Discard`] to proceed.
    NeedsConfirmation,
}

/// Summary of a session restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub annotations: DecodeCount,
    pub commands: DecodeCount,
}

/// One open document with its annotations and undo history.
#[derive(Debug)]
pub struct AnnotatedDocument {
    path: PathBuf,
    store: AnnotationStore,
    history: CommandHistory,
    config: EngineConfig,
}

impl AnnotatedDocument {
    /// Start a fresh session for a document with `page_count` pages.
    pub fn open(path: impl Into<PathBuf>, page_count: u32, config: EngineConfig) -> Self {
        let path = path.into();
        log::debug!("opened {} with {} pages", path.display(), page_count);
        Self {
            path,
            store: AnnotationStore::new(page_count, config.highlight_padding),
            history: CommandHistory::new(config.max_stack_size),
            config,
        }
    }

    /// Open a document through `opener` and start a fresh session for it.
    pub fn open_with(
        opener: &dyn DocumentOpener,
        path: impl Into<PathBuf>,
        config: EngineConfig,
    ) -> AnnotatorResult<Self> {
        let path = path.into();
        let page_count = opener.open(&path)?;
        Ok(Self::open(path, page_count, config))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> u32 {
        self.store.page_count()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    /// Highlight a text selection on one page.
    ///
    /// A selection that covers no hit units is reported as a recoverable
    /// [`AnnotatorError::InvalidRegionRange`](crate::AnnotatorError::InvalidRegionRange).
    pub fn highlight_selection(
        &mut self,
        page_index: u32,
        units: &[HitUnit],
        range: SelectionRange,
        zoom: f64,
        color: Color,
        policy: BranchPolicy,
    ) -> AnnotatorResult<Submission> {
        let regions = try_selection_regions(units, range, zoom, self.config.line_break_ratio)?;
        self.submit(Box::new(HighlightCommand::new(page_index, regions, color)), policy)
    }

    /// Execute a command and record it in the history.
    pub fn submit(
        &mut self,
        command: Box<dyn Command>,
        policy: BranchPolicy,
    ) -> AnnotatorResult<Submission> {
        if policy == BranchPolicy::Confirm && self.history.will_lose_redo_history() {
            return Ok(Submission::NeedsConfirmation);
        }
        self.history.execute(command, &mut self.store)?;
        Ok(Submission::Applied)
    }

    pub fn undo(&mut self) -> AnnotatorResult<bool> {
        self.history.undo(&mut self.store)
    }

    pub fn redo(&mut self) -> AnnotatorResult<bool> {
        self.history.redo(&mut self.store)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn will_lose_redo_history(&self) -> bool {
        self.history.will_lose_redo_history()
    }

    pub fn annotations(&self) -> &[AnnotationRecord] {
        self.store.records()
    }

    pub fn annotations_for_page(&self, page_index: u32) -> Vec<&AnnotationRecord> {
        self.store.records_for_page(page_index)
    }

    /// Write all annotations into `target` through `sink`.
    pub fn commit(&self, sink: &mut dyn AnnotationSink, target: &Path) -> AnnotatorResult<()> {
        log::info!("committing {} annotations to {}", self.store.len(), target.display());
        sink.commit(self.store.records(), target)
    }

    /// Persisted form of this session.
    pub fn snapshot(&self) -> AnnotatorResult<SessionFile> {
        Ok(SessionFile {
            last_file: Some(self.path.clone()),
            annotations: serde_json::to_value(session::encode_annotations(&self.store))?,
            command_history: serde_json::to_value(session::encode_history(&self.history))?,
        })
    }

    /// Reopen the last document of a saved session.
    ///
    /// Returns `Ok(None)` when the session names no document or the document
    /// no longer exists. Annotations are added back first, then the history
    /// is rebuilt against them without replaying any command. A blob that is
    /// corrupt as a whole is logged and treated as empty.
    pub fn restore(
        file: &SessionFile,
        opener: &dyn DocumentOpener,
        config: EngineConfig,
    ) -> AnnotatorResult<Option<(Self, RestoreReport)>> {
        let Some(path) = file.last_file.as_ref() else {
            return Ok(None);
        };
        if !path.exists() {
            log::info!("last document {} no longer exists, not restoring", path.display());
            return Ok(None);
        }

        let mut document = Self::open_with(opener, path.clone(), config)?;
        let mut report = RestoreReport::default();

        match session::decode_annotations(&file.annotations, &mut document.store) {
            Ok(count) => report.annotations = count,
            Err(err) => log::warn!("ignoring saved annotations: {}", err),
        }

        match session::decode_history(&file.command_history, &document.store, &document.config) {
            Ok((history, count)) => {
                document.history = history;
                report.commands = count;
            }
            Err(err) => log::warn!("ignoring saved command history: {}", err),
        }

        log::info!(
            "restored {}: {} annotations ({} skipped), {} commands ({} skipped)",
            path.display(),
            report.annotations.restored,
            report.annotations.skipped,
            report.commands.restored,
            report.commands.skipped
        );
        Ok(Some((document, report)))
    }
}
