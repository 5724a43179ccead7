//! Highlight annotation engine
//!
//! Annotation store, reversible highlight commands with a bounded undo/redo
//! history, session persistence, and the geometry that turns a text
//! selection into highlight regions.

pub mod command;
pub mod config;
pub mod document;
pub mod error;
pub mod geometry;
pub mod history;
pub mod search;
pub mod session;
pub mod store;
pub mod text_layer;

pub use command::{Command, CommandKind, CommandState, HighlightCommand};
pub use config::{ConfigError, EngineConfig, DEFAULT_MAX_STACK_SIZE};
pub use document::{
    AnnotatedDocument, AnnotationSink, BranchPolicy, DocumentOpener, RestoreReport, Submission,
};
pub use error::{AnnotatorError, AnnotatorResult, ReplayOperation};
pub use geometry::{
    nearest_unit, selected_text, selection_regions, try_selection_regions, word_at, HitUnit,
    ScreenRect, SelectionRange,
};
pub use history::CommandHistory;
pub use search::{find_matches, SearchHit, SearchResults};
pub use session::DecodeCount;
pub use store::{AnnotationId, AnnotationRecord, AnnotationStore};
pub use text_layer::{
    hit_units, OcrEngine, OcrFallback, PageRenderer, PageTextLayer, PixelBuffer, TextOrigin,
    TextRun, TextRunSource,
};
