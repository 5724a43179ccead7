//! Session codec
//!
//! Converts the store and the history to and from their persisted JSON
//! shapes. Decoding is lenient per entry: a malformed annotation or command
//! is logged and skipped, the rest of the blob still loads. Commands are
//! rebuilt directly onto their stacks without being replayed.

use serde::Deserialize;
use serde_json::Value;

use crate::command::{Command, CommandState, HighlightCommand};
use crate::config::EngineConfig;
use crate::error::{AnnotatorError, AnnotatorResult};
use crate::history::CommandHistory;
use crate::store::AnnotationStore;
use doc_model::{AnnotationEntry, CommandRecord, HistoryRecord};

/// Outcome of decoding one persisted collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeCount {
    pub restored: usize,
    pub skipped: usize,
}

/// History blob as read from disk, before per-entry validation.
#[derive(Debug, Deserialize)]
struct RawHistory {
    #[serde(default)]
    undo_stack: Vec<Value>,
    #[serde(default)]
    redo_stack: Vec<Value>,
    max_stack_size: Option<usize>,
}

pub fn encode_annotations(store: &AnnotationStore) -> Vec<AnnotationEntry> {
    store.to_entries()
}

pub fn encode_history(history: &CommandHistory) -> HistoryRecord {
    HistoryRecord {
        undo_stack: history.undo_stack().map(|command| command.to_record()).collect(),
        redo_stack: history.redo_stack().map(|command| command.to_record()).collect(),
        max_stack_size: history.max_stack_size(),
    }
}

/// Serialized history, as written into the session file.
pub fn history_to_string(history: &CommandHistory) -> AnnotatorResult<String> {
    Ok(serde_json::to_string(&encode_history(history))?)
}

/// Add persisted annotations to `store` in their stored order.
///
/// `null` is an empty collection. Entries that fail to parse or reference a
/// page the document does not have are skipped.
pub fn decode_annotations(
    value: &Value,
    store: &mut AnnotationStore,
) -> AnnotatorResult<DecodeCount> {
    let entries = match value {
        Value::Null => return Ok(DecodeCount::default()),
        Value::Array(entries) => entries,
        other => {
            return Err(AnnotatorError::CorruptPersistedState(format!(
                "annotations must be a list, found {}",
                json_kind(other)
            )))
        }
    };

    let mut count = DecodeCount::default();
    for (position, raw) in entries.iter().enumerate() {
        let entry = match AnnotationEntry::deserialize(raw) {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("skipping malformed annotation {}: {}", position, err);
                count.skipped += 1;
                continue;
            }
        };

        match store.add(entry.page, entry.rect, entry.color) {
            Ok(_) => count.restored += 1,
            Err(err) => {
                log::warn!("skipping annotation {}: {}", position, err);
                count.skipped += 1;
            }
        }
    }

    Ok(count)
}

/// Rebuild a history from its persisted form against an already restored store.
///
/// Undo-stack commands come back `Applied` and linked to the records at
/// their recorded indices; redo-stack commands come back `Reversed` with the
/// records they will reinsert. A missing or zero `max_stack_size` falls back
/// to the configured depth, so such a blob does not re-encode to itself.
pub fn decode_history(
    value: &Value,
    store: &AnnotationStore,
    config: &EngineConfig,
) -> AnnotatorResult<(CommandHistory, DecodeCount)> {
    if value.is_null() {
        return Ok((CommandHistory::new(config.max_stack_size), DecodeCount::default()));
    }

    let raw = RawHistory::deserialize(value).map_err(|err| {
        AnnotatorError::CorruptPersistedState(format!("command history: {}", err))
    })?;

    let mut count = DecodeCount::default();
    let undo = decode_stack(&raw.undo_stack, CommandState::Applied, store, &mut count);
    let redo = decode_stack(&raw.redo_stack, CommandState::Reversed, store, &mut count);

    let max_stack_size = match raw.max_stack_size {
        Some(0) => {
            log::warn!("ignoring saved history depth of 0, using {}", config.max_stack_size);
            config.max_stack_size
        }
        Some(depth) => depth,
        None => config.max_stack_size,
    };
    Ok((CommandHistory::from_stacks(undo, redo, max_stack_size), count))
}

fn decode_stack(
    entries: &[Value],
    state: CommandState,
    store: &AnnotationStore,
    count: &mut DecodeCount,
) -> Vec<Box<dyn Command>> {
    let mut commands: Vec<Box<dyn Command>> = Vec::with_capacity(entries.len());

    for (position, raw) in entries.iter().enumerate() {
        match decode_command(raw, state, store) {
            Ok(command) => {
                commands.push(command);
                count.restored += 1;
            }
            Err(err) => {
                log::warn!("skipping {:?} history entry {}: {}", state, position, err);
                count.skipped += 1;
            }
        }
    }

    commands
}

fn decode_command(
    raw: &Value,
    state: CommandState,
    store: &AnnotationStore,
) -> AnnotatorResult<Box<dyn Command>> {
    let record = CommandRecord::deserialize(raw)
        .map_err(|err| AnnotatorError::CorruptPersistedState(err.to_string()))?;

    match record {
        CommandRecord::Highlight(record) => {
            Ok(Box::new(HighlightCommand::from_record(record, state, store)?))
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
