//! Reversible annotation edits
//!
//! A [`Command`] is a self-contained replay log for one edit: it holds copies
//! of everything it needs to apply itself and back-references into the store,
//! but never owns store entries.

use crate::error::{AnnotatorError, AnnotatorResult, ReplayOperation};
use crate::store::{AnnotationId, AnnotationRecord, AnnotationStore};
use doc_model::{Color, CommandRecord, HighlightRecord, Rect};

/// Lifecycle of a command.
///
/// `Unapplied -> Applied <-> Reversed`; there is no terminal state, a command
/// lives on whichever history stack holds it until it is evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Unapplied,
    Applied,
    Reversed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Highlight,
}

/// A reversible, serializable edit against an [`AnnotationStore`].
pub trait Command: std::fmt::Debug {
    fn kind(&self) -> CommandKind;

    fn state(&self) -> CommandState;

    /// Apply the edit. Executing a reversed command is a redo.
    fn execute(&mut self, store: &mut AnnotationStore) -> AnnotatorResult<()>;

    /// Revert the edit.
    ///
    /// On failure the command must not be trusted for further replay.
    fn undo(&mut self, store: &mut AnnotationStore) -> AnnotatorResult<()>;

    /// Persisted form, reflecting the command's current bookkeeping.
    fn to_record(&self) -> CommandRecord;

    /// Pages whose annotations change when this command is replayed.
    fn affected_pages(&self) -> Vec<u32>;
}

/// Highlight of one or more regions on a page, undone and redone as a unit.
#[derive(Debug, Clone)]
pub struct HighlightCommand {
    regions: Vec<Rect>,
    page_index: u32,
    color: Color,
    /// Last known store position of the record produced for each region
    applied_indices: Vec<Option<usize>>,
    /// Identity of the record produced for each region, when known
    applied_ids: Vec<Option<AnnotationId>>,
    /// Records removed by the last undo, in the store order they had
    pending_snapshot: Vec<AnnotationRecord>,
    /// Region slot of each `pending_snapshot` entry
    pending_slots: Vec<usize>,
    state: CommandState,
}

impl HighlightCommand {
    pub fn new(page_index: u32, regions: Vec<Rect>, color: Color) -> Self {
        let count = regions.len();
        Self {
            regions,
            page_index,
            color,
            applied_indices: vec![None; count],
            applied_ids: vec![None; count],
            pending_snapshot: Vec::new(),
            pending_slots: Vec::new(),
            state: CommandState::Unapplied,
        }
    }

    /// Rebuild a command from its persisted form without replaying it.
    ///
    /// `state` is the state implied by the stack the record was stored on:
    /// [`CommandState::Applied`] for the undo stack, [`CommandState::Reversed`]
    /// for the redo stack. Applied commands are re-linked to the store records
    /// sitting at their recorded indices; reversed commands rebuild the
    /// records they will reinsert on redo.
    pub fn from_record(
        record: HighlightRecord,
        state: CommandState,
        store: &AnnotationStore,
    ) -> AnnotatorResult<Self> {
        let HighlightRecord { rects, page_num, color, mut annotation_indices } = record;

        if rects.is_empty() {
            return Err(AnnotatorError::CorruptPersistedState(
                "highlight has no regions".to_string(),
            ));
        }
        if page_num >= store.page_count() {
            return Err(AnnotatorError::CorruptPersistedState(format!(
                "highlight on page {} but document has {} pages",
                page_num,
                store.page_count()
            )));
        }
        if annotation_indices.is_empty() {
            annotation_indices = vec![None; rects.len()];
        }
        if annotation_indices.len() != rects.len() {
            return Err(AnnotatorError::CorruptPersistedState(format!(
                "highlight has {} regions but {} annotation indices",
                rects.len(),
                annotation_indices.len()
            )));
        }

        let mut command = Self::new(page_num, rects, color);
        command.applied_indices = annotation_indices;
        command.state = state;

        match state {
            CommandState::Applied => command.link_applied(store)?,
            CommandState::Reversed => {
                let mut slots: Vec<usize> = (0..command.regions.len()).collect();
                slots.sort_by_key(|&slot| command.applied_indices[slot].unwrap_or(usize::MAX));
                command.pending_snapshot = slots
                    .iter()
                    .map(|&slot| {
                        let rect = command.regions[slot];
                        AnnotationRecord::highlight(page_num, rect, color, store.padding())
                    })
                    .collect();
                command.pending_slots = slots;
            }
            CommandState::Unapplied => {}
        }

        Ok(command)
    }

    pub fn regions(&self) -> &[Rect] {
        &self.regions
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn applied_indices(&self) -> &[Option<usize>] {
        &self.applied_indices
    }

    pub fn pending_snapshot(&self) -> &[AnnotationRecord] {
        &self.pending_snapshot
    }

    fn link_applied(&mut self, store: &AnnotationStore) -> AnnotatorResult<()> {
        for (slot, index) in self.applied_indices.iter().enumerate() {
            let Some(index) = *index else {
                return Err(AnnotatorError::CorruptPersistedState(format!(
                    "applied highlight region {} has no annotation index",
                    slot
                )));
            };

            let expected = AnnotationRecord::highlight(
                self.page_index,
                self.regions[slot],
                self.color,
                store.padding(),
            );
            self.applied_ids[slot] = match store.get(index) {
                Some(record) if record.same_content(&expected) => Some(record.id()),
                _ => {
                    log::debug!(
                        "highlight region {} does not match store index {}, keeping index only",
                        slot,
                        index
                    );
                    None
                }
            };
        }
        Ok(())
    }

    fn check_page(&self, store: &AnnotationStore) -> AnnotatorResult<()> {
        if self.page_index >= store.page_count() {
            return Err(AnnotatorError::PageOutOfRange {
                page: self.page_index,
                page_count: store.page_count(),
            });
        }
        Ok(())
    }

    fn apply_first(&mut self, store: &mut AnnotationStore) -> AnnotatorResult<()> {
        for (slot, rect) in self.regions.iter().enumerate() {
            let (index, record) = store.add(self.page_index, *rect, self.color)?;
            self.applied_indices[slot] = Some(index);
            self.applied_ids[slot] = Some(record.id());
        }
        Ok(())
    }

    fn reinsert_snapshot(&mut self, store: &mut AnnotationStore) -> AnnotatorResult<()> {
        let snapshot = std::mem::take(&mut self.pending_snapshot);
        let slots = std::mem::take(&mut self.pending_slots);

        // Ascending target order so each exact position is valid when it is used.
        let mut pending: Vec<(usize, AnnotationRecord)> = slots.into_iter().zip(snapshot).collect();
        pending.sort_by_key(|(slot, _)| self.applied_indices[*slot].unwrap_or(usize::MAX));

        for (slot, record) in pending {
            let target = self.applied_indices[slot].unwrap_or(usize::MAX);
            self.applied_ids[slot] = Some(record.id());
            store.insert_at(target, record)?;
        }

        // Appended records may have been shifted by later exact insertions.
        for (slot, id) in self.applied_ids.iter().enumerate() {
            self.applied_indices[slot] = id.and_then(|id| store.position_of(id));
        }
        Ok(())
    }

    /// Current store position of every region's record, all resolved before
    /// anything is removed.
    fn resolve_positions(&self, store: &AnnotationStore) -> AnnotatorResult<Vec<(usize, usize)>> {
        let mut positions = Vec::with_capacity(self.regions.len());

        for slot in 0..self.regions.len() {
            let position = match (self.applied_ids[slot], self.applied_indices[slot]) {
                (Some(id), recorded) => {
                    store.position_of(id).ok_or(AnnotatorError::IndexOutOfRange {
                        index: recorded.unwrap_or(store.len()),
                        len: store.len(),
                    })?
                }
                (None, Some(index)) if index < store.len() => index,
                (None, Some(index)) => {
                    return Err(AnnotatorError::IndexOutOfRange { index, len: store.len() })
                }
                (None, None) => {
                    return Err(AnnotatorError::CorruptPersistedState(format!(
                        "highlight region {} was never applied",
                        slot
                    )))
                }
            };
            positions.push((slot, position));
        }

        positions.sort_by(|a, b| b.1.cmp(&a.1));
        if positions.windows(2).any(|pair| pair[0].1 == pair[1].1) {
            return Err(AnnotatorError::CorruptPersistedState(
                "two highlight regions point at the same annotation".to_string(),
            ));
        }
        Ok(positions)
    }
}

impl Command for HighlightCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::Highlight
    }

    fn state(&self) -> CommandState {
        self.state
    }

    fn execute(&mut self, store: &mut AnnotationStore) -> AnnotatorResult<()> {
        if self.regions.is_empty() {
            return Err(AnnotatorError::EmptyCommand);
        }
        self.check_page(store)?;

        match self.state {
            CommandState::Unapplied => self.apply_first(store)?,
            CommandState::Reversed => self.reinsert_snapshot(store)?,
            CommandState::Applied => {
                return Err(AnnotatorError::InvalidCommandState {
                    operation: ReplayOperation::Execute,
                    state: self.state,
                })
            }
        }

        self.state = CommandState::Applied;
        Ok(())
    }

    fn undo(&mut self, store: &mut AnnotationStore) -> AnnotatorResult<()> {
        if self.state != CommandState::Applied {
            return Err(AnnotatorError::InvalidCommandState {
                operation: ReplayOperation::Undo,
                state: self.state,
            });
        }
        if self.regions.is_empty() {
            return Err(AnnotatorError::EmptyCommand);
        }

        // Descending positions keep the remaining ones valid during the loop.
        let positions = self.resolve_positions(store)?;
        let mut removed = Vec::with_capacity(positions.len());
        for (slot, position) in positions {
            let record = store.remove_at(position)?;
            self.applied_indices[slot] = Some(position);
            self.applied_ids[slot] = Some(record.id());
            removed.push((slot, record));
        }

        removed.reverse();
        let (slots, records): (Vec<usize>, Vec<AnnotationRecord>) = removed.into_iter().unzip();
        self.pending_slots = slots;
        self.pending_snapshot = records;
        self.state = CommandState::Reversed;
        Ok(())
    }

    fn to_record(&self) -> CommandRecord {
        CommandRecord::Highlight(HighlightRecord {
            rects: self.regions.clone(),
            page_num: self.page_index,
            color: self.color,
            annotation_indices: self.applied_indices.clone(),
        })
    }

    fn affected_pages(&self) -> Vec<u32> {
        vec![self.page_index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions() -> Vec<Rect> {
        vec![Rect::new(10.0, 10.0, 100.0, 20.0), Rect::new(10.0, 22.0, 60.0, 32.0)]
    }

    fn store_with_background() -> AnnotationStore {
        let mut store = AnnotationStore::new(3, 1.0);
        store.add(1, Rect::new(0.0, 0.0, 5.0, 5.0), Color::SEARCH_GREEN).unwrap();
        store
    }

    #[test]
    fn test_first_execute_records_indices() {
        let mut store = store_with_background();
        let mut command = HighlightCommand::new(0, regions(), Color::HIGHLIGHT_YELLOW);
        assert_eq!(command.state(), CommandState::Unapplied);
        assert_eq!(command.applied_indices(), &[None, None]);

        command.execute(&mut store).unwrap();

        assert_eq!(command.state(), CommandState::Applied);
        assert_eq!(command.applied_indices(), &[Some(1), Some(2)]);
        assert!(command.pending_snapshot().is_empty());
        assert_eq!(store.records_for_page(0).len(), 2);
    }

    #[test]
    fn test_undo_snapshots_in_store_order() {
        let mut store = store_with_background();
        let mut command = HighlightCommand::new(0, regions(), Color::HIGHLIGHT_YELLOW);
        command.execute(&mut store).unwrap();
        let applied: Vec<AnnotationRecord> = store.records()[1..].to_vec();

        command.undo(&mut store).unwrap();

        assert_eq!(command.state(), CommandState::Reversed);
        assert_eq!(command.pending_snapshot(), applied.as_slice());
        assert_eq!(command.applied_indices(), &[Some(1), Some(2)]);
        assert_eq!(store.len(), 1);
        assert!(store.records_for_page(0).is_empty());
    }

    #[test]
    fn test_execute_undo_redo_restores_identical_records() {
        let mut store = store_with_background();
        let mut command = HighlightCommand::new(0, regions(), Color::HIGHLIGHT_YELLOW);
        command.execute(&mut store).unwrap();
        let after_first: Vec<AnnotationRecord> = store.records().to_vec();

        command.undo(&mut store).unwrap();
        command.execute(&mut store).unwrap();

        assert_eq!(store.records(), after_first.as_slice());
        assert!(command.pending_snapshot().is_empty());
        assert_eq!(command.applied_indices(), &[Some(1), Some(2)]);
    }

    #[test]
    fn test_undo_follows_records_that_moved() {
        let mut store = AnnotationStore::new(1, 1.0);
        let mut command = HighlightCommand::new(0, regions(), Color::HIGHLIGHT_YELLOW);
        command.execute(&mut store).unwrap();

        // Something else lands in front of the highlight.
        let unrelated =
            AnnotationRecord::highlight(0, Rect::new(0.0, 0.0, 1.0, 1.0), Color::SEARCH_GREEN, 1.0);
        let unrelated_id = unrelated.id();
        store.insert_at(0, unrelated).unwrap();

        command.undo(&mut store).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].id(), unrelated_id);
        assert_eq!(command.applied_indices(), &[Some(1), Some(2)]);
    }

    #[test]
    fn test_undo_with_missing_record_fails_without_mutation() {
        let mut store = AnnotationStore::new(1, 1.0);
        let mut command = HighlightCommand::new(0, regions(), Color::HIGHLIGHT_YELLOW);
        command.execute(&mut store).unwrap();
        store.remove_at(1).unwrap();

        let err = command.undo(&mut store).unwrap_err();

        assert!(matches!(err, AnnotatorError::IndexOutOfRange { .. }));
        assert_eq!(store.len(), 1);
        assert_eq!(command.state(), CommandState::Applied);
    }

    #[test]
    fn test_snapshot_follows_store_order_not_region_order() {
        let first = Rect::new(10.0, 10.0, 100.0, 20.0);
        let second = Rect::new(10.0, 22.0, 60.0, 32.0);
        let mut store = AnnotationStore::new(1, 1.0);
        store.add(0, second, Color::HIGHLIGHT_YELLOW).unwrap();
        store.add(0, first, Color::HIGHLIGHT_YELLOW).unwrap();
        let before = store.to_entries();
        let record = HighlightRecord {
            rects: vec![first, second],
            page_num: 0,
            color: Color::HIGHLIGHT_YELLOW,
            annotation_indices: vec![Some(1), Some(0)],
        };
        let mut command =
            HighlightCommand::from_record(record, CommandState::Applied, &store).unwrap();

        command.undo(&mut store).unwrap();

        let snapshot: Vec<Rect> = command.pending_snapshot().iter().map(|r| r.rect()).collect();
        assert_eq!(snapshot, vec![second, first]);
        assert_eq!(command.applied_indices(), &[Some(1), Some(0)]);

        command.execute(&mut store).unwrap();
        assert_eq!(store.to_entries(), before);
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let mut store = AnnotationStore::new(1, 1.0);
        let mut command = HighlightCommand::new(0, Vec::new(), Color::HIGHLIGHT_YELLOW);

        let err = command.execute(&mut store).unwrap_err();
        assert!(matches!(err, AnnotatorError::EmptyCommand));
        assert_eq!(command.state(), CommandState::Unapplied);

        let mut applied = HighlightCommand {
            state: CommandState::Applied,
            ..HighlightCommand::new(0, Vec::new(), Color::HIGHLIGHT_YELLOW)
        };
        assert!(matches!(applied.undo(&mut store), Err(AnnotatorError::EmptyCommand)));
        assert_eq!(applied.state(), CommandState::Applied);
    }

    #[test]
    fn test_from_record_rejects_empty_regions() {
        let store = store_with_background();
        let record = HighlightRecord {
            rects: Vec::new(),
            page_num: 0,
            color: Color::HIGHLIGHT_YELLOW,
            annotation_indices: Vec::new(),
        };

        let err = HighlightCommand::from_record(record, CommandState::Applied, &store).unwrap_err();
        assert!(matches!(err, AnnotatorError::CorruptPersistedState(_)));
    }

    #[test]
    fn test_state_guards() {
        let mut store = AnnotationStore::new(1, 1.0);
        let mut command = HighlightCommand::new(0, regions(), Color::HIGHLIGHT_YELLOW);

        assert!(matches!(
            command.undo(&mut store),
            Err(AnnotatorError::InvalidCommandState { operation: ReplayOperation::Undo, .. })
        ));

        command.execute(&mut store).unwrap();
        assert!(matches!(
            command.execute(&mut store),
            Err(AnnotatorError::InvalidCommandState { operation: ReplayOperation::Execute, .. })
        ));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_execute_on_missing_page_is_rejected() {
        let mut store = AnnotationStore::new(1, 1.0);
        let mut command = HighlightCommand::new(4, regions(), Color::HIGHLIGHT_YELLOW);

        let err = command.execute(&mut store).unwrap_err();
        assert!(matches!(err, AnnotatorError::PageOutOfRange { page: 4, page_count: 1 }));
        assert!(store.is_empty());
        assert_eq!(command.state(), CommandState::Unapplied);
    }

    #[test]
    fn test_redo_appends_when_position_is_gone() {
        let mut store = AnnotationStore::new(1, 1.0);
        store.add(0, Rect::new(0.0, 0.0, 1.0, 1.0), Color::SEARCH_GREEN).unwrap();
        store.add(0, Rect::new(2.0, 0.0, 3.0, 1.0), Color::SEARCH_GREEN).unwrap();
        let region = Rect::new(10.0, 10.0, 20.0, 20.0);
        let mut command = HighlightCommand::new(0, vec![region], Color::HIGHLIGHT_YELLOW);
        command.execute(&mut store).unwrap();
        command.undo(&mut store).unwrap();
        assert_eq!(command.applied_indices(), &[Some(2)]);

        store.remove_at(0).unwrap();
        store.remove_at(0).unwrap();
        command.execute(&mut store).unwrap();

        assert_eq!(command.applied_indices(), &[Some(0)]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_record_carries_current_indices() {
        let mut store = store_with_background();
        let mut command = HighlightCommand::new(0, regions(), Color::HIGHLIGHT_YELLOW);
        command.execute(&mut store).unwrap();

        let CommandRecord::Highlight(record) = command.to_record();
        assert_eq!(record.rects, regions());
        assert_eq!(record.page_num, 0);
        assert_eq!(record.color, Color::HIGHLIGHT_YELLOW);
        assert_eq!(record.annotation_indices, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_from_record_applied_links_to_store_records() {
        let mut store = store_with_background();
        let mut original = HighlightCommand::new(0, regions(), Color::HIGHLIGHT_YELLOW);
        original.execute(&mut store).unwrap();
        let CommandRecord::Highlight(record) = original.to_record();

        let mut restored =
            HighlightCommand::from_record(record, CommandState::Applied, &store).unwrap();
        assert_eq!(restored.state(), CommandState::Applied);

        restored.undo(&mut store).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_from_record_reversed_rebuilds_snapshot() {
        let store = store_with_background();
        let record = HighlightRecord {
            rects: regions(),
            page_num: 0,
            color: Color::HIGHLIGHT_YELLOW,
            annotation_indices: vec![Some(1), Some(2)],
        };

        let command =
            HighlightCommand::from_record(record, CommandState::Reversed, &store).unwrap();

        assert_eq!(command.state(), CommandState::Reversed);
        assert_eq!(command.pending_snapshot().len(), 2);
        assert_eq!(command.pending_snapshot()[0].region(), regions()[0].padded_x(1.0));
    }

    #[test]
    fn test_from_record_rejects_mismatched_indices() {
        let store = store_with_background();
        let record = HighlightRecord {
            rects: regions(),
            page_num: 0,
            color: Color::HIGHLIGHT_YELLOW,
            annotation_indices: vec![Some(1)],
        };

        let err = HighlightCommand::from_record(record, CommandState::Applied, &store).unwrap_err();
        assert!(matches!(err, AnnotatorError::CorruptPersistedState(_)));
    }

    #[test]
    fn test_from_record_rejects_unknown_page() {
        let store = store_with_background();
        let record = HighlightRecord {
            rects: regions(),
            page_num: 7,
            color: Color::HIGHLIGHT_YELLOW,
            annotation_indices: Vec::new(),
        };

        let err =
            HighlightCommand::from_record(record, CommandState::Reversed, &store).unwrap_err();
        assert!(matches!(err, AnnotatorError::CorruptPersistedState(_)));
    }
}
