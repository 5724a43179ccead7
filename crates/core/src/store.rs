//! Annotation store
//!
//! The ordered set of annotations of one open document. Order is paint
//! order: later records draw over earlier ones. The store is the only
//! component that mutates the collection; commands replay edits through it.

use crate::error::{AnnotatorError, AnnotatorResult};
use doc_model::{AnnotationEntry, AnnotationKind, Color, Rect};

/// Stable identifier for an annotation record
///
/// Assigned once when the record is created and carried through undo and
/// redo, unlike store indices which shift on every insert or removal.
pub type AnnotationId = uuid::Uuid;

/// One annotation as held by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    id: AnnotationId,
    kind: AnnotationKind,
    page_index: u32,
    /// Region as requested by the edit
    rect: Rect,
    /// Region with display padding applied, what gets painted
    region: Rect,
    color: Color,
}

impl AnnotationRecord {
    /// Create a highlight record, applying `padding` horizontally once.
    pub fn highlight(page_index: u32, rect: Rect, color: Color, padding: f64) -> Self {
        Self {
            id: AnnotationId::new_v4(),
            kind: AnnotationKind::Highlight,
            page_index,
            rect,
            region: rect.padded_x(padding),
            color,
        }
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// The requested rectangle, without padding.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// The padded rectangle to paint.
    pub fn region(&self) -> Rect {
        self.region
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Same geometry, page and color, ignoring identity.
    pub fn same_content(&self, other: &AnnotationRecord) -> bool {
        self.kind == other.kind
            && self.page_index == other.page_index
            && self.region == other.region
            && self.color == other.color
    }

    pub fn to_entry(&self) -> AnnotationEntry {
        AnnotationEntry {
            kind: self.kind,
            page: self.page_index,
            color: self.color,
            rect: self.rect,
        }
    }
}

/// Ordered annotation collection for one document.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    records: Vec<AnnotationRecord>,
    page_count: u32,
    padding: f64,
}

impl AnnotationStore {
    /// Create an empty store for a document with `page_count` pages.
    pub fn new(page_count: u32, padding: f64) -> Self {
        Self { records: Vec::new(), page_count, padding }
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }

    /// Append a new highlight and return its current index with the record.
    pub fn add(
        &mut self,
        page_index: u32,
        rect: Rect,
        color: Color,
    ) -> AnnotatorResult<(usize, &AnnotationRecord)> {
        self.check_page(page_index)?;

        let record = AnnotationRecord::highlight(page_index, rect, color, self.padding);
        log::debug!(
            "add annotation {} on page {} at index {}",
            record.id,
            page_index,
            self.records.len()
        );
        self.records.push(record);

        let index = self.records.len() - 1;
        Ok((index, &self.records[index]))
    }

    /// Remove and return the record at `index`.
    ///
    /// When removing several records by indices captured before the first
    /// removal, remove them in descending index order.
    pub fn remove_at(&mut self, index: usize) -> AnnotatorResult<AnnotationRecord> {
        if index >= self.records.len() {
            return Err(AnnotatorError::IndexOutOfRange { index, len: self.records.len() });
        }
        let record = self.records.remove(index);
        log::debug!("removed annotation {} from index {}", record.id, index);
        Ok(record)
    }

    /// Reinsert a previously removed record.
    ///
    /// The record goes to `index` when that position is still within bounds,
    /// otherwise it is appended. Returns the position actually used.
    pub fn insert_at(&mut self, index: usize, record: AnnotationRecord) -> AnnotatorResult<usize> {
        self.check_page(record.page_index)?;

        if index <= self.records.len() {
            self.records.insert(index, record);
            Ok(index)
        } else {
            log::debug!(
                "insert index {} beyond end ({}), appending annotation {}",
                index,
                self.records.len(),
                record.id
            );
            self.records.push(record);
            Ok(self.records.len() - 1)
        }
    }

    /// Records on one page, in store order.
    pub fn records_for_page(&self, page_index: u32) -> Vec<&AnnotationRecord> {
        self.records.iter().filter(|record| record.page_index == page_index).collect()
    }

    pub fn get(&self, index: usize) -> Option<&AnnotationRecord> {
        self.records.get(index)
    }

    /// Current position of a record, if it is still in the store.
    pub fn position_of(&self, id: AnnotationId) -> Option<usize> {
        self.records.iter().position(|record| record.id == id)
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn to_entries(&self) -> Vec<AnnotationEntry> {
        self.records.iter().map(AnnotationRecord::to_entry).collect()
    }

    fn check_page(&self, page: u32) -> AnnotatorResult<()> {
        if page >= self.page_count {
            return Err(AnnotatorError::PageOutOfRange { page, page_count: self.page_count });
        }
        Ok(())
    }
}
