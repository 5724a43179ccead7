//! Selection geometry
//!
//! Converts a run of character hit-test units, laid out on screen at some
//! zoom factor, into the minimal set of line rectangles in document space.
//! Everything here is a pure function of its inputs.

use doc_model::Rect;

/// Rectangle in screen pixels at a known zoom factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }
}

/// The smallest selectable piece of text: one character and where it sits on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitUnit {
    pub text: char,
    pub rect: ScreenRect,
}

impl HitUnit {
    pub fn new(text: char, rect: ScreenRect) -> Self {
        Self { text, rect }
    }

    pub fn is_whitespace(&self) -> bool {
        self.text.is_whitespace()
    }
}

/// Inclusive range of hit-unit indices, always `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionRange {
    pub start: usize,
    pub end: usize,
}

impl SelectionRange {
    /// Build a range from a drag anchor and focus, in either direction.
    pub fn new(anchor: usize, focus: usize) -> Self {
        Self { start: anchor.min(focus), end: anchor.max(focus) }
    }

    pub fn single(index: usize) -> Self {
        Self { start: index, end: index }
    }

    /// Number of units covered, zero for a reversed range.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.end - self.start + 1
        }
    }

    /// A range built with `start > end` covers nothing.
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index <= self.end
    }

    /// Intersect with the indices actually available, `None` when disjoint.
    pub fn clamp_to(&self, available: usize) -> Option<SelectionRange> {
        if self.is_empty() || self.start >= available {
            return None;
        }
        Some(SelectionRange { start: self.start, end: self.end.min(available - 1) })
    }
}

/// Group the selected units into one document-space rectangle per visual line.
///
/// A unit starts a new line when its vertical center moves more than
/// `line_break_ratio` of its height away from the center of the first unit of
/// the current line. Each line rectangle spans the horizontal extent of its
/// units and takes the vertical extent of its first unit. Screen coordinates
/// are divided by `zoom`.
///
/// A range that does not intersect `units` yields no rectangles.
pub fn selection_regions(
    units: &[HitUnit],
    range: SelectionRange,
    zoom: f64,
    line_break_ratio: f64,
) -> Vec<Rect> {
    let Some(range) = range.clamp_to(units.len()) else {
        return Vec::new();
    };
    if !(zoom.is_finite() && zoom > 0.0) {
        log::warn!("ignoring selection at invalid zoom factor {}", zoom);
        return Vec::new();
    }

    let mut regions = Vec::new();
    let mut line: Option<LineGroup> = None;

    for unit in &units[range.start..=range.end] {
        let rect = unit.rect;
        match line.as_mut() {
            Some(group) if !group.breaks_at(&rect, line_break_ratio) => group.push(&rect),
            _ => {
                if let Some(done) = line.take() {
                    regions.push(done.to_document_rect(zoom));
                }
                line = Some(LineGroup::start(rect));
            }
        }
    }

    if let Some(done) = line {
        regions.push(done.to_document_rect(zoom));
    }

    regions
}

/// Same as [`selection_regions`] but reports a selection that misses every
/// unit as [`AnnotatorError::InvalidRegionRange`](crate::AnnotatorError::InvalidRegionRange).
pub fn try_selection_regions(
    units: &[HitUnit],
    range: SelectionRange,
    zoom: f64,
    line_break_ratio: f64,
) -> crate::AnnotatorResult<Vec<Rect>> {
    let regions = selection_regions(units, range, zoom, line_break_ratio);
    if regions.is_empty() {
        return Err(crate::AnnotatorError::InvalidRegionRange {
            start: range.start,
            end: range.end,
            available: units.len(),
        });
    }
    Ok(regions)
}

struct LineGroup {
    anchor: ScreenRect,
    min_x: f64,
    max_x: f64,
}

impl LineGroup {
    fn start(anchor: ScreenRect) -> Self {
        Self { anchor, min_x: anchor.x, max_x: anchor.right() }
    }

    fn breaks_at(&self, rect: &ScreenRect, ratio: f64) -> bool {
        (rect.center_y() - self.anchor.center_y()).abs() > rect.height * ratio
    }

    fn push(&mut self, rect: &ScreenRect) {
        self.min_x = self.min_x.min(rect.x);
        self.max_x = self.max_x.max(rect.right());
    }

    fn to_document_rect(&self, zoom: f64) -> Rect {
        Rect::new(
            self.min_x / zoom,
            self.anchor.y / zoom,
            self.max_x / zoom,
            self.anchor.bottom() / zoom,
        )
    }
}

/// Expand `index` to the surrounding run of non-whitespace units.
pub fn word_at(units: &[HitUnit], index: usize) -> Option<SelectionRange> {
    if index >= units.len() {
        return None;
    }

    let mut start = index;
    while start > 0 && !units[start - 1].is_whitespace() {
        start -= 1;
    }

    let mut end = index;
    while end + 1 < units.len() && !units[end + 1].is_whitespace() {
        end += 1;
    }

    Some(SelectionRange { start, end })
}

/// Find the unit closest to a screen point.
///
/// Only units whose vertical span contains the point are candidates; among
/// them the one with the nearest horizontal center wins.
pub fn nearest_unit(units: &[HitUnit], x: f64, y: f64) -> Option<usize> {
    units
        .iter()
        .enumerate()
        .filter(|(_, unit)| y >= unit.rect.y && y <= unit.rect.bottom())
        .map(|(index, unit)| (index, (x - unit.rect.center_x()).abs()))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

pub fn selected_text(units: &[HitUnit], range: SelectionRange) -> String {
    match range.clamp_to(units.len()) {
        Some(range) => units[range.start..=range.end].iter().map(|unit| unit.text).collect(),
        None => String::new(),
    }
}
