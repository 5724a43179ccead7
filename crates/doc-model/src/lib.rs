use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Axis-aligned rectangle in document space (page points, unaffected by zoom).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    /// Build a rectangle from two corners in any order.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0: x0.min(x1), y0: y0.min(y1), x1: x0.max(x1), y1: y0.max(y1) }
    }

    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Grow the rectangle horizontally by `padding` on both sides.
    pub fn padded_x(&self, padding: f64) -> Self {
        Self { x0: self.x0 - padding, y0: self.y0, x1: self.x1 + padding, y1: self.y1 }
    }

    /// Multiply every coordinate by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.x0 * factor, self.y0 * factor, self.x1 * factor, self.y1 * factor)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

/// RGBA color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Normalized RGB triple, the form PDF writers expect for stroke colors.
    pub fn to_normalized_rgb(&self) -> (f32, f32, f32) {
        (self.r as f32 / 255.0, self.g as f32 / 255.0, self.b as f32 / 255.0)
    }
}

impl Color {
    pub const HIGHLIGHT_YELLOW: Color = Color::new(255, 255, 0, 100);
    pub const SEARCH_GREEN: Color = Color::new(0, 255, 0, 60);
}

impl Default for Color {
    fn default() -> Self {
        Self::HIGHLIGHT_YELLOW
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseColorError {
    #[error("color must be 6 or 8 hex digits, optionally prefixed with '#': {0:?}")]
    InvalidLength(String),
    #[error("invalid hex digits in color: {0:?}")]
    InvalidDigit(String),
}

impl FromStr for Color {
    type Err = ParseColorError;

    /// Parses `#RRGGBB` or `#RRGGBBAA`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if !digits.is_ascii() || (digits.len() != 6 && digits.len() != 8) {
            return Err(ParseColorError::InvalidLength(s.to_owned()));
        }

        let channel = |offset: usize| {
            u8::from_str_radix(&digits[offset..offset + 2], 16)
                .map_err(|_| ParseColorError::InvalidDigit(s.to_owned()))
        };

        let a = if digits.len() == 8 { channel(6)? } else { 255 };
        Ok(Self { r: channel(0)?, g: channel(2)?, b: channel(4)?, a })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Highlight,
}

/// Persisted form of one store entry.
///
/// `rect` is the region as requested by the edit, before the store applies
/// its display padding, so restoring through the regular add path yields the
/// same record again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationEntry {
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub page: u32,
    pub color: Color,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRecord {
    pub rects: Vec<Rect>,
    pub page_num: u32,
    pub color: Color,
    #[serde(default)]
    pub annotation_indices: Vec<Option<usize>>,
}

/// Tagged persisted form of a history command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandRecord {
    Highlight(HighlightRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub undo_stack: Vec<CommandRecord>,
    pub redo_stack: Vec<CommandRecord>,
    pub max_stack_size: usize,
}

/// Everything needed to resume annotating the last open document.
///
/// The two document-scoped blobs stay untyped here; they are validated entry
/// by entry when the session is restored so one bad entry cannot sink the rest.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionFile {
    pub last_file: Option<PathBuf>,
    #[serde(default)]
    pub annotations: serde_json::Value,
    #[serde(default)]
    pub command_history: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Skip the confirmation before a new edit discards redo history.
    pub hide_redo_warning: bool,
    pub zoom_percent: u16,
    pub highlight_color: Color,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { hide_redo_warning: false, zoom_percent: 150, highlight_color: Color::default() }
    }
}

impl Preferences {
    pub fn zoom_factor(&self) -> f64 {
        f64::from(self.zoom_percent.clamp(10, 1600)) / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_new_orders_corners() {
        let rect = Rect::new(10.0, 20.0, 2.0, 4.0);
        assert_eq!(rect, Rect { x0: 2.0, y0: 4.0, x1: 10.0, y1: 20.0 });
        assert_eq!(rect.width(), 8.0);
        assert_eq!(rect.height(), 16.0);
    }

    #[test]
    fn padding_only_touches_x() {
        let rect = Rect::new(10.0, 10.0, 20.0, 15.0).padded_x(1.0);
        assert_eq!(rect, Rect { x0: 9.0, y0: 10.0, x1: 21.0, y1: 15.0 });
    }

    #[test]
    fn color_parses_hex_with_and_without_alpha() {
        assert_eq!("#ffff0064".parse::<Color>(), Ok(Color::new(255, 255, 0, 100)));
        assert_eq!("00ff00".parse::<Color>(), Ok(Color::rgb(0, 255, 0)));
        assert!(matches!("#fff".parse::<Color>(), Err(ParseColorError::InvalidLength(_))));
        assert!(matches!("#gg0000".parse::<Color>(), Err(ParseColorError::InvalidDigit(_))));
    }

    #[test]
    fn color_display_round_trips() {
        let color = Color::new(1, 2, 3, 4);
        assert_eq!(color.to_string(), "#01020304");
        assert_eq!(color.to_string().parse::<Color>(), Ok(color));
    }

    #[test]
    fn command_record_uses_highlight_tag() {
        let record = CommandRecord::Highlight(HighlightRecord {
            rects: vec![Rect::new(0.0, 0.0, 1.0, 1.0)],
            page_num: 3,
            color: Color::HIGHLIGHT_YELLOW,
            annotation_indices: vec![Some(0)],
        });

        let value = serde_json::to_value(&record).expect("record should serialize");
        assert_eq!(value["type"], "highlight");
        assert_eq!(value["page_num"], 3);
        assert_eq!(value["rects"][0]["x1"], 1.0);
        assert_eq!(value["color"]["a"], 100);
        assert_eq!(value["annotation_indices"][0], 0);
    }

    #[test]
    fn highlight_record_tolerates_missing_indices() {
        let json = r#"{"type":"highlight","rects":[],"page_num":0,
            "color":{"r":1,"g":2,"b":3,"a":4}}"#;
        let record: CommandRecord = serde_json::from_str(json).expect("record should parse");
        let CommandRecord::Highlight(highlight) = record;
        assert!(highlight.annotation_indices.is_empty());
    }

    #[test]
    fn annotation_entry_serializes_kind_as_type() {
        let entry = AnnotationEntry {
            kind: AnnotationKind::Highlight,
            page: 1,
            color: Color::SEARCH_GREEN,
            rect: Rect::new(0.0, 0.0, 5.0, 5.0),
        };
        let value = serde_json::to_value(&entry).expect("entry should serialize");
        assert_eq!(value["type"], "highlight");
        assert_eq!(value["page"], 1);
    }

    #[test]
    fn preferences_fill_missing_fields_with_defaults() {
        let prefs: Preferences =
            serde_json::from_str(r#"{"hide_redo_warning":true}"#).expect("prefs should parse");
        assert!(prefs.hide_redo_warning);
        assert_eq!(prefs.zoom_percent, 150);
        assert_eq!(prefs.highlight_color, Color::HIGHLIGHT_YELLOW);
        assert_eq!(prefs.zoom_factor(), 1.5);
    }
}
