//! Engine configuration
//!
//! Tunables for history depth, highlight padding, line grouping and OCR
//! fallback. Configuration can be created programmatically or read from
//! environment variables.

/// Default history depth for both the undo and the redo stack.
pub const DEFAULT_MAX_STACK_SIZE: usize = 100;

/// Configuration shared by the store, the history and the geometry helpers.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Maximum number of commands kept on each history stack
    pub max_stack_size: usize,
    /// Horizontal padding (document units) added to every new highlight
    pub highlight_padding: f64,
    /// Vertical shift, as a fraction of the line height, that starts a new line
    pub line_break_ratio: f64,
    /// Render scale used when a page has to go through OCR
    pub ocr_scale: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
            highlight_padding: 1.0,
            line_break_ratio: 0.5,
            ocr_scale: 2.0,
        }
    }
}

impl EngineConfig {
    pub fn with_max_stack_size(mut self, max_stack_size: usize) -> Self {
        self.max_stack_size = max_stack_size;
        self
    }

    pub fn with_highlight_padding(mut self, padding: f64) -> Self {
        self.highlight_padding = padding;
        self
    }

    pub fn with_line_break_ratio(mut self, ratio: f64) -> Self {
        self.line_break_ratio = ratio;
        self
    }

    pub fn with_ocr_scale(mut self, scale: f64) -> Self {
        self.ocr_scale = scale;
        self
    }

    /// Loads configuration from environment variables, falling back to defaults.
    ///
    /// Supported environment variables:
    /// - `ANNOTATOR_MAX_HISTORY`: history depth per stack
    /// - `ANNOTATOR_HIGHLIGHT_PADDING`: horizontal highlight padding
    /// - `ANNOTATOR_LINE_BREAK_RATIO`: line grouping threshold
    /// - `ANNOTATOR_OCR_SCALE`: render scale for OCR
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ANNOTATOR_MAX_HISTORY") {
            config.max_stack_size = val
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue("ANNOTATOR_MAX_HISTORY".to_string()))?;
        }

        if let Ok(val) = std::env::var("ANNOTATOR_HIGHLIGHT_PADDING") {
            config.highlight_padding = parse_non_negative(&val, "ANNOTATOR_HIGHLIGHT_PADDING")?;
        }

        if let Ok(val) = std::env::var("ANNOTATOR_LINE_BREAK_RATIO") {
            config.line_break_ratio = parse_non_negative(&val, "ANNOTATOR_LINE_BREAK_RATIO")?;
        }

        if let Ok(val) = std::env::var("ANNOTATOR_OCR_SCALE") {
            let scale = parse_non_negative(&val, "ANNOTATOR_OCR_SCALE")?;
            if scale == 0.0 {
                return Err(ConfigError::InvalidValue("ANNOTATOR_OCR_SCALE".to_string()));
            }
            config.ocr_scale = scale;
        }

        Ok(config)
    }
}

fn parse_non_negative(val: &str, key: &str) -> Result<f64, ConfigError> {
    match val.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed >= 0.0 => Ok(parsed),
        _ => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

/// Errors that can occur while reading configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Invalid value for a configuration key
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
}
