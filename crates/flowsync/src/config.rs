//! Configuration types for Flowsync sessions.
//!
//! All types implement [`serde::Deserialize`] so they can be loaded from a
//! configuration file. Every field has a default, so a partial file is valid.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining the sections below.
//! - [`RealignConfig`] - Constants used by connector realignment.
//! - [`ExportConfig`] - Controls serialization and image export.
//! - [`StyleConfig`] - Visual styling options such as background color.
//!
//! # Example
//!
//! ```
//! # use flowsync::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.realign().tolerance(), 5.0);
//! assert!(config.style().background_color().is_ok());
//! ```

use serde::Deserialize;

use flowsync_core::color::Color;

/// Top-level configuration combining realignment, export and style settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Realignment section.
    #[serde(default)]
    realign: RealignConfig,

    /// Export section.
    #[serde(default)]
    export: ExportConfig,

    /// Style section.
    #[serde(default)]
    style: StyleConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] from its sections.
    pub fn new(realign: RealignConfig, export: ExportConfig, style: StyleConfig) -> Self {
        Self {
            realign,
            export,
            style,
        }
    }

    /// Returns the realignment configuration.
    pub fn realign(&self) -> &RealignConfig {
        &self.realign
    }

    /// Returns the export configuration.
    pub fn export(&self) -> &ExportConfig {
        &self.export
    }

    /// Returns the style configuration.
    pub fn style(&self) -> &StyleConfig {
        &self.style
    }
}

/// Constants for connector realignment and annotation sizing.
///
/// Annotation width is estimated as `text length * char_width`, clamped to
/// `[min_width, max_width]`. A connector whose last waypoint is within
/// `tolerance` of its target's border is considered anchored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RealignConfig {
    char_width: f32,
    min_width: f32,
    max_width: f32,
    tolerance: f32,
}

impl RealignConfig {
    /// Creates a new [`RealignConfig`].
    ///
    /// # Arguments
    ///
    /// * `char_width` - Width units per character of annotation text.
    /// * `min_width` - Smallest estimated annotation width.
    /// * `max_width` - Largest estimated annotation width.
    /// * `tolerance` - Distance within which a waypoint counts as on a border.
    pub fn new(char_width: f32, min_width: f32, max_width: f32, tolerance: f32) -> Self {
        Self {
            char_width,
            min_width,
            max_width,
            tolerance,
        }
    }

    pub fn char_width(&self) -> f32 {
        self.char_width
    }

    pub fn min_width(&self) -> f32 {
        self.min_width
    }

    pub fn max_width(&self) -> f32 {
        self.max_width
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }
}

impl Default for RealignConfig {
    fn default() -> Self {
        Self::new(7.0, 100.0, 400.0, 5.0)
    }
}

/// Serialization and image export settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Space kept around the diagram content when fitting the viewport.
    margin: f32,

    /// Pretty-print XML written back into documents.
    format_xml: bool,
}

impl ExportConfig {
    pub fn new(margin: f32, format_xml: bool) -> Self {
        Self { margin, format_xml }
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn format_xml(&self) -> bool {
        self.format_xml
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self::new(20.0, true)
    }
}

/// Visual styling configuration for exported images.
///
/// Fields that are not set fall back to renderer defaults.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StyleConfig {
    /// Background [`Color`] for images, as a color string.
    #[serde(default)]
    background_color: Option<String>,
}

impl StyleConfig {
    /// Creates a [`StyleConfig`] with an optional background color string.
    pub fn new(background_color: Option<String>) -> Self {
        Self { background_color }
    }

    /// Returns the parsed background [`Color`], or `None` if no color is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured color string cannot be parsed
    /// into a valid [`Color`].
    pub fn background_color(&self) -> Result<Option<Color>, String> {
        self.background_color
            .as_ref()
            .map(|color| Color::new(color))
            .transpose()
            .map_err(|err| format!("Invalid background color in config: {err}"))
    }
}
