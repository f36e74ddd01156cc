//! Tree view configuration.
//!
//! Configuration can be built in code or loaded from TOML:
//!
//! ```
//! use arbor::TreeViewConfig;
//!
//! let config = TreeViewConfig::from_toml_str(r#"
//! open_depth = 2
//! indent = 12.0
//!
//! [row]
//! row_height = 18.0
//! "#).unwrap();
//!
//! assert_eq!(config.open_depth, 2);
//! assert_eq!(config.row.row_height, 18.0);
//! assert_eq!(config.page_steps, 10);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default depth below which nodes start open on the initial build.
pub const DEFAULT_OPEN_DEPTH: usize = 4;

/// Default number of rows moved by page up / page down.
pub const DEFAULT_PAGE_STEPS: usize = 10;

/// Suffix appended to pasted node names that collide with a sibling.
pub const DEFAULT_COPY_SUFFIX: &str = "_Copy";

/// Metrics used to measure a row when no custom measurement hook is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowMetrics {
    /// Width of one label character.
    pub char_width: f32,
    /// Height of one row.
    pub row_height: f32,
    /// Width reserved for the node icon.
    pub icon_width: f32,
    /// Width reserved for the open/close branch indicator.
    pub branch_width: f32,
}

impl Default for RowMetrics {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            row_height: 20.0,
            icon_width: 16.0,
            branch_width: 12.0,
        }
    }
}

/// Configuration for a [`TreeView`](crate::TreeView).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeViewConfig {
    /// Nodes deeper than this start closed when the tree is first built.
    pub open_depth: usize,
    /// Rows moved by a page navigation.
    pub page_steps: usize,
    /// Horizontal offset of each tree level.
    pub indent: f32,
    /// Whether structural editing is disabled.
    pub read_only: bool,
    /// Default row measurements.
    pub row: RowMetrics,
    /// Suffix used to disambiguate pasted copies.
    pub copy_suffix: String,
}

impl Default for TreeViewConfig {
    fn default() -> Self {
        Self {
            open_depth: DEFAULT_OPEN_DEPTH,
            page_steps: DEFAULT_PAGE_STEPS,
            indent: 16.0,
            read_only: false,
            row: RowMetrics::default(),
            copy_suffix: DEFAULT_COPY_SUFFIX.to_string(),
        }
    }
}

impl TreeViewConfig {
    /// Parse a configuration from a TOML document.
    ///
    /// Missing keys take their default values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Set the open depth.
    pub fn with_open_depth(mut self, depth: usize) -> Self {
        self.open_depth = depth;
        self
    }

    /// Set the page step count. Zero is treated as one.
    pub fn with_page_steps(mut self, steps: usize) -> Self {
        self.page_steps = steps.max(1);
        self
    }

    /// Set the indentation per level.
    pub fn with_indent(mut self, indent: f32) -> Self {
        self.indent = indent;
        self
    }

    /// Set read-only mode.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}
