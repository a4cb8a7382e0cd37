//! Configuration types for a modeling session.
//!
//! All types implement [`serde::Deserialize`] so a session can be configured
//! from a TOML file; every section and field falls back to its default.
//!
//! - [`ModelerConfig`] - Top-level configuration.
//! - [`CopyPasteConfig`] - Selection normalization and root-element policies.
//! - [`HistoryConfig`] - Undo history bound.
//!
//! # Example
//!
//! ```
//! # use sextant::config::{LaneSelection, ModelerConfig, RootElementPolicy};
//! let config = ModelerConfig::default();
//! assert_eq!(config.copy_paste().lane_selection(), LaneSelection::Reject);
//! assert_eq!(config.copy_paste().root_elements(), RootElementPolicy::CloneOnce);
//! assert_eq!(config.history().max_entries(), 100);
//! ```

use serde::Deserialize;

/// Top-level configuration of a [`Modeler`](crate::Modeler) session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelerConfig {
    /// Copy/paste policies.
    #[serde(default)]
    copy_paste: CopyPasteConfig,

    /// Undo history settings.
    #[serde(default)]
    history: HistoryConfig,
}

impl ModelerConfig {
    pub fn new(copy_paste: CopyPasteConfig, history: HistoryConfig) -> Self {
        Self {
            copy_paste,
            history,
        }
    }

    pub fn copy_paste(&self) -> &CopyPasteConfig {
        &self.copy_paste
    }

    pub fn history(&self) -> &HistoryConfig {
        &self.history
    }
}

/// How a lane selected without its participant is treated when copying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneSelection {
    /// The copy rule refuses the lane, which empties the whole clipboard.
    #[default]
    Reject,
    /// The lane is replaced by its participant before the tree is built.
    IncludeParticipant,
}

/// How references to shared root definitions are resolved on paste.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootElementPolicy {
    /// Each referenced definition is cloned once per paste and the clone is
    /// shared by every pasted element that referenced the original.
    #[default]
    CloneOnce,
    /// Pasted elements keep pointing at the original definition while it is
    /// still part of the document; it is cloned once only if it was removed.
    ReuseExisting,
}

/// Copy/paste configuration section.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CopyPasteConfig {
    #[serde(default)]
    lane_selection: LaneSelection,

    #[serde(default)]
    root_elements: RootElementPolicy,
}

impl CopyPasteConfig {
    pub fn new(lane_selection: LaneSelection, root_elements: RootElementPolicy) -> Self {
        Self {
            lane_selection,
            root_elements,
        }
    }

    pub fn lane_selection(&self) -> LaneSelection {
        self.lane_selection
    }

    pub fn root_elements(&self) -> RootElementPolicy {
        self.root_elements
    }
}

/// Undo history configuration section.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of undoable commands kept; the oldest are dropped.
    #[serde(default = "HistoryConfig::default_max_entries")]
    max_entries: usize,
}

impl HistoryConfig {
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries }
    }

    fn default_max_entries() -> usize {
        100
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: Self::default_max_entries(),
        }
    }
}
