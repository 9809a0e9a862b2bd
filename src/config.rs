// src/config.rs

//! Transaction configuration
//!
//! Everything that influences checking and ordering is carried by an
//! explicit [`TransactionConfig`] handed to the transaction set; nothing is
//! read from process-wide state.

use crate::error::{Error, Result};
use crate::version::EpochPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Settings for dependency checking and ordering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Epoch handling when matching against installed packages
    pub installed_epoch_policy: EpochPolicy,
    /// Epoch handling when matching against packages in the transaction
    pub added_epoch_policy: EpochPolicy,
    /// Transaction color; dependencies of other colors are skipped (0 = all)
    pub color: u32,
    /// Color preferred when several packages satisfy a dependency
    pub preferred_color: u32,
    /// Report Conflicts of added packages
    pub check_conflicts: bool,
    /// Report Conflicts declared by installed packages
    pub check_installed_conflicts: bool,
    /// Satisfy `rpmlib(...)` requirements from the built-in feature table
    pub use_rpmlib_provides: bool,
    /// Record suggestions from the available repository
    pub suggest: bool,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            installed_epoch_policy: EpochPolicy::Promote,
            added_epoch_policy: EpochPolicy::Skip,
            color: 0,
            preferred_color: 0,
            check_conflicts: true,
            check_installed_conflicts: true,
            use_rpmlib_provides: true,
            suggest: true,
        }
    }
}

impl TransactionConfig {
    /// Load a configuration from a JSON file; missing keys keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading transaction config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::ParseError(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Multilib filter: does a dependency of `color` take part?
    pub fn color_matches(&self, color: u32) -> bool {
        self.color == 0 || color == 0 || self.color & color != 0
    }
}
