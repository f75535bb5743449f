//! CLI command implementations.

pub mod run;
pub mod syncs;

pub use run::run_scenario;
pub use syncs::list_syncs;

use anyhow::{Context, Result};
use concord_concepts::AppConfig;
use std::path::Path;

/// Load `concord.yml`, falling back to defaults when there is none
pub(crate) fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no configuration file, using defaults");
        return Ok(AppConfig::default());
    }
    AppConfig::from_file(path).context("Failed to load configuration")
}
