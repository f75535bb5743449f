//! Print the sync rule catalogue.

use super::load_config;
use anyhow::{Context, Result};
use concord_concepts::App;
use std::path::Path;

pub fn list_syncs(config_path: &Path, names_only: bool) -> Result<()> {
    let app = App::new(load_config(config_path)?).context("Failed to build application")?;
    for (i, rule) in app.syncs().iter().enumerate() {
        if names_only {
            println!("{}", rule.name());
            continue;
        }
        if i > 0 {
            println!();
        }
        println!("{rule}");
    }
    Ok(())
}
