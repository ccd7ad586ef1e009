//! CLI command implementations.

pub mod pipelines;
pub mod runs;

use anyhow::{Context, Result};
use std::path::Path;

pub fn validate(path: &Path) -> Result<()> {
    let definition = stagerunner_config::load_pipeline(path)
        .with_context(|| format!("configuration error in {}", path.display()))?;
    println!(
        "Configuration is valid: pipeline {:?} ({})",
        definition.name, definition.repository
    );
    Ok(())
}
