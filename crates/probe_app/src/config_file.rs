use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use probe_engine::PipelineConfig;
use probe_logging::probe_info;

/// Reads a RON pipeline config, or returns the built-in one when no path is given.
///
/// Missing sections fall back to their defaults, so a file may list only
/// the backends it wants to change.
pub(crate) fn load(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        probe_info!("no config file given, using built-in defaults");
        return Ok(PipelineConfig::default());
    };

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: PipelineConfig = ron::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;

    probe_info!(
        "loaded config from {:?} ({} backends)",
        path,
        config.backends.len()
    );
    Ok(config)
}

pub(crate) fn default_config_ron() -> Result<String> {
    let pretty = ron::ser::PrettyConfig::new();
    ron::ser::to_string_pretty(&PipelineConfig::default(), pretty)
        .context("failed to serialize default config")
}
