//! Parameter files
//!
//! Household parameters are read from YAML (`.yaml`, `.yml`) or JSON (any
//! other extension). Either way the result is validated before it is
//! returned, and every failure surfaces as a `ConfigError`.

use std::path::Path;

use glidepath_core::ConfigError;
use glidepath_core::model::SimulationParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamsFormat {
    Yaml,
    Json,
}

impl ParamsFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                ParamsFormat::Yaml
            }
            _ => ParamsFormat::Json,
        }
    }
}

pub fn parse_params(content: &str, format: ParamsFormat) -> Result<SimulationParams, ConfigError> {
    match format {
        ParamsFormat::Json => SimulationParams::from_json(content),
        ParamsFormat::Yaml => {
            let params: SimulationParams = serde_saphyr::from_str(content)
                .map_err(|e| ConfigError::Parse(e.to_string()))?;
            params.validate()?;
            Ok(params)
        }
    }
}

pub fn load_params(path: &Path) -> color_eyre::Result<SimulationParams> {
    let content = std::fs::read_to_string(path)?;
    let params = parse_params(&content, ParamsFormat::from_path(path))?;
    tracing::debug!(path = %path.display(), "Loaded parameters");
    Ok(params)
}
