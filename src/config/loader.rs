use std::path::Path;

use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use eyre::{Context, Result};

use crate::config::models::GatewayConfig;

/// Load configuration from the process environment, optionally layered on top
/// of a config file. Environment values win over file values.
pub fn load_config(config_path: Option<&str>) -> Result<GatewayConfig> {
    load_config_from(config_path, Environment::default())
}

/// Same as [`load_config`] but with an explicit environment source, so callers
/// (and tests) can supply variables without touching the process environment.
pub fn load_config_from(config_path: Option<&str>, env: Environment) -> Result<GatewayConfig> {
    let mut builder = Config::builder();
    if let Some(path) = config_path {
        builder = add_file_source(builder, path)?;
    }

    let settings = builder
        .add_source(env)
        .build()
        .wrap_err("Failed to build gateway configuration")?;

    let gateway_config: GatewayConfig = settings
        .try_deserialize()
        .wrap_err("Failed to deserialize gateway configuration")?;

    Ok(gateway_config.normalized())
}

fn add_file_source(
    builder: ConfigBuilder<DefaultState>,
    config_path: &str,
) -> Result<ConfigBuilder<DefaultState>> {
    let path = Path::new(config_path);

    let format = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Yaml,
    };

    let name = path
        .to_str()
        .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", path.display()))?;

    if !path.exists() {
        return Err(eyre::eyre!("Config file not found: {}", path.display()));
    }

    Ok(builder.add_source(File::new(name, format)))
}
