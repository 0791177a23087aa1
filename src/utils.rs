use std::path::Path;

use color_eyre::{eyre::eyre, Result};
use tracing::info;

use crate::Config;

/// Environment prefix for overrides, e.g. `LOOKOUT__CAPTURE__FPS=15`
pub const ENV_PREFIX: &str = "LOOKOUT";

/// Load configuration from an optional file plus `LOOKOUT__*` overrides.
/// Missing keys fall back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        if !path.exists() {
            return Err(eyre!("Config file not found: {}", path.display()));
        }
        info!("Loading config from {}", path.display());
        builder = builder.add_source(config::File::from(path));
    }

    let config: Config = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("notify.recipients")
                .with_list_parse_key("capture.formats"),
        )
        .build()?
        .try_deserialize()?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.capture.fps == 0 {
        return Err(eyre!("capture.fps must be non-zero"));
    }
    if config.capture.formats.is_empty() {
        return Err(eyre!("capture.formats must name at least one symbology"));
    }
    if config.overlay.reference_width <= 0.0 || config.overlay.reference_height <= 0.0 {
        return Err(eyre!("overlay reference size must be positive"));
    }
    Ok(())
}
