use crate::config::{default_config_toml, CONFIG_FILE_NAME};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Write the default configuration into `dir`, refusing to clobber an
/// existing file unless `force` is set.
pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!("Configuration file already exists. Use --force to overwrite.");
    }

    let contents = format!(
        "# churnmap configuration\n# Every key is optional; omitted keys keep these defaults.\n\n{}",
        default_config_toml()?
    );
    fs::write(&config_path, contents)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Created {} configuration file", CONFIG_FILE_NAME);

    Ok(())
}
