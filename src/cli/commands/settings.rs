//! Configuration commands.

use std::path::Path;

use mir_datasets::config::{self, Config};

/// Print the config file location and the effective settings
pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    match config::config_path() {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no config directory on this platform"),
    }
    println!("# data root: {}", config.storage.data_root().display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Store a new data root in the user config
pub fn cmd_config_set_data_root(config: &Config, dir: &Path) -> anyhow::Result<()> {
    let updated = with_data_root(config, dir)?;
    config::save(&updated)?;
    println!("Data root set to {}", dir.display());
    Ok(())
}

/// Copy of `config` pointing at `dir`, made absolute.
fn with_data_root(config: &Config, dir: &Path) -> anyhow::Result<Config> {
    let dir = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(dir)
    };
    let mut updated = config.clone();
    updated.storage.data_root = Some(dir);
    Ok(updated)
}
