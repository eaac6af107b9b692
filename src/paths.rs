use anyhow::Result;
use std::{env, path::PathBuf};

#[derive(Clone)]
pub struct Paths {
    pub home: PathBuf,
    pub config: PathBuf,
}

/// Directory holding the varsync configuration.
///
/// `$XDG_CONFIG_HOME/.varsync`, or `$HOME/.config/.varsync` when XDG is unset.
pub fn varsync_home() -> Result<PathBuf> {
    let xdg = env::var_os("XDG_CONFIG_HOME");
    let base = xdg
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env::var_os("HOME").unwrap_or_default()).join(".config"));
    Ok(base.join(".varsync"))
}

pub fn paths() -> Result<Paths> {
    let home = varsync_home()?;
    Ok(Paths {
        config: home.join("config.toml"),
        home,
    })
}
