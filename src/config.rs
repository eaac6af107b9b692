use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::paths::paths;

/// Environment variable overriding `optimizely.token`.
pub const OPTIMIZELY_TOKEN_ENV: &str = "VARSYNC_OPTIMIZELY_TOKEN";
/// Environment variable supplying the optional GitHub token.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Top-level configuration loaded from `config.toml`.
///
/// Example TOML:
/// ```toml
/// project_id    = 860940042
/// experiment_id = 855363189
///
/// [github]
/// repository = "acme/site"
///
/// [optimizely]
/// token = "abc123"
/// ```
///
/// Everything except the ids and `github.repository` has a default. The
/// Optimizely token may come from [`OPTIMIZELY_TOKEN_ENV`] instead of the file.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub project_id: u64,
    pub experiment_id: u64,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    pub github: GithubConfig,
    #[serde(default)]
    pub optimizely: OptimizelyConfig,
}

/// Where variation files live.
#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    /// `owner/name` of the repository holding the experiment files.
    pub repository: String,
    #[serde(default = "default_raw_url")]
    pub raw_url: String,
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    /// Path prefix under which each directory is one experiment.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OptimizelyConfig {
    #[serde(default = "default_optimizely_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub token: String,
}

impl Default for OptimizelyConfig {
    fn default() -> Self {
        Self {
            api_url: default_optimizely_api_url(),
            token: String::new(),
        }
    }
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_raw_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_prefix() -> String {
    "js/experiments/".to_string()
}

fn default_optimizely_api_url() -> String {
    "https://www.optimizelyapis.com/experiment/v1".to_string()
}

impl Config {
    /// Parse a config document and apply environment overrides.
    ///
    /// # Errors
    /// - TOML syntax or schema errors.
    /// - No Optimizely token in either the document or the environment.
    pub fn from_toml_str(txt: &str) -> Result<Self> {
        let mut cfg: Config = toml::from_str(txt).context("failed to parse config.toml")?;
        cfg.apply_env();
        if cfg.optimizely.token.trim().is_empty() {
            bail!(
                "no Optimizely token: set optimizely.token or {}",
                OPTIMIZELY_TOKEN_ENV
            );
        }
        if !cfg.github.prefix.ends_with('/') {
            cfg.github.prefix.push('/');
        }
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Ok(tok) = env::var(OPTIMIZELY_TOKEN_ENV)
            && !tok.is_empty()
        {
            self.optimizely.token = tok;
        }
        if self.github.token.is_none()
            && let Ok(tok) = env::var(GITHUB_TOKEN_ENV)
            && !tok.is_empty()
        {
            self.github.token = Some(tok);
        }
    }
}

/// Load and parse `config.toml` into a [`Config`].
///
/// `path` overrides the default location resolved by [`paths()`].
///
/// # Errors
/// - The file cannot be read; the message includes the resolved path.
/// - Parsing or validation fails (see [`Config::from_toml_str`]).
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let resolved = match path {
        Some(p) => p.to_path_buf(),
        None => paths()?.config,
    };
    let txt = fs::read_to_string(&resolved)
        .with_context(|| format!("config not found: {}", resolved.display()))?;
    Config::from_toml_str(&txt)
}
