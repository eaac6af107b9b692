use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::Config;
use crate::model::{Experiment, ExperimentStatus};
use crate::remote::ExperimentClient;

/// Parse `field:value` filter arguments.
///
/// Only the first `:` splits, so values may contain colons.
pub fn parse_filters(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|f| {
            f.split_once(':')
                .filter(|(k, _)| !k.is_empty())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .with_context(|| format!("invalid filter (expected field:value): {}", f))
        })
        .collect()
}

fn render(exp: &Experiment) -> String {
    let status = match &exp.status {
        Some(s @ ExperimentStatus::Running) => s.to_string().green(),
        Some(s @ ExperimentStatus::Paused) => s.to_string().yellow(),
        Some(s) => s.to_string().normal(),
        None => "unknown".dimmed(),
    };
    let desc = exp.description.as_deref().unwrap_or("");
    format!("- {} [{}] {}", exp.id, status, desc)
}

/// CLI command: print the experiments of the configured project.
///
/// Example output:
/// ```text
/// - 855363189 [Running] Homepage hero copy
/// - 855363190 [Paused] Checkout button color
/// ```
///
/// # Errors
/// - A filter is not `field:value`.
/// - The experiment platform cannot be reached or answers non-2xx.
pub fn cmd_experiments(cfg: &Config, filters: &[String]) -> Result<()> {
    let filters = parse_filters(filters)?;
    let client = ExperimentClient::from_config(&cfg.optimizely)?;
    let experiments = client.get_experiments(cfg.project_id, &filters)?;
    for exp in &experiments {
        println!("{}", render(exp));
    }
    Ok(())
}
