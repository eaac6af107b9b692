mod changes;
mod pairing;

use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, info_span, warn};

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::model::{ActivationMode, Commit, ExperimentStatus, HookPayload};
use crate::remote::{ContentFetcher, ExperimentClient};

pub use changes::ChangeSet;
pub use pairing::{pair_variations, variation_filenames};

/// Outcome of a successful reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub experiment_name: String,
    /// Variation ids whose content was pushed, in processing order.
    pub updated: Vec<u64>,
    /// Paired variation ids with no matching fetched variation.
    pub skipped: Vec<u64>,
}

/// Pushes variation files from the repository to the experiment platform.
pub struct Reconciler {
    experiments: ExperimentClient,
    content: ContentFetcher,
    prefix: String,
    branch: String,
}

impl Reconciler {
    pub fn new(
        experiments: ExperimentClient,
        content: ContentFetcher,
        prefix: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            experiments,
            content,
            prefix: prefix.into(),
            branch: branch.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            ExperimentClient::from_config(&cfg.optimizely)?,
            ContentFetcher::from_config(&cfg.github)?,
            cfg.github.prefix.clone(),
            cfg.branch.clone(),
        ))
    }

    /// Sync the variations of `experiment_id` with the files changed in `commits`.
    ///
    /// Process:
    /// 1. Collect the distinct changed paths under the prefix.
    /// 2. Name the experiment after the first path that names one (added, then
    ///    modified, then removed).
    /// 3. List the experiment directory in the repository.
    /// 4. Fetch the experiment.
    /// 5. Sort the listed files and build their repository paths.
    /// 6. Fetch the experiment's variations.
    /// 7. Pair variation ids with the sorted paths by position.
    /// 8. For each pair with a matching variation, replace its script with the
    ///    file content and push it. Unmatched ids are skipped.
    /// 9. Mark the experiment running with immediate activation and push it once.
    ///
    /// Added and removed files only take part in naming the experiment: no
    /// variation is created or deleted.
    ///
    /// # Errors
    /// Any [`SyncError`] aborts the run at the failing step. Variations pushed
    /// before the failure stay updated and the experiment is not started.
    pub fn reconcile(
        &self,
        project_id: u64,
        experiment_id: u64,
        commits: &[Commit],
    ) -> Result<ReconcileReport> {
        let span = info_span!("reconcile", project_id, experiment_id);
        let _guard = span.enter();

        let changes = ChangeSet::collect(commits, &self.prefix);
        let name = changes
            .first_experiment_name(&self.prefix)
            .ok_or_else(|| {
                SyncError::Reconciliation(format!(
                    "no changed files under {} in {} commit(s)",
                    self.prefix,
                    commits.len()
                ))
            })?
            .to_string();
        let touched = changes.experiment_names(&self.prefix);
        if touched.len() > 1 {
            warn!(?touched, chosen = %name, "commit batch touches several experiments");
        }
        info!(
            experiment = %name,
            added = changes.added.len(),
            modified = changes.modified.len(),
            removed = changes.removed.len(),
            "collected changes"
        );

        let listing = self.content.list_directory(&name, &self.branch)?;
        let mut experiment = self.experiments.get_experiment(experiment_id)?;
        let filenames = variation_filenames(listing, &self.prefix, &name);
        info!(?filenames, "variation files");
        let variations = self.experiments.get_variations(experiment.id)?;

        let pairs = pair_variations(&experiment.variation_ids, &filenames);
        info!(?pairs, "paired variations");

        let mut report = ReconcileReport {
            experiment_name: name,
            ..Default::default()
        };
        for (id, filename) in pairs {
            let Some(found) = variations.iter().find(|v| v.id == id) else {
                info!(id, filename, "no variation with this id; skipping");
                report.skipped.push(id);
                continue;
            };
            let mut variation = found.clone();
            variation.js_component = Some(self.content.fetch_file_content(filename, &self.branch)?);
            self.experiments.update_variation(&variation)?;
            info!(id, filename, "variation updated");
            report.updated.push(id);
        }

        experiment.status = Some(ExperimentStatus::Running);
        experiment.activation_mode = Some(ActivationMode::Immediate);
        self.experiments.update_experiment(&experiment)?;
        info!(updated = report.updated.len(), skipped = report.skipped.len(), "experiment started");
        Ok(report)
    }
}

/// CLI command: replay a stored push payload synchronously.
///
/// Reads the webhook JSON at `payload`, reconciles it against the configured
/// project and experiment, and prints the report as JSON.
///
/// # Errors
/// - The payload cannot be read or holds no commits.
/// - Any reconciliation failure.
pub fn cmd_reconcile(cfg: &Config, payload: &Path) -> anyhow::Result<()> {
    let body = fs::read(payload)
        .with_context(|| format!("failed to read payload: {}", payload.display()))?;
    let hook = HookPayload::from_slice(&body);
    if hook.commits.is_empty() {
        anyhow::bail!("no commits in {}", payload.display());
    }
    let reconciler = Reconciler::from_config(cfg)?;
    let report = reconciler
        .reconcile(cfg.project_id, cfg.experiment_id, &hook.commits)
        .context("reconciliation failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
