//! Crate entry point for **varsync**.
//!
//! varsync listens for GitHub push webhooks and pushes the changed experiment
//! variation scripts to Optimizely, then starts the experiment.
//! Each submodule encapsulates one responsibility (config, remote APIs,
//! reconciliation, the webhook server). The `pub use` re-exports make the
//! commands and the core types reachable from the crate root.

mod config;
mod error;
mod list;
mod logging;
mod model;
mod paths;
mod reconcile;
mod remote;
mod webhook;

pub use config::{Config, GithubConfig, OptimizelyConfig, load_config};
pub use error::SyncError;
pub use list::cmd_experiments;
pub use logging::init_logging;
pub use model::{ActivationMode, Commit, Experiment, ExperimentStatus, HookPayload, Variation};
pub use paths::{Paths, paths, varsync_home};
pub use reconcile::{ReconcileReport, Reconciler, cmd_reconcile};
pub use remote::{ContentFetcher, ExperimentClient};
pub use webhook::{
    ChannelQueue, HookState, JobQueue, ReconcileJob, cmd_serve, create_router, spawn_worker,
};
