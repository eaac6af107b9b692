//! FIFO hand-off between the webhook handler and the reconciliation worker.
//!
//! The handler only sees [`JobQueue`]; the worker owns the [`Reconciler`] and
//! its blocking HTTP clients on a dedicated OS thread, so the async server
//! never waits on the remote APIs.

use anyhow::{Result, anyhow};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{error, info};

use crate::model::Commit;
use crate::reconcile::Reconciler;

/// One webhook delivery's worth of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileJob {
    pub project_id: u64,
    pub experiment_id: u64,
    pub commits: Vec<Commit>,
}

/// Task submission seam for the webhook handler.
pub trait JobQueue: Send + Sync {
    fn enqueue(&self, job: ReconcileJob) -> Result<()>;
}

/// [`JobQueue`] feeding a worker thread through a channel.
pub struct ChannelQueue {
    tx: Sender<ReconcileJob>,
}

impl JobQueue for ChannelQueue {
    fn enqueue(&self, job: ReconcileJob) -> Result<()> {
        self.tx
            .send(job)
            .map_err(|_| anyhow!("reconciliation worker has stopped"))
    }
}

/// Start the worker thread and return the queue that feeds it.
///
/// Jobs run one at a time in submission order. A failed job is logged and the
/// worker moves on. The thread exits once every [`ChannelQueue`] is dropped
/// and the backlog is drained.
pub fn spawn_worker(reconciler: Reconciler) -> Result<(ChannelQueue, JoinHandle<()>)> {
    let (tx, rx) = mpsc::channel();
    let handle = thread::Builder::new()
        .name("varsync-worker".into())
        .spawn(move || run_worker(&reconciler, rx))?;
    Ok((ChannelQueue { tx }, handle))
}

fn run_worker(reconciler: &Reconciler, rx: Receiver<ReconcileJob>) {
    info!("reconciliation worker started");
    for job in rx {
        info!(
            project_id = job.project_id,
            experiment_id = job.experiment_id,
            commits = job.commits.len(),
            "job dequeued"
        );
        match reconciler.reconcile(job.project_id, job.experiment_id, &job.commits) {
            Ok(report) => info!(
                experiment = %report.experiment_name,
                updated = ?report.updated,
                skipped = ?report.skipped,
                "job finished"
            ),
            Err(e) => error!(
                project_id = job.project_id,
                experiment_id = job.experiment_id,
                error = %e,
                "job failed"
            ),
        }
    }
    info!("reconciliation worker stopped");
}
