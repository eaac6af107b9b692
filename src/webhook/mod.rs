//! GitHub push webhook endpoint.
//!
//! Provides:
//! - `/_hooks` - accepts a push payload and queues a reconciliation
//! - `/favicon.ico` - empty 204 so browsers hitting the service stay quiet

mod queue;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{MethodFilter, get, on},
};
use serde::Serialize;
use tracing::{error, info};

use crate::config::Config;
use crate::model::HookPayload;
use crate::reconcile::Reconciler;

pub use queue::{ChannelQueue, JobQueue, ReconcileJob, spawn_worker};

pub const NOTHING_TO_DO: &str = "Nothing to do";
pub const QUEUED: &str = "thanks for all the fish";
pub const QUEUE_FAILED: &str = "Failed to queue reconciliation";

/// Largest push payload GitHub delivers.
pub const MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared state for the webhook handler.
#[derive(Clone)]
pub struct HookState {
    pub queue: Arc<dyn JobQueue>,
    /// Project every queued job is reconciled against.
    pub project_id: u64,
    /// Experiment every queued job is reconciled against.
    pub experiment_id: u64,
}

/// Body of every webhook response.
#[derive(Debug, Serialize)]
pub struct HookReply {
    pub message: &'static str,
}

pub fn create_router(state: HookState) -> Router {
    let verbs = MethodFilter::GET
        .or(MethodFilter::POST)
        .or(MethodFilter::PUT)
        .or(MethodFilter::DELETE)
        .or(MethodFilter::HEAD)
        .or(MethodFilter::OPTIONS);
    Router::new()
        .route(
            "/_hooks",
            on(verbs, hooks_handler).layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES)),
        )
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .with_state(Arc::new(state))
}

/// Handler for `/_hooks`.
///
/// Always 200: the reply only says whether a job was queued, never how the
/// reconciliation went.
async fn hooks_handler(State(state): State<Arc<HookState>>, body: Bytes) -> Json<HookReply> {
    Json(intake(&state, &body))
}

fn intake(state: &HookState, body: &[u8]) -> HookReply {
    let payload = HookPayload::from_slice(body);
    if payload.commits.is_empty() {
        return HookReply {
            message: NOTHING_TO_DO,
        };
    }

    info!(
        commits = payload.commits.len(),
        git_ref = payload.git_ref.as_deref().unwrap_or("-"),
        "enqueuing reconciliation"
    );
    let job = ReconcileJob {
        project_id: state.project_id,
        experiment_id: state.experiment_id,
        commits: payload.commits,
    };
    match state.queue.enqueue(job) {
        Ok(()) => HookReply { message: QUEUED },
        Err(e) => {
            error!(error = %e, "failed to enqueue reconciliation");
            HookReply {
                message: QUEUE_FAILED,
            }
        }
    }
}

/// Serve the webhook on `addr` until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: HookState) -> Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "webhook listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

/// CLI command: run the worker and the webhook server.
///
/// Process:
/// 1. Build the reconciler from `cfg` and start the worker thread.
/// 2. Serve `/_hooks` on `listen` (or `cfg.listen`) until Ctrl-C.
/// 3. Close the queue and wait for the worker to drain queued jobs.
pub fn cmd_serve(cfg: &Config, listen: Option<SocketAddr>) -> Result<()> {
    let reconciler = Reconciler::from_config(cfg)?;
    let (queue, worker) = spawn_worker(reconciler)?;
    let state = HookState {
        queue: Arc::new(queue),
        project_id: cfg.project_id,
        experiment_id: cfg.experiment_id,
    };
    let addr = listen.unwrap_or(cfg.listen);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let served = rt.block_on(serve(addr, state));
    drop(rt);

    worker
        .join()
        .map_err(|_| anyhow!("reconciliation worker panicked"))?;
    served
}
