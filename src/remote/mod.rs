//! Remote API layer.
//!
//! `experiments` talks to the Optimizely Experiment API, `content` reads files
//! from GitHub. Both share the request/response plumbing in `http`, which logs
//! every call and turns transport failures into [`crate::error::SyncError`].

mod content;
mod experiments;
mod http;

pub use content::ContentFetcher;
pub use experiments::ExperimentClient;
