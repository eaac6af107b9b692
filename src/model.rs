//! Wire types shared by the remote clients, the reconciler and the webhook.
//!
//! Experiment and Variation mirror the Optimizely Experiment API v1 payloads.
//! Only the fields varsync reads or writes are named; everything else is kept
//! in `extra` so an update writes back exactly what was fetched.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Lifecycle state of an experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperimentStatus {
    #[serde(rename = "Not started")]
    NotStarted,
    Running,
    Paused,
    Archived,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentStatus::NotStarted => f.write_str("Not started"),
            ExperimentStatus::Running => f.write_str("Running"),
            ExperimentStatus::Paused => f.write_str("Paused"),
            ExperimentStatus::Archived => f.write_str("Archived"),
            ExperimentStatus::Other(s) => f.write_str(s),
        }
    }
}

/// How the experiment is activated on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationMode {
    Immediate,
    Manual,
    Conditional,
    #[serde(untagged)]
    Other(String),
}

/// An experiment as returned by `GET /experiments/{id}`.
///
/// `variation_ids` is the order used to pair variations with files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ExperimentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_mode: Option<ActivationMode>,
    /// Variation ids in the order the platform reports them.
    #[serde(default)]
    pub variation_ids: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One arm of an experiment; `js_component` is replaced with the file content on sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<u64>,
    #[serde(default)]
    pub is_paused: bool,
    /// Traffic allocation in basis points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    /// Script run for visitors bucketed into this variation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One commit from a GitHub push payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub added: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub modified: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub removed: Vec<String>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(d)?.unwrap_or_default())
}

/// Decode each commit on its own so one bad entry does not drop the delivery.
fn lenient_commits<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Commit>, D::Error> {
    let raw = Option::<Vec<Value>>::deserialize(d)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, v)| match serde_json::from_value(v) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::error!(index, error = %e, "dropping malformed commit");
                None
            }
        })
        .collect())
}

/// The part of a push payload varsync cares about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookPayload {
    #[serde(default, deserialize_with = "lenient_commits")]
    pub commits: Vec<Commit>,
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
}

impl HookPayload {
    /// Lenient parse: an empty or non-JSON body is a payload without commits.
    pub fn from_slice(body: &[u8]) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Self::default();
        }
        match serde_json::from_slice(body) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "dropping webhook delivery with unparseable body");
                Self::default()
            }
        }
    }
}
