use reqwest::blocking::Client;
use tracing::{debug, warn};

use super::http::{join, optimizely_client, send};
use crate::config::OptimizelyConfig;
use crate::error::{Result, SyncError};
use crate::model::{Experiment, Variation};

/// Blocking client for the Optimizely Experiment API.
pub struct ExperimentClient {
    http: Client,
    base: String,
}

impl ExperimentClient {
    pub fn new(base_url: &str, token: &str) -> anyhow::Result<Self> {
        Ok(Self {
            http: optimizely_client(token)?,
            base: base_url.to_string(),
        })
    }

    pub fn from_config(cfg: &OptimizelyConfig) -> anyhow::Result<Self> {
        Self::new(&cfg.api_url, &cfg.token)
    }

    /// `GET /experiments/{id}`.
    ///
    /// # Errors
    /// [`SyncError::RemoteUnavailable`] on transport failure or non-2xx status.
    pub fn get_experiment(&self, experiment_id: u64) -> Result<Experiment> {
        let url = join(&self.base, &format!("/experiments/{}", experiment_id));
        send(self.http.get(&url), "GET", &url)?
            .ensure_success()?
            .decode()
    }

    /// `PUT /experiments/{id}` with the whole experiment as body.
    ///
    /// The status is not checked: a rejected update is logged and whatever the
    /// platform returned is decoded.
    pub fn update_experiment(&self, experiment: &Experiment) -> Result<Experiment> {
        let url = join(&self.base, &format!("/experiments/{}", experiment.id));
        debug!(?experiment, "experiment update body");
        let reply = send(self.http.put(&url).json(experiment), "PUT", &url)?;
        if !reply.status.is_success() {
            warn!(
                id = experiment.id,
                status = reply.status.as_u16(),
                "experiment update was not accepted"
            );
        }
        reply.decode()
    }

    /// `GET /projects/{id}/experiments/`, one `filter=field:value` per pair.
    pub fn get_experiments(
        &self,
        project_id: u64,
        filters: &[(String, String)],
    ) -> Result<Vec<Experiment>> {
        let url = join(&self.base, &format!("/projects/{}/experiments/", project_id));
        let params: Vec<(&str, String)> = filters
            .iter()
            .map(|(field, value)| ("filter", format!("{}:{}", field, value)))
            .collect();
        debug!(?params, "experiment filters");
        send(self.http.get(&url).query(&params), "GET", &url)?
            .ensure_success()?
            .decode()
    }

    /// `GET /experiments/{id}/variations/`.
    pub fn get_variations(&self, experiment_id: u64) -> Result<Vec<Variation>> {
        let url = join(
            &self.base,
            &format!("/experiments/{}/variations/", experiment_id),
        );
        send(self.http.get(&url), "GET", &url)?
            .ensure_success()?
            .decode()
    }

    /// `PUT /variations/{id}` with the whole variation as body.
    ///
    /// # Errors
    /// - [`SyncError::VariationUpdateFailed`] when the status is above 299.
    /// - [`SyncError::RemoteUnavailable`] on transport failure.
    pub fn update_variation(&self, variation: &Variation) -> Result<Variation> {
        let url = join(&self.base, &format!("/variations/{}", variation.id));
        debug!(?variation, "variation update body");
        let reply = send(self.http.put(&url).json(variation), "PUT", &url)?;
        if reply.status.as_u16() > 299 {
            return Err(SyncError::VariationUpdateFailed {
                id: variation.id,
                status: reply.status.as_u16(),
            });
        }
        reply.decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActivationMode, ExperimentStatus};
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> ExperimentClient {
        ExperimentClient::new(&server.base_url(), "tok").unwrap()
    }

    #[test]
    fn get_experiment_decodes_body() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/experiments/42").header("token", "tok");
            then.status(200).json_body(json!({
                "id": 42,
                "status": "Paused",
                "variation_ids": [1, 2, 3]
            }));
        });
        let exp = client(&server).get_experiment(42).unwrap();
        m.assert();
        assert_eq!(exp.id, 42);
        assert_eq!(exp.status, Some(ExperimentStatus::Paused));
        assert_eq!(exp.variation_ids, vec![1, 2, 3]);
    }

    #[test]
    fn get_experiment_non_success_is_remote_unavailable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/experiments/42");
            then.status(503).body("down");
        });
        let err = client(&server).get_experiment(42).unwrap_err();
        assert!(matches!(err, SyncError::RemoteUnavailable { .. }));
    }

    #[test]
    fn get_experiment_malformed_body_is_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/experiments/42");
            then.status(200).body("<html>");
        });
        let err = client(&server).get_experiment(42).unwrap_err();
        assert!(matches!(err, SyncError::Decode { .. }));
    }

    #[test]
    fn get_experiments_sends_one_filter_param_per_pair() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/projects/860/experiments/")
                .query_param("filter", "status:Running");
            then.status(200)
                .json_body(json!([{"id": 1, "status": "Running"}, {"id": 2}]));
        });
        let exps = client(&server)
            .get_experiments(860, &[("status".into(), "Running".into())])
            .unwrap();
        m.assert();
        assert_eq!(exps.len(), 2);
        assert_eq!(exps[1].id, 2);
    }

    #[test]
    fn update_experiment_puts_whole_record() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(PUT)
                .path("/experiments/5")
                .json_body_partial(r#"{"status":"Running","activation_mode":"immediate","edit_url":"u"}"#);
            then.status(202).json_body(json!({"id": 5, "status": "Running"}));
        });
        let mut exp: Experiment =
            serde_json::from_value(json!({"id": 5, "status": "Paused", "edit_url": "u"})).unwrap();
        exp.status = Some(ExperimentStatus::Running);
        exp.activation_mode = Some(ActivationMode::Immediate);
        let got = client(&server).update_experiment(&exp).unwrap();
        m.assert();
        assert_eq!(got.status, Some(ExperimentStatus::Running));
    }

    #[test]
    fn update_experiment_does_not_check_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PUT).path("/experiments/5");
            then.status(400).json_body(json!({"id": 5}));
        });
        let exp: Experiment = serde_json::from_value(json!({"id": 5})).unwrap();
        assert!(client(&server).update_experiment(&exp).is_ok());
    }

    #[test]
    fn update_variation_rejects_status_above_299() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PUT).path("/variations/9");
            then.status(400).json_body(json!({"error": "bad"}));
        });
        let var: Variation = serde_json::from_value(json!({"id": 9})).unwrap();
        match client(&server).update_variation(&var) {
            Err(SyncError::VariationUpdateFailed { id, status }) => {
                assert_eq!(id, 9);
                assert_eq!(status, 400);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn updated_variation_content_is_reflected_on_refetch() {
        let server = MockServer::start();
        let put = server.mock(|when, then| {
            when.method(PUT)
                .path("/variations/9")
                .json_body_partial(r#"{"id":9,"js_component":"window.x = 1;"}"#);
            then.status(200)
                .json_body(json!({"id": 9, "js_component": "window.x = 1;"}));
        });
        let get = server.mock(|when, then| {
            when.method(GET).path("/experiments/3/variations/");
            then.status(200)
                .json_body(json!([{"id": 9, "js_component": "window.x = 1;"}]));
        });

        let c = client(&server);
        let mut var: Variation =
            serde_json::from_value(json!({"id": 9, "js_component": "old"})).unwrap();
        var.js_component = Some("window.x = 1;".into());
        let updated = c.update_variation(&var).unwrap();
        let fetched = c.get_variations(3).unwrap();

        put.assert();
        get.assert();
        assert_eq!(updated.js_component.as_deref(), Some("window.x = 1;"));
        assert_eq!(fetched[0].js_component, updated.js_component);
    }
}
