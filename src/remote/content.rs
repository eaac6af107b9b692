use reqwest::blocking::Client;
use serde::Deserialize;

use super::http::{github_client, join, send};
use crate::config::GithubConfig;
use crate::error::{Result, SyncError};

/// Entry of a GitHub contents listing; only the name is used.
#[derive(Debug, Deserialize)]
struct DirEntry {
    name: String,
}

/// Reads variation files from the GitHub repository.
pub struct ContentFetcher {
    http: Client,
    raw_url: String,
    api_url: String,
    repository: String,
    prefix: String,
}

impl ContentFetcher {
    pub fn from_config(cfg: &GithubConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: github_client(cfg.token.as_deref())?,
            raw_url: cfg.raw_url.clone(),
            api_url: cfg.api_url.clone(),
            repository: cfg.repository.clone(),
            prefix: cfg.prefix.clone(),
        })
    }

    /// Raw text of `filename` (repository-relative) at `branch`.
    ///
    /// # Errors
    /// - [`SyncError::ContentFetchFailed`] if the status is not 200.
    /// - [`SyncError::RemoteUnavailable`] on transport failure.
    pub fn fetch_file_content(&self, filename: &str, branch: &str) -> Result<String> {
        let url = join(
            &self.raw_url,
            &format!("/{}/{}/{}", self.repository, branch, filename),
        );
        let reply = send(self.http.get(&url), "GET", &url)?;
        if reply.status.as_u16() != 200 {
            return Err(SyncError::ContentFetchFailed {
                filename: filename.to_string(),
                status: reply.status.as_u16(),
            });
        }
        Ok(reply.body)
    }

    /// Names of the entries in `<prefix><experiment_name>` at `branch`.
    ///
    /// The names are returned in listing order; callers sort as needed.
    pub fn list_directory(&self, experiment_name: &str, branch: &str) -> Result<Vec<String>> {
        let url = join(
            &self.api_url,
            &format!(
                "/repos/{}/contents/{}{}",
                self.repository, self.prefix, experiment_name
            ),
        );
        let reply = send(self.http.get(&url).query(&[("ref", branch)]), "GET", &url)?
            .ensure_success()?;
        let entries: Vec<DirEntry> = reply.decode()?;
        Ok(entries.into_iter().map(|e| e.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn fetcher(server: &MockServer) -> ContentFetcher {
        ContentFetcher::from_config(&GithubConfig {
            repository: "acme/site".into(),
            raw_url: server.base_url(),
            api_url: server.base_url(),
            prefix: "js/experiments/".into(),
            token: None,
        })
        .unwrap()
    }

    #[test]
    fn fetch_file_content_returns_raw_text() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/acme/site/master/js/experiments/foo/a.js");
            then.status(200).body("console.log('a');");
        });
        let txt = fetcher(&server)
            .fetch_file_content("js/experiments/foo/a.js", "master")
            .unwrap();
        m.assert();
        assert_eq!(txt, "console.log('a');");
    }

    #[test]
    fn fetch_file_content_non_200_fails() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/acme/site/master/js/experiments/foo/a.js");
            then.status(404).body("404: Not Found");
        });
        match fetcher(&server).fetch_file_content("js/experiments/foo/a.js", "master") {
            Err(SyncError::ContentFetchFailed { filename, status }) => {
                assert_eq!(filename, "js/experiments/foo/a.js");
                assert_eq!(status, 404);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn list_directory_returns_entry_names() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/acme/site/contents/js/experiments/foo")
                .query_param("ref", "master");
            then.status(200).json_body(json!([
                {"name": "b.js", "type": "file", "sha": "1"},
                {"name": "a.js", "type": "file", "sha": "2"}
            ]));
        });
        let names = fetcher(&server).list_directory("foo", "master").unwrap();
        m.assert();
        assert_eq!(names, vec!["b.js", "a.js"]);
    }

    #[test]
    fn list_directory_failure_is_remote_unavailable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/acme/site/contents/js/experiments/foo");
            then.status(404).json_body(json!({"message": "Not Found"}));
        });
        let err = fetcher(&server).list_directory("foo", "master").unwrap_err();
        assert!(matches!(err, SyncError::RemoteUnavailable { .. }));
    }

    #[test]
    fn list_directory_malformed_body_is_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/acme/site/contents/js/experiments/foo");
            then.status(200).json_body(json!({"name": "not-a-list"}));
        });
        let err = fetcher(&server).list_directory("foo", "master").unwrap_err();
        assert!(matches!(err, SyncError::Decode { .. }));
    }
}
