use anyhow::Result;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::SyncError;

const AGENT: &str = concat!("varsync/", env!("CARGO_PKG_VERSION"));

/// Client for the experiment platform: JSON content type plus the static `token` header.
pub fn optimizely_client(token: &str) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(AGENT));
    let mut tok = HeaderValue::from_str(token)?;
    tok.set_sensitive(true);
    headers.insert("token", tok);
    let client = Client::builder().default_headers(headers).build()?;
    Ok(client)
}

/// Client for the content host. The bearer token is only sent when configured.
pub fn github_client(token: Option<&str>) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/vnd.github+json"),
    );
    headers.insert(USER_AGENT, HeaderValue::from_static(AGENT));
    if let Some(tok) = token {
        let mut v = HeaderValue::from_str(&format!("Bearer {}", tok))?;
        v.set_sensitive(true);
        headers.insert("Authorization", v);
    }
    let client = Client::builder().default_headers(headers).build()?;
    Ok(client)
}

/// A fully read response.
#[derive(Debug)]
pub struct Reply {
    pub url: String,
    pub status: StatusCode,
    pub body: String,
}

impl Reply {
    /// Map a non-2xx status to [`SyncError::RemoteUnavailable`].
    pub fn ensure_success(self) -> Result<Self, SyncError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(SyncError::RemoteUnavailable {
                url: self.url,
                reason: format!("status {}", self.status.as_u16()),
            })
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, SyncError> {
        serde_json::from_str(&self.body).map_err(|source| SyncError::Decode {
            url: self.url.clone(),
            source,
        })
    }
}

/// Send a request and read the whole body, logging both sides.
///
/// Transport failures (connect, TLS, body read) become
/// [`SyncError::RemoteUnavailable`]; the status is left for the caller to judge.
pub fn send(req: RequestBuilder, method: &str, url: &str) -> Result<Reply, SyncError> {
    info!("{} {}", method, url);
    let unavailable = |e: reqwest::Error| SyncError::RemoteUnavailable {
        url: url.to_string(),
        reason: e.to_string(),
    };
    let resp = req.send().map_err(unavailable)?;
    let status = resp.status();
    let body = resp.text().map_err(unavailable)?;
    info!(status = status.as_u16(), "{} {} responded", method, url);
    debug!(body = %body, "response body");
    Ok(Reply {
        url: url.to_string(),
        status,
        body,
    })
}

/// Join a base URL and a path that starts with `/`.
pub fn join(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn optimizely_client_sends_fixed_headers() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/ping")
                .header("content-type", "application/json")
                .header("token", "s3cret");
            then.status(200).body("pong");
        });
        let client = optimizely_client("s3cret").unwrap();
        let url = server.url("/ping");
        let reply = send(client.get(&url), "GET", &url).unwrap();
        m.assert();
        assert_eq!(reply.body, "pong");
    }

    #[test]
    fn github_client_sends_bearer_when_configured() {
        let server = MockServer::start();
        let authed = server.mock(|when, then| {
            when.method(GET)
                .path("/authed")
                .header("authorization", "Bearer gh");
            then.status(200);
        });
        let url = server.url("/authed");
        let client = github_client(Some("gh")).unwrap();
        send(client.get(&url), "GET", &url).unwrap();
        authed.assert();

        let anon = server.mock(|when, then| {
            when.method(GET).path("/anon");
            then.status(200);
        });
        let url = server.url("/anon");
        let client = github_client(None).unwrap();
        send(client.get(&url), "GET", &url).unwrap();
        anon.assert();
    }

    #[test]
    fn ensure_success_maps_status_to_remote_unavailable() {
        let reply = Reply {
            url: "http://x/y".into(),
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        };
        match reply.ensure_success() {
            Err(SyncError::RemoteUnavailable { url, reason }) => {
                assert_eq!(url, "http://x/y");
                assert!(reason.contains("502"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn transport_error_is_remote_unavailable() {
        let client = Client::new();
        let url = "http://127.0.0.1:9/unreachable";
        let err = send(client.get(url), "GET", url).unwrap_err();
        assert!(matches!(err, SyncError::RemoteUnavailable { .. }));
    }

    #[test]
    fn join_trims_trailing_slash() {
        assert_eq!(join("http://h/v1/", "/x"), "http://h/v1/x");
        assert_eq!(join("http://h/v1", "/x"), "http://h/v1/x");
    }
}
