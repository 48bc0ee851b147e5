//! Contains a remote implementation using HTTP to interact with the key-value store.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use url::Url;

use crate::error::{Error, Result};
use crate::record::Record;

const USER_AGENT: &str = concat!("kvbench/", env!("CARGO_PKG_VERSION"));

/// A remote implementation using HTTP to interact with the key-value store.
///
/// The remote wraps a single [`reqwest::Client`] and therefore a single connection pool. Cloning
/// it is cheap and shares that pool, so all cycles of a run can use the same instance.
#[derive(Clone, Debug)]
pub struct HttpRemote {
    client: reqwest::Client,
    set_url: Url,
    get_url: Url,
    remove_url: Url,
}

impl HttpRemote {
    /// Creates a new `HttpRemote` for the service at the given base URL.
    ///
    /// When a `timeout` is given, it applies to each individual call, from connecting until the
    /// response body has been read.
    pub fn new(remote: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut base = Url::parse(remote)?;
        if base.cannot_be_a_base() {
            return Err(Error::CannotBeABase(remote.to_owned()));
        }
        // Without a trailing slash, `join` would replace the last path segment.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            set_url: base.join("set")?,
            get_url: base.join("get")?,
            remove_url: base.join("remove")?,
        })
    }

    /// Stores the record with `POST /set`.
    pub async fn set(&self, record: &Record) -> Result<StatusCode> {
        let response = self
            .client
            .post(self.set_url.clone())
            .json(record)
            .send()
            .await?;
        drain(response).await
    }

    /// Reads the value of `key` with `GET /get?key=...`.
    pub async fn get(&self, key: &str) -> Result<StatusCode> {
        let response = self
            .client
            .get(self.get_url.clone())
            .query(&[("key", key)])
            .send()
            .await?;
        drain(response).await
    }

    /// Removes `key` with `DELETE /remove?key=...`.
    pub async fn remove(&self, key: &str) -> Result<StatusCode> {
        let response = self
            .client
            .delete(self.remove_url.clone())
            .query(&[("key", key)])
            .send()
            .await?;
        drain(response).await
    }
}

/// Reads the full response body and returns the status code.
async fn drain(response: Response) -> Result<StatusCode> {
    let status = response.status();
    response.bytes().await?;
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_endpoint_paths() {
        let remote = HttpRemote::new("http://127.0.0.1:3030", None).unwrap();
        assert_eq!(remote.set_url.as_str(), "http://127.0.0.1:3030/set");
        assert_eq!(remote.get_url.as_str(), "http://127.0.0.1:3030/get");
        assert_eq!(remote.remove_url.as_str(), "http://127.0.0.1:3030/remove");
    }

    #[test]
    fn keeps_base_path() {
        let remote = HttpRemote::new("http://localhost:8080/kv", None).unwrap();
        assert_eq!(remote.set_url.as_str(), "http://localhost:8080/kv/set");

        let remote = HttpRemote::new("http://localhost:8080/kv/", None).unwrap();
        assert_eq!(remote.remove_url.as_str(), "http://localhost:8080/kv/remove");
    }

    #[test]
    fn rejects_invalid_urls() {
        let err = HttpRemote::new("not a url", None).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));

        let err = HttpRemote::new("mailto:someone@example.com", None).unwrap_err();
        assert!(matches!(err, Error::CannotBeABase(_)));
    }
}
