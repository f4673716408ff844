//! HTTP RPC client for a Kubo-compatible IPFS daemon.
//!
//! Every command is a `POST` to `<url>/api/v0/<command>` with positional
//! arguments passed as repeated `arg` query parameters. Errors come back as
//! a JSON body `{"Message", "Code", "Type"}`; the message
//! `file does not exist` is the daemon's way of reporting a missing
//! namespace path.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use cidgate_types::ContentId;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;
use crate::types::{DirEntry, Stat};

const API_PREFIX: &str = "api/v0";
const NOT_FOUND_MESSAGE: &str = "file does not exist";

/// Connection settings for [`KuboClient`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KuboConfig {
    /// Daemon RPC address, e.g. `http://127.0.0.1:5001`. A trailing
    /// `/api/v0` is accepted and not duplicated.
    pub url: String,
    /// Extra headers sent with every request (typically `Authorization`).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// [`ContentStore`] backed by a Kubo daemon's RPC API.
#[derive(Clone, Debug)]
pub struct KuboClient {
    client: Client,
    base: Url,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Debug, Deserialize)]
struct StatResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Debug, Deserialize)]
struct LsResponse {
    // The daemon sends `null` rather than `[]` for an empty directory.
    #[serde(rename = "Entries", default)]
    entries: Option<Vec<LsEntry>>,
}

#[derive(Debug, Deserialize)]
struct LsEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Hash", default)]
    hash: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "Message")]
    message: String,
}

impl KuboClient {
    /// Build a client from connection settings.
    pub fn new(config: &KuboConfig) -> StoreResult<Self> {
        let base = api_base(&config.url)?;
        let headers = header_map(&config.headers)?;
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;
        Ok(Self { client, base })
    }

    /// Base URL every command is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, command: &str, args: &[&str], flags: &[(&str, &str)]) -> StoreResult<Url> {
        command_url(&self.base, command, args, flags)
    }

    async fn call(&self, url: Url, form: Option<Form>, subject: &str) -> StoreResult<String> {
        debug!(%url, "store rpc");
        let mut request = self.client.post(url);
        if let Some(form) = form {
            request = request.multipart(form);
        }
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(error_from_response(status, &body, subject));
        }
        Ok(body)
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        url: Url,
        form: Option<Form>,
        subject: &str,
    ) -> StoreResult<T> {
        let body = self.call(url, form, subject).await?;
        decode_last_line(&body)
    }
}

#[async_trait]
impl ContentStore for KuboClient {
    async fn ingest(&self, data: Bytes) -> StoreResult<ContentId> {
        let url = self.endpoint("add", &[], &[("pin", "false")])?;
        let part = Part::bytes(data.to_vec()).file_name("file");
        let form = Form::new().part("file", part);
        let added: AddResponse = self.call_json(url, Some(form), "add").await?;
        Ok(ContentId::parse(&added.hash)?)
    }

    async fn stat(&self, path: &str) -> StoreResult<Stat> {
        let url = self.endpoint("files/stat", &[path], &[])?;
        let stat: StatResponse = self.call_json(url, None, path).await?;
        Ok(Stat {
            cid: ContentId::parse(&stat.hash)?,
        })
    }

    async fn link(&self, cid: &ContentId, path: &str) -> StoreResult<()> {
        let source = format!("/ipfs/{cid}");
        let url = self.endpoint("files/cp", &[&source, path], &[])?;
        self.call(url, None, path).await?;
        Ok(())
    }

    async fn unlink(&self, path: &str) -> StoreResult<()> {
        let url = self.endpoint("files/rm", &[path], &[])?;
        self.call(url, None, path).await?;
        Ok(())
    }

    async fn list(&self, path: &str) -> StoreResult<Vec<DirEntry>> {
        let url = self.endpoint("files/ls", &[path], &[("long", "true")])?;
        let ls: LsResponse = self.call_json(url, None, path).await?;
        ls.entries
            .unwrap_or_default()
            .into_iter()
            .map(|entry| -> StoreResult<DirEntry> {
                Ok(DirEntry {
                    cid: ContentId::parse(&entry.hash)?,
                    name: entry.name,
                })
            })
            .collect()
    }
}

/// Resolve the configured URL to `<url>/api/v0/`.
fn api_base(url: &str) -> StoreResult<Url> {
    let mut base = Url::parse(url).map_err(|e| StoreError::Config(format!("{url}: {e}")))?;
    if base.cannot_be_a_base() {
        return Err(StoreError::Config(format!("{url}: not a base URL")));
    }
    let trimmed = base.path().trim_end_matches('/').to_string();
    let path = if trimmed.ends_with(&format!("/{API_PREFIX}")) {
        format!("{trimmed}/")
    } else {
        format!("{trimmed}/{API_PREFIX}/")
    };
    base.set_path(&path);
    Ok(base)
}

fn command_url(base: &Url, command: &str, args: &[&str], flags: &[(&str, &str)]) -> StoreResult<Url> {
    let mut url = base
        .join(command)
        .map_err(|e| StoreError::Config(format!("{command}: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        for arg in args {
            query.append_pair("arg", arg);
        }
        for (key, value) in flags {
            query.append_pair(key, value);
        }
    }
    Ok(url)
}

fn header_map(headers: &BTreeMap<String, String>) -> StoreResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| StoreError::Config(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| StoreError::Config(format!("header value for {name}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn error_from_response(status: StatusCode, body: &str, subject: &str) -> StoreError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string());
    if message == NOT_FOUND_MESSAGE {
        return StoreError::NotFound(subject.to_string());
    }
    StoreError::Remote {
        status: status.as_u16(),
        message,
    }
}

/// Streaming commands emit newline-delimited JSON; the final object is the
/// result.
fn decode_last_line<T: DeserializeOwned>(body: &str) -> StoreResult<T> {
    let line = body
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| StoreError::InvalidResponse("empty body".into()))?;
    serde_json::from_str(line).map_err(|e| StoreError::InvalidResponse(e.to_string()))
}
