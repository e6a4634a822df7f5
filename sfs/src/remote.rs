//! HTTP implementations of the service traits, one per server.

use crate::service::{BlockService, MetaService};
use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use common::error::{ErrorBody, FsError, FsResult};
use common::protocol::{CommitRequest, CommitResponse, ListResponse};
use common::types::FileRecord;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

fn build_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build http client")
}

fn base_url(addr: &str) -> String {
    if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.trim_end_matches('/').to_string()
    } else {
        format!("http://{addr}")
    }
}

/// Maps a transport failure onto the error taxonomy. Once a request has left
/// this process its outcome is unknown unless the connection itself failed.
fn transport_error(err: reqwest::Error) -> FsError {
    if err.is_timeout() {
        FsError::Ambiguous(format!("request timed out, outcome unknown: {err}"))
    } else if err.is_connect() {
        FsError::IoFailure(format!("connection failed: {err}"))
    } else {
        FsError::Ambiguous(format!("request failed, outcome unknown: {err}"))
    }
}

/// Rebuilds the server-side error from a non-2xx response.
async fn check_status(response: Response) -> FsResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.json::<ErrorBody>().await.ok();
    Err(FsError::from_wire(status.as_u16(), body))
}

/// Client of one datanode's block API.
pub struct RemoteBlockService {
    http: Client,
    base: String,
}

impl RemoteBlockService {
    pub fn new(addr: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_client(timeout)?,
            base: base_url(addr),
        })
    }
}

#[async_trait]
impl BlockService for RemoteBlockService {
    async fn write_block(&self, block_id: &str, data: Bytes) -> FsResult<()> {
        let url = format!("{}/blocks/{block_id}", self.base);
        let response = self
            .http
            .put(url)
            .body(data)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        Ok(())
    }

    async fn read_block(&self, block_id: &str) -> FsResult<Option<Bytes>> {
        let url = format!("{}/blocks/{block_id}", self.base);
        let response = self.http.get(url).send().await.map_err(transport_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        let data = response.bytes().await.map_err(transport_error)?;
        Ok(Some(data))
    }

    async fn delete_block(&self, block_id: &str) -> FsResult<()> {
        let url = format!("{}/blocks/{block_id}", self.base);
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        Ok(())
    }
}

/// Client of the MDS namespace API.
pub struct RemoteMetaService {
    http: Client,
    base: String,
}

impl RemoteMetaService {
    pub fn new(addr: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_client(timeout)?,
            base: base_url(addr),
        })
    }
}

#[async_trait]
impl MetaService for RemoteMetaService {
    async fn commit(&self, request: CommitRequest) -> FsResult<CommitResponse> {
        let url = format!("{}/files/commit", self.base);
        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        response
            .json::<CommitResponse>()
            .await
            .map_err(transport_error)
    }

    async fn stat(&self, path: &str) -> FsResult<FileRecord> {
        let url = format!("{}/files/stat", self.base);
        let response = self
            .http
            .get(url)
            .query(&[("path", path)])
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        response.json::<FileRecord>().await.map_err(transport_error)
    }

    async fn list(&self, prefix: &str) -> FsResult<Vec<String>> {
        let url = format!("{}/files/list", self.base);
        let response = self
            .http
            .get(url)
            .query(&[("prefix", prefix)])
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        let body = response
            .json::<ListResponse>()
            .await
            .map_err(transport_error)?;
        Ok(body.paths)
    }

    async fn delete(&self, path: &str) -> FsResult<FileRecord> {
        let url = format!("{}/files", self.base);
        let response = self
            .http
            .delete(url)
            .query(&[("path", path)])
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        response.json::<FileRecord>().await.map_err(transport_error)
    }
}
