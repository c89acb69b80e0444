//! Document-store REST client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.
//! Every upload-protocol call is a POST whose body is the raw chunk.

use chunkup_transfer::SessionToken;
use chunkup_upload::{DestinationFile, FileMetadata, RemoteError, RemoteFuture, RemoteSession};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;

use crate::odata::{MetadataMode, parse_metadata, parse_offset};

/// Characters kept verbatim inside quoted path literals.
const PATH_LITERAL: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Errors from building a client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid site URL: {0}")]
    InvalidUrl(String),

    #[error("invalid access token")]
    InvalidToken,
}

/// Client bound to one site of the document store.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    site_url: String,
}

impl Client {
    /// Creates a client for `site_url` authenticating with `access_token`.
    pub fn new(
        site_url: &str,
        access_token: &str,
        metadata: MetadataMode,
    ) -> Result<Self, Error> {
        let parsed =
            reqwest::Url::parse(site_url).map_err(|e| Error::InvalidUrl(format!("{site_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!("{site_url}: unsupported scheme")));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {access_token}"))
                .map_err(|_| Error::InvalidToken)?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(metadata.accept_header()));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            site_url: site_url.trim_end_matches('/').to_string(),
        })
    }

    /// Returns an upload target for the folder at `server_relative_url`.
    pub fn folder(&self, server_relative_url: &str) -> Folder {
        Folder {
            client: self.clone(),
            path: server_relative_url.to_string(),
        }
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    /// POSTs `body` to `_api/<endpoint>` and returns the response body.
    async fn post(&self, endpoint: &str, body: Vec<u8>) -> Result<Vec<u8>, RemoteError> {
        let url = format!("{}/_api/{}", self.site_url, endpoint);
        debug!(%url, bytes = body.len(), "POST");

        let resp = self
            .http
            .post(&url)
            .body(body)
            .send()
            .await
            .map_err(transport)?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.bytes().await.map_err(transport)?.to_vec())
    }
}

fn transport(e: reqwest::Error) -> RemoteError {
    RemoteError::Transport(e.to_string())
}

/// Quotes a value for use inside `'...'` in an endpoint path.
fn literal(value: &str) -> String {
    utf8_percent_encode(&value.replace('\'', "''"), PATH_LITERAL).to_string()
}

/// Upload target: a folder in the store.
#[derive(Debug, Clone)]
pub struct Folder {
    client: Client,
    path: String,
}

impl Folder {
    pub fn path(&self) -> &str {
        &self.path
    }

    fn add_endpoint(&self, name: &str, overwrite: bool) -> String {
        format!(
            "Web/GetFolderByServerRelativeUrl('{}')/Files/Add(overwrite={overwrite},url='{}')",
            literal(&self.path),
            literal(name)
        )
    }

    fn file_endpoint(file: &DestinationFile, operation: &str) -> String {
        format!(
            "Web/GetFileByServerRelativeUrl('{}')/{operation}",
            literal(file.server_relative_url())
        )
    }
}

impl RemoteSession for Folder {
    fn create_file<'a>(
        &'a self,
        name: &'a str,
        content: &'a [u8],
        overwrite: bool,
    ) -> RemoteFuture<'a, FileMetadata> {
        Box::pin(async move {
            let endpoint = self.add_endpoint(name, overwrite);
            let body = self.client.post(&endpoint, content.to_vec()).await?;
            parse_metadata(&body)
        })
    }

    fn start_upload<'a>(
        &'a self,
        file: &'a DestinationFile,
        token: SessionToken,
        chunk: &'a [u8],
    ) -> RemoteFuture<'a, u64> {
        Box::pin(async move {
            let op = format!("StartUpload(uploadId=guid'{token}')");
            let endpoint = Self::file_endpoint(file, &op);
            let body = self.client.post(&endpoint, chunk.to_vec()).await?;
            parse_offset(&body, "StartUpload")
        })
    }

    fn continue_upload<'a>(
        &'a self,
        file: &'a DestinationFile,
        token: SessionToken,
        offset: u64,
        chunk: &'a [u8],
    ) -> RemoteFuture<'a, u64> {
        Box::pin(async move {
            let op = format!("ContinueUpload(uploadId=guid'{token}',fileOffset={offset})");
            let endpoint = Self::file_endpoint(file, &op);
            let body = self.client.post(&endpoint, chunk.to_vec()).await?;
            parse_offset(&body, "ContinueUpload")
        })
    }

    fn finish_upload<'a>(
        &'a self,
        file: &'a DestinationFile,
        token: SessionToken,
        offset: u64,
        chunk: &'a [u8],
    ) -> RemoteFuture<'a, FileMetadata> {
        Box::pin(async move {
            let op = format!("FinishUpload(uploadId=guid'{token}',fileOffset={offset})");
            let endpoint = Self::file_endpoint(file, &op);
            let body = self.client.post(&endpoint, chunk.to_vec()).await?;
            parse_metadata(&body)
        })
    }

    fn cancel_upload<'a>(
        &'a self,
        file: &'a DestinationFile,
        token: SessionToken,
    ) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            let op = format!("CancelUpload(uploadId=guid'{token}')");
            let endpoint = Self::file_endpoint(file, &op);
            self.client.post(&endpoint, Vec::new()).await?;
            Ok(())
        })
    }
}
