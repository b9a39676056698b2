//! HTTP transport shared by the HTTP Domain Services.
//!
//! Joins paths onto the configured base url, attaches the bearer credential of
//! the live session and classifies every failure into an [`ApiError`]. It
//! only classifies: tearing down the session on `Unauthorized` is the store's
//! job, so the logout happens once per rejected request.

use crate::session::SessionContext;
use crate::traits::ProgressSender;
use gradtrack_core::{
    filename_from_content_disposition, ApiError, ApiResult, Download, ErrorKind, FileRecord,
    FileUpload, DEFAULT_DOWNLOAD_NAME,
};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, ClientBuilder, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Size of the chunks an upload body is streamed in.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Error body the API sends with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: BTreeMap<String, String>,
}

/// Authenticated JSON-over-HTTP client.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    session: SessionContext,
}

impl HttpTransport {
    /// Create a transport for `base_url` with a per-request `timeout`.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        session: SessionContext,
    ) -> ApiResult<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::new(ErrorKind::Unknown, format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Base url without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute url of an API path.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Start a request, with the bearer credential attached when signed in.
    pub async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!("{} {}", method, path);
        let builder = self.client.request(method, self.url(path));
        match self.session.token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request, turning transport failures and non-2xx answers into
    /// classified errors.
    pub async fn send(&self, builder: RequestBuilder, fallback: &str) -> ApiResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| classify_send_error(&e, fallback))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = error_from_body(status.as_u16(), &body, fallback);
        warn!("Request failed: {}", err);
        Err(err)
    }

    /// Send and decode a JSON answer.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        fallback: &str,
    ) -> ApiResult<T> {
        let response = self.send(builder, fallback).await?;
        response.json::<T>().await.map_err(|e| {
            ApiError::new(
                ErrorKind::Unknown,
                format!("{}: malformed response: {}", fallback, e),
            )
        })
    }

    /// GET a JSON resource.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, fallback: &str) -> ApiResult<T> {
        let builder = self.request(Method::GET, path).await;
        self.send_json(builder, fallback).await
    }

    /// POST a JSON body and decode the JSON answer.
    pub async fn post<B, T>(&self, path: &str, body: &B, fallback: &str) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).await.json(body);
        self.send_json(builder, fallback).await
    }

    /// PUT a JSON body and decode the JSON answer.
    pub async fn put<B, T>(&self, path: &str, body: &B, fallback: &str) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PUT, path).await.json(body);
        self.send_json(builder, fallback).await
    }

    /// PUT without a body, ignoring the answer.
    pub async fn put_empty(&self, path: &str, fallback: &str) -> ApiResult<()> {
        let builder = self.request(Method::PUT, path).await;
        self.send(builder, fallback).await.map(|_| ())
    }

    /// DELETE a resource, ignoring the answer.
    pub async fn delete(&self, path: &str, fallback: &str) -> ApiResult<()> {
        let builder = self.request(Method::DELETE, path).await;
        self.send(builder, fallback).await.map(|_| ())
    }

    /// Multipart upload with parts `file`, `description` and `folderId`.
    ///
    /// The file part is streamed in [`UPLOAD_CHUNK_SIZE`] chunks and every
    /// chunk handed to the connection reports its cumulative percentage.
    pub async fn upload(
        &self,
        path: &str,
        upload: FileUpload,
        progress: ProgressSender,
        fallback: &str,
    ) -> ApiResult<FileRecord> {
        let total = upload.size();
        let _ = progress.send(0);

        let chunks: Vec<Vec<u8>> = upload
            .bytes
            .chunks(UPLOAD_CHUNK_SIZE)
            .map(<[u8]>::to_vec)
            .collect();
        if chunks.is_empty() {
            let _ = progress.send(100);
        }

        let mut sent = 0u64;
        let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            let _ = progress.send(percent(sent, total));
            Ok::<_, std::io::Error>(chunk)
        }));

        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type)
            .map_err(|_| {
                ApiError::validation(
                    "fileType",
                    format!("Invalid content type: {}", upload.content_type),
                )
            })?;

        let mut form = Form::new().part("file", part);
        if let Some(description) = upload.description {
            form = form.text("description", description);
        }
        form = form.text("folderId", upload.folder_id.to_string());

        debug!("Uploading {} ({} bytes)", upload.file_name, total);
        let builder = self.request(Method::POST, path).await.multipart(form);
        self.send_json(builder, fallback).await
    }

    /// Download raw bytes, recovering the file name from `content-disposition`.
    pub async fn download(&self, path: &str, fallback: &str) -> ApiResult<Download> {
        let builder = self.request(Method::GET, path).await;
        let response = self.send(builder, fallback).await?;

        let headers = response.headers();
        let file_name = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_content_disposition)
            .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string());
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_send_error(&e, fallback))?;

        Ok(Download {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

/// Percentage of `sent` over `total`, clamped to 100.
pub fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (sent.saturating_mul(100) / total).min(100) as u8
}

/// Classify a non-2xx response from its status and raw body.
pub fn error_from_body(status: u16, body: &str, fallback: &str) -> ApiError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message.filter(|m| !m.trim().is_empty());
    ApiError::from_status(status, message, fallback).with_field_errors(parsed.errors)
}

/// Classify a failure where no response was received.
fn classify_send_error(err: &reqwest::Error, fallback: &str) -> ApiError {
    let err = if err.is_builder() {
        ApiError::new(ErrorKind::Unknown, format!("{}: {}", fallback, err))
    } else {
        ApiError::network(format!("{}: {}", fallback, err))
    };
    warn!("Request failed: {}", err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradtrack_storage::MemorySessionStore;
    use std::sync::Arc;

    fn transport(base: &str) -> HttpTransport {
        let session = SessionContext::new(Arc::new(MemorySessionStore::new()));
        HttpTransport::new(base, Duration::from_secs(2), session).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let t = transport("http://localhost:8080/api/");
        assert_eq!(t.base_url(), "http://localhost:8080/api");
        assert_eq!(t.url("/projects"), "http://localhost:8080/api/projects");
        assert_eq!(t.url("projects/3"), "http://localhost:8080/api/projects/3");
    }

    #[test]
    fn test_error_body_message_wins_over_fallback() {
        let err = error_from_body(409, r#"{"message":"Project name already taken"}"#, "Failed to create project");
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(err.message, "Project name already taken");
        assert_eq!(err.status, Some(409));
    }

    #[test]
    fn test_error_body_falls_back_when_unparseable() {
        let err = error_from_body(502, "<html>Bad gateway</html>", "Failed to fetch projects");
        assert_eq!(err.kind, ErrorKind::ServerUnavailable);
        assert_eq!(err.message, "Failed to fetch projects");
    }

    #[test]
    fn test_error_body_carries_field_errors() {
        let err = error_from_body(
            422,
            r#"{"message":"Invalid milestone","errors":{"dueDate":"Due date is required"}}"#,
            "Failed to add milestone",
        );
        assert_eq!(err.kind, ErrorKind::ValidationRejected);
        assert_eq!(err.field_errors.len(), 1);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 200), 0);
        assert_eq!(percent(100, 200), 50);
        assert_eq!(percent(200, 200), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_failure() {
        let t = transport("http://127.0.0.1:1");
        let err = t
            .get::<serde_json::Value>("/projects", "Failed to fetch projects")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NetworkUnreachable);
        assert!(err.message.starts_with("Failed to fetch projects"));
    }
}
