//! REST client for an Appwrite-compatible platform.
//!
//! Sessions are cookie based: the platform answers a successful login with a
//! `a_session_<project>` cookie, which the client keeps and replays on every
//! later request. Non-browser clients also receive the same value in the
//! `X-Fallback-Cookies` header, used when no cookie is set.

use std::path::Path;
use std::sync::RwLock;

use bytes::Bytes;
use futures_util::StreamExt;
use namespace::StoredObject;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use super::{Identity, Platform, PlatformError, PlatformResult, Session};
use crate::config::{PlatformConfig, DEFAULT_CHUNK_SIZE};

/// Response format version requested from the platform.
pub const RESPONSE_FORMAT: &str = "1.5.0";

/// Objects requested per listing page.
pub const LIST_PAGE_SIZE: usize = 100;

/// Header carrying cookies for clients that cannot store them.
const FALLBACK_COOKIES: &str = "x-fallback-cookies";

/// Header naming the object a follow-up chunk belongs to.
const UPLOAD_ID: &str = "x-appwrite-id";

/// Error body returned by the platform.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: u16,
    #[serde(rename = "type", default)]
    kind: String,
}

/// A page of the object listing.
#[derive(Debug, Deserialize)]
struct ObjectPage {
    total: usize,
    files: Vec<StoredObject>,
}

/// Appwrite REST client.
pub struct AppwriteClient {
    http: reqwest::Client,
    endpoint: Url,
    project_id: String,
    chunk_size: usize,
    session_secret: RwLock<Option<String>>,
}

impl AppwriteClient {
    /// Create a client for the configured platform.
    pub fn new(config: &PlatformConfig) -> PlatformResult<Self> {
        Self::with_builder(config, reqwest::Client::builder())
    }

    /// Create a client on top of a caller-supplied HTTP builder.
    ///
    /// Project headers and the user agent are added to `builder`.
    pub fn with_builder(
        config: &PlatformConfig,
        builder: reqwest::ClientBuilder,
    ) -> PlatformResult<Self> {
        let endpoint = Url::parse(&config.endpoint)?;
        if endpoint.cannot_be_a_base() {
            return Err(PlatformError::InvalidUrl(config.endpoint.clone()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-appwrite-project",
            HeaderValue::from_str(&config.project_id)
                .map_err(|e| PlatformError::InvalidUrl(e.to_string()))?,
        );
        headers.insert(
            "x-appwrite-response-format",
            HeaderValue::from_static(RESPONSE_FORMAT),
        );

        let http = builder
            .default_headers(headers)
            .user_agent(concat!("shelf/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            project_id: config.project_id.clone(),
            chunk_size: DEFAULT_CHUNK_SIZE as usize,
            session_secret: RwLock::new(None),
        })
    }

    /// Override the upload chunk size.
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.clamp(1, DEFAULT_CHUNK_SIZE) as usize;
        self
    }

    /// Name of the session cookie for this project.
    pub fn session_cookie_name(&self) -> String {
        format!("a_session_{}", self.project_id)
    }

    /// Build an endpoint URL from path segments.
    fn url(&self, segments: &[&str]) -> PlatformResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| PlatformError::InvalidUrl(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn current_secret(&self) -> Option<String> {
        match self.session_secret.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn store_secret(&self, secret: Option<String>) {
        match self.session_secret.write() {
            Ok(mut guard) => *guard = secret,
            Err(poisoned) => *poisoned.into_inner() = secret,
        }
    }

    /// Attach the session cookie, if any.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.current_secret() {
            Some(secret) => request.header(
                COOKIE,
                format!("{}={}", self.session_cookie_name(), secret),
            ),
            None => request,
        }
    }

    /// Send a request and turn error statuses into [`PlatformError::Api`].
    async fn send(&self, request: RequestBuilder) -> PlatformResult<Response> {
        let response = self.authorize(request).send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(api_error(response).await)
        }
    }

    async fn fetch_page(&self, bucket_id: &str, offset: usize) -> PlatformResult<ObjectPage> {
        let url = self.url(&["storage", "buckets", bucket_id, "files"])?;
        let request = self.http.get(url).query(&list_queries(LIST_PAGE_SIZE, offset));
        let page = self.send(request).await?.json::<ObjectPage>().await?;
        Ok(page)
    }

    async fn rename_object(
        &self,
        bucket_id: &str,
        object_id: &str,
        key: &str,
    ) -> PlatformResult<StoredObject> {
        let url = self.url(&["storage", "buckets", bucket_id, "files", object_id])?;
        let request = self.http.put(url).json(&json!({ "name": key }));
        Ok(self.send(request).await?.json().await?)
    }
}

impl Platform for AppwriteClient {
    fn set_session_secret(&self, secret: Option<String>) {
        self.store_secret(secret);
    }

    async fn get_current_identity(&self) -> PlatformResult<Identity> {
        let request = self.http.get(self.url(&["account"])?);
        match self.send(request).await {
            Ok(response) => Ok(response.json().await?),
            Err(PlatformError::Api { code: 401, .. }) => Err(PlatformError::Unauthenticated),
            Err(e) => Err(e),
        }
    }

    async fn create_identity(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> PlatformResult<Identity> {
        let body = json!({
            "userId": "unique()",
            "email": email,
            "password": password,
            "name": name,
        });
        let request = self.http.post(self.url(&["account"])?).json(&body);
        Ok(self.send(request).await?.json().await?)
    }

    async fn create_session(&self, email: &str, password: &str) -> PlatformResult<Session> {
        let url = self.url(&["account", "sessions", "email"])?;
        let request = self
            .http
            .post(url)
            .json(&json!({ "email": email, "password": password }));
        let response = self.send(request).await?;

        let secret = extract_session_secret(response.headers(), &self.session_cookie_name());
        if secret.is_none() {
            tracing::warn!("Session created but no session cookie was returned");
        }

        let mut session: Session = response.json().await?;
        session.secret = secret.clone();
        self.store_secret(secret);

        tracing::debug!("Created session {} for {}", session.id, session.user_id);
        Ok(session)
    }

    fn oauth_redirect_url(
        &self,
        provider: &str,
        success_url: &str,
        failure_url: &str,
    ) -> PlatformResult<Url> {
        let mut url = self.url(&["account", "sessions", "oauth2", provider])?;
        url.query_pairs_mut()
            .append_pair("project", &self.project_id)
            .append_pair("success", success_url)
            .append_pair("failure", failure_url);
        Ok(url)
    }

    async fn delete_session(&self, session_ref: &str) -> PlatformResult<()> {
        let url = self.url(&["account", "sessions", session_ref])?;
        self.send(self.http.delete(url)).await?;
        if session_ref == super::CURRENT_SESSION {
            self.store_secret(None);
        }
        Ok(())
    }

    async fn list_objects(&self, bucket_id: &str) -> PlatformResult<Vec<StoredObject>> {
        let mut objects = Vec::new();

        loop {
            let page = self.fetch_page(bucket_id, objects.len()).await?;
            let received = page.files.len();
            objects.extend(page.files);

            if received == 0 || objects.len() >= page.total {
                break;
            }
        }

        tracing::debug!("Listed {} objects in bucket {}", objects.len(), bucket_id);
        Ok(objects)
    }

    async fn create_object(
        &self,
        bucket_id: &str,
        object_id: &str,
        key: &str,
        data: Bytes,
    ) -> PlatformResult<StoredObject> {
        let url = self.url(&["storage", "buckets", bucket_id, "files"])?;
        let total = data.len();
        let mut created: Option<StoredObject> = None;

        for (index, range) in chunk_ranges(total, self.chunk_size).into_iter().enumerate() {
            let part = Part::bytes(data.slice(range.clone()).to_vec())
                .file_name(key.to_string())
                .mime_str("application/octet-stream")?;
            let form = Form::new()
                .text("fileId", object_id.to_string())
                .part("file", part);

            let mut request = self.http.post(url.clone()).multipart(form);
            if total > self.chunk_size {
                request = request.header(
                    reqwest::header::CONTENT_RANGE,
                    content_range(range.start, range.end, total),
                );
                if index > 0 {
                    request = request.header(UPLOAD_ID, object_id);
                }
            }

            created = Some(self.send(request).await?.json().await?);
            tracing::trace!("Uploaded chunk {} of {}", index + 1, key);
        }

        let created = created.ok_or_else(|| PlatformError::Decode("no upload response".into()))?;

        // Multipart file names may lose their directory part on the way in.
        if created.key != key {
            tracing::debug!("Platform stored {:?}, renaming to {:?}", created.key, key);
            return self.rename_object(bucket_id, &created.id, key).await;
        }
        Ok(created)
    }

    fn download_url(&self, bucket_id: &str, object_id: &str) -> PlatformResult<Url> {
        let mut url = self.url(&["storage", "buckets", bucket_id, "files", object_id, "download"])?;
        url.query_pairs_mut().append_pair("project", &self.project_id);
        Ok(url)
    }

    async fn download_to(
        &self,
        bucket_id: &str,
        object_id: &str,
        dest: &Path,
    ) -> PlatformResult<u64> {
        let url = self.download_url(bucket_id, object_id)?;
        let response = self.send(self.http.get(url)).await?;

        let mut file = File::create(dest).await?;
        match write_body(response, &mut file).await {
            Ok(written) => Ok(written),
            Err(e) => {
                drop(file);
                // A partial file is never left at `dest`.
                if let Err(rm) = tokio::fs::remove_file(dest).await {
                    tracing::warn!("Could not remove partial download {:?}: {}", dest, rm);
                }
                Err(e)
            }
        }
    }

    async fn delete_object(&self, bucket_id: &str, object_id: &str) -> PlatformResult<()> {
        let url = self.url(&["storage", "buckets", bucket_id, "files", object_id])?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }
}

/// Stream a response body into `file`, returning the bytes written.
async fn write_body(response: Response, file: &mut File) -> PlatformResult<u64> {
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

/// Convert an error response into a [`PlatformError`].
async fn api_error(response: Response) -> PlatformError {
    let status = response.status();
    match response.text().await {
        Ok(body) => parse_api_error(status, &body),
        Err(e) => PlatformError::Transport(e.to_string()),
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> PlatformError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => PlatformError::Api {
            code: if parsed.code == 0 { status.as_u16() } else { parsed.code },
            kind: parsed.kind,
            message: if parsed.message.is_empty() {
                status.to_string()
            } else {
                parsed.message
            },
        },
        Err(_) => PlatformError::Api {
            code: status.as_u16(),
            kind: String::new(),
            message: status.to_string(),
        },
    }
}

/// Find the session secret in the response headers.
///
/// Prefers the `Set-Cookie` header and falls back to the JSON object carried
/// in `X-Fallback-Cookies`.
fn extract_session_secret(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_cookie = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            let pair = cookie.split(';').next()?.trim();
            let (name, value) = pair.split_once('=')?;
            (name == cookie_name && !value.is_empty()).then(|| value.to_string())
        });

    from_cookie.or_else(|| {
        let raw = headers.get(FALLBACK_COOKIES)?.to_str().ok()?;
        let cookies: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw).ok()?;
        cookies
            .get(cookie_name)?
            .as_str()
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    })
}

/// Query parameters for one listing page.
fn list_queries(limit: usize, offset: usize) -> Vec<(&'static str, String)> {
    vec![
        ("queries[]", json!({ "method": "limit", "values": [limit] }).to_string()),
        ("queries[]", json!({ "method": "offset", "values": [offset] }).to_string()),
    ]
}

/// Byte ranges for uploading `total` bytes in chunks of `chunk_size`.
///
/// An empty payload is still sent as a single empty request.
fn chunk_ranges(total: usize, chunk_size: usize) -> Vec<std::ops::Range<usize>> {
    if total == 0 {
        return vec![0..0];
    }
    (0..total)
        .step_by(chunk_size.max(1))
        .map(|start| start..(start + chunk_size).min(total))
        .collect()
}

/// `Content-Range` value for the chunk `[start, end)`.
fn content_range(start: usize, end: usize, total: usize) -> String {
    format!("bytes {}-{}/{}", start, end - 1, total)
}
