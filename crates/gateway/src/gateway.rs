use crate::error::{ErrorKind, Result};
use crate::headers::{apply_common, apply_document};
use crate::mime::{is_html, mime_type};
use crate::path::{DEFAULT_FILE, sanitize_path};
use bytes::Bytes;
use elpx_storage::Token;
use exn::{OptionExt, ResultExt};
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Response, StatusCode};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// A file resolved inside an artifact, loaded and ready to send.
#[derive(Clone, Debug)]
pub struct ContentFile {
    pub path: PathBuf,
    pub mime: &'static str,
    pub body: Bytes,
}

impl ContentFile {
    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(Bytes::new());
        let headers = response.headers_mut();
        apply_common(headers, self.mime, self.body.len() as u64);
        if is_html(self.mime) {
            apply_document(headers);
        }
        *response.body_mut() = self.body;
        response
    }
}

/// Serves single files out of `<base>/<token>/`.
///
/// Stateless: the identifier is only checked for shape, never looked up, and
/// the filesystem decides whether anything exists.
#[derive(Clone, Debug)]
pub struct ContentGateway {
    base: PathBuf,
}

impl ContentGateway {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Answer a request for `path` inside the artifact named `hash`.
    ///
    /// Always produces a response: `200` with the whole file, or `404` with a
    /// plain-text reason.
    #[instrument(skip(self))]
    pub async fn serve(&self, hash: &str, path: Option<&str>) -> Response<Bytes> {
        match self.resolve(hash, path).await {
            Ok(file) => file.into_response(),
            Err(e) => {
                tracing::debug!(error = ?e, "Rejected content request");
                not_found(e.reason())
            },
        }
    }

    /// Locate and read the requested file.
    ///
    /// 1. `hash` must be 40 hexadecimal characters; checked before any
    ///    filesystem access.
    /// 2. `path` is sanitized (see [`sanitize_path`]) and defaults to
    ///    `index.html`.
    /// 3. The target must be a regular file whose canonical location lies
    ///    inside the canonical artifact directory, so symlinks cannot escape.
    pub async fn resolve(&self, hash: &str, path: Option<&str>) -> Result<ContentFile> {
        let token: Token = hash.parse::<Token>().or_raise(|| ErrorKind::InvalidIdentifier)?;
        let relative = match path.filter(|path| !path.is_empty()) {
            Some(path) => sanitize_path(path).ok_or_raise(|| ErrorKind::InvalidPath)?,
            None => DEFAULT_FILE.to_string(),
        };

        let root = self.base.join(token.as_str());
        let target = root.join(&relative);
        let metadata = tokio::fs::metadata(&target).await.or_raise(|| ErrorKind::NotFound)?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::NotFound);
        }

        let canonical_root = tokio::fs::canonicalize(&root).await.or_raise(|| ErrorKind::NotFound)?;
        let canonical_target = tokio::fs::canonicalize(&target).await.or_raise(|| ErrorKind::NotFound)?;
        if !canonical_target.starts_with(&canonical_root) {
            tracing::warn!(token = %token, path = %relative, "Content path resolves outside its artifact");
            exn::bail!(ErrorKind::AccessDenied);
        }

        let body = tokio::fs::read(&canonical_target).await.or_raise(|| ErrorKind::Io)?;
        Ok(ContentFile {
            mime: mime_type(&target),
            path: canonical_target,
            body: Bytes::from(body),
        })
    }
}

/// The 404 sent for every rejection.
pub fn not_found(reason: &'static str) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from_static(reason.as_bytes()));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}
