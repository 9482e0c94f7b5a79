use super::SharedState;
use axum::Json;
use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HeaderValue, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use elpx_library::error::{Error as LibraryError, ErrorKind as LibraryErrorKind};
use serde::Serialize;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct ApiError {
    success: bool,
    message: String,
}

type Rejection = (StatusCode, Json<ApiError>);
type ApiResult<T> = Result<Json<T>, Rejection>;

fn reject(status: StatusCode, message: impl Into<String>) -> Rejection {
    let message = message.into();
    (status, Json(ApiError { success: false, message }))
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    success: bool,
    message: &'static str,
    media_id: u64,
    preview_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse {
    success: bool,
    id: u64,
    url: String,
    title: String,
    filename: String,
    has_preview: bool,
    preview_url: Option<String>,
}

fn parse_id(raw: &str) -> Result<u64, Rejection> {
    raw.parse().map_err(|_| reject(StatusCode::BAD_REQUEST, "Media ID required"))
}

/// Check the request's bearer token against the configured one.
fn authorize(expected: Option<&str>, headers: &HeaderMap) -> Result<(), Rejection> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    match provided {
        None => Err(reject(StatusCode::UNAUTHORIZED, "Unauthorized")),
        // blake3::Hash compares in constant time.
        Some(token) if blake3::hash(token.as_bytes()) == blake3::hash(expected.as_bytes()) => Ok(()),
        Some(_) => Err(reject(StatusCode::FORBIDDEN, "Forbidden")),
    }
}

fn lookup_error(err: LibraryError) -> Rejection {
    match &*err {
        LibraryErrorKind::NotFound(_) => reject(StatusCode::NOT_FOUND, "Media not found"),
        _ => {
            tracing::error!(error = ?err, "Media lookup failed");
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        },
    }
}

fn save_error(err: LibraryError) -> Rejection {
    match &*err {
        LibraryErrorKind::NotFound(_) => reject(StatusCode::NOT_FOUND, "Media not found"),
        LibraryErrorKind::InvalidPackage => {
            reject(StatusCode::BAD_REQUEST, "Save failed: invalid course package")
        },
        kind => {
            let message = format!("Save failed: {kind}");
            tracing::error!(error = ?err, "Save failed");
            reject(StatusCode::INTERNAL_SERVER_ERROR, message)
        },
    }
}

/// Stream the `file` field of the request into a temporary file.
async fn receive_upload(multipart: Result<Multipart, MultipartRejection>) -> Result<NamedTempFile, Rejection> {
    let no_file = || reject(StatusCode::BAD_REQUEST, "No file uploaded");
    let storage_failed = |e: std::io::Error| {
        tracing::error!(error = %e, "Unable to buffer upload");
        reject(StatusCode::INTERNAL_SERVER_ERROR, "Save failed: unable to store upload")
    };

    let mut multipart = multipart.map_err(|e| {
        tracing::debug!(error = %e, "Not a multipart request");
        no_file()
    })?;
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| reject(e.status(), e.body_text()))?;
        let Some(mut field) = field else {
            return Err(no_file());
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let upload = tempfile::Builder::new()
            .prefix("elpx-upload-")
            .tempfile()
            .map_err(storage_failed)?;
        let mut file = tokio::fs::File::create(upload.path()).await.map_err(storage_failed)?;
        let mut written = 0;
        while let Some(chunk) = field.chunk().await.map_err(|e| reject(e.status(), e.body_text()))? {
            file.write_all(&chunk).await.map_err(storage_failed)?;
            written += chunk.len();
        }
        file.flush().await.map_err(storage_failed)?;
        if written == 0 {
            return Err(no_file());
        }
        tracing::debug!(bytes = written, "Received upload");
        return Ok(upload);
    }
}

/// `POST /api/save/{id}`: replace a course's package with the uploaded file.
pub async fn save(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<SaveResponse> {
    authorize(state.api_token.as_deref(), &headers)?;
    let id = parse_id(&id)?;
    state.library.get(id).await.map_err(lookup_error)?;
    let upload = receive_upload(multipart).await?;

    let saved = state.library.save(id, upload.path()).await.map_err(save_error)?;
    tracing::info!(media_id = id, token = %saved.processed.token, "Saved media file");
    Ok(Json(SaveResponse {
        success: true,
        message: "File saved successfully",
        media_id: id,
        preview_url: saved.preview_url,
    }))
}

pub async fn method_not_allowed() -> Rejection {
    reject(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// `GET /api/data/{id}`.
pub async fn data(State(state): State<SharedState>, Path(id): Path<String>) -> ApiResult<DataResponse> {
    let id = parse_id(&id)?;
    let status = state.library.status(id).await.map_err(lookup_error)?;
    Ok(Json(DataResponse {
        success: true,
        id: status.id,
        url: status.url,
        title: status.title,
        filename: status.filename,
        has_preview: status.has_preview,
        preview_url: status.preview_url,
    }))
}

/// `GET /api/file/{id}`: the raw stored file.
pub async fn file(State(state): State<SharedState>, Path(id): Path<String>) -> Result<Response, Rejection> {
    let id = parse_id(&id)?;
    let (record, path) = state.library.file(id).await.map_err(lookup_error)?;
    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        tracing::warn!(media_id = id, path = %path.display(), error = %e, "Raw media file unavailable");
        reject(StatusCode::NOT_FOUND, "File not found")
    })?;
    let length = file.metadata().await.ok().map(|metadata| metadata.len());
    let mime = if record.is_course_package() {
        "application/zip"
    } else {
        elpx_gateway::mime_type(std::path::Path::new(&record.filename))
    };

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(mime));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    if let Some(length) = length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::testing::Fixture;
    use axum::extract::FromRequest;
    use axum::http::Request;
    use elpx_storage::ArtifactStore;
    use rstest::rstest;

    const BOUNDARY: &str = "elpx-test-boundary";

    async fn multipart(field: &str, data: &[u8]) -> Result<Multipart, MultipartRejection> {
        let mut payload = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"course.elpx\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        payload.extend_from_slice(data);
        payload.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        let request = Request::builder()
            .method("POST")
            .uri("/api/save/1")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(payload))
            .unwrap();
        Multipart::from_request(request, &()).await
    }

    async fn not_multipart() -> Result<Multipart, MultipartRejection> {
        let request = Request::builder().method("POST").body(Body::from("file=1")).unwrap();
        Multipart::from_request(request, &()).await
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap());
        headers
    }

    fn zip_bytes(f: &Fixture, entries: &[(&str, &[u8])]) -> Vec<u8> {
        std::fs::read(f.zip("upload.zip", entries)).unwrap()
    }

    #[tokio::test]
    async fn test_save() {
        let f = Fixture::new(Some("s3cret")).await;
        let record = f.course(&[("index.html", b"one")]).await;
        let old = ArtifactStore::hash(&record).unwrap();
        let upload = zip_bytes(&f, &[("index.html", b"two")]);

        let Json(response) = save(
            State(f.state.clone()),
            Path(record.id.to_string()),
            bearer("s3cret"),
            multipart("file", &upload).await,
        )
        .await
        .unwrap();
        assert!(response.success);
        assert_eq!(response.message, "File saved successfully");
        assert_eq!(response.media_id, record.id);
        let preview = response.preview_url.unwrap();
        assert!(preview.starts_with("/content/") && preview.ends_with("/index.html"));
        assert!(!preview.contains(old.as_str()));
    }

    #[rstest]
    #[case(None, StatusCode::UNAUTHORIZED, "Unauthorized")]
    #[case(Some("wrong"), StatusCode::FORBIDDEN, "Forbidden")]
    #[tokio::test]
    async fn test_save_requires_token(
        #[case] token: Option<&str>,
        #[case] status: StatusCode,
        #[case] message: &str,
    ) {
        let f = Fixture::new(Some("s3cret")).await;
        let record = f.course(&[("index.html", b"one")]).await;
        let headers = token.map(bearer).unwrap_or_default();
        let (actual, Json(body)) = save(
            State(f.state.clone()),
            Path(record.id.to_string()),
            headers,
            multipart("file", b"ignored").await,
        )
        .await
        .unwrap_err();
        assert_eq!(actual, status);
        assert!(!body.success);
        assert_eq!(body.message, message);
    }

    #[tokio::test]
    async fn test_save_rejections() {
        let f = Fixture::new(None).await;
        let record = f.course(&[("index.html", b"one")]).await;
        let id = record.id.to_string();
        let readme = zip_bytes(&f, &[("readme.txt", b"hi")]);

        let cases = [
            ("abc".to_string(), multipart("file", b"x").await, StatusCode::BAD_REQUEST, "Media ID required"),
            ("999".to_string(), multipart("file", b"x").await, StatusCode::NOT_FOUND, "Media not found"),
            (id.clone(), multipart("other", b"x").await, StatusCode::BAD_REQUEST, "No file uploaded"),
            (id.clone(), multipart("file", b"").await, StatusCode::BAD_REQUEST, "No file uploaded"),
            (id.clone(), not_multipart().await, StatusCode::BAD_REQUEST, "No file uploaded"),
            (
                id.clone(),
                multipart("file", &readme).await,
                StatusCode::BAD_REQUEST,
                "Save failed: invalid course package",
            ),
        ];
        for (id, upload, status, message) in cases {
            let (actual, Json(body)) =
                save(State(f.state.clone()), Path(id), HeaderMap::new(), upload).await.unwrap_err();
            assert_eq!((actual, body.message.as_str()), (status, message));
        }
        // Nothing changed.
        let unchanged = f.state.library.get(record.id).await.unwrap();
        assert_eq!(ArtifactStore::hash(&unchanged), ArtifactStore::hash(&record));
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let (status, Json(body)) = method_not_allowed().await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body.message, "Method not allowed");
    }

    #[tokio::test]
    async fn test_data() {
        let f = Fixture::new(None).await;
        let record = f.course(&[("index.html", b"one")]).await;
        let hash = ArtifactStore::hash(&record).unwrap();
        let Json(response) = data(State(f.state.clone()), Path(record.id.to_string())).await.unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["id"], record.id);
        assert_eq!(json["title"], "Course.elpx");
        assert_eq!(json["filename"], record.filename.as_str());
        assert_eq!(json["url"], format!("/api/file/{}", record.id));
        assert_eq!(json["hasPreview"], true);
        assert_eq!(json["previewUrl"], format!("/content/{hash}/index.html"));

        let (status, _) = data(State(f.state.clone()), Path("12345".to_string())).await.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_file_download() {
        let f = Fixture::new(None).await;
        let record = f.course(&[("index.html", b"one")]).await;
        let response = file(State(f.state.clone()), Path(record.id.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/zip");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let (_, path) = f.state.library.file(record.id).await.unwrap();
        assert_eq!(body.as_ref(), std::fs::read(path).unwrap().as_slice());
    }
}
