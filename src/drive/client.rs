//! Google Drive 客户端
//!
//! 负责一次性认证、授权检查以及单文件可续传上传

use std::path::Path;

use async_trait::async_trait;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use tokio_util::io::ReaderStream;

use crate::model::config::{Config, DriveEndpoints};

use super::credentials::ServiceAccountKey;
use super::error::{DriveError, DriveResult};
use super::model::{About, AccountInfo, CreatedFile, FileMetadata};
use super::token::TokenProvider;
use super::traits::Uploader;

/// 授权检查结果
///
/// 检查失败不影响客户端继续使用，由调用方决定如何处理
#[must_use]
#[derive(Debug)]
pub enum AuthorizationOutcome {
    Authorized(AccountInfo),
    Failed(DriveError),
}

pub struct DriveClient {
    http: reqwest::Client,
    tokens: TokenProvider,
    endpoints: DriveEndpoints,
    /// 上传目标文件夹
    folder: Option<String>,
}

impl DriveClient {
    /// 加载凭据并构建客户端
    ///
    /// 仅在凭据文件缺失或无效时返回错误，不发起网络请求
    pub fn new(config: &Config) -> DriveResult<Self> {
        let key = ServiceAccountKey::load(&config.credentials_file)?;
        tracing::info!("已加载服务账号凭据: {}", key.client_email);

        let http = reqwest::Client::builder().build()?;
        let tokens = TokenProvider::new(http.clone(), &key, &config.scopes)?;

        Ok(Self {
            http,
            tokens,
            endpoints: config.endpoints.clone(),
            folder: config.drive_folder.clone(),
        })
    }

    /// 服务账号邮箱
    pub fn client_email(&self) -> &str {
        self.tokens.client_email()
    }

    /// 查询账号与配额信息以验证授权
    pub async fn check_authorization(&self) -> AuthorizationOutcome {
        match self.fetch_about().await {
            Ok(info) => {
                tracing::info!("授权成功");
                tracing::info!("登录账号: {}", info.email);
                match info.quota_limit {
                    Some(limit) => tracing::info!("存储总量: {} bytes", limit),
                    None => tracing::info!("存储总量: 不限"),
                }
                tracing::info!("已使用: {} bytes", info.quota_usage);
                AuthorizationOutcome::Authorized(info)
            }
            Err(e) => {
                tracing::error!("授权检查失败: {}", e);
                AuthorizationOutcome::Failed(e)
            }
        }
    }

    async fn fetch_about(&self) -> DriveResult<AccountInfo> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .get(format!("{}/about", self.endpoints.api_base))
            .query(&[("fields", "user,storageQuota")])
            .bearer_auth(&token)
            .send()
            .await?;

        let about: About = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| DriveError::Decode(e.to_string()))?;

        Ok(about.into())
    }

    /// 上传文件，失败时返回错误
    ///
    /// 先以元数据创建可续传会话，再把文件内容流式写入会话地址
    pub async fn try_upload(&self, path: &Path) -> DriveResult<String> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                DriveError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("无效的文件路径: {}", path.display()),
                ))
            })?;

        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let metadata = FileMetadata {
            name,
            parents: self.folder.iter().cloned().collect(),
        };

        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(format!("{}/files", self.endpoints.upload_base))
            .query(&[("uploadType", "resumable"), ("fields", "id")])
            .bearer_auth(&token)
            .header("X-Upload-Content-Type", mime.essence_str())
            .header("X-Upload-Content-Length", size)
            .json(&metadata)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let session_uri = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(DriveError::MissingUploadSession)?;

        tracing::debug!("上传会话已创建: {} ({} bytes)", metadata.name, size);

        let response = self
            .http
            .put(&session_uri)
            .header(CONTENT_TYPE, mime.essence_str())
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await?;

        let created: CreatedFile = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| DriveError::Decode(e.to_string()))?;

        Ok(created.id)
    }
}

#[async_trait]
impl Uploader for DriveClient {
    async fn upload(&self, path: &Path) -> Option<String> {
        match self.try_upload(path).await {
            Ok(id) => {
                tracing::info!("文件 ID: {}", id);
                Some(id)
            }
            Err(e) => {
                tracing::error!("上传失败 {}: {}", path.display(), e);
                None
            }
        }
    }
}

async fn ensure_success(response: reqwest::Response) -> DriveResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DriveError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::credentials::tests::service_account_json;
    use crate::model::config::DRIVE_SCOPE;
    use axum::{
        Json, Router,
        body::Bytes,
        extract::{Query, State},
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::{get, post, put},
    };
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::{NamedTempFile, TempDir};

    /// 进程内的 Drive 假服务
    #[derive(Default)]
    struct FakeDrive {
        base_url: Mutex<String>,
        fail_about: AtomicBool,
        fail_upload: AtomicBool,
        omit_location: AtomicBool,
        sessions: Mutex<Vec<(serde_json::Value, HashMap<String, String>)>>,
        uploads: Mutex<Vec<Bytes>>,
    }

    async fn token() -> Json<serde_json::Value> {
        Json(serde_json::json!({ "access_token": "ya29.fake", "expires_in": 3600 }))
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer ya29.fake")
    }

    async fn about(State(fake): State<Arc<FakeDrive>>, headers: HeaderMap) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        if fake.fail_about.load(Ordering::Relaxed) {
            return (StatusCode::FORBIDDEN, "insufficientPermissions").into_response();
        }
        Json(serde_json::json!({
            "user": { "emailAddress": "uploader@demo-project.iam.gserviceaccount.com" },
            "storageQuota": { "limit": "1000", "usage": "250" }
        }))
        .into_response()
    }

    async fn create_session(
        State(fake): State<Arc<FakeDrive>>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
        Json(metadata): Json<serde_json::Value>,
    ) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        if fake.fail_upload.load(Ordering::Relaxed) {
            return (StatusCode::INTERNAL_SERVER_ERROR, "backendError").into_response();
        }
        fake.sessions.lock().push((metadata, query));
        if fake.omit_location.load(Ordering::Relaxed) {
            return StatusCode::OK.into_response();
        }
        let location = format!("{}/upload/session/1", fake.base_url.lock());
        (StatusCode::OK, [("location", location)]).into_response()
    }

    async fn put_content(State(fake): State<Arc<FakeDrive>>, body: Bytes) -> Response {
        fake.uploads.lock().push(body);
        Json(serde_json::json!({ "id": "file-1" })).into_response()
    }

    struct Harness {
        fake: Arc<FakeDrive>,
        client: DriveClient,
        dir: TempDir,
        _key_file: NamedTempFile,
    }

    async fn harness(folder: Option<&str>) -> Harness {
        let fake = Arc::new(FakeDrive::default());
        let app = Router::new()
            .route("/token", post(token))
            .route("/drive/v3/about", get(about))
            .route("/upload/drive/v3/files", post(create_session))
            .route("/upload/session/1", put(put_content))
            .with_state(fake.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        *fake.base_url.lock() = base.clone();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let mut key_file = NamedTempFile::new().unwrap();
        write!(key_file, "{}", service_account_json(&format!("{}/token", base))).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            watched_dir: dir.path().to_path_buf(),
            credentials_file: key_file.path().to_path_buf(),
            drive_folder: folder.map(str::to_string),
            scopes: vec![DRIVE_SCOPE.to_string()],
            endpoints: DriveEndpoints {
                api_base: format!("{}/drive/v3", base),
                upload_base: format!("{}/upload/drive/v3", base),
            },
        };

        Harness {
            fake,
            client: DriveClient::new(&config).unwrap(),
            dir,
            _key_file: key_file,
        }
    }

    fn write_png(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_new_fails_on_missing_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            watched_dir: dir.path().to_path_buf(),
            credentials_file: dir.path().join("missing.json"),
            drive_folder: None,
            scopes: vec![DRIVE_SCOPE.to_string()],
            endpoints: DriveEndpoints::default(),
        };

        let err = DriveClient::new(&config).err().unwrap();
        assert!(matches!(err, DriveError::Credentials(_)));
    }

    #[tokio::test]
    async fn test_check_authorization_success() {
        let h = harness(None).await;

        match h.client.check_authorization().await {
            AuthorizationOutcome::Authorized(info) => {
                assert_eq!(info.email, "uploader@demo-project.iam.gserviceaccount.com");
                assert_eq!(info.quota_limit, Some(1000));
                assert_eq!(info.quota_usage, 250);
            }
            AuthorizationOutcome::Failed(e) => panic!("unexpected failure: {}", e),
        }
    }

    #[tokio::test]
    async fn test_check_authorization_failure_is_not_fatal() {
        let h = harness(None).await;
        h.fake.fail_about.store(true, Ordering::Relaxed);

        let outcome = h.client.check_authorization().await;
        assert!(matches!(
            outcome,
            AuthorizationOutcome::Failed(DriveError::Status { status: 403, .. })
        ));

        // 授权检查失败后客户端仍可上传
        let path = write_png(h.dir.path(), "report.png", b"png-bytes");
        assert_eq!(h.client.upload(&path).await.as_deref(), Some("file-1"));
    }

    #[tokio::test]
    async fn test_upload_sends_metadata_and_content() {
        let h = harness(Some("folder-9")).await;
        let path = write_png(h.dir.path(), "report.png", b"\x89PNG fake image");

        let id = h.client.upload(&path).await;
        assert_eq!(id.as_deref(), Some("file-1"));

        let sessions = h.fake.sessions.lock();
        assert_eq!(sessions.len(), 1);
        let (metadata, query) = &sessions[0];
        assert_eq!(
            metadata,
            &serde_json::json!({ "name": "report.png", "parents": ["folder-9"] })
        );
        assert_eq!(query.get("uploadType").map(String::as_str), Some("resumable"));

        let uploads = h.fake.uploads.lock();
        assert_eq!(uploads.len(), 1);
        assert_eq!(&uploads[0][..], b"\x89PNG fake image");
    }

    #[tokio::test]
    async fn test_upload_without_folder() {
        let h = harness(None).await;
        let path = write_png(h.dir.path(), "chart.png", b"data");

        assert!(h.client.upload(&path).await.is_some());
        let sessions = h.fake.sessions.lock();
        assert_eq!(sessions[0].0, serde_json::json!({ "name": "chart.png" }));
    }

    #[tokio::test]
    async fn test_upload_remote_error_returns_none() {
        let h = harness(None).await;
        h.fake.fail_upload.store(true, Ordering::Relaxed);
        let path = write_png(h.dir.path(), "report.png", b"data");

        assert_eq!(h.client.upload(&path).await, None);
        assert!(h.fake.uploads.lock().is_empty());

        let err = h.client.try_upload(&path).await.unwrap_err();
        assert!(matches!(err, DriveError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_upload_missing_session_uri() {
        let h = harness(None).await;
        h.fake.omit_location.store(true, Ordering::Relaxed);
        let path = write_png(h.dir.path(), "report.png", b"data");

        let err = h.client.try_upload(&path).await.unwrap_err();
        assert!(matches!(err, DriveError::MissingUploadSession));
    }

    #[tokio::test]
    async fn test_upload_missing_file_returns_none() {
        let h = harness(None).await;
        let path = h.dir.path().join("gone.png");

        assert_eq!(h.client.upload(&path).await, None);
        assert!(h.fake.sessions.lock().is_empty());
    }
}
