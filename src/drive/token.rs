//! 访问令牌管理
//!
//! 使用服务账号私钥签发 JWT，通过 jwt-bearer 授权换取访问令牌，
//! 并在过期前复用

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::credentials::ServiceAccountKey;
use super::error::{DriveError, DriveResult};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// 断言有效期（秒），Google 允许的上限
const ASSERTION_TTL_SECS: i64 = 3600;

/// 距离过期不足该秒数时提前刷新
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// 服务账号令牌提供者
pub struct TokenProvider {
    http: reqwest::Client,
    client_email: String,
    key_id: Option<String>,
    token_uri: String,
    scope: String,
    signing_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// 创建令牌提供者
    ///
    /// 私钥在此解析，格式错误时立即失败
    pub fn new(
        http: reqwest::Client,
        key: &ServiceAccountKey,
        scopes: &[String],
    ) -> DriveResult<Self> {
        Ok(Self {
            http,
            client_email: key.client_email.clone(),
            key_id: key.private_key_id.clone(),
            token_uri: key.token_uri.clone(),
            scope: scopes.join(" "),
            signing_key: key.encoding_key()?,
            cached: Mutex::new(None),
        })
    }

    /// 服务账号邮箱
    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// 获取有效的访问令牌，必要时刷新
    pub async fn access_token(&self) -> DriveResult<String> {
        let cached = self.cached.lock().clone();
        if let Some(token) = cached.filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.value);
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *self.cached.lock() = Some(token);
        Ok(value)
    }

    /// 签发 JWT 断言
    fn sign_assertion(&self, now: DateTime<Utc>) -> DriveResult<String> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: self.scope.clone(),
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_TTL_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();

        encode(&header, &claims, &self.signing_key)
            .map_err(|e| DriveError::Token(format!("JWT 签名失败: {}", e)))
    }

    async fn fetch_token(&self) -> DriveResult<CachedToken> {
        let now = Utc::now();
        let assertion = self.sign_assertion(now)?;

        tracing::debug!("正在获取访问令牌: {}", self.client_email);

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| DriveError::Token(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::Token(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let data: TokenResponse = response
            .json()
            .await
            .map_err(|e| DriveError::Token(format!("响应解析失败: {}", e)))?;

        // 服务端返回的有效期不可信，限制在断言有效期之内
        let expires_in = data
            .expires_in
            .unwrap_or(ASSERTION_TTL_SECS)
            .clamp(1, ASSERTION_TTL_SECS);
        let expires_at = Duration::try_seconds(expires_in)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| DriveError::Token(format!("无效的有效期: {} 秒", expires_in)))?;
        tracing::debug!("访问令牌已刷新，有效期 {} 秒", expires_in);

        Ok(CachedToken {
            value: data.access_token,
            expires_at,
        })
    }
}
