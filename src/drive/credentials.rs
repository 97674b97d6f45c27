//! 服务账号凭据
//!
//! 兼容 Google Cloud 控制台导出的 service account JSON 格式

use std::path::Path;

use jsonwebtoken::EncodingKey;
use serde::Deserialize;

use super::error::{DriveError, DriveResult};

/// 默认令牌端点
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const SERVICE_ACCOUNT_TYPE: &str = "service_account";

/// 服务账号密钥
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

// 私钥不进日志
impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// 从文件加载凭据
    pub fn load(path: impl AsRef<Path>) -> DriveResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DriveError::Credentials(format!("读取 {} 失败: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// 从 JSON 字符串解析凭据
    pub fn from_json(content: &str) -> DriveResult<Self> {
        let key: Self = serde_json::from_str(content)
            .map_err(|e| DriveError::Credentials(format!("JSON 格式错误: {}", e)))?;

        if key.key_type != SERVICE_ACCOUNT_TYPE {
            return Err(DriveError::Credentials(format!(
                "不支持的凭据类型: {}",
                key.key_type
            )));
        }
        if key.client_email.trim().is_empty() {
            return Err(DriveError::Credentials("client_email 为空".to_string()));
        }

        Ok(key)
    }

    /// 构建 RS256 签名密钥
    pub fn encoding_key(&self) -> DriveResult<EncodingKey> {
        Ok(EncodingKey::from_rsa_pem(self.private_key.as_bytes())?)
    }
}
