//! Drive API 数据结构

use serde::{Deserialize, Serialize};

/// `about.get` 响应（fields=user,storageQuota）
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct About {
    pub user: DriveUser,
    pub storage_quota: StorageQuota,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveUser {
    pub email_address: String,
}

/// 存储配额
///
/// API 以字符串返回 int64；`limit` 缺失表示不限容量
#[derive(Debug, Clone, Deserialize)]
pub struct StorageQuota {
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub usage: Option<String>,
}

impl StorageQuota {
    pub fn limit_bytes(&self) -> Option<u64> {
        self.limit.as_deref().and_then(|v| v.parse().ok())
    }

    pub fn usage_bytes(&self) -> u64 {
        self.usage
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}

/// 授权检查通过后的账号信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub email: String,
    /// None 表示不限容量
    pub quota_limit: Option<u64>,
    pub quota_usage: u64,
}

impl From<About> for AccountInfo {
    fn from(about: About) -> Self {
        Self {
            quota_limit: about.storage_quota.limit_bytes(),
            quota_usage: about.storage_quota.usage_bytes(),
            email: about.user.email_address,
        }
    }
}

/// 新建文件的元数据
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

/// `files.create` 响应（fields=id）
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedFile {
    pub id: String,
}
