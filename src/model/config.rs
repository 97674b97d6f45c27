//! 运行配置
//!
//! 启动时从环境变量构建一次，之后按引用传入各组件

use std::path::PathBuf;

use anyhow::{Context, bail};

/// 被监听目录
pub const WATCHED_DIR_ENV: &str = "WATCHED_DIR";
/// 服务账号凭据文件
pub const CREDENTIALS_FILE_ENV: &str = "CREDENTIALS_FILE";
/// 上传目标文件夹 ID
pub const DRIVE_FOLDER_ENV: &str = "DRIVE_FOLDER";

/// Drive 读写权限
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Drive API 地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveEndpoints {
    /// 元数据接口，例如 about
    pub api_base: String,
    /// 上传接口
    pub upload_base: String,
}

impl Default for DriveEndpoints {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base: "https://www.googleapis.com/upload/drive/v3".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// 被监听目录（非递归）
    pub watched_dir: PathBuf,
    /// 服务账号凭据文件路径
    pub credentials_file: PathBuf,
    /// 上传目标文件夹，未设置时上传到账号根目录
    pub drive_folder: Option<String>,
    /// OAuth 权限范围
    pub scopes: Vec<String>,
    pub endpoints: DriveEndpoints,
}

impl Config {
    /// 从进程环境变量加载配置
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 使用给定的查找函数加载配置
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let watched_dir = require(&lookup, WATCHED_DIR_ENV).map(PathBuf::from)?;
        if !watched_dir.is_dir() {
            bail!(
                "{} 指向的目录不存在: {}",
                WATCHED_DIR_ENV,
                watched_dir.display()
            );
        }

        let credentials_file = require(&lookup, CREDENTIALS_FILE_ENV).map(PathBuf::from)?;

        let drive_folder = lookup(DRIVE_FOLDER_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let config = Self {
            watched_dir,
            credentials_file,
            drive_folder,
            scopes: vec![DRIVE_SCOPE.to_string()],
            endpoints: DriveEndpoints::default(),
        };
        config.validate_scopes()?;

        Ok(config)
    }

    /// 权限范围必须非空且均为 https URL
    pub fn validate_scopes(&self) -> anyhow::Result<()> {
        if self.scopes.is_empty() {
            bail!("未配置任何 OAuth scope");
        }
        for scope in &self.scopes {
            if !scope.starts_with("https://") || scope.contains(char::is_whitespace) {
                bail!("无效的 OAuth scope: {:?}", scope);
            }
        }
        Ok(())
    }
}

fn require<F>(lookup: &F, key: &str) -> anyhow::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("缺少环境变量 {}", key))
}
