//! 事件处理
//!
//! 外部程序先写出原始文件，再生成同名 `.png`；监听到原始文件被修改时，
//! 若同名 PNG 已存在则上传该 PNG

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::drive::Uploader;

use super::event::{FileEvent, FileEventKind};

const DERIVED_EXTENSION: &str = "png";

/// 文件系统事件处理器
#[async_trait]
pub trait FileEventHandler: Send + Sync {
    /// 处理单个事件，必须自行消化所有错误
    async fn handle(&self, event: FileEvent);
}

/// 派生路径：把扩展名替换为 `.png`，无扩展名时直接追加
pub fn derive_png_path(path: &Path) -> PathBuf {
    path.with_extension(DERIVED_EXTENSION)
}

/// 修改事件触发同名 PNG 上传
pub struct PngUploadHandler {
    uploader: Arc<dyn Uploader>,
}

impl PngUploadHandler {
    pub fn new(uploader: Arc<dyn Uploader>) -> Self {
        Self { uploader }
    }
}

#[async_trait]
impl FileEventHandler for PngUploadHandler {
    async fn handle(&self, event: FileEvent) {
        if event.is_directory {
            return;
        }
        if event.kind != FileEventKind::Modified {
            return;
        }

        // 检查与上传之间 PNG 可能仍在写入，此处不做额外等待
        let derived = derive_png_path(&event.path);
        if !tokio::fs::try_exists(&derived).await.unwrap_or(false) {
            tracing::debug!("未找到 {}，忽略事件", derived.display());
            return;
        }

        tracing::info!("发现新文件: {}", derived.display());
        if self.uploader.upload(&derived).await.is_none() {
            tracing::warn!("文件未上传: {}", derived.display());
        }
    }
}
