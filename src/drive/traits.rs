//! 上传 trait 定义

use std::path::Path;

use async_trait::async_trait;

/// 单文件上传抽象
///
/// 监听器只依赖该 trait，测试中可替换为记录调用的实现
#[async_trait]
pub trait Uploader: Send + Sync {
    /// 上传单个文件
    ///
    /// 成功返回远程对象 ID；任何失败均已在内部记录日志并返回 None
    async fn upload(&self, path: &Path) -> Option<String>;
}
