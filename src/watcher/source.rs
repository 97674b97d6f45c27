//! 文件系统事件源
//!
//! 监听机制本身作为可替换的外部协作者，默认实现基于 notify

use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;

use super::event::FileEvent;

/// 事件源抽象
///
/// 订阅后事件在后台线程产生，通过通道投递给监听循环
pub trait WatchSource: Send {
    /// 非递归订阅目录
    fn subscribe(
        &mut self,
        dir: &Path,
        events: UnboundedSender<FileEvent>,
    ) -> anyhow::Result<()>;

    /// 取消订阅并释放底层资源
    fn unsubscribe(&mut self) -> anyhow::Result<()>;
}

/// 基于操作系统通知（inotify / FSEvents / ReadDirectoryChangesW）的事件源
#[derive(Default)]
pub struct NotifyWatchSource {
    watcher: Option<RecommendedWatcher>,
    dir: Option<PathBuf>,
}

impl NotifyWatchSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WatchSource for NotifyWatchSource {
    fn subscribe(
        &mut self,
        dir: &Path,
        events: UnboundedSender<FileEvent>,
    ) -> anyhow::Result<()> {
        let mut watcher = notify::recommended_watcher(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    for file_event in FileEvent::from_notify(&event) {
                        // 接收端已关闭说明监听循环已退出
                        if events.send(file_event).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => tracing::warn!("文件监听错误: {}", e),
            },
        )?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        tracing::info!("开始监听目录: {}", dir.display());
        self.watcher = Some(watcher);
        self.dir = Some(dir.to_path_buf());
        Ok(())
    }

    fn unsubscribe(&mut self) -> anyhow::Result<()> {
        if let (Some(mut watcher), Some(dir)) = (self.watcher.take(), self.dir.take()) {
            // 目录被删除后内核已自动移除监听，unwatch 会报 WatchNotFound
            if let Err(e) = watcher.unwatch(&dir) {
                tracing::warn!("取消监听 {} 失败: {}", dir.display(), e);
            }
            drop(watcher);
            tracing::info!("已停止监听目录: {}", dir.display());
        }
        Ok(())
    }
}
