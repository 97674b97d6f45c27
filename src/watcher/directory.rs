//! 目录监听器
//!
//! 订阅后进入 Idle，逐个处理事件直至收到取消信号，随后退订并进入 Stopped

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::handler::FileEventHandler;
use super::source::WatchSource;

/// 监听器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// 已订阅，等待事件
    Idle,
    /// 已退订（终态）
    Stopped,
}

pub struct DirectoryWatcher {
    dir: PathBuf,
    source: Mutex<Box<dyn WatchSource>>,
    handler: Arc<dyn FileEventHandler>,
    /// None 表示尚未订阅
    state: Mutex<Option<WatcherState>>,
}

impl DirectoryWatcher {
    pub fn new(
        dir: impl Into<PathBuf>,
        source: Box<dyn WatchSource>,
        handler: Arc<dyn FileEventHandler>,
    ) -> Self {
        Self {
            dir: dir.into(),
            source: Mutex::new(source),
            handler,
            state: Mutex::new(None),
        }
    }

    pub fn state(&self) -> Option<WatcherState> {
        *self.state.lock()
    }

    /// 运行监听循环，直到 `cancel` 被触发
    ///
    /// 事件按到达顺序处理，前一个事件（含上传）完成后才处理下一个；
    /// 正在进行的上传不会被取消
    pub async fn run(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        if self.state().is_some() {
            anyhow::bail!("监听器只能运行一次");
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        self.source.lock().subscribe(&self.dir, tx)?;
        *self.state.lock() = Some(WatcherState::Idle);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => self.handler.handle(event).await,
                    None => {
                        tracing::error!("事件源已关闭，等待退出信号");
                        cancel.cancelled().await;
                        break;
                    }
                },
            }
        }

        // 退订失败不影响正常退出
        if let Err(e) = self.source.lock().unsubscribe() {
            tracing::warn!("退订事件源失败: {:#}", e);
        }
        *self.state.lock() = Some(WatcherState::Stopped);
        tracing::info!("监听已停止");
        Ok(())
    }
}
