mod drive;
mod model;
mod watcher;

use std::sync::Arc;

use anyhow::Context;
use drive::{AuthorizationOutcome, DriveClient};
use model::config::Config;
use tokio_util::sync::CancellationToken;
use watcher::{DirectoryWatcher, NotifyWatchSource, PngUploadHandler};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // 加载配置
    let config = Config::from_env()?;
    tracing::info!("监听目录: {}", config.watched_dir.display());
    match &config.drive_folder {
        Some(folder) => tracing::info!("上传目标文件夹: {}", folder),
        None => tracing::warn!("未设置 DRIVE_FOLDER，文件将上传到账号根目录"),
    }

    // 创建 Drive 客户端，凭据错误直接退出
    let client = Arc::new(DriveClient::new(&config).context("初始化 Drive 客户端失败")?);

    // 授权检查失败不影响后续监听
    match client.check_authorization().await {
        AuthorizationOutcome::Authorized(info) => {
            tracing::debug!("授权账号: {}", info.email);
        }
        AuthorizationOutcome::Failed(e) => {
            tracing::warn!("授权检查未通过（{}），继续以 {} 运行", e, client.client_email());
        }
    }

    let handler = Arc::new(PngUploadHandler::new(client));
    let watcher = DirectoryWatcher::new(
        &config.watched_dir,
        Box::new(NotifyWatchSource::new()),
        handler,
    );

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    watcher.run(cancel).await
}

/// 等待 Ctrl-C 或 SIGTERM 后触发取消
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("注册 Ctrl-C 处理失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("注册 SIGTERM 处理失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("收到退出信号，正在停止");
    cancel.cancel();
}
