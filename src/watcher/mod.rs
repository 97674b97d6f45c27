//! 目录监听
//!
//! 非递归监听单个目录，原始文件被修改且同名 PNG 已存在时触发上传
//!
//! # 使用方式
//!
//! ```rust,ignore
//! let handler = Arc::new(PngUploadHandler::new(drive_client));
//! let watcher = DirectoryWatcher::new(dir, Box::new(NotifyWatchSource::new()), handler);
//! watcher.run(cancel).await?;
//! ```

mod directory;
mod event;
mod handler;
mod source;

pub use directory::DirectoryWatcher;
pub use handler::PngUploadHandler;
pub use source::NotifyWatchSource;
