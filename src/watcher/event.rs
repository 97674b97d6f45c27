//! 文件系统事件

use std::path::PathBuf;

use notify::event::{EventKind, ModifyKind};

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Created,
    Modified,
    Deleted,
    Moved,
    Other,
}

impl From<&EventKind> for FileEventKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => FileEventKind::Created,
            EventKind::Modify(ModifyKind::Name(_)) => FileEventKind::Moved,
            EventKind::Modify(_) => FileEventKind::Modified,
            EventKind::Remove(_) => FileEventKind::Deleted,
            _ => FileEventKind::Other,
        }
    }
}

/// 单个路径上的文件系统事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub is_directory: bool,
    pub kind: FileEventKind,
}

impl FileEvent {
    pub fn new(path: impl Into<PathBuf>, kind: FileEventKind) -> Self {
        let path = path.into();
        // 不跟随符号链接，指向目录的链接按普通文件处理
        let is_directory = std::fs::symlink_metadata(&path)
            .map(|m| m.is_dir())
            .unwrap_or(false);
        Self {
            path,
            is_directory,
            kind,
        }
    }

    /// 将 notify 事件拆分为逐路径事件
    ///
    /// 目录判断在转换时完成，路径已被删除时视为普通文件
    pub fn from_notify(event: &notify::Event) -> Vec<Self> {
        let kind = FileEventKind::from(&event.kind);
        event
            .paths
            .iter()
            .map(|path| Self::new(path.clone(), kind))
            .collect()
    }
}
