//! Google Drive 存储客户端
//!
//! - 服务账号凭据加载
//! - jwt-bearer 访问令牌交换与缓存
//! - 授权检查与可续传单文件上传

mod client;
mod credentials;
mod error;
mod model;
mod token;
mod traits;

pub use client::{AuthorizationOutcome, DriveClient};
pub use traits::Uploader;
