//! Drive 远程边界的错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriveError {
    /// 凭据文件缺失、格式错误或私钥无效
    #[error("凭据无效: {0}")]
    Credentials(String),
    /// 访问令牌交换失败
    #[error("获取访问令牌失败: {0}")]
    Token(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// 远程接口返回非成功状态码
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// 可续传上传未返回会话地址
    #[error("上传会话响应缺少 Location 头")]
    MissingUploadSession,
    #[error("响应解析失败: {0}")]
    Decode(String),
}

pub type DriveResult<T> = Result<T, DriveError>;

impl From<jsonwebtoken::errors::Error> for DriveError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        DriveError::Credentials(err.to_string())
    }
}
