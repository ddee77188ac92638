//! 错误类型
//!
//! 整个中继流程共用一个错误枚举，CLI 根据它决定退出码和是否还能通知用户。

use thiserror::Error;

/// 中继流程中的错误
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("missing required configuration value: {0}")]
    ConfigMissing(&'static str),
    #[error("invalid configuration value for {name}: {reason}")]
    ConfigInvalid { name: &'static str, reason: String },
    #[error("unrecognized pixeldrain link: {0}")]
    UnrecognizedLink(String),
    #[error("failed to fetch folder {id}: {reason}")]
    FolderFetchFailed { id: String, reason: String },
    #[error("folder {0} does not contain any files")]
    EmptyFolder(String),
    #[error("staging area error: {0}")]
    StagingFailed(#[from] std::io::Error),
    #[error("failed to download {name} from {url}: {reason}")]
    DownloadFailed {
        name: String,
        url: String,
        reason: String,
    },
    #[error("failed to create archive {name}: {reason}")]
    ArchiveFailed { name: String, reason: String },
    #[error("failed to upload {name}: {reason}")]
    UploadFailed { name: String, reason: String },
    #[error("failed to deliver message: {0}")]
    NotifyFailed(String),
    #[error("failed to build HTTP client: {0}")]
    ClientSetup(#[source] reqwest::Error),
}

impl RelayError {
    /// 是否可以通过消息通道告知用户
    ///
    /// 配置错误发生在通道建立之前，只能写到 stderr。
    pub fn is_notifiable(&self) -> bool {
        !matches!(
            self,
            RelayError::ConfigMissing(_) | RelayError::ConfigInvalid { .. }
        )
    }
}

/// 把 reqwest 错误转成字符串，去掉 URL（Telegram 的 URL 里带着 bot token）
pub(crate) fn transport_reason(err: reqwest::Error) -> String {
    err.without_url().to_string()
}
