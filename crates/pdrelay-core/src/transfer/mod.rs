//! 文件传输模块
//!
//! 包含:
//! - 暂存目录（运行结束时自动清理）
//! - HTTP 下载器
//! - ZIP 打包
//! - 上传抽象
//!
//! 下载、打包、上传都以 trait 形式暴露，生产实现之外可以换成测试替身。

pub mod archiver;
pub mod fetcher;
pub mod staging;

pub use archiver::ZipArchiver;
pub use fetcher::HttpFetcher;
pub use staging::{StagingArea, sanitize_file_name};

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::RelayError;

/// 已下载到暂存目录的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    /// 本地文件名（已清理、去重）
    pub name: String,
}

/// 下载到指定路径，返回写入的字节数
///
/// 目标文件总是被完整重写。给出 `limit` 时，写入量一旦超过它就停止，
/// 此时返回值大于 `limit`，文件内容不完整，由调用方丢弃。
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        name: &str,
        url: &str,
        dest: &Path,
        limit: Option<u64>,
    ) -> Result<u64, RelayError>;
}

/// 把多个暂存文件打成一个压缩包，返回压缩包大小
#[async_trait]
pub trait Archiver: Send + Sync {
    async fn archive(&self, files: &[StagedFile], dest: &Path) -> Result<u64, RelayError>;
}

/// 以附件形式上传一个文件
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        path: &Path,
        file_name: &str,
        caption: Option<&str>,
    ) -> Result<(), RelayError>;
}
