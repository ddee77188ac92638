//! 元数据解析
//!
//! 包含:
//! - 文件/文件夹元数据类型
//! - [`MetadataSource`] 抽象，便于测试时替换
//! - pixeldrain API 客户端

pub mod disposition;
pub mod pixeldrain;

pub use pixeldrain::PixeldrainClient;

use async_trait::async_trait;

use crate::error::RelayError;

/// 单个远程文件的元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub id: String,
    /// 显示名称（来自远端，未清理）
    pub name: String,
    /// 字节数，探测失败时为 `None`
    pub size: Option<u64>,
    /// 直接下载地址
    pub source_url: String,
}

/// 文件夹成员列表（保持远端顺序）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderListing {
    pub id: String,
    pub title: Option<String>,
    /// 文件夹页面地址
    pub page_url: String,
    pub files: Vec<FileMeta>,
}

impl FolderListing {
    /// 已知大小之和；未报告大小的成员按 0 计
    pub fn total_size_bytes(&self) -> u64 {
        self.files.iter().filter_map(|f| f.size).sum()
    }

    /// 未报告大小的成员数量
    pub fn unknown_sizes(&self) -> usize {
        self.files.iter().filter(|f| f.size.is_none()).count()
    }
}

/// 解析后的资源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    File(FileMeta),
    Folder(FolderListing),
}

/// 远程元数据来源
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// 只取元数据不下载内容；探测失败时降级为未知大小和合成名称
    async fn probe_file(&self, id: &str) -> FileMeta;

    /// 获取文件夹成员列表
    async fn list_folder(&self, id: &str) -> Result<FolderListing, RelayError>;
}
