//! 链接分类
//!
//! 识别 pixeldrain 的单文件链接 (`/u/<id>`) 和文件夹链接 (`/l/<id>`)。
//! 协议和主机名不区分大小写，ID 区分大小写。

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::error::RelayError;

static FILE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:https?://(?:www\.)?pixeldrain\.(?:com|net))/u/([A-Za-z0-9_-]+)/?(?:[?#].*)?$")
        .expect("file link pattern is valid")
});

static FOLDER_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:https?://(?:www\.)?pixeldrain\.(?:com|net))/l/([A-Za-z0-9_-]+)/?(?:[?#].*)?$")
        .expect("folder link pattern is valid")
});

/// 资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    File,
    Folder,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::File => write!(f, "file"),
            ResourceKind::Folder => write!(f, "folder"),
        }
    }
}

/// 从输入链接解析出的资源引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
}

impl ResourceRef {
    /// 解析链接，两种模式都不匹配时返回 `UnrecognizedLink`
    pub fn classify(link: &str) -> Result<Self, RelayError> {
        let link = link.trim();

        if let Some(caps) = FILE_LINK.captures(link) {
            return Ok(Self {
                kind: ResourceKind::File,
                id: caps[1].to_string(),
            });
        }

        if let Some(caps) = FOLDER_LINK.captures(link) {
            return Ok(Self {
                kind: ResourceKind::Folder,
                id: caps[1].to_string(),
            });
        }

        Err(RelayError::UnrecognizedLink(link.to_string()))
    }
}
