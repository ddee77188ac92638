//! 传输预算判定
//!
//! 两阶段检查：
//! 1. 传输前用探测到的大小（或文件夹估算）选择方案
//! 2. 下载/打包之后用实际大小复核
//!
//! 预检只是建议性的：压缩率未知，远端也可能不报告大小。

use log::{debug, warn};
use std::fmt;

use crate::source::{FileMeta, FolderListing, Resource};

/// 降级为链接的目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackTarget {
    File(FileMeta),
    Folder(FolderListing),
}

impl FallbackTarget {
    /// 需要发送链接的条目（保持原顺序）
    pub fn items(&self) -> &[FileMeta] {
        match self {
            FallbackTarget::File(meta) => std::slice::from_ref(meta),
            FallbackTarget::Folder(listing) => &listing.files,
        }
    }
}

/// 降级原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// 预检大小超出预算
    TooLarge { size: u64, max: u64 },
    /// 下载后的实际大小超出预算
    DownloadTooLarge { size: u64, max: u64 },
    /// 压缩包实际大小超出预算
    ArchiveTooLarge { size: u64, max: u64 },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::TooLarge { size, max } => write!(
                f,
                "too large to auto-upload ({} > {})",
                format_size(*size),
                format_size(*max)
            ),
            FallbackReason::DownloadTooLarge { size, max } => write!(
                f,
                "too large to auto-upload after download ({} > {})",
                format_size(*size),
                format_size(*max)
            ),
            FallbackReason::ArchiveTooLarge { size, max } => write!(
                f,
                "archive too large to auto-upload ({} > {})",
                format_size(*size),
                format_size(*max)
            ),
        }
    }
}

/// 传输方案，每次运行只选择一次
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferPlan {
    Direct(FileMeta),
    Archive(FolderListing),
    LinkFallback {
        target: FallbackTarget,
        reason: FallbackReason,
    },
}

/// 传输后复核的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Downloaded,
    Archived,
}

/// 预算闸门
#[derive(Debug, Clone, Copy)]
pub struct BudgetGate {
    max_bytes: u64,
}

impl BudgetGate {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// 根据预检信息选择方案
    pub fn plan(&self, resource: Resource) -> TransferPlan {
        let max = self.max_bytes;
        match resource {
            Resource::File(meta) => match meta.size {
                Some(size) if size > max => TransferPlan::LinkFallback {
                    target: FallbackTarget::File(meta),
                    reason: FallbackReason::TooLarge { size, max },
                },
                Some(_) => TransferPlan::Direct(meta),
                None => {
                    debug!("Size of {} unknown, attempting direct transfer", meta.name);
                    TransferPlan::Direct(meta)
                }
            },
            Resource::Folder(listing) => {
                let unknown = listing.unknown_sizes();
                if unknown > 0 {
                    warn!(
                        "{} member(s) of folder {} have no reported size, counted as 0",
                        unknown, listing.id
                    );
                }
                let total = listing.total_size_bytes();
                if total > max {
                    TransferPlan::LinkFallback {
                        target: FallbackTarget::Folder(listing),
                        reason: FallbackReason::TooLarge { size: total, max },
                    }
                } else {
                    TransferPlan::Archive(listing)
                }
            }
        }
    }

    /// 用实际大小复核
    pub fn check_actual(&self, checkpoint: Checkpoint, size: u64) -> Result<(), FallbackReason> {
        if size <= self.max_bytes {
            return Ok(());
        }
        let max = self.max_bytes;
        Err(match checkpoint {
            Checkpoint::Downloaded => FallbackReason::DownloadTooLarge { size, max },
            Checkpoint::Archived => FallbackReason::ArchiveTooLarge { size, max },
        })
    }
}

/// 可读的字节数
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(size: Option<u64>) -> FileMeta {
        FileMeta {
            id: "abc".to_string(),
            name: "a.bin".to_string(),
            size,
            source_url: "https://pixeldrain.com/api/file/abc?download".to_string(),
        }
    }

    fn folder(sizes: &[Option<u64>]) -> FolderListing {
        FolderListing {
            id: "f".to_string(),
            title: None,
            page_url: "https://pixeldrain.com/l/f".to_string(),
            files: sizes.iter().map(|s| file(*s)).collect(),
        }
    }

    #[test]
    fn test_file_plans() {
        let gate = BudgetGate::new(1000);

        assert!(matches!(gate.plan(Resource::File(file(Some(500)))), TransferPlan::Direct(_)));
        assert!(matches!(gate.plan(Resource::File(file(Some(1000)))), TransferPlan::Direct(_)));
        assert!(matches!(gate.plan(Resource::File(file(None))), TransferPlan::Direct(_)));

        match gate.plan(Resource::File(file(Some(1001)))) {
            TransferPlan::LinkFallback { target, reason } => {
                assert_eq!(target.items().len(), 1);
                assert_eq!(reason, FallbackReason::TooLarge { size: 1001, max: 1000 });
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn test_folder_plans() {
        let gate = BudgetGate::new(1000);

        // 未知大小按 0 计
        assert!(matches!(
            gate.plan(Resource::Folder(folder(&[Some(600), None, Some(400)]))),
            TransferPlan::Archive(_)
        ));

        match gate.plan(Resource::Folder(folder(&[Some(600), Some(401)]))) {
            TransferPlan::LinkFallback { target, reason } => {
                assert_eq!(target.items().len(), 2);
                assert_eq!(reason, FallbackReason::TooLarge { size: 1001, max: 1000 });
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn test_check_actual() {
        let gate = BudgetGate::new(1000);
        assert!(gate.check_actual(Checkpoint::Downloaded, 1000).is_ok());
        assert_eq!(
            gate.check_actual(Checkpoint::Downloaded, 1001),
            Err(FallbackReason::DownloadTooLarge { size: 1001, max: 1000 })
        );
        assert_eq!(
            gate.check_actual(Checkpoint::Archived, 5000),
            Err(FallbackReason::ArchiveTooLarge { size: 5000, max: 1000 })
        );
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(1_900_000_000), "1.8 GiB");
    }
}
