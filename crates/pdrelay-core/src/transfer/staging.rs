//! 暂存目录
//!
//! 每次运行独占一个临时目录，`StagingArea` 被丢弃时递归删除，
//! 成功和失败路径都一样。

use log::{debug, warn};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::RelayError;

/// 本地文件名的最大字节数
const MAX_NAME_BYTES: usize = 200;

/// 清理远端文件名，保证结果只是一个路径组件
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return "file".to_string();
    }

    if cleaned.len() <= MAX_NAME_BYTES {
        return cleaned.to_string();
    }

    // 截断时尽量保留扩展名
    let (stem, ext) = match cleaned.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= 16 => (stem, Some(ext)),
        _ => (cleaned, None),
    };
    let budget = MAX_NAME_BYTES - ext.map_or(0, |e| e.len() + 1);
    let mut cut = budget.min(stem.len());
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    match ext {
        Some(ext) => format!("{}.{}", &stem[..cut], ext),
        None => stem[..cut].to_string(),
    }
}

/// 运行期间独占的临时目录
pub struct StagingArea {
    dir: TempDir,
    used: HashSet<String>,
}

impl StagingArea {
    /// 在 `root`（默认系统临时目录）下创建
    pub fn create(root: Option<&Path>) -> Result<Self, RelayError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pdrelay-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        debug!("Created staging area {:?}", dir.path());

        Ok(Self {
            dir,
            used: HashSet::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// 为远端文件名分配一个唯一的本地路径
    ///
    /// 重名时追加 ` (n)`。返回 (路径, 本地文件名)。
    pub fn reserve(&mut self, remote_name: &str) -> (PathBuf, String) {
        let base = sanitize_file_name(remote_name);
        let mut candidate = base.clone();
        let mut n = 1;

        while self.used.contains(&candidate) {
            candidate = match base.rsplit_once('.') {
                Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({n}).{ext}"),
                _ => format!("{base} ({n})"),
            };
            n += 1;
        }

        self.used.insert(candidate.clone());
        (self.dir.path().join(&candidate), candidate)
    }

    /// 丢弃一个暂存文件，文件不存在时不报错
    pub fn discard(&self, path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => debug!("Discarded {:?}", path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to discard {:?}: {}", path, e),
        }
    }

    /// 显式清理；目录已不存在时不报错
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Removed staging area {:?}", path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staging area {:?}: {}", path, e),
        }
    }
}
