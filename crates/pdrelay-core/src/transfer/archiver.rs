//! ZIP 打包
//!
//! 扁平结构，条目名即暂存文件名。zip 写入是同步的，放到 blocking 线程执行。

use async_trait::async_trait;
use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{Archiver, StagedFile};
use crate::error::RelayError;

/// ZIP 打包器
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

impl ZipArchiver {
    pub fn new() -> Self {
        Self
    }
}

fn write_zip(files: &[StagedFile], dest: &Path) -> zip::result::ZipResult<u64> {
    let out = File::create(dest)?;
    let mut zip = zip::ZipWriter::new(BufWriter::new(out));

    for file in files {
        let mut input = File::open(&file.path)?;
        let len = input.metadata()?.len();
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .large_file(len > u64::from(u32::MAX));

        debug!("Adding {} ({} bytes) to archive", file.name, len);
        zip.start_file(file.name.as_str(), options)?;
        std::io::copy(&mut input, &mut zip)?;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    drop(writer);

    Ok(std::fs::metadata(dest)?.len())
}

#[async_trait]
impl Archiver for ZipArchiver {
    async fn archive(&self, files: &[StagedFile], dest: &Path) -> Result<u64, RelayError> {
        let archive_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "archive.zip".to_string());
        let failed = |reason: String| RelayError::ArchiveFailed {
            name: archive_name.clone(),
            reason,
        };

        let owned_files = files.to_vec();
        let owned_dest: PathBuf = dest.to_path_buf();
        let size = tokio::task::spawn_blocking(move || write_zip(&owned_files, &owned_dest))
            .await
            .map_err(|e| failed(format!("archiver task aborted: {e}")))?
            .map_err(|e| failed(e.to_string()))?;

        info!("Created {} with {} file(s), {} bytes", archive_name, files.len(), size);
        Ok(size)
    }
}
