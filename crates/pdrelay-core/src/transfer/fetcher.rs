//! HTTP 下载器

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::Fetcher;
use crate::error::{RelayError, transport_reason};

/// 基于 reqwest 的流式下载器
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn download(&self, url: &str, dest: &Path, limit: Option<u64>) -> Result<u64, String> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_reason)?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("server returned {status}"));
        }

        // File::create 会截断已有文件
        let mut file = File::create(dest).await.map_err(|e| e.to_string())?;
        let mut written: u64 = 0;

        while let Some(chunk) = response.chunk().await.map_err(transport_reason)? {
            file.write_all(&chunk).await.map_err(|e| e.to_string())?;
            written += chunk.len() as u64;
            if let Some(limit) = limit
                && written > limit
            {
                debug!("Stopped after {} bytes, limit is {}", written, limit);
                break;
            }
        }
        file.flush().await.map_err(|e| e.to_string())?;

        Ok(written)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        name: &str,
        url: &str,
        dest: &Path,
        limit: Option<u64>,
    ) -> Result<u64, RelayError> {
        debug!("Downloading {} from {} to {:?}", name, url, dest);

        match self.download(url, dest, limit).await {
            Ok(written) => {
                info!("Downloaded {} ({} bytes)", name, written);
                Ok(written)
            }
            Err(reason) => {
                // 不留下半截文件
                let _ = tokio::fs::remove_file(dest).await;
                Err(RelayError::DownloadFailed {
                    name: name.to_string(),
                    url: url.to_string(),
                    reason,
                })
            }
        }
    }
}
