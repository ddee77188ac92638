//! pixeldrain API 客户端
//!
//! - `HEAD /api/file/{id}` 探测文件名和大小
//! - `GET /api/file/{id}?download` 下载内容
//! - `GET /api/list/{id}` 获取文件夹列表

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, HeaderMap};
use serde::Deserialize;

use super::{FileMeta, FolderListing, MetadataSource, disposition};
use crate::error::{RelayError, transport_reason};

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    title: Option<String>,
    files: Vec<ListEntry>,
}

#[derive(Deserialize)]
struct ListEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

/// pixeldrain 客户端
#[derive(Clone)]
pub struct PixeldrainClient {
    client: Client,
    base: String,
    name_prefix: String,
}

impl PixeldrainClient {
    pub fn new(client: Client, base: &str, name_prefix: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            name_prefix: name_prefix.to_string(),
        }
    }

    /// 文件直链
    pub fn file_url(&self, id: &str) -> String {
        format!("{}/api/file/{}?download", self.base, id)
    }

    pub fn list_url(&self, id: &str) -> String {
        format!("{}/api/list/{}", self.base, id)
    }

    /// 文件夹页面
    pub fn folder_page_url(&self, id: &str) -> String {
        format!("{}/l/{}", self.base, id)
    }

    /// 远端没有给出名称时使用的名称
    pub fn synthesized_name(&self, id: &str) -> String {
        format!("{}-{}", self.name_prefix, id)
    }

    fn meta_from_headers(&self, id: &str, headers: &HeaderMap) -> FileMeta {
        // HEAD 响应没有 body，必须读原始头而不是 body 长度
        let size = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let name = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition::file_name)
            .unwrap_or_else(|| self.synthesized_name(id));

        FileMeta {
            id: id.to_string(),
            name,
            size,
            source_url: self.file_url(id),
        }
    }

    fn unknown_meta(&self, id: &str) -> FileMeta {
        FileMeta {
            id: id.to_string(),
            name: self.synthesized_name(id),
            size: None,
            source_url: self.file_url(id),
        }
    }
}

#[async_trait]
impl MetadataSource for PixeldrainClient {
    async fn probe_file(&self, id: &str) -> FileMeta {
        let url = format!("{}/api/file/{}", self.base, id);
        debug!("Probing file metadata: {}", url);

        match self.client.head(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let meta = self.meta_from_headers(id, response.headers());
                info!("Probed {}: name={}, size={:?}", id, meta.name, meta.size);
                meta
            }
            Ok(response) => {
                warn!(
                    "Metadata probe for {} returned {}, size cannot be pre-validated",
                    id,
                    response.status()
                );
                self.unknown_meta(id)
            }
            Err(e) => {
                warn!(
                    "Metadata probe for {} failed: {}, size cannot be pre-validated",
                    id,
                    transport_reason(e)
                );
                self.unknown_meta(id)
            }
        }
    }

    async fn list_folder(&self, id: &str) -> Result<FolderListing, RelayError> {
        let url = self.list_url(id);
        debug!("Fetching folder listing: {}", url);

        let failed = |reason: String| RelayError::FolderFetchFailed {
            id: id.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| failed(transport_reason(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("server returned {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| failed(transport_reason(e)))?;
        let listing: ListResponse = serde_json::from_str(&body)
            .map_err(|e| failed(format!("malformed listing: {e}")))?;

        if listing.files.is_empty() {
            return Err(RelayError::EmptyFolder(id.to_string()));
        }

        let files: Vec<FileMeta> = listing
            .files
            .into_iter()
            .map(|entry| FileMeta {
                name: entry
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| self.synthesized_name(&entry.id)),
                size: entry.size,
                source_url: self.file_url(&entry.id),
                id: entry.id,
            })
            .collect();

        info!("Folder {} lists {} file(s)", id, files.len());

        Ok(FolderListing {
            id: id.to_string(),
            title: listing.title.filter(|t| !t.trim().is_empty()),
            page_url: self.folder_page_url(id),
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use httpmock::Method::HEAD;
    use reqwest::header::HeaderValue;

    fn client_for(server: &MockServer) -> PixeldrainClient {
        PixeldrainClient::new(Client::new(), &server.base_url(), "pixeldrain")
    }

    #[test]
    fn test_meta_from_headers() {
        let pd = PixeldrainClient::new(Client::new(), "https://pixeldrain.com/", "pixeldrain");
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("500"));
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"movie.mkv\""),
        );

        let meta = pd.meta_from_headers("abc123", &headers);
        assert_eq!(meta.name, "movie.mkv");
        assert_eq!(meta.size, Some(500));
        assert_eq!(meta.source_url, "https://pixeldrain.com/api/file/abc123?download");
    }

    #[test]
    fn test_meta_without_headers_is_synthesized() {
        let pd = PixeldrainClient::new(Client::new(), "https://pixeldrain.com", "pixeldrain");
        let meta = pd.meta_from_headers("abc123", &HeaderMap::new());
        assert_eq!(meta.name, "pixeldrain-abc123");
        assert_eq!(meta.size, None);
    }

    #[tokio::test]
    async fn test_probe_failure_degrades() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(HEAD).path("/api/file/gone");
            then.status(404);
        });

        let meta = client_for(&server).probe_file("gone").await;

        mock.assert();
        assert_eq!(meta.name, "pixeldrain-gone");
        assert_eq!(meta.size, None);
    }

    #[tokio::test]
    async fn test_probe_reads_disposition() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(HEAD).path("/api/file/abc");
            then.status(200)
                .header("Content-Disposition", "attachment; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf");
        });

        let meta = client_for(&server).probe_file("abc").await;
        assert_eq!(meta.name, "résumé.pdf");
    }

    #[tokio::test]
    async fn test_list_folder() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/list/fold1");
            then.status(200).json_body(serde_json::json!({
                "title": "Holiday",
                "files": [
                    {"id": "a1", "name": "one.jpg", "size": 10},
                    {"id": "b2", "name": "two.jpg"},
                    {"id": "c3", "size": 5}
                ]
            }));
        });

        let listing = client_for(&server).list_folder("fold1").await.unwrap();
        assert_eq!(listing.title.as_deref(), Some("Holiday"));
        assert_eq!(listing.files.len(), 3);
        assert_eq!(listing.files[0].name, "one.jpg");
        assert_eq!(listing.files[2].name, "pixeldrain-c3");
        assert_eq!(listing.total_size_bytes(), 15);
        assert_eq!(listing.unknown_sizes(), 1);
        assert!(listing.files[1].source_url.ends_with("/api/file/b2?download"));
        assert!(listing.page_url.ends_with("/l/fold1"));
    }

    #[tokio::test]
    async fn test_list_folder_errors() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/list/missing");
            then.status(404).json_body(serde_json::json!({"success": false}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/list/empty");
            then.status(200).json_body(serde_json::json!({"files": []}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/list/nofiles");
            then.status(200).json_body(serde_json::json!({"title": "x"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/list/notseq");
            then.status(200).json_body(serde_json::json!({"files": {"id": "a"}}));
        });

        let pd = client_for(&server);
        assert!(matches!(
            pd.list_folder("missing").await,
            Err(RelayError::FolderFetchFailed { .. })
        ));
        assert!(matches!(
            pd.list_folder("empty").await,
            Err(RelayError::EmptyFolder(_))
        ));
        assert!(matches!(
            pd.list_folder("nofiles").await,
            Err(RelayError::FolderFetchFailed { .. })
        ));
        assert!(matches!(
            pd.list_folder("notseq").await,
            Err(RelayError::FolderFetchFailed { .. })
        ));
    }
}
