//! Telegram Bot API
//!
//! - `sendMessage`：进度、结果和错误通知
//! - `sendDocument`：以附件形式上传文件
//!
//! [`TelegramBot`] 同时实现 [`Notifier`] 和 [`Uploader`]。

pub mod markup;
pub mod notice;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Deserialize;
use std::path::Path;
use tokio_util::io::ReaderStream;

use crate::error::{RelayError, transport_reason};
use crate::transfer::Uploader;

/// 向固定目标发送文本消息
///
/// 文本必须已经按 MarkdownV2 转义（见 [`markup`]）。
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), RelayError>;
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot 客户端
#[derive(Clone)]
pub struct TelegramBot {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramBot {
    pub fn new(client: Client, api_base: &str, token: &str, chat_id: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// 发送 MarkdownV2 文本消息，关闭链接预览
    pub async fn send_message(&self, text: &str) -> Result<(), RelayError> {
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "MarkdownV2",
            "disable_web_page_preview": true,
        });

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| RelayError::NotifyFailed(transport_reason(e)))?;

        check_response(response)
            .await
            .map_err(RelayError::NotifyFailed)?;
        debug!("Message delivered to {}", self.chat_id);
        Ok(())
    }

    /// 以 multipart 形式上传文件，内容从磁盘流式读取
    pub async fn send_document(
        &self,
        path: &Path,
        file_name: &str,
        caption: Option<&str>,
    ) -> Result<(), RelayError> {
        let failed = |reason: String| RelayError::UploadFailed {
            name: file_name.to_string(),
            reason,
        };

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| failed(e.to_string()))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| failed(e.to_string()))?
            .len();

        let body = Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, len)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| failed(transport_reason(e)))?;

        let mut form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .part("document", part);
        if let Some(caption) = caption {
            form = form
                .text("caption", caption.to_string())
                .text("parse_mode", "MarkdownV2");
        }

        info!("Uploading {} ({} bytes)", file_name, len);
        let response = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| failed(transport_reason(e)))?;

        check_response(response).await.map_err(failed)?;
        info!("Uploaded {}", file_name);
        Ok(())
    }
}

/// 2xx 且 `ok: true` 才算成功
async fn check_response(response: reqwest::Response) -> Result<(), String> {
    let status = response.status();
    let body = response.text().await.map_err(transport_reason)?;
    let parsed: Option<ApiResponse> = serde_json::from_str(&body).ok();

    match parsed {
        Some(api) if status.is_success() && api.ok => Ok(()),
        Some(api) => Err(api
            .description
            .unwrap_or_else(|| format!("server returned {status}"))),
        None if status.is_success() => Err(format!("unexpected response body: {body}")),
        None => Err(format!("server returned {status}")),
    }
}

#[async_trait]
impl Notifier for TelegramBot {
    async fn notify(&self, text: &str) -> Result<(), RelayError> {
        self.send_message(text).await
    }
}

#[async_trait]
impl Uploader for TelegramBot {
    async fn upload(
        &self,
        path: &Path,
        file_name: &str,
        caption: Option<&str>,
    ) -> Result<(), RelayError> {
        self.send_document(path, file_name, caption).await
    }
}
