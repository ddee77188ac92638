//! 中继工作流
//!
//! 高层 API 封装完整的中继流程:
//! 1. 解析链接
//! 2. 获取元数据
//! 3. 预算判定
//! 4. 下载到暂存目录 →（打包）→ 上传，或直接发送直链
//!
//! 每个阶段都会发送进度通知。所有致命错误在 [`Relay::run`] 中汇总，
//! 保证用户只收到一条错误消息。

use log::{error, info, warn};
use reqwest::Client;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::link::{ResourceKind, ResourceRef};
use crate::plan::{BudgetGate, Checkpoint, FallbackReason, FallbackTarget, TransferPlan};
use crate::source::{FileMeta, FolderListing, MetadataSource, PixeldrainClient, Resource};
use crate::telegram::{Notifier, TelegramBot, notice};
use crate::transfer::{
    Archiver, Fetcher, HttpFetcher, StagedFile, StagingArea, Uploader, ZipArchiver,
};

/// 所有 HTTP 协作者共用的客户端
pub fn http_client() -> Result<Client, RelayError> {
    Client::builder()
        .user_agent(concat!("pdrelay/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(RelayError::ClientSetup)
}

/// 流程依赖的外部能力
pub struct Collaborators {
    pub source: Box<dyn MetadataSource>,
    pub fetcher: Box<dyn Fetcher>,
    pub archiver: Box<dyn Archiver>,
    pub uploader: Box<dyn Uploader>,
    pub notifier: Box<dyn Notifier>,
}

impl Collaborators {
    /// 生产环境实现：pixeldrain + reqwest + zip + Telegram
    pub fn production(config: &RelayConfig) -> Result<Self, RelayError> {
        let client = http_client()?;

        let bot = TelegramBot::new(
            client.clone(),
            &config.telegram_base,
            &config.bot_token,
            &config.chat_id,
        );

        Ok(Self {
            source: Box::new(PixeldrainClient::new(
                client.clone(),
                &config.pixeldrain_base,
                &config.name_prefix,
            )),
            fetcher: Box::new(HttpFetcher::new(client)),
            archiver: Box::new(ZipArchiver::new()),
            uploader: Box::new(bot.clone()),
            notifier: Box::new(bot),
        })
    }
}

/// 一次运行的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// 文件（或压缩包）已作为附件上传
    Uploaded { name: String, size: u64 },
    /// 只发送了直链
    LinkFallback { reason: FallbackReason, links: usize },
}

/// 致命错误，附带是否已经通知过用户
struct Failure {
    error: RelayError,
    reported: bool,
}

impl From<RelayError> for Failure {
    fn from(error: RelayError) -> Self {
        Self {
            error,
            reported: false,
        }
    }
}

/// 中继流程
pub struct Relay {
    config: RelayConfig,
    gate: BudgetGate,
    services: Collaborators,
}

impl Relay {
    pub fn new(config: RelayConfig, services: Collaborators) -> Self {
        let gate = BudgetGate::new(config.max_bytes);
        Self {
            config,
            gate,
            services,
        }
    }

    /// 执行一次完整的中继
    ///
    /// 失败时先尽力发送一条错误通知，再返回原始错误。
    pub async fn run(&self) -> Result<RelayOutcome, RelayError> {
        match self.execute().await {
            Ok(outcome) => {
                info!("Relay finished: {:?}", outcome);
                Ok(outcome)
            }
            Err(Failure { error, reported }) => {
                error!("Relay failed: {}", error);
                if !reported
                    && error.is_notifiable()
                    && let Err(e) = self.services.notifier.notify(&notice::failure(&error)).await
                {
                    warn!("Could not deliver error notification: {}", e);
                }
                Err(error)
            }
        }
    }

    async fn execute(&self) -> Result<RelayOutcome, Failure> {
        let resource = ResourceRef::classify(&self.config.link)?;
        info!("Classified link as {} {}", resource.kind, resource.id);
        self.progress(notice::started(&resource)).await;

        let resolved = match resource.kind {
            ResourceKind::File => Resource::File(self.services.source.probe_file(&resource.id).await),
            ResourceKind::Folder => {
                Resource::Folder(self.services.source.list_folder(&resource.id).await?)
            }
        };

        match self.gate.plan(resolved) {
            TransferPlan::Direct(meta) => self.relay_file(meta).await,
            TransferPlan::Archive(listing) => self.relay_folder(listing).await,
            TransferPlan::LinkFallback { target, reason } => {
                self.link_fallback(target, reason).await
            }
        }
    }

    async fn relay_file(&self, meta: FileMeta) -> Result<RelayOutcome, Failure> {
        let mut staging = StagingArea::create(self.config.staging_dir.as_deref())?;
        let (path, local_name) = staging.reserve(&meta.name);

        self.progress(notice::downloading(&meta)).await;
        let fetched = self
            .services
            .fetcher
            .fetch(&meta.name, &meta.source_url, &path, Some(self.gate.max_bytes()))
            .await;
        let size = match fetched {
            Ok(size) => size,
            Err(e) => return Err(self.fail_with_links(e, FallbackTarget::File(meta)).await),
        };

        if let Err(reason) = self.gate.check_actual(Checkpoint::Downloaded, size) {
            info!("{} exceeds the budget after download, discarding", meta.name);
            staging.discard(&path);
            staging.close();
            return self.link_fallback(FallbackTarget::File(meta), reason).await;
        }

        self.progress(notice::uploading(&meta.name, size)).await;
        let caption = notice::caption(&meta.name, size);
        let uploaded = self
            .services
            .uploader
            .upload(&path, &local_name, Some(&caption))
            .await;
        if let Err(e) = uploaded {
            return Err(self.fail_with_links(e, FallbackTarget::File(meta)).await);
        }

        staging.close();
        self.progress(notice::uploaded(&meta.name, size)).await;
        Ok(RelayOutcome::Uploaded {
            name: local_name,
            size,
        })
    }

    async fn relay_folder(&self, listing: FolderListing) -> Result<RelayOutcome, Failure> {
        let mut staging = StagingArea::create(self.config.staging_dir.as_deref())?;

        self.progress(notice::downloading_folder(
            listing.files.len(),
            listing.total_size_bytes(),
        ))
        .await;

        // 顺序下载，保证暂存内容和通知顺序确定
        // 成员不设上限，以压缩包的实际大小为准
        let mut staged = Vec::with_capacity(listing.files.len());
        for (i, member) in listing.files.iter().enumerate() {
            let (path, name) = staging.reserve(&member.name);
            info!("Fetching member {}/{}: {}", i + 1, listing.files.len(), member.name);
            let fetched = self
                .services
                .fetcher
                .fetch(&member.name, &member.source_url, &path, None)
                .await;
            match fetched {
                Ok(_) => staged.push(StagedFile { path, name }),
                Err(e) => {
                    return Err(self
                        .fail_with_links(e, FallbackTarget::Folder(listing.clone()))
                        .await);
                }
            }
        }

        let (archive_path, archive_name) = staging.reserve(&self.archive_name(&listing));
        self.progress(notice::archiving(staged.len(), &archive_name)).await;
        let archived = self.services.archiver.archive(&staged, &archive_path).await;
        let size = match archived {
            Ok(size) => size,
            Err(e) => {
                return Err(self
                    .fail_with_links(e, FallbackTarget::Folder(listing))
                    .await);
            }
        };

        if let Err(reason) = self.gate.check_actual(Checkpoint::Archived, size) {
            info!("{} exceeds the budget, falling back to links", archive_name);
            staging.discard(&archive_path);
            staging.close();
            return self
                .link_fallback(FallbackTarget::Folder(listing), reason)
                .await;
        }

        self.progress(notice::uploading(&archive_name, size)).await;
        let caption = notice::caption(&archive_name, size);
        let uploaded = self
            .services
            .uploader
            .upload(&archive_path, &archive_name, Some(&caption))
            .await;
        if let Err(e) = uploaded {
            return Err(self
                .fail_with_links(e, FallbackTarget::Folder(listing))
                .await);
        }

        staging.close();
        self.progress(notice::uploaded(&archive_name, size)).await;
        Ok(RelayOutcome::Uploaded {
            name: archive_name,
            size,
        })
    }

    fn archive_name(&self, listing: &FolderListing) -> String {
        let stem = listing
            .title
            .clone()
            .unwrap_or_else(|| format!("{}-list-{}", self.config.name_prefix, listing.id));
        format!("{stem}.zip")
    }

    /// 发送直链；这是降级路径的交付物，发送失败即为致命错误
    async fn link_fallback(
        &self,
        target: FallbackTarget,
        reason: FallbackReason,
    ) -> Result<RelayOutcome, Failure> {
        info!("Falling back to links: {}", reason);
        let messages = notice::fallback(&target, &reason);
        self.send_all(&messages).await?;
        Ok(RelayOutcome::LinkFallback {
            reason,
            links: target.items().len(),
        })
    }

    /// 方案失败：发送错误和直链，作为该错误唯一的通知
    async fn fail_with_links(&self, error: RelayError, target: FallbackTarget) -> Failure {
        let messages = notice::failure_with_links(&error, &target);
        let reported = match self.send_all(&messages).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not deliver failure links: {}", e);
                false
            }
        };
        Failure { error, reported }
    }

    async fn send_all(&self, messages: &[String]) -> Result<(), RelayError> {
        for message in messages {
            self.services.notifier.notify(message).await?;
        }
        Ok(())
    }

    /// 进度通知失败不影响流程
    async fn progress(&self, text: String) {
        if let Err(e) = self.services.notifier.notify(&text).await {
            warn!("Progress notification failed: {}", e);
        }
    }
}
