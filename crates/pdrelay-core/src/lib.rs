//! pdrelay Core Library
//!
//! 把 pixeldrain 上的文件或文件夹转发到 Telegram 聊天：
//! 小于传输预算的内容下载后作为附件上传，超出预算则只发送直链。
//!
//! # 模块
//!
//! - **link**: 链接分类（单文件 / 文件夹）
//! - **source**: pixeldrain 元数据探测和文件夹列表
//! - **plan**: 传输预算判定
//! - **transfer**: 暂存目录、下载、ZIP 打包、上传抽象
//! - **telegram**: Bot API 客户端、MarkdownV2 转义、通知模板
//! - **workflow**: 完整的中继流程
//!
//! # 使用示例
//!
//! ```ignore
//! use pdrelay_core::{Collaborators, Relay, RelayConfig, RelayInputs, RelaySettings};
//!
//! let settings = RelaySettings::load(None);
//! let config = RelayConfig::resolve(inputs, &settings)?;
//! let services = Collaborators::production(&config)?;
//!
//! match Relay::new(config, services).run().await {
//!     Ok(outcome) => println!("{outcome:?}"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

pub mod config;
pub mod error;
pub mod link;
pub mod plan;
pub mod source;
pub mod telegram;
pub mod transfer;
pub mod workflow;

pub use config::{RelayConfig, RelayInputs, RelaySettings};
pub use error::RelayError;
pub use link::{ResourceKind, ResourceRef};
pub use plan::{BudgetGate, FallbackReason, FallbackTarget, TransferPlan};
pub use source::{FileMeta, FolderListing, MetadataSource, PixeldrainClient, Resource};
pub use telegram::{Notifier, TelegramBot};
pub use transfer::{Archiver, Fetcher, StagedFile, StagingArea, Uploader};
pub use workflow::{Collaborators, Relay, RelayOutcome};
