//! 通知消息模板
//!
//! 每个函数返回已转义、可直接以 MarkdownV2 发送的文本。

use super::markup::{
    CAPTION_LIMIT, MESSAGE_LIMIT, Markup, clip, split_messages, truncate_escaped,
};
use crate::error::RelayError;
use crate::link::ResourceRef;
use crate::plan::{FallbackReason, FallbackTarget, format_size};
use crate::source::FileMeta;

/// 说明中文件名的上限；转义最多翻倍，再留出大小和标记的空间
const CAPTION_NAME_LIMIT: usize = (CAPTION_LIMIT - 32) / 2;
/// 链接行中文件名的上限，剩余空间留给 URL
const LINE_NAME_LIMIT: usize = MESSAGE_LIMIT / 4;

fn size_label(size: Option<u64>) -> String {
    size.map_or_else(|| "unknown size".to_string(), format_size)
}

pub fn started(resource: &ResourceRef) -> String {
    Markup::new()
        .text(&format!("🔗 Processing pixeldrain {} ", resource.kind))
        .bold(&resource.id)
        .finish()
}

pub fn downloading(meta: &FileMeta) -> String {
    Markup::new()
        .text("⬇️ Downloading ")
        .bold(&meta.name)
        .text(&format!(" ({})", size_label(meta.size)))
        .finish()
}

pub fn downloading_folder(count: usize, total: u64) -> String {
    Markup::new()
        .text(&format!(
            "⬇️ Downloading {count} file(s), about {}",
            format_size(total)
        ))
        .finish()
}

pub fn archiving(count: usize, archive_name: &str) -> String {
    Markup::new()
        .text(&format!("🗜 Zipping {count} file(s) into "))
        .bold(archive_name)
        .finish()
}

pub fn uploading(name: &str, size: u64) -> String {
    Markup::new()
        .text("⬆️ Uploading ")
        .bold(name)
        .text(&format!(" ({})", format_size(size)))
        .finish()
}

pub fn uploaded(name: &str, size: u64) -> String {
    Markup::new()
        .text("✅ Uploaded ")
        .bold(name)
        .text(&format!(" ({})", format_size(size)))
        .finish()
}

/// 附件说明
pub fn caption(name: &str, size: u64) -> String {
    let text = Markup::new()
        .bold(&clip(name, CAPTION_NAME_LIMIT))
        .newline()
        .text(&format_size(size))
        .finish();
    truncate_escaped(&text, CAPTION_LIMIT)
}

fn link_lines(target: &FallbackTarget) -> Vec<String> {
    target
        .items()
        .iter()
        .map(|item| {
            Markup::new()
                .text("• ")
                .bold(&clip(&item.name, LINE_NAME_LIMIT))
                .text(&format!(" ({}): {}", size_label(item.size), item.source_url))
                .finish()
        })
        .collect()
}

fn target_header(markup: Markup, target: &FallbackTarget) -> Markup {
    match target {
        FallbackTarget::File(meta) => markup.bold(&meta.name),
        FallbackTarget::Folder(listing) => {
            let title = listing.title.as_deref().unwrap_or(&listing.id);
            markup
                .text("folder ")
                .bold(title)
                .text(&format!(" ({} file(s)) {}", listing.files.len(), listing.page_url))
        }
    }
}

/// 降级为链接的消息（可能拆成多条）
pub fn fallback(target: &FallbackTarget, reason: &FallbackReason) -> Vec<String> {
    let header = target_header(Markup::new().text("⚠️ "), target)
        .text(&format!(" is {reason}."))
        .newline()
        .text("Direct links:")
        .finish();
    split_messages(&header, &link_lines(target), MESSAGE_LIMIT)
}

/// 致命错误消息
pub fn failure(error: &RelayError) -> String {
    let text = Markup::new().text(&format!("❌ Error: {error}")).finish();
    truncate_escaped(&text, MESSAGE_LIMIT)
}

/// 方案失败后附带直链的错误消息
pub fn failure_with_links(error: &RelayError, target: &FallbackTarget) -> Vec<String> {
    let header = Markup::new()
        .text(&format!("❌ Error: {error}"))
        .newline()
        .text("Direct links:")
        .finish();
    split_messages(&header, &link_lines(target), MESSAGE_LIMIT)
}
