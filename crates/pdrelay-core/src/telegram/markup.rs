//! MarkdownV2 转义与消息拆分
//!
//! 所有来自用户或远端的文本（文件名、URL、错误信息）都必须经过 [`escape`]
//! 之后才能拼进消息。

/// 单条消息的最大长度（UTF-16 码元）
pub const MESSAGE_LIMIT: usize = 4096;
/// 附件说明的最大长度（UTF-16 码元）
pub const CAPTION_LIMIT: usize = 1024;

const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

/// 转义 MarkdownV2 保留字符
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    for ch in text.chars() {
        if RESERVED.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Telegram 计算长度的方式：UTF-16 码元数
///
/// BMP 之外的字符（例如 emoji）占两个码元。
pub fn telegram_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// 截断未转义的文本，结果不超过 `limit` 个码元
///
/// 用于在拼进标记之前限制文件名等动态内容的长度。
pub fn clip(text: &str, limit: usize) -> String {
    if telegram_len(text) <= limit {
        return text.to_string();
    }
    if limit == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        if used + ch.len_utf16() > limit - 1 {
            break;
        }
        used += ch.len_utf16();
        out.push(ch);
    }
    out.push('…');
    out
}

/// 消息构建器，普通文本自动转义
#[derive(Debug, Default, Clone)]
pub struct Markup {
    buf: String,
}

impl Markup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: &str) -> Self {
        self.buf.push_str(&escape(text));
        self
    }

    pub fn bold(mut self, text: &str) -> Self {
        self.buf.push('*');
        self.buf.push_str(&escape(text));
        self.buf.push('*');
        self
    }

    pub fn newline(mut self) -> Self {
        self.buf.push('\n');
        self
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

/// 截断已转义的文本，保证结果不超过 `limit` 个码元
///
/// 不会留下孤立的转义符。
pub fn truncate_escaped(text: &str, limit: usize) -> String {
    if telegram_len(text) <= limit {
        return text.to_string();
    }
    if limit == 0 {
        return String::new();
    }

    let mut cut = clip(text, limit);
    cut.pop();
    let trailing = cut.chars().rev().take_while(|c| *c == '\\').count();
    if trailing % 2 == 1 {
        cut.pop();
    }
    cut.push('…');
    cut
}

/// 把标题和多行条目拆成若干条消息
///
/// 每条消息不超过 `limit`，条目顺序不变，单个条目不会跨消息。
/// 自身就超长的条目会被截断。
pub fn split_messages(header: &str, lines: &[String], limit: usize) -> Vec<String> {
    let mut messages = Vec::new();
    let mut current = truncate_escaped(header, limit);
    let mut current_len = telegram_len(&current);

    for line in lines {
        let line = truncate_escaped(line, limit);
        let line_len = telegram_len(&line);
        let needed = if current.is_empty() { line_len } else { current_len + 1 + line_len };

        if needed > limit {
            messages.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(&line);
        current_len += line_len;
    }

    if !current.is_empty() {
        messages.push(current);
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_reserved() {
        assert_eq!(escape("a_b*c[d](e).txt!"), r"a\_b\*c\[d\]\(e\)\.txt\!");
        assert_eq!(escape(r"back\slash"), r"back\\slash");
        assert_eq!(escape("plain 文件"), "plain 文件");
    }

    #[test]
    fn test_markup_builder() {
        let msg = Markup::new().text("Uploaded ").bold("a*b.zip").text(" (1.5 KiB)").finish();
        assert_eq!(msg, r"Uploaded *a\*b\.zip* \(1\.5 KiB\)");
    }

    #[test]
    fn test_truncate_does_not_leave_dangling_escape() {
        let escaped = escape("ab.cd");
        // "ab\.cd": 截到 3 个字符会把 "\" 切开
        let cut = truncate_escaped(&escaped, 4);
        assert_eq!(cut, "ab…");
        assert!(telegram_len(&cut) <= 4);
        assert_eq!(truncate_escaped("short", 10), "short");
    }

    #[test]
    fn test_split_preserves_order_and_lines() {
        let lines: Vec<String> = (0..50).map(|i| format!("item-{i:02}-{}", "x".repeat(30))).collect();
        let messages = split_messages("header", &lines, 200);

        assert!(messages.len() >= 2);
        assert!(messages[0].starts_with("header\n"));
        for msg in &messages {
            assert!(telegram_len(msg) <= 200);
        }

        let rejoined: Vec<&str> = messages.iter().flat_map(|m| m.lines()).skip(1).collect();
        let expected: Vec<&str> = lines.iter().map(String::as_str).collect();
        assert_eq!(rejoined, expected);
    }

    #[test]
    fn test_split_oversized_line() {
        let lines = vec!["a".repeat(50), "b".repeat(5)];
        let messages = split_messages("h", &lines, 20);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], "h");
        assert_eq!(telegram_len(&messages[1]), 20);
        assert!(messages[1].ends_with('…'));
        assert_eq!(messages[2], "bbbbb");
    }

    #[test]
    fn test_length_counts_utf16_units() {
        assert_eq!(telegram_len("abc"), 3);
        assert_eq!(telegram_len("文件"), 2);
        assert_eq!(telegram_len("😀"), 2);
    }

    #[test]
    fn test_clip_respects_surrogate_pairs() {
        let clipped = clip(&"😀".repeat(10), 6);
        // 两个 emoji (4) + 省略号 (1)，第三个 emoji 放不下
        assert_eq!(clipped, "😀😀…");
        assert!(telegram_len(&clipped) <= 6);
        assert_eq!(clip("short", 10), "short");
    }

    #[test]
    fn test_split_with_emoji_lines_stays_under_limit() {
        let lines: Vec<String> = (0..200).map(|i| format!("{i}: {}", "😀".repeat(60))).collect();
        let messages = split_messages("header", &lines, MESSAGE_LIMIT);

        assert!(messages.len() > 5);
        for msg in &messages {
            assert!(telegram_len(msg) <= MESSAGE_LIMIT, "{} units", telegram_len(msg));
        }
        let total: usize = messages.iter().map(|m| m.lines().count()).sum();
        assert_eq!(total, 201);
    }
}
