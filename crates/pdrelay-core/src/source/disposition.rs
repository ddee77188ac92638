//! Content-Disposition 文件名解析
//!
//! 优先使用 RFC 5987 扩展形式 `filename*=UTF-8''...`，其次是 `filename="..."`。

use percent_encoding::percent_decode_str;

/// 从 Content-Disposition 头中取出文件名
pub fn file_name(header: &str) -> Option<String> {
    let params: Vec<(String, &str)> = split_params(header)
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            Some((key.trim().to_ascii_lowercase(), value.trim()))
        })
        .collect();

    let extended = params
        .iter()
        .find(|(key, _)| key == "filename*")
        .and_then(|(_, value)| decode_extended(value));
    if extended.is_some() {
        return extended;
    }

    params
        .iter()
        .find(|(key, _)| key == "filename")
        .map(|(_, value)| unquote(value))
        .filter(|name| !name.is_empty())
}

/// 按 `;` 切分参数，忽略引号内的分号
fn split_params(header: &str) -> impl Iterator<Item = &str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, ch) in header.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                parts.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&header[start..]);
    parts.into_iter()
}

/// `UTF-8'lang'pct-encoded`
fn decode_extended(value: &str) -> Option<String> {
    let value = value.trim_matches('"');
    let mut pieces = value.splitn(3, '\'');
    let charset = pieces.next()?;
    let _language = pieces.next()?;
    let encoded = pieces.next()?;

    if !charset.eq_ignore_ascii_case("utf-8") {
        return None;
    }

    percent_decode_str(encoded)
        .decode_utf8()
        .ok()
        .map(|name| name.into_owned())
        .filter(|name| !name.is_empty())
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_form() {
        assert_eq!(
            file_name(r#"attachment; filename="report final.pdf""#).as_deref(),
            Some("report final.pdf")
        );
    }

    #[test]
    fn test_extended_form_preferred() {
        let header = r#"attachment; filename="fallback.txt"; filename*=UTF-8''%E6%96%87%E4%BB%B6.txt"#;
        assert_eq!(file_name(header).as_deref(), Some("文件.txt"));
    }

    #[test]
    fn test_token_and_escaped_quotes() {
        assert_eq!(file_name("inline; filename=plain.bin").as_deref(), Some("plain.bin"));
        assert_eq!(
            file_name(r#"attachment; filename="a \"b\"; c.txt""#).as_deref(),
            Some(r#"a "b"; c.txt"#)
        );
    }

    #[test]
    fn test_bad_extended_falls_back() {
        let header = r#"attachment; filename*=ISO-8859-1''caf%E9.txt; filename="cafe.txt""#;
        assert_eq!(file_name(header).as_deref(), Some("cafe.txt"));
        assert_eq!(file_name("attachment"), None);
        assert_eq!(file_name(r#"attachment; filename="""#), None);
    }
}
