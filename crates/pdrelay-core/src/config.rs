//! 运行配置
//!
//! 两层结构：
//! - [`RelaySettings`]：可选的 TOML 设置文件，保存 API 地址和默认预算
//! - [`RelayConfig`]：一次运行的不可变配置，启动时构建一次后传入流程

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RelayError;

/// 默认传输预算（字节）
pub const DEFAULT_MAX_BYTES: u64 = 1_900_000_000;
pub const DEFAULT_PIXELDRAIN_BASE: &str = "https://pixeldrain.com";
pub const DEFAULT_TELEGRAM_BASE: &str = "https://api.telegram.org";

/// 持久化设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// pixeldrain 站点地址
    pub pixeldrain_base: String,
    /// Telegram Bot API 地址（自建 Bot API 服务器时修改）
    pub telegram_base: String,
    /// 传输预算
    pub max_bytes: u64,
    /// 暂存目录的父目录，默认使用系统临时目录
    pub staging_dir: Option<PathBuf>,
    /// 合成文件名的前缀
    pub name_prefix: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            pixeldrain_base: DEFAULT_PIXELDRAIN_BASE.to_string(),
            telegram_base: DEFAULT_TELEGRAM_BASE.to_string(),
            max_bytes: DEFAULT_MAX_BYTES,
            staging_dir: None,
            name_prefix: "pixeldrain".to_string(),
        }
    }
}

impl RelaySettings {
    /// 默认设置文件路径
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pdrelay")
            .join("settings.toml")
    }

    /// 加载设置（文件不存在或无法解析时使用默认值）
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.map_or_else(Self::default_path, Path::to_path_buf);
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => {
                    debug!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// 保存设置
    pub fn save(&self, path: &Path) -> Result<(), RelayError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| RelayError::ConfigInvalid {
            name: "settings",
            reason: e.to_string(),
        })?;
        fs::write(path, content)?;
        debug!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// 单次运行的原始输入（来自命令行或环境变量）
#[derive(Debug, Clone, Default)]
pub struct RelayInputs {
    pub link: Option<String>,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub max_bytes: Option<String>,
}

/// 单次运行的配置，构建后不再修改
#[derive(Clone)]
pub struct RelayConfig {
    pub link: String,
    pub bot_token: String,
    pub chat_id: String,
    pub max_bytes: u64,
    pub pixeldrain_base: String,
    pub telegram_base: String,
    pub staging_dir: Option<PathBuf>,
    pub name_prefix: String,
}

impl RelayConfig {
    /// 合并输入与设置；空白值视为缺失
    pub fn resolve(inputs: RelayInputs, settings: &RelaySettings) -> Result<Self, RelayError> {
        let link = required(inputs.link, "PIXELDRAIN_LINK")?;
        let bot_token = required(inputs.bot_token, "TELEGRAM_BOT_TOKEN")?;
        let chat_id = required(inputs.chat_id, "TELEGRAM_CHAT_ID")?;

        let max_bytes = match present(inputs.max_bytes) {
            Some(raw) => raw.parse::<u64>().map_err(|e| RelayError::ConfigInvalid {
                name: "MAX_UPLOAD_BYTES",
                reason: format!("{raw:?}: {e}"),
            })?,
            None => settings.max_bytes,
        };

        Ok(Self {
            link,
            bot_token,
            chat_id,
            max_bytes,
            pixeldrain_base: settings.pixeldrain_base.trim_end_matches('/').to_string(),
            telegram_base: settings.telegram_base.trim_end_matches('/').to_string(),
            staging_dir: settings.staging_dir.clone(),
            name_prefix: settings.name_prefix.clone(),
        })
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("link", &self.link)
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("max_bytes", &self.max_bytes)
            .field("pixeldrain_base", &self.pixeldrain_base)
            .field("telegram_base", &self.telegram_base)
            .field("staging_dir", &self.staging_dir)
            .finish_non_exhaustive()
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, name: &'static str) -> Result<String, RelayError> {
    present(value).ok_or(RelayError::ConfigMissing(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> RelayInputs {
        RelayInputs {
            link: Some("https://pixeldrain.com/u/abc123".to_string()),
            bot_token: Some("123:token".to_string()),
            chat_id: Some("-10042".to_string()),
            max_bytes: None,
        }
    }

    #[test]
    fn test_resolve_uses_settings_budget() {
        let config = RelayConfig::resolve(inputs(), &RelaySettings::default()).unwrap();
        assert_eq!(config.max_bytes, DEFAULT_MAX_BYTES);
        assert_eq!(config.pixeldrain_base, "https://pixeldrain.com");
    }

    #[test]
    fn test_resolve_budget_override() {
        let mut raw = inputs();
        raw.max_bytes = Some(" 1000 ".to_string());
        let config = RelayConfig::resolve(raw, &RelaySettings::default()).unwrap();
        assert_eq!(config.max_bytes, 1000);
    }

    #[test]
    fn test_resolve_missing_values() {
        let mut raw = inputs();
        raw.bot_token = Some("   ".to_string());
        let err = RelayConfig::resolve(raw, &RelaySettings::default()).unwrap_err();
        assert!(matches!(err, RelayError::ConfigMissing("TELEGRAM_BOT_TOKEN")));
        assert!(!err.is_notifiable());

        let mut raw = inputs();
        raw.link = None;
        let err = RelayConfig::resolve(raw, &RelaySettings::default()).unwrap_err();
        assert!(matches!(err, RelayError::ConfigMissing("PIXELDRAIN_LINK")));
    }

    #[test]
    fn test_resolve_invalid_budget() {
        let mut raw = inputs();
        raw.max_bytes = Some("2GB".to_string());
        let err = RelayConfig::resolve(raw, &RelaySettings::default()).unwrap_err();
        assert!(matches!(err, RelayError::ConfigInvalid { name: "MAX_UPLOAD_BYTES", .. }));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = RelayConfig::resolve(inputs(), &RelaySettings::default()).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("123:token"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_settings_roundtrip_and_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pdrelay").join("settings.toml");

        let settings = RelaySettings {
            telegram_base: "http://localhost:8081".to_string(),
            max_bytes: 42,
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(RelaySettings::load(Some(&path)), settings);

        // 只写部分字段时其余字段取默认值
        fs::write(&path, "max_bytes = 7\n").unwrap();
        let loaded = RelaySettings::load(Some(&path));
        assert_eq!(loaded.max_bytes, 7);
        assert_eq!(loaded.pixeldrain_base, DEFAULT_PIXELDRAIN_BASE);
    }

    #[test]
    fn test_settings_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "max_bytes = \"lots\"").unwrap();
        assert_eq!(RelaySettings::load(Some(&path)), RelaySettings::default());
    }
}
