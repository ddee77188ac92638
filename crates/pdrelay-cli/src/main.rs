//! pdrelay CLI
//!
//! 把一个 pixeldrain 链接转发到 Telegram 聊天。
//! 所有参数都可以通过环境变量提供，便于在 CI 中使用。
//!
//! 退出码：成功（包括只发送直链）为 0，任何致命错误为 1。

use anyhow::{Context, Result};
use clap::Parser;
use pdrelay_core::telegram::notice;
use pdrelay_core::workflow::http_client;
use pdrelay_core::{
    Collaborators, Notifier, Relay, RelayConfig, RelayError, RelayInputs, RelayOutcome,
    RelaySettings, TelegramBot,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdrelay", version, about = "pixeldrain → Telegram 文件中继")]
struct Cli {
    /// pixeldrain 链接 (/u/<id> 或 /l/<id>)
    #[arg(env = "PIXELDRAIN_LINK")]
    link: Option<String>,
    /// Telegram Bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    bot_token: Option<String>,
    /// 目标聊天 ID
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    chat_id: Option<String>,
    /// 传输预算（字节），超出时只发送直链
    #[arg(long, env = "MAX_UPLOAD_BYTES")]
    max_bytes: Option<String>,
    /// 设置文件路径 (默认: ~/.config/pdrelay/settings.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// 详细日志
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn inputs(&self) -> RelayInputs {
        RelayInputs {
            link: self.link.clone(),
            bot_token: self.bot_token.clone(),
            chat_id: self.chat_id.clone(),
            max_bytes: self.max_bytes.clone(),
        }
    }
}

fn init_logging(verbose: bool) {
    // 桥接 log crate（pdrelay-core 使用）到 tracing
    let _ = tracing_log::LogTracer::init();

    let default_filter = if verbose {
        "info,pdrelay_core=debug"
    } else {
        "info"
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .try_init();
}

/// 配置无效但消息通道可用时，尽力通知一次
async fn report_startup_failure(
    inputs: &RelayInputs,
    settings: &RelaySettings,
    error: &RelayError,
) -> Result<()> {
    let token = inputs.bot_token.as_deref().map(str::trim).unwrap_or_default();
    let chat_id = inputs.chat_id.as_deref().map(str::trim).unwrap_or_default();
    if token.is_empty() || chat_id.is_empty() {
        return Ok(());
    }

    let client = http_client().context("Failed to build HTTP client")?;
    let bot = TelegramBot::new(client, &settings.telegram_base, token, chat_id);
    bot.notify(&notice::failure(error))
        .await
        .context("Failed to deliver startup error")?;
    Ok(())
}

fn build_relay(config: RelayConfig) -> Result<Relay> {
    let services = Collaborators::production(&config).context("Failed to set up relay services")?;
    Ok(Relay::new(config, services))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(cli.verbose);

    let settings = RelaySettings::load(cli.config.as_deref());
    let inputs = cli.inputs();

    let config = match RelayConfig::resolve(inputs.clone(), &settings) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            if let Err(e) = report_startup_failure(&inputs, &settings, &e).await {
                tracing::warn!("{:#}", e);
            }
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!("Configuration: {:?}", config);

    let relay = match build_relay(config) {
        Ok(relay) => relay,
        Err(e) => {
            tracing::error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match relay.run().await {
        Ok(RelayOutcome::Uploaded { name, size }) => {
            tracing::info!("Uploaded {} ({} bytes)", name, size);
            ExitCode::SUCCESS
        }
        Ok(RelayOutcome::LinkFallback { reason, links }) => {
            tracing::info!("Sent {} direct link(s): {}", links, reason);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("pdrelay failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_map_to_inputs() {
        let cli = Cli::try_parse_from([
            "pdrelay",
            "https://pixeldrain.com/u/abc123",
            "--bot-token",
            "123:token",
            "--chat-id",
            "-100",
            "--max-bytes",
            "1000",
        ])
        .unwrap();

        let inputs = cli.inputs();
        assert_eq!(inputs.link.as_deref(), Some("https://pixeldrain.com/u/abc123"));
        assert_eq!(inputs.chat_id.as_deref(), Some("-100"));
        assert_eq!(inputs.max_bytes.as_deref(), Some("1000"));
        assert!(!cli.verbose);
    }

    #[tokio::test]
    async fn test_startup_failure_without_channel_is_skipped() {
        let inputs = RelayInputs {
            link: None,
            bot_token: Some("123:token".to_string()),
            chat_id: Some("  ".to_string()),
            max_bytes: None,
        };
        let error = RelayError::ConfigMissing("TELEGRAM_CHAT_ID");

        assert!(
            report_startup_failure(&inputs, &RelaySettings::default(), &error)
                .await
                .is_ok()
        );
    }

    #[test]
    fn test_build_relay() {
        let inputs = RelayInputs {
            link: Some("https://pixeldrain.com/u/abc123".to_string()),
            bot_token: Some("123:token".to_string()),
            chat_id: Some("-100".to_string()),
            max_bytes: None,
        };
        let config = RelayConfig::resolve(inputs, &RelaySettings::default()).unwrap();
        assert!(build_relay(config).is_ok());
    }
}
