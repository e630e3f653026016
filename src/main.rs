//! Stadt, Land, Fluss - 用维基百科验证答案的文字游戏
//!
//! 核心设计原则：
//! - 自动验证只给出建议
//! - 缓存只记录被确认的词条
//! - 历史记录跟随当前类别配置
//! - 人类永远有最终裁决权

pub mod core;
pub mod storage;
pub mod ui;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::game::GameSession;
use crate::core::lookup::WikipediaClient;
use crate::core::models::AppConfig;
use crate::storage::config::ConfigManager;
use crate::ui::app::StadtLandFlussApp;
use crate::ui::args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,reqwest=warn,hyper=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let config_manager = ConfigManager::new(cli.config.clone().unwrap_or_else(ConfigManager::default_path));
    let config = config_manager.load().unwrap_or_else(|e| {
        tracing::error!("{:#}，使用默认配置", e);
        AppConfig::default()
    });
    if !config_manager.path().exists() {
        // 首次运行时写出默认配置，失败不影响游戏
        if let Err(e) = config_manager.save(&config) {
            tracing::warn!("写入默认配置失败: {}", e);
        }
    }
    tracing::info!("配置文件: {}", config_manager.path().display());

    let source = WikipediaClient::new(&config.lookup)?;
    let (session, report) = GameSession::open(config, Box::new(source));

    if report.skipped_rows > 0 {
        tracing::warn!("历史记录中有 {} 行无法解析，已跳过", report.skipped_rows);
    }
    if report.added_date_column || report.inferred_letter_column {
        tracing::warn!("历史记录缺少 Date/Letter 列，已按旧格式迁移");
    }
    if report.rewritten {
        tracing::info!(
            "已同步历史记录: 新增列 {:?}，删除列 {:?}，调整 {} 行，补填日期 {} 行",
            report.added_columns,
            report.dropped_columns,
            report.adjusted_rows,
            report.filled_dates
        );
    }

    tracing::info!("启动 Stadt, Land, Fluss");

    let mut app = StadtLandFlussApp::new(session, config_manager);
    app.run(cli.cmd).await
}
