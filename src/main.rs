//! # Picverter 图片处理后端 — 进程入口
//!
//! 本文件仅负责日志初始化、配置加载与桥接服务启动。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::process::ExitCode;
use std::sync::Arc;

use picverter::bridge;
use picverter::error::AppError;
use picverter::image_handler::{ImageConfig, ImageServiceState};
use tokio::io::BufReader;

/// 配置文件路径的环境变量名；未设置时使用默认配置。
const CONFIG_ENV: &str = "PICVERTER_CONFIG";

fn load_config() -> Result<ImageConfig, AppError> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            log::info!("setup: 读取配置文件 {}", path.to_string_lossy());
            ImageConfig::load(path)
        }
        None => Ok(ImageConfig::default()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            log::error!("setup: 配置加载失败: {err}");
            return ExitCode::FAILURE;
        }
    };

    log::info!(
        "setup: image service ready - workers={} timeout_ms={} output_dir={}",
        config.max_concurrent_requests,
        config.request_timeout_ms,
        config.resolved_output_dir().display()
    );
    let state = Arc::new(ImageServiceState::with_config(config));

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    match bridge::serve(state, stdin, stdout).await {
        Ok(()) => {
            log::info!("输入已关闭，服务退出");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("桥接服务异常退出: {err}");
            ExitCode::FAILURE
        }
    }
}
