//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ImageConfig`，保证运行时行为可观测、可调整、可测试。
//! 配置只在启动时加载一次，之后以 `Arc<ImageConfig>` 只读共享，
//! 不存在运行时切换，也就不存在请求之间的配置漂移。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置。
//! - `load` 从 JSON 文件读取，缺失字段回落到默认值（`#[serde(default)]`）。
//! - `validate` 拒绝越界取值，错误统一映射为 `AppError::Config`。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// 图片处理配置。
///
/// 字段覆盖了读取、解码、输出与调度四个阶段。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// 读取原始字节时允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// Base64 上传的输出目录；未设置时使用系统临时目录。
    pub output_dir: Option<PathBuf>,
    /// 单次请求超时（毫秒），0 表示不限制。
    pub request_timeout_ms: u64,
    /// 同时处理的请求数上限。
    pub max_concurrent_requests: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            output_dir: None,
            request_timeout_ms: 60_000,
            max_concurrent_requests: 4,
        }
    }
}

impl ImageConfig {
    /// 从 JSON 文件加载配置并校验。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use picverter::image_handler::ImageConfig;
    ///
    /// let config = ImageConfig::load("picverter.json")?;
    /// # Ok::<(), picverter::error::AppError>(())
    /// ```
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("读取配置文件 '{}' 失败: {}", path.display(), e))
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("解析配置文件失败: {}", e)))?;
        config.validate()?;

        Ok(config)
    }

    /// 校验各项取值范围。
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_file_size < 1024 {
            return Err(AppError::Config("max_file_size 不能小于 1KB".to_string()));
        }
        if self.max_decoded_pixels == 0 {
            return Err(AppError::Config("max_decoded_pixels 必须大于 0".to_string()));
        }
        if self.max_decoded_bytes < 8 * 1024 * 1024 {
            return Err(AppError::Config("max_decoded_bytes 不能小于 8MB".to_string()));
        }
        if !(1..=64).contains(&self.max_concurrent_requests) {
            return Err(AppError::Config(
                "max_concurrent_requests 必须在 1~64 之间".to_string(),
            ));
        }
        if self.request_timeout_ms != 0 && self.request_timeout_ms < 100 {
            return Err(AppError::Config(
                "request_timeout_ms 必须为 0（不限制）或不小于 100 毫秒".to_string(),
            ));
        }
        if let Some(dir) = &self.output_dir {
            if dir.as_os_str().is_empty() {
                return Err(AppError::Config("output_dir 不能为空字符串".to_string()));
            }
        }

        Ok(())
    }

    /// 请求超时；未启用时返回 `None`。
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    /// Base64 上传结果的落盘目录。
    pub fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        ImageConfig::default()
            .validate()
            .expect("default config should be valid");
    }

    #[test]
    fn load_fills_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp config failed");
        write!(file, r#"{{ "max_concurrent_requests": 2, "request_timeout_ms": 0 }}"#)
            .expect("write temp config failed");

        let config = ImageConfig::load(file.path()).expect("load config should succeed");

        assert_eq!(config.max_concurrent_requests, 2);
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.max_file_size, ImageConfig::default().max_file_size);
    }

    #[test]
    fn load_rejects_out_of_range_values() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp config failed");
        write!(file, r#"{{ "max_concurrent_requests": 0 }}"#).expect("write temp config failed");

        let result = ImageConfig::load(file.path());
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn load_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp config failed");
        write!(file, "not json").expect("write temp config failed");

        assert!(matches!(ImageConfig::load(file.path()), Err(AppError::Config(_))));
    }

    #[test]
    fn output_dir_falls_back_to_temp_dir() {
        let config = ImageConfig::default();
        assert_eq!(config.resolved_output_dir(), std::env::temp_dir());
    }
}
