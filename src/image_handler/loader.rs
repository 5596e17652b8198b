//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（Base64 / 本地文件 / 内存字节）的原始字节加载，
//! 并在“尽可能早”的阶段执行体积校验。目标是尽快失败，减少不必要内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! - Base64：可选 Data URL 前缀剥离 + 解码前体积估算 + 解码后体积复核。
//! - 文件：metadata 体积限制 + 读取。
//! - 内容识别不在本阶段进行，统一交给 `decoder`（只信任字节内容，不信任扩展名）。

use base64::{Engine as _, engine::general_purpose};
use std::path::Path;

use super::source::RawImageData;
use super::{ImageConfig, ImageError, ImageHandler, ImageSource};

impl ImageHandler {
    /// 按来源加载原始字节，体积上限取自处理器配置。
    pub(crate) fn load_source(&self, source: ImageSource) -> Result<RawImageData, ImageError> {
        let config = &*self.config;
        match source {
            ImageSource::Base64(data) => Self::load_from_base64(&data, config),
            ImageSource::FilePath(path) => Self::load_from_file(&path, config),
            ImageSource::Bytes(bytes) => Self::load_from_bytes(bytes, config),
        }
    }

    /// 从 Base64 字符串加载图片原始字节。
    pub(super) fn load_from_base64(
        data: &str,
        config: &ImageConfig,
    ) -> Result<RawImageData, ImageError> {
        log::debug!("📝 开始处理 base64 图片（{} 字符）", data.len());

        let bytes = Self::parse_base64_with_limit(data, config.max_file_size)?;
        let raw = Self::load_from_bytes(bytes, config)?;

        Ok(RawImageData {
            source_hint: "base64",
            ..raw
        })
    }

    /// 从本地路径加载图片原始字节。
    pub(super) fn load_from_file(
        path: &Path,
        config: &ImageConfig,
    ) -> Result<RawImageData, ImageError> {
        log::debug!("📁 开始读取本地图片 - 路径: {}", path.display());

        let metadata = std::fs::metadata(path).map_err(|e| {
            ImageError::IoFailure(format!("无法读取文件信息 '{}'：{}", path.display(), e))
        })?;

        if !metadata.is_file() {
            return Err(ImageError::IoFailure(format!(
                "不是普通文件：{}",
                path.display()
            )));
        }

        Self::check_file_size(metadata.len(), config)?;

        let bytes = std::fs::read(path).map_err(|e| {
            ImageError::IoFailure(format!("无法读取图片文件 '{}'：{}", path.display(), e))
        })?;
        let raw = Self::load_from_bytes(bytes, config)?;

        Ok(RawImageData {
            source_hint: "file",
            ..raw
        })
    }

    pub(super) fn load_from_bytes(
        bytes: Vec<u8>,
        config: &ImageConfig,
    ) -> Result<RawImageData, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::EmptyInput);
        }
        Self::check_file_size(bytes.len() as u64, config)?;

        Ok(RawImageData {
            bytes,
            source_hint: "bytes",
        })
    }

    fn check_file_size(len: u64, config: &ImageConfig) -> Result<(), ImageError> {
        if len > config.max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                len as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        Ok(())
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, ImageError> {
        let len = base64_data.len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| ImageError::ResourceLimit("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| ImageError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
    }

    /// 解析 Base64 输入（支持 Data URL / 纯 Base64），解码前先按长度估算拒绝超大负载。
    pub(crate) fn parse_base64_with_limit(
        data: &str,
        max_file_size: u64,
    ) -> Result<Vec<u8>, ImageError> {
        let normalized = data.trim();

        let base64_data = if normalized.starts_with("data:") {
            let base64_start = normalized
                .find(";base64,")
                .ok_or_else(|| ImageError::CorruptData("Data URL 缺少 base64 标记".to_string()))?;
            &normalized[base64_start + 8..]
        } else {
            normalized
        };

        if base64_data.is_empty() {
            return Err(ImageError::EmptyInput);
        }

        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(base64_data)?;
        if estimated_len > max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
                estimated_len as f64 / 1024.0 / 1024.0,
                max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        general_purpose::STANDARD
            .decode(base64_data)
            .map_err(|e| ImageError::CorruptData(format!("Base64 解码失败：{}", e)))
    }
}
