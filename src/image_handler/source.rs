//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示外部来源语义
//! - `RawImageData` 表示已加载但未解码的字节
//! - `DecodedImage` 表示解码后的 RGBA8 像素缓冲（单次请求独占）
//! - `ProcessedImage` 表示最终编码结果
//!
//! 所有中间值都按值在阶段之间移动，任何阶段返回错误时由 `Drop` 立即释放。

use std::path::PathBuf;

use image::{ImageFormat, RgbaImage};

use super::OutputFormat;

/// 图片输入来源。
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// 纯 Base64 字符串（也容忍 Data URL 前缀）。
    Base64(String),
    /// 本地文件路径来源。
    FilePath(PathBuf),
    /// 调用方已持有的原始字节。
    Bytes(Vec<u8>),
}

/// 编码结果的去向。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// 仅返回字节，不落盘。
    Memory,
    /// 原子写入到指定路径（已存在则替换）。
    File(PathBuf),
    /// 在目录下生成唯一文件名写入。
    UniqueIn(PathBuf),
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 解码阶段输出：RGBA8 像素缓冲。
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// 按内容识别出的容器格式。
    pub source_format: ImageFormat,
    pub pixels: RgbaImage,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// 一次处理的成功结果。
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// 目标容器格式的完整字节。
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    /// 落盘路径；`OutputTarget::Memory` 时为 `None`。
    pub output_path: Option<PathBuf>,
}
