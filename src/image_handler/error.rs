//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载图片链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 边界层（`AppError`）只把 `Display` 文本交给前端；
//! 结构化分支、`code()` 与 `stage()` 留在后端用于日志与测试。

/// 裁剪区域校验失败的具体原因。
///
/// 每个分支都携带越界数值，保证前端提示能指出是哪条边界出错。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CropViolation {
    #[error("裁剪宽度必须大于 0")]
    ZeroWidth,

    #[error("裁剪高度必须大于 0")]
    ZeroHeight,

    #[error("裁剪参数 {field} 不能为负数：{value}")]
    NegativeCoordinate { field: &'static str, value: i64 },

    #[error("裁剪参数 {field} 超出范围：{value}")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("裁剪区域横向越界：x({x}) + width({width}) > 原图宽度 {source_width}")]
    ExceedsWidth {
        x: u32,
        width: u32,
        source_width: u32,
    },

    #[error("裁剪区域纵向越界：y({y}) + height({height}) > 原图高度 {source_height}")]
    ExceedsHeight {
        y: u32,
        height: u32,
        source_height: u32,
    },
}

/// 图片处理统一错误类型。
///
/// 该类型会在命令层被上转为 `AppError`，最终以字符串透传给前端。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("输入为空：没有可处理的图片数据")]
    EmptyInput,

    #[error("不支持的格式：{0}")]
    UnsupportedFormat(String),

    #[error("图片数据损坏：{0}")]
    CorruptData(String),

    #[error("裁剪区域无效：{0}")]
    InvalidCropRegion(#[from] CropViolation),

    #[error("质量参数无效：{0}（有效范围 1~100）")]
    InvalidQuality(i64),

    #[error("编码失败：{0}")]
    EncodeFailure(String),

    #[error("文件错误：{0}")]
    IoFailure(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("超时错误：{0}")]
    Timeout(String),
}

impl ImageError {
    /// 稳定错误码，供日志检索与后续结构化协议使用。
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "E_EMPTY_INPUT",
            Self::UnsupportedFormat(_) => "E_UNSUPPORTED_FORMAT",
            Self::CorruptData(_) => "E_CORRUPT_DATA",
            Self::InvalidCropRegion(_) => "E_INVALID_CROP",
            Self::InvalidQuality(_) => "E_INVALID_QUALITY",
            Self::EncodeFailure(_) => "E_ENCODE",
            Self::IoFailure(_) => "E_IO",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
            Self::Timeout(_) => "E_TIMEOUT",
        }
    }

    /// 错误归属的流水线阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::EmptyInput | Self::ResourceLimit(_) => "load",
            Self::UnsupportedFormat(_) | Self::CorruptData(_) => "decode",
            Self::InvalidCropRegion(_) => "crop",
            Self::InvalidQuality(_) | Self::EncodeFailure(_) => "encode",
            Self::IoFailure(_) => "persist",
            Self::Timeout(_) => "schedule",
        }
    }

    /// 调用方是否可能在纠正外部条件（磁盘空间、权限、负载）后重试。
    ///
    /// 引擎自身从不重试。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::IoFailure(_) | Self::Timeout(_))
    }
}
