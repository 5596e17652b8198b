//! # 请求参数模块
//!
//! ## 设计思路
//!
//! 区分“线上形态”和“已校验形态”：
//! - `ProcessOptions` / `CropArea` 与前端 JSON 一一对应，字段宽松（有符号整数、字符串格式）
//! - `ProcessRequest` / `CropRect` / `OutputFormat` 是校验后的强类型值，流水线只接受后者
//!
//! 质量参数只对 jpeg / webp 有意义，其余格式直接忽略（与前端隐藏滑块的行为一致）。

use serde::{Deserialize, Serialize};

use super::error::CropViolation;
use super::ImageError;

const DEFAULT_QUALITY: i64 = 90;

/// 前端传入的处理参数（线上形态）。
///
/// `crop` 缺省表示不裁剪；`quality` 缺省取 90。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOptions {
    pub format: String,
    #[serde(default = "default_quality")]
    pub quality: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropArea>,
}

fn default_quality() -> i64 {
    DEFAULT_QUALITY
}

/// 前端传入的裁剪区域（线上形态，源图像素坐标）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropArea {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// 已校验的输出格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
}

impl OutputFormat {
    /// 本构建启用的全部输出格式（顺序即 `GetSupportedFormats` 的返回顺序）。
    pub fn enabled() -> Vec<OutputFormat> {
        let mut formats = vec![Self::Jpeg, Self::Png];
        if cfg!(feature = "webp") {
            formats.push(Self::WebP);
        }
        formats.extend([Self::Gif, Self::Bmp]);
        formats
    }

    /// 大小写不敏感解析；`jpg` 视为 `jpeg` 的别名。
    ///
    /// # 示例
    /// ```rust
    /// use picverter::image_handler::OutputFormat;
    ///
    /// assert_eq!(OutputFormat::parse(" JPG ")?, OutputFormat::Jpeg);
    /// # Ok::<(), picverter::image_handler::ImageError>(())
    /// ```
    pub fn parse(format: &str) -> Result<Self, ImageError> {
        let parsed = match format.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Self::Jpeg,
            "png" => Self::Png,
            "webp" => Self::WebP,
            "gif" => Self::Gif,
            "bmp" => Self::Bmp,
            other => {
                return Err(ImageError::UnsupportedFormat(format!(
                    "未知输出格式：{}（可选：jpeg / png / webp / gif / bmp）",
                    other
                )));
            }
        };

        if !parsed.is_enabled() {
            return Err(ImageError::UnsupportedFormat(format!(
                "当前构建未启用 {} 编码",
                parsed.as_str()
            )));
        }

        Ok(parsed)
    }

    /// 稳定字符串，同时用作输出文件扩展名。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
        }
    }

    pub fn uses_quality(self) -> bool {
        matches!(self, Self::Jpeg | Self::WebP)
    }

    pub fn is_enabled(self) -> bool {
        match self {
            Self::WebP => cfg!(feature = "webp"),
            _ => true,
        }
    }
}

/// 已校验的质量值（1~100）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: i64) -> Result<Self, ImageError> {
        if !(1..=100).contains(&value) {
            return Err(ImageError::InvalidQuality(value));
        }
        Ok(Self(value as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// 已完成符号与非零校验的裁剪矩形。
///
/// 与源图尺寸的越界校验在裁剪阶段进行（此时才知道源图宽高）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TryFrom<CropArea> for CropRect {
    type Error = CropViolation;

    fn try_from(area: CropArea) -> Result<Self, Self::Error> {
        let x = non_negative_u32("x", area.x)?;
        let y = non_negative_u32("y", area.y)?;
        let width = non_negative_u32("width", area.width)?;
        let height = non_negative_u32("height", area.height)?;

        if width == 0 {
            return Err(CropViolation::ZeroWidth);
        }
        if height == 0 {
            return Err(CropViolation::ZeroHeight);
        }

        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }
}

fn non_negative_u32(field: &'static str, value: i64) -> Result<u32, CropViolation> {
    if value < 0 {
        return Err(CropViolation::NegativeCoordinate { field, value });
    }
    u32::try_from(value).map_err(|_| CropViolation::OutOfRange { field, value })
}

/// 流水线实际消费的请求参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessRequest {
    pub format: OutputFormat,
    /// 仅 jpeg / webp 为 `Some`。
    pub quality: Option<Quality>,
    pub crop: Option<CropRect>,
}

impl ProcessOptions {
    /// 将线上参数校验为强类型请求。
    ///
    /// 校验顺序：格式 → 质量 → 裁剪矩形自身约束。
    pub fn resolve(&self) -> Result<ProcessRequest, ImageError> {
        let format = OutputFormat::parse(&self.format)?;

        let quality = if format.uses_quality() {
            Some(Quality::new(self.quality)?)
        } else {
            None
        };

        let crop = self.crop.map(CropRect::try_from).transpose()?;

        Ok(ProcessRequest {
            format,
            quality,
            crop,
        })
    }
}
