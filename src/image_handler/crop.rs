//! # 裁剪模块
//!
//! 纯子矩形提取：逐行拷贝 `[y, y+height)` 行中的 `[x, x+width)` 列，不插值、不取整、不夹紧。
//! 越界时返回指明具体边界的 `InvalidCropRegion`，保证输出与编辑器预览完全一致。

use image::RgbaImage;

use super::error::CropViolation;
use super::source::DecodedImage;
use super::{CropRect, ImageError};

const CHANNELS: usize = 4;

/// 校验裁剪矩形是否完全落在 `source_width x source_height` 内。
pub fn validate_crop(
    rect: &CropRect,
    source_width: u32,
    source_height: u32,
) -> Result<(), CropViolation> {
    if rect.width == 0 {
        return Err(CropViolation::ZeroWidth);
    }
    if rect.height == 0 {
        return Err(CropViolation::ZeroHeight);
    }

    // u64 相加避免 u32 溢出后“绕回”通过校验
    if u64::from(rect.x) + u64::from(rect.width) > u64::from(source_width) {
        return Err(CropViolation::ExceedsWidth {
            x: rect.x,
            width: rect.width,
            source_width,
        });
    }
    if u64::from(rect.y) + u64::from(rect.height) > u64::from(source_height) {
        return Err(CropViolation::ExceedsHeight {
            y: rect.y,
            height: rect.height,
            source_height,
        });
    }

    Ok(())
}

/// 按可选裁剪矩形处理图片；`None` 原样返回（恒等操作）。
pub fn apply_crop(image: DecodedImage, crop: Option<&CropRect>) -> Result<DecodedImage, ImageError> {
    let Some(rect) = crop else {
        return Ok(image);
    };

    validate_crop(rect, image.width(), image.height())?;

    if rect.x == 0 && rect.y == 0 && rect.width == image.width() && rect.height == image.height() {
        return Ok(image);
    }

    let pixels = copy_region(&image.pixels, rect)?;

    Ok(DecodedImage {
        source_format: image.source_format,
        pixels,
    })
}

/// 逐行拷贝子矩形，调用前必须已通过 `validate_crop`。
fn copy_region(source: &RgbaImage, rect: &CropRect) -> Result<RgbaImage, ImageError> {
    let source_stride = source.width() as usize * CHANNELS;
    let row_len = rect.width as usize * CHANNELS;
    let left = rect.x as usize * CHANNELS;

    let capacity = row_len
        .checked_mul(rect.height as usize)
        .ok_or_else(|| ImageError::ResourceLimit("裁剪结果尺寸溢出".to_string()))?;
    let mut out = Vec::with_capacity(capacity);

    let raw = source.as_raw();
    for row in rect.y as usize..(rect.y + rect.height) as usize {
        let start = row * source_stride + left;
        out.extend_from_slice(&raw[start..start + row_len]);
    }

    RgbaImage::from_raw(rect.width, rect.height, out)
        .ok_or_else(|| ImageError::CorruptData("裁剪结果像素长度异常".to_string()))
}
