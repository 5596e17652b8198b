//! # 编码模块
//!
//! ## 设计思路
//!
//! 纯函数：RGBA8 缓冲 + 目标格式 + 质量 → 目标容器字节，无任何副作用。
//! 相同输入总是得到逐字节相同的输出（各编码器均为确定性实现）。
//!
//! | 格式 | 实现 | 质量参数 |
//! |------|------|----------|
//! | jpeg | `image::codecs::jpeg::JpegEncoder`（先丢弃 alpha） | 1~100 直接映射 |
//! | png  | `image::codecs::png::PngEncoder` | 忽略 |
//! | webp | `webp::Encoder`（libwebp 有损） | 1~100 映射为 libwebp 的 0~100 浮点 |
//! | gif  | `image::codecs::gif::GifEncoder`（NeuQuant 量化为 256 色） | 忽略 |
//! | bmp  | `image::codecs::bmp::BmpEncoder`（32 位 BGRA） | 忽略 |

use image::codecs::bmp::BmpEncoder;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, Frame, RgbaImage};

use super::source::DecodedImage;
use super::{ImageError, OutputFormat, Quality};

/// JPEG 规范的单边尺寸上限。
const JPEG_MAX_DIMENSION: u32 = 65_535;
/// GIF 逻辑屏幕宽高为 16 位字段。
const GIF_MAX_DIMENSION: u32 = 65_535;
/// NeuQuant 采样步长（1 最慢最精细，30 最快）。
const GIF_QUANTIZE_SPEED: i32 = 10;
/// libwebp 的单边尺寸上限。
#[cfg(feature = "webp")]
const WEBP_MAX_DIMENSION: u32 = 16_383;

/// 将解码图片编码为目标格式。
///
/// `quality` 只对 jpeg / webp 生效且此时必须提供，缺失即 `EncodeFailure`；
/// 其余格式忽略该参数。
pub fn encode(
    image: &DecodedImage,
    format: OutputFormat,
    quality: Option<Quality>,
) -> Result<Vec<u8>, ImageError> {
    let pixels = &image.pixels;

    let estimated = (pixels.width() as usize)
        .saturating_mul(pixels.height() as usize)
        .saturating_mul(4);
    let mut buffer = Vec::with_capacity(estimated / 4);

    match format {
        OutputFormat::Jpeg => encode_jpeg(pixels, &mut buffer, required_quality(format, quality)?)?,
        OutputFormat::Png => encode_png(pixels, &mut buffer)?,
        OutputFormat::WebP => encode_webp(pixels, &mut buffer, required_quality(format, quality)?)?,
        OutputFormat::Gif => encode_gif(pixels, &mut buffer)?,
        OutputFormat::Bmp => encode_bmp(pixels, &mut buffer)?,
    }

    if buffer.is_empty() {
        return Err(ImageError::EncodeFailure(format!(
            "{} 编码器未产生任何数据",
            format.as_str()
        )));
    }

    Ok(buffer)
}

fn required_quality(format: OutputFormat, quality: Option<Quality>) -> Result<u8, ImageError> {
    quality.map(Quality::get).ok_or_else(|| {
        ImageError::EncodeFailure(format!("{} 编码需要质量参数", format.as_str()))
    })
}

fn ensure_max_dimension(
    pixels: &RgbaImage,
    max: u32,
    format: OutputFormat,
) -> Result<(), ImageError> {
    if pixels.width() > max || pixels.height() > max {
        return Err(ImageError::EncodeFailure(format!(
            "{} 不支持 {}x{} 的尺寸（单边上限 {}）",
            format.as_str(),
            pixels.width(),
            pixels.height(),
            max
        )));
    }
    Ok(())
}

fn encoder_error(format: OutputFormat, error: image::ImageError) -> ImageError {
    ImageError::EncodeFailure(format!("{} 编码失败：{}", format.as_str(), error))
}

fn encode_jpeg(pixels: &RgbaImage, buffer: &mut Vec<u8>, quality: u8) -> Result<(), ImageError> {
    ensure_max_dimension(pixels, JPEG_MAX_DIMENSION, OutputFormat::Jpeg)?;

    // JPEG 不支持 alpha 通道
    let rgb = DynamicImage::ImageRgba8(pixels.clone()).to_rgb8();
    let encoder = JpegEncoder::new_with_quality(buffer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| encoder_error(OutputFormat::Jpeg, e))
}

fn encode_png(pixels: &RgbaImage, buffer: &mut Vec<u8>) -> Result<(), ImageError> {
    let encoder = PngEncoder::new(buffer);
    pixels
        .write_with_encoder(encoder)
        .map_err(|e| encoder_error(OutputFormat::Png, e))
}

fn encode_bmp(pixels: &RgbaImage, buffer: &mut Vec<u8>) -> Result<(), ImageError> {
    let encoder = BmpEncoder::new(buffer);
    pixels
        .write_with_encoder(encoder)
        .map_err(|e| encoder_error(OutputFormat::Bmp, e))
}

fn encode_gif(pixels: &RgbaImage, buffer: &mut Vec<u8>) -> Result<(), ImageError> {
    ensure_max_dimension(pixels, GIF_MAX_DIMENSION, OutputFormat::Gif)?;

    // 编码器在 drop 时才写入 GIF 结尾标记，需限定作用域
    {
        let mut encoder = GifEncoder::new_with_speed(&mut *buffer, GIF_QUANTIZE_SPEED);
        encoder
            .encode_frame(Frame::new(pixels.clone()))
            .map_err(|e| encoder_error(OutputFormat::Gif, e))?;
    }

    Ok(())
}

#[cfg(feature = "webp")]
fn encode_webp(pixels: &RgbaImage, buffer: &mut Vec<u8>, quality: u8) -> Result<(), ImageError> {
    ensure_max_dimension(pixels, WEBP_MAX_DIMENSION, OutputFormat::WebP)?;

    let encoder = webp::Encoder::from_rgba(pixels.as_raw(), pixels.width(), pixels.height());
    let memory = encoder
        .encode_simple(false, f32::from(quality))
        .map_err(|e| ImageError::EncodeFailure(format!("webp 编码失败：{:?}", e)))?;

    buffer.extend_from_slice(&memory);
    Ok(())
}

#[cfg(not(feature = "webp"))]
fn encode_webp(_pixels: &RgbaImage, _buffer: &mut Vec<u8>, _quality: u8) -> Result<(), ImageError> {
    Err(ImageError::UnsupportedFormat(
        "当前构建未启用 webp 编码".to_string(),
    ))
}
