//! # 解码模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → RGBA”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! 格式只按文件签名（magic bytes）识别，调用方给出的扩展名一概不参考。
//!
//! ## 实现思路
//!
//! 1. `infer` 粗筛：识别为非图片类型时直接拒绝
//! 2. `image::guess_format` 确定容器格式，未知签名 → `UnsupportedFormat`
//! 3. 读取 header 尺寸并按像素 / 内存上限快速拒绝
//! 4. 完整解码，解码中途失败 → `CorruptData`
//! 5. 转换为 RGBA8，并校验字节长度一致性

use image::{ImageFormat, ImageReader};
use std::io::Cursor;

use super::source::DecodedImage;
use super::{ImageConfig, ImageError};

/// 仅按内容识别容器格式。
///
/// # 示例
/// ```rust
/// use picverter::image_handler::decoder::detect_format;
///
/// let gif_header = b"GIF89a\x01\x00\x01\x00\x00\x00\x00";
/// assert_eq!(detect_format(gif_header)?, image::ImageFormat::Gif);
/// # Ok::<(), picverter::image_handler::ImageError>(())
/// ```
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyInput);
    }

    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ImageError::UnsupportedFormat(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }
    }

    let format = image::guess_format(bytes)
        .map_err(|_| ImageError::UnsupportedFormat("无法识别图片类型".to_string()))?;

    if !format.reading_enabled() {
        return Err(ImageError::UnsupportedFormat(format!(
            "未启用 {:?} 解码器",
            format
        )));
    }

    Ok(format)
}

/// 将原始字节解码为 RGBA8 像素缓冲。
pub fn decode(bytes: &[u8], config: &ImageConfig) -> Result<DecodedImage, ImageError> {
    let format = detect_format(bytes)?;

    let (header_width, header_height) = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| map_decode_error(format, e))?;
    validate_pixel_limits(config, header_width, header_height)?;
    validate_decoded_memory_limits(config, header_width, header_height)?;

    let decoded = ImageReader::with_format(Cursor::new(bytes), format)
        .decode()
        .map_err(|e| map_decode_error(format, e))?;

    let pixels = decoded.into_rgba8();
    let (width, height) = pixels.dimensions();

    if width == 0 || height == 0 {
        return Err(ImageError::CorruptData(format!(
            "解码结果尺寸为空：{}x{}",
            width, height
        )));
    }
    validate_pixel_limits(config, width, height)?;

    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| ImageError::ResourceLimit("图片尺寸导致内存溢出风险".to_string()))?;

    if pixels.as_raw().len() != expected_len {
        return Err(ImageError::CorruptData("解码后像素数据长度异常".to_string()));
    }

    log::debug!("🔍 图片解码成功 - 格式: {:?} 尺寸: {}x{}", format, width, height);

    Ok(DecodedImage {
        source_format: format,
        pixels,
    })
}

fn map_decode_error(format: ImageFormat, error: image::ImageError) -> ImageError {
    match error {
        image::ImageError::Unsupported(e) => {
            ImageError::UnsupportedFormat(format!("{:?} 解码器不支持该图片：{}", format, e))
        }
        image::ImageError::Limits(e) => {
            ImageError::ResourceLimit(format!("解码超出内存限制：{}", e))
        }
        other => ImageError::CorruptData(format!("{:?} 解码失败：{}", format, other)),
    }
}

/// 校验像素数量是否超过配置上限。
fn validate_pixel_limits(config: &ImageConfig, width: u32, height: u32) -> Result<(), ImageError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| ImageError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(ImageError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    Ok(())
}

fn validate_decoded_memory_limits(
    config: &ImageConfig,
    width: u32,
    height: u32,
) -> Result<(), ImageError> {
    let estimated = (width as u64)
        .checked_mul(height as u64)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| ImageError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

    if estimated > config.max_decoded_bytes {
        return Err(ImageError::ResourceLimit(format!(
            "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
            estimated as f64 / 1024.0 / 1024.0,
            config.max_decoded_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, Rgba};

    fn encode_test_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 255])
        });

        let dyn_img = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8()),
            _ => DynamicImage::ImageRgba8(img),
        };

        let mut cursor = Cursor::new(Vec::new());
        dyn_img
            .write_to(&mut cursor, format)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    #[test]
    fn decodes_each_common_container() {
        let config = ImageConfig::default();
        for format in [
            ImageFormat::Png,
            ImageFormat::Jpeg,
            ImageFormat::Gif,
            ImageFormat::Bmp,
        ] {
            let bytes = encode_test_image(37, 21, format);
            let decoded = decode(&bytes, &config).expect("decode should succeed");

            assert_eq!(decoded.source_format, format);
            assert_eq!((decoded.width(), decoded.height()), (37, 21));
            assert_eq!(decoded.pixels.as_raw().len(), 37 * 21 * 4);
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            decode(&[], &ImageConfig::default()),
            Err(ImageError::EmptyInput)
        ));
    }

    #[test]
    fn unknown_signature_is_unsupported() {
        let payload = b"<html><body>not an image</body></html>";
        assert!(matches!(
            decode(payload, &ImageConfig::default()),
            Err(ImageError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn non_image_signature_is_unsupported() {
        let zip = b"PK\x03\x04\x14\x00\x00\x00\x08\x00";
        assert!(matches!(
            detect_format(zip),
            Err(ImageError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn truncated_stream_is_corrupt() {
        let bytes = encode_test_image(64, 64, ImageFormat::Png);
        let truncated = &bytes[..bytes.len() / 2];

        assert!(matches!(
            decode(truncated, &ImageConfig::default()),
            Err(ImageError::CorruptData(_))
        ));
    }

    #[test]
    fn header_only_signature_is_corrupt() {
        let png_signature = [137_u8, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13];
        assert_eq!(
            detect_format(&png_signature).expect("signature should be detected"),
            ImageFormat::Png
        );
        assert!(matches!(
            decode(&png_signature, &ImageConfig::default()),
            Err(ImageError::CorruptData(_))
        ));
    }

    #[test]
    fn rejects_too_many_pixels_before_full_decode() {
        let config = ImageConfig {
            max_decoded_pixels: 1_000,
            ..ImageConfig::default()
        };
        let bytes = encode_test_image(100, 100, ImageFormat::Png);

        assert!(matches!(
            decode(&bytes, &config),
            Err(ImageError::ResourceLimit(_))
        ));
    }
}
