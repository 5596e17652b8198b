//! # 命令层
//!
//! ## 设计思路
//!
//! 命令层仅做参数接收与结果返回，不承载业务逻辑。
//! 所有实际处理交由 `ImageServiceState`，保持命令函数薄、稳定、易测试。
//!
//! 三个命令与前端绑定一一对应：
//! - `ProcessImage(imagePath, options) -> string`
//! - `ProcessImageFromBase64(base64Data, options) -> string`
//! - `GetSupportedFormats() -> string[]`
//!
//! 错误统一上转为 `AppError`，序列化后只剩一条人类可读消息。

use std::path::PathBuf;

use super::{ImageError, ImageServiceState, ProcessOptions};
use crate::error::AppError;

/// 处理本地图片，返回输出文件路径。
pub async fn process_image(
    state: &ImageServiceState,
    image_path: String,
    options: ProcessOptions,
) -> Result<String, AppError> {
    let processed = state
        .process_image(PathBuf::from(image_path), options)
        .await?;
    output_path_string(processed.output_path)
}

/// 处理 Base64 图片，返回输出文件路径。
pub async fn process_image_from_base64(
    state: &ImageServiceState,
    base64_data: String,
    options: ProcessOptions,
) -> Result<String, AppError> {
    let processed = state.process_base64(base64_data, options).await?;
    output_path_string(processed.output_path)
}

/// 查询后端启用的输出格式。
pub fn get_supported_formats(state: &ImageServiceState) -> Vec<String> {
    state
        .supported_formats()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn output_path_string(path: Option<PathBuf>) -> Result<String, AppError> {
    path.map(|p| p.to_string_lossy().into_owned())
        .ok_or_else(|| AppError::Image(ImageError::IoFailure("未生成输出文件".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_handler::{CropArea, ImageConfig};
    use base64::{Engine as _, engine::general_purpose};
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, 128, 255])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    #[tokio::test]
    async fn process_image_returns_output_path_string() {
        let dir = tempfile::tempdir().expect("create temp dir failed");
        let input = dir.path().join("shot.png");
        std::fs::write(&input, create_png_bytes(50, 40)).expect("write input failed");

        let state = ImageServiceState::new();
        let options = ProcessOptions {
            format: "gif".to_string(),
            quality: 50,
            crop: Some(CropArea { x: 0, y: 0, width: 25, height: 20 }),
        };

        let path = process_image(&state, input.to_string_lossy().into_owned(), options)
            .await
            .expect("command should succeed");

        assert!(path.ends_with("shot_processed.gif"));
        let decoded = image::open(&path).expect("output should decode");
        assert_eq!((decoded.width(), decoded.height()), (25, 20));
    }

    #[tokio::test]
    async fn errors_serialize_to_plain_message() {
        let dir = tempfile::tempdir().expect("create temp dir failed");
        let state = ImageServiceState::with_config(ImageConfig {
            output_dir: Some(dir.path().to_path_buf()),
            ..ImageConfig::default()
        });
        let encoded = general_purpose::STANDARD.encode(create_png_bytes(100, 100));
        let options = ProcessOptions {
            format: "png".to_string(),
            quality: 90,
            crop: Some(CropArea { x: 50, y: 50, width: 100, height: 100 }),
        };

        let err = process_image_from_base64(&state, encoded, options)
            .await
            .expect_err("out-of-bounds crop must fail");

        let json = serde_json::to_value(&err).expect("serialize error");
        let message = json.as_str().expect("error should serialize as a string");
        assert!(message.contains("裁剪区域无效"));
        assert!(message.contains("x(50)"));
        assert_eq!(std::fs::read_dir(dir.path()).expect("list dir").count(), 0);
    }

    #[test]
    fn supported_formats_are_strings() {
        let formats = get_supported_formats(&ImageServiceState::new());
        assert_eq!(formats.first().map(String::as_str), Some("jpeg"));
        assert!(formats.iter().any(|f| f == "bmp"));
    }
}
