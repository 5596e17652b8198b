// Tests for the JSON-lines bridge serving all three boundary operations
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use image::{Rgba, RgbaImage};
use picverter::bridge;
use picverter::image_handler::{ImageConfig, ImageServiceState};
use serde_json::{Value, json};

fn png_base64(width: u32, height: u32) -> String {
    let image = RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 200, 255]));
    let mut cursor = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, image::ImageFormat::Png)
        .expect("failed to encode fixture");
    general_purpose::STANDARD.encode(cursor.into_inner())
}

async fn run_session(state: ImageServiceState, requests: &[Value]) -> Vec<Value> {
    let mut input = String::new();
    for request in requests {
        input.push_str(&request.to_string());
        input.push('\n');
    }

    let mut output = Vec::new();
    bridge::serve(Arc::new(state), input.as_bytes(), &mut output)
        .await
        .expect("bridge session should finish");

    String::from_utf8(output)
        .expect("utf-8 output")
        .lines()
        .map(|line| serde_json::from_str(line).expect("response line is json"))
        .collect()
}

fn response_for(responses: &[Value], id: i64) -> &Value {
    responses
        .iter()
        .find(|r| r["id"] == json!(id))
        .expect("response for id")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_mixed_session_answers_each_request_by_id() {
        let dir = tempfile::tempdir().expect("create temp dir failed");
        let input_path = dir.path().join("drop.png");
        let png = general_purpose::STANDARD
            .decode(png_base64(60, 40))
            .expect("fixture base64 decodes");
        std::fs::write(&input_path, png).expect("write fixture failed");

        let state = ImageServiceState::with_config(ImageConfig {
            output_dir: Some(dir.path().join("uploads")),
            ..ImageConfig::default()
        });

        let requests = [
            json!({"id": 1, "method": "GetSupportedFormats"}),
            json!({
                "id": 2,
                "method": "ProcessImage",
                "params": {
                    "imagePath": input_path.to_string_lossy(),
                    "options": {"format": "jpg", "quality": 70, "crop": {"x": 10, "y": 5, "width": 30, "height": 20}}
                }
            }),
            json!({
                "id": 3,
                "method": "ProcessImageFromBase64",
                "params": {
                    "base64Data": png_base64(16, 16),
                    "options": {"format": "bmp", "quality": 90}
                }
            }),
            json!({
                "id": 4,
                "method": "ProcessImageFromBase64",
                "params": {
                    "base64Data": png_base64(16, 16),
                    "options": {"format": "png", "quality": 90, "crop": {"x": 8, "y": 8, "width": 16, "height": 16}}
                }
            }),
        ];

        let responses = run_session(state, &requests).await;
        assert_eq!(responses.len(), 4);

        let formats = &response_for(&responses, 1)["result"];
        assert!(formats.as_array().expect("array").contains(&json!("png")));

        let jpeg_path = response_for(&responses, 2)["result"]
            .as_str()
            .expect("path result");
        assert_eq!(jpeg_path, dir.path().join("drop_processed.jpeg").to_string_lossy());
        let jpeg = image::open(jpeg_path).expect("jpeg output decodes");
        assert_eq!((jpeg.width(), jpeg.height()), (30, 20));

        let bmp_path = response_for(&responses, 3)["result"]
            .as_str()
            .expect("path result");
        assert!(bmp_path.ends_with("_processed.bmp"));
        assert!(std::path::Path::new(bmp_path).starts_with(dir.path().join("uploads")));

        let crop_error = response_for(&responses, 4)["error"]
            .as_str()
            .expect("error message");
        assert!(crop_error.contains("裁剪区域无效"));
        assert!(response_for(&responses, 4).get("result").is_none());
    }

    #[tokio::test]
    async fn test_malformed_line_gets_null_id_error() {
        let mut output = Vec::new();
        let input = "{\"id\": 5, \"method\": \n";

        bridge::serve(Arc::new(ImageServiceState::new()), input.as_bytes(), &mut output)
            .await
            .expect("bridge session should finish");

        let response: Value = serde_json::from_slice(&output).expect("single json response");
        assert_eq!(response["id"], Value::Null);
        assert!(response["error"].as_str().expect("message").starts_with("请求格式错误"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_end_session() {
        let mut input = Vec::new();
        input.extend_from_slice(json!({"id": 1, "method": "GetSupportedFormats"}).to_string().as_bytes());
        input.extend_from_slice(b"\n\xff\xfe\n");
        input.extend_from_slice(json!({"id": 2, "method": "GetSupportedFormats"}).to_string().as_bytes());
        input.push(b'\n');

        let mut output = Vec::new();
        bridge::serve(Arc::new(ImageServiceState::new()), input.as_slice(), &mut output)
            .await
            .expect("bridge session should finish");

        let responses: Vec<Value> = String::from_utf8(output)
            .expect("utf-8 output")
            .lines()
            .map(|line| serde_json::from_str(line).expect("response line is json"))
            .collect();
        assert_eq!(responses.len(), 3);
        assert!(response_for(&responses, 1)["result"].is_array());
        assert!(response_for(&responses, 2)["result"].is_array());

        let rejected = responses
            .iter()
            .find(|r| r["id"].is_null())
            .expect("null-id response");
        assert!(rejected.get("result").is_none());
        assert!(rejected["error"].as_str().expect("message").starts_with("请求格式错误"));
    }
}
