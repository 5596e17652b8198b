//! # 桥接层（JSON 行协议）
//!
//! ## 设计思路
//!
//! 宿主 UI 通过子进程的标准输入输出调用后端，每行一个 JSON 消息：
//!
//! ```text
//! → {"id":1,"method":"ProcessImage","params":{"imagePath":"/a.png","options":{"format":"jpeg","quality":80}}}
//! ← {"id":1,"result":"/a_processed.jpeg"}
//! ← {"id":2,"error":"不支持的格式：tiff"}
//! ```
//!
//! ## 实现思路
//!
//! - 每个请求一个 tokio 任务，互不阻塞；响应可能乱序，调用方按 `id` 关联。
//! - 所有响应经 `mpsc` 汇入唯一的写循环，避免多任务交错写出半行。
//! - 无法解析或不是有效 UTF-8 的行回复 `id: null` 的错误响应，不中断服务。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::image_handler::{self, ImageServiceState, ProcessOptions};

/// 写循环的缓冲深度。
const RESPONSE_CHANNEL_CAPACITY: usize = 64;

/// 一行请求。
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// 一行响应；`result` 与 `error` 恰有一个存在。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeResponse {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, error: &AppError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessImageParams {
    image_path: String,
    options: ProcessOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessBase64Params {
    base64_data: String,
    options: ProcessOptions,
}

/// 执行单个请求并生成响应。
pub async fn dispatch(state: &ImageServiceState, request: BridgeRequest) -> BridgeResponse {
    let id = request.id.clone();
    match handle(state, request).await {
        Ok(result) => BridgeResponse::ok(id, result),
        Err(err) => BridgeResponse::err(id, &err),
    }
}

async fn handle(state: &ImageServiceState, request: BridgeRequest) -> Result<Value, AppError> {
    log::debug!("📨 收到请求 - id={} method={}", request.id, request.method);

    match request.method.as_str() {
        "ProcessImage" => {
            let params: ProcessImageParams = parse_params(request.params)?;
            let path =
                image_handler::process_image(state, params.image_path, params.options).await?;
            Ok(Value::String(path))
        }
        "ProcessImageFromBase64" => {
            let params: ProcessBase64Params = parse_params(request.params)?;
            let path = image_handler::process_image_from_base64(
                state,
                params.base64_data,
                params.options,
            )
            .await?;
            Ok(Value::String(path))
        }
        "GetSupportedFormats" => Ok(Value::from(image_handler::get_supported_formats(state))),
        other => Err(AppError::Protocol(format!("未知方法 '{}'", other))),
    }
}

fn parse_params<T>(params: Value) -> Result<T, AppError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(params).map_err(|e| AppError::Protocol(format!("参数无效：{}", e)))
}

/// 解析一行原始字节；失败时直接给出 `id: null` 的错误响应。
///
/// 空行返回 `Ok(None)`。
fn parse_line(raw: &[u8]) -> Result<Option<BridgeRequest>, BridgeResponse> {
    let line = std::str::from_utf8(raw).map_err(|e| {
        log::warn!("⚠️ 请求行不是有效的 UTF-8：{}", e);
        BridgeResponse::err(
            Value::Null,
            &AppError::Protocol(format!("请求行不是有效的 UTF-8：{}", e)),
        )
    })?;

    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(line).map(Some).map_err(|e| {
        log::warn!("⚠️ 无法解析的请求行：{}", e);
        BridgeResponse::err(Value::Null, &AppError::Protocol(e.to_string()))
    })
}

/// 持续读取请求直到输入结束，所有已派发请求完成后返回。
pub async fn serve<R, W>(
    state: Arc<ImageServiceState>,
    mut reader: R,
    mut writer: W,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (tx, mut rx) = mpsc::channel::<BridgeResponse>(RESPONSE_CHANNEL_CAPACITY);

    let read_loop = async move {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            match parse_line(&buf) {
                Ok(None) => {}
                Ok(Some(request)) => {
                    let state = Arc::clone(&state);
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let response = dispatch(&state, request).await;
                        if tx.send(response).await.is_err() {
                            log::warn!("⚠️ 响应通道已关闭，丢弃结果");
                        }
                    });
                }
                Err(response) => {
                    if tx.send(response).await.is_err() {
                        break;
                    }
                }
            }
        }
        Ok::<(), AppError>(())
    };

    let write_loop = async {
        while let Some(response) = rx.recv().await {
            let mut line = serde_json::to_vec(&response)
                .map_err(|e| AppError::Protocol(format!("响应序列化失败：{}", e)))?;
            line.push(b'\n');
            writer.write_all(&line).await?;
            writer.flush().await?;
        }
        Ok::<(), AppError>(())
    };

    let (read_result, write_result) = tokio::join!(read_loop, write_loop);
    read_result?;
    write_result
}
