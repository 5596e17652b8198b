//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义边界统一的 `AppError` 枚举，所有对外操作统一返回 `Result<T, AppError>`。
//! 内部仍保留结构化的 `ImageError`，只在边界处压平成一条消息。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ImageError` 与 `std::io::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，满足桥接协议要求。

use serde::Serialize;

use crate::image_handler::ImageError;

/// 应用级统一错误类型
///
/// 所有边界操作均返回此类型，确保调用方收到一致的错误格式。
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片处理流水线错误（加载 / 解码 / 裁剪 / 编码 / 落盘）
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 文件系统或标准输入输出错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件缺失、格式错误或取值越界
    #[error("配置错误: {0}")]
    Config(String),

    /// 桥接请求格式错误或方法未知
    #[error("请求格式错误: {0}")]
    Protocol(String),
}

/// 桥接协议要求返回值实现 `Serialize`。
/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
