//! # Picverter 图片处理后端 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            前端 (拖放区 · 裁剪框 · 格式/质量控件)           │
//! │                                                          │
//! │  ProcessImage / ProcessImageFromBase64 / GetSupportedFormats
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ stdin/stdout JSON 行 (Result<T, AppError> → result / error)
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            后端 (Rust)                           │
//! │                                                          │
//! │  ┌─ bridge ───── 请求解析 · 并发派发 · 响应回写            │
//! │  │                                                       │
//! │  ├─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  └─ image_handler                                        │
//! │      ├─ service    有界工作池 · 超时 · 取消令牌           │
//! │      ├─ handler    加载 → 解码 → 裁剪 → 编码 → 落盘       │
//! │      └─ 各阶段     loader / decoder / crop / encoder / output
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，所有边界操作的返回类型 |
//! | [`bridge`] | JSON 行协议：解析请求、并发执行、按 `id` 回写响应 |
//! | [`image_handler`] | 按内容识别解码、裁剪、重新编码并原子写出结果 |

pub mod error;
pub mod bridge;
pub mod image_handler;
