//! # 图片处理模块（image_handler）
//!
//! ## 设计思路
//!
//! 该模块将“参数校验 → 来源加载 → 内容识别解码 → 裁剪 → 编码 → 原子落盘”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `commands`：仅做边界入参/出参适配（薄封装）
//! - `service`：承载可注入状态（`ImageServiceState`），有界工作池 + 超时
//! - `handler`：编排整条处理流水线
//! - `loader`：负责 Base64/文件/字节加载与体积校验
//! - `decoder`：按魔数识别格式、像素与内存上限、解码为 RGBA8
//! - `crop`：裁剪矩形越界校验与逐行拷贝
//! - `encoder`：jpeg/png/webp/gif/bmp 编码
//! - `output`：输出命名与原子写入
//! - `cancel`：超时方与工作线程之间的取消 / 提交竞争
//! - `config/error/options/source`：配置、错误、请求参数、中间数据模型
//!
//! ## 实现思路
//!
//! 对外仅暴露必要类型与纯函数阶段，内部细节保持 `mod` 私有。
//! 宿主进程通过 `ImageServiceState` 注入状态，提升测试隔离与后续扩展能力。
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! bridge.rs（JSON 行请求）
//!    ↓
//! commands.rs（参数适配）
//!    ↓
//! service.rs（工作池许可 + 超时 + 取消令牌）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ options.rs（格式 / 质量 / 裁剪矩形校验）
//!    ├─ loader.rs（来源加载 + 体积校验）
//!    ├─ decoder.rs（魔数识别 + 像素限制 + 解码）
//!    ├─ crop.rs（越界校验 + 区域拷贝）
//!    ├─ encoder.rs（目标格式编码）
//!    └─ output.rs（原子落盘）
//!    ↓
//! 返回 AppError 给调用方（序列化为一条消息）
//! ```
//!
//! ## 分层职责建议
//!
//! - 调用入口变更（命令名/参数）优先改 `commands.rs` 与 `bridge.rs`
//! - 配置与限额变更优先改 `config.rs`
//! - 业务流程顺序变更优先改 `handler.rs`
//! - 单阶段行为优化分别改 `loader/decoder/crop/encoder/output`

mod cancel;
pub mod commands;
mod config;
pub mod crop;
pub mod decoder;
pub mod encoder;
mod error;
mod handler;
mod loader;
mod options;
pub mod output;
mod service;
mod source;

pub use cancel::CancelToken;
pub use commands::{get_supported_formats, process_image, process_image_from_base64};
pub use config::ImageConfig;
pub use error::{CropViolation, ImageError};
pub use handler::ImageHandler;
pub use options::{CropArea, CropRect, OutputFormat, ProcessOptions, ProcessRequest, Quality};
pub use service::ImageServiceState;
pub use source::{DecodedImage, ImageSource, OutputTarget, ProcessedImage};
