//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageHandler` 只负责流程编排，不直接与传输层绑定。
//! 处理链路固定为：
//! 1. 校验请求参数（格式 / 质量 / 裁剪矩形自身约束）
//! 2. 按来源加载原始字节
//! 3. 按内容识别格式并解码为 RGBA8
//! 4. 按需裁剪
//! 5. 编码为目标格式
//! 6. 按 `OutputTarget` 落盘或直接返回字节
//!
//! ## 实现思路
//!
//! - 配置以 `Arc<ImageConfig>` 只读共享，请求之间没有任何可变共享状态。
//! - 中间缓冲按值在阶段间移动，任一阶段出错即 `?` 短路，已分配缓冲随作用域释放。
//! - 每个阶段之间检查取消令牌；落盘前必须先提交令牌，超时的请求不会再写出文件。
//! - 记录 `load/decode/crop/encode/persist/total` 阶段耗时，便于性能诊断。

use std::sync::Arc;
use std::time::Instant;

use super::source::ProcessedImage;
use super::{
    CancelToken, ImageConfig, ImageError, ImageSource, OutputTarget, ProcessOptions, crop,
    decoder, encoder, output,
};

/// 图片处理器。
///
/// 同步执行整条流水线；可在任意线程上并发调用。
#[derive(Debug, Clone)]
pub struct ImageHandler {
    pub(super) config: Arc<ImageConfig>,
}

impl ImageHandler {
    /// 根据配置创建处理器。
    ///
    /// # 示例
    /// ```rust
    /// use std::sync::Arc;
    /// use picverter::image_handler::{ImageConfig, ImageHandler};
    ///
    /// let handler = ImageHandler::new(Arc::new(ImageConfig::default()));
    /// assert_eq!(handler.config().max_concurrent_requests, 4);
    /// ```
    pub fn new(config: Arc<ImageConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    /// 处理主入口：加载 → 解码 → 裁剪 → 编码 → 输出。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use picverter::image_handler::{
    ///     ImageConfig, ImageHandler, ImageSource, OutputTarget, ProcessOptions,
    /// };
    ///
    /// let handler = ImageHandler::new(Arc::new(ImageConfig::default()));
    /// let options = ProcessOptions { format: "png".into(), quality: 90, crop: None };
    /// let result = handler.process(
    ///     ImageSource::FilePath("/tmp/in.jpg".into()),
    ///     &options,
    ///     OutputTarget::Memory,
    /// )?;
    /// assert!(!result.bytes.is_empty());
    /// # Ok::<(), picverter::image_handler::ImageError>(())
    /// ```
    pub fn process(
        &self,
        source: ImageSource,
        options: &ProcessOptions,
        target: OutputTarget,
    ) -> Result<ProcessedImage, ImageError> {
        self.process_with_cancel(source, options, target, &CancelToken::new())
    }

    /// 带取消令牌的处理入口。
    ///
    /// 每个阶段开始前检查令牌；写文件前提交令牌，提交失败即放弃，
    /// 不产生任何输出文件。
    pub fn process_with_cancel(
        &self,
        source: ImageSource,
        options: &ProcessOptions,
        target: OutputTarget,
        token: &CancelToken,
    ) -> Result<ProcessedImage, ImageError> {
        let result = self.run_pipeline(source, options, target, token);

        if let Err(err) = &result {
            log::warn!(
                "⚠️ 图片处理失败 - stage={} code={} message={}",
                err.stage(),
                err.code(),
                err
            );
        }

        result
    }

    fn run_pipeline(
        &self,
        source: ImageSource,
        options: &ProcessOptions,
        target: OutputTarget,
        token: &CancelToken,
    ) -> Result<ProcessedImage, ImageError> {
        let config = &*self.config;
        let total_start = Instant::now();

        let request = options.resolve()?;

        Self::check_cancelled(token)?;
        let load_start = Instant::now();
        let raw = self.load_source(source)?;
        let source_hint = raw.source_hint;
        let input_len = raw.bytes.len();
        let load_elapsed = load_start.elapsed();

        Self::check_cancelled(token)?;
        let decode_start = Instant::now();
        let decoded = decoder::decode(&raw.bytes, config)?;
        drop(raw);
        let (source_width, source_height) = (decoded.width(), decoded.height());
        let decode_elapsed = decode_start.elapsed();

        Self::check_cancelled(token)?;
        let crop_start = Instant::now();
        let cropped = crop::apply_crop(decoded, request.crop.as_ref())?;
        let crop_elapsed = crop_start.elapsed();

        Self::check_cancelled(token)?;
        let encode_start = Instant::now();
        let bytes = encoder::encode(&cropped, request.format, request.quality)?;
        let (width, height) = (cropped.width(), cropped.height());
        drop(cropped);
        let encode_elapsed = encode_start.elapsed();

        Self::check_cancelled(token)?;
        let persist_start = Instant::now();
        let output_path = match target {
            OutputTarget::Memory => None,
            OutputTarget::File(path) => Some(output::persist_to(&path, &bytes, token)?),
            OutputTarget::UniqueIn(dir) => {
                Some(output::persist_unique_in(&dir, request.format, &bytes, token)?)
            }
        };
        let persist_elapsed = persist_start.elapsed();

        log::info!(
            "✅ 图片处理完成 - 来源: {} 输入: {}KB {}x{} -> {} {}x{} 输出: {}KB | load={}ms decode={}ms crop={}ms encode={}ms persist={}ms total={}ms",
            source_hint,
            input_len / 1024,
            source_width,
            source_height,
            request.format.as_str(),
            width,
            height,
            bytes.len() / 1024,
            load_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            crop_elapsed.as_millis(),
            encode_elapsed.as_millis(),
            persist_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(ProcessedImage {
            bytes,
            format: request.format,
            width,
            height,
            output_path,
        })
    }

    fn check_cancelled(token: &CancelToken) -> Result<(), ImageError> {
        if token.is_cancelled() {
            return Err(ImageError::Timeout("请求已超时，处理被放弃".to_string()));
        }
        Ok(())
    }
}
