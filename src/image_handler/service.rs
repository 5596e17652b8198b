//! # 服务层（可注入状态）
//!
//! ## 设计思路
//!
//! 使用 `ImageServiceState` 作为宿主进程持有的状态，替代全局单例函数。
//! 好处：
//! 1. 生命周期清晰（由 `main.rs` 统一管理）
//! 2. 测试可创建独立实例，减少共享状态副作用
//! 3. 多个请求可并发执行，互不干扰
//!
//! ## 实现思路
//!
//! - `Semaphore` 作为有界工作池，限制同时在跑的流水线数量。
//! - 流水线是 CPU 密集的同步代码，放进 `spawn_blocking` 避免阻塞 async 运行时。
//! - 每个请求一个独立的 `CancelToken`；超时后取消，工作线程在下一个阶段边界退出且不落盘。
//!   若工作线程已提交落盘，超时方改为等待其完成，返回值与磁盘状态始终一致。

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;

use super::source::ProcessedImage;
use super::{
    CancelToken, ImageConfig, ImageError, ImageHandler, ImageSource, OutputFormat, OutputTarget,
    ProcessOptions, output,
};

/// 图片处理服务状态。
pub struct ImageServiceState {
    handler: Arc<ImageHandler>,
    permits: Arc<Semaphore>,
}

impl ImageServiceState {
    /// 使用默认配置创建服务状态。
    ///
    /// # 示例
    /// ```rust
    /// use picverter::image_handler::ImageServiceState;
    ///
    /// let service = ImageServiceState::new();
    /// assert!(service.supported_formats().contains(&"png"));
    /// ```
    pub fn new() -> Self {
        Self::with_config(ImageConfig::default())
    }

    /// 使用自定义配置创建服务状态。
    ///
    /// 主要用于测试或按部署场景注入不同策略。
    pub fn with_config(config: ImageConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_requests.max(1)));
        let handler = Arc::new(ImageHandler::new(Arc::new(config)));
        Self { handler, permits }
    }

    pub fn config(&self) -> &ImageConfig {
        self.handler.config()
    }

    /// 处理磁盘上的图片，输出写到同目录 `<主干>_processed.<格式>`。
    pub async fn process_image(
        &self,
        image_path: PathBuf,
        options: ProcessOptions,
    ) -> Result<ProcessedImage, ImageError> {
        let format = OutputFormat::parse(&options.format)?;
        let target = OutputTarget::File(output::processed_path_for(&image_path, format));
        self.run(ImageSource::FilePath(image_path), options, target)
            .await
    }

    /// 处理 Base64 上传，输出写到配置的输出目录（默认系统临时目录）。
    pub async fn process_base64(
        &self,
        base64_data: String,
        options: ProcessOptions,
    ) -> Result<ProcessedImage, ImageError> {
        let target = OutputTarget::UniqueIn(self.config().resolved_output_dir());
        self.run(ImageSource::Base64(base64_data), options, target)
            .await
    }

    /// 任意来源、任意去向的通用入口。
    pub async fn run(
        &self,
        source: ImageSource,
        options: ProcessOptions,
        target: OutputTarget,
    ) -> Result<ProcessedImage, ImageError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ImageError::ResourceLimit("处理队列已关闭".to_string()))?;

        let token = CancelToken::new();
        let handler = Arc::clone(&self.handler);
        let worker_token = token.clone();

        // 许可随工作线程一起释放：超时返回后，放弃中的流水线仍占用名额直到退出
        let mut task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            handler.process_with_cancel(source, &options, target, &worker_token)
        });

        let joined = match self.config().request_timeout() {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) if token.cancel() => {
                    log::warn!("⏱️ 图片处理超时（{}ms），已通知工作线程放弃", limit.as_millis());
                    return Err(ImageError::Timeout(format!(
                        "处理超过 {} 毫秒未完成",
                        limit.as_millis()
                    )));
                }
                Err(_) => {
                    log::debug!("⏱️ 超时时结果已在落盘，等待写入完成");
                    task.await
                }
            },
            None => task.await,
        };

        joined.map_err(|e| ImageError::ResourceLimit(format!("处理线程异常退出：{}", e)))?
    }

    /// 本构建启用的输出格式列表。
    pub fn supported_formats(&self) -> Vec<&'static str> {
        OutputFormat::enabled()
            .into_iter()
            .map(OutputFormat::as_str)
            .collect()
    }
}

impl Default for ImageServiceState {
    fn default() -> Self {
        Self::new()
    }
}
