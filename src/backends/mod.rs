//! 转换后端
//!
//! 每个后端负责一个转换方向，满足相同的契约：
//! 输入 `ConversionRequest`，成功返回目标路径，失败返回归一化后的 `ConversionError`。
//! 后端持有的外部资源（渲染会话 / 子进程）生命周期严格限定在单次调用内。

pub mod process_backend;
pub mod render_backend;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::ConversionResult;
use crate::models::ConversionRequest;

pub use process_backend::ExternalProcessBackend;
pub use render_backend::{RenderSessionBackend, RenderSignalPolicy, RenderStage};

/// 转换后端契约
#[async_trait]
pub trait ConversionBackend: Send + Sync {
    /// 后端名称（用于日志与错误信息）
    fn name(&self) -> &'static str;

    /// 执行一次转换
    async fn convert(&self, request: &ConversionRequest) -> ConversionResult<PathBuf>;
}
