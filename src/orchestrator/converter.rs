//! 转换门面 - 编排层
//!
//! 按转换方向把请求路由到对应后端，单次尝试，不重试。
//! 后端 panic 被转换为 `ConversionError::Unknown`，门面之外只会看到 `ConversionError`。

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use tracing::{info, warn};

use crate::backends::{ConversionBackend, ExternalProcessBackend, RenderSessionBackend};
use crate::config::Config;
use crate::error::{ConversionError, ConversionResult};
use crate::models::{ConversionRequest, Direction};

/// 转换门面
pub struct ConversionOrchestrator {
    fixed_layout: Arc<dyn ConversionBackend>,
    editable: Arc<dyn ConversionBackend>,
}

impl ConversionOrchestrator {
    /// 使用真实后端创建
    pub fn new(config: &Config) -> Self {
        Self {
            fixed_layout: Arc::new(RenderSessionBackend::new(config)),
            editable: Arc::new(ExternalProcessBackend::new(config)),
        }
    }

    /// 使用自定义后端创建
    pub fn with_backends(
        fixed_layout: Arc<dyn ConversionBackend>,
        editable: Arc<dyn ConversionBackend>,
    ) -> Self {
        Self {
            fixed_layout,
            editable,
        }
    }

    fn backend(&self, direction: Direction) -> &Arc<dyn ConversionBackend> {
        match direction {
            Direction::FixedLayout => &self.fixed_layout,
            Direction::Editable => &self.editable,
        }
    }

    /// DOCX → PDF
    pub async fn convert_to_fixed_layout(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
    ) -> ConversionResult<PathBuf> {
        let request = ConversionRequest::new(source.as_ref(), destination.as_ref());
        self.convert(Direction::FixedLayout, &request).await
    }

    /// PDF → DOCX
    pub async fn convert_to_editable(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
    ) -> ConversionResult<PathBuf> {
        let request = ConversionRequest::new(source.as_ref(), destination.as_ref());
        self.convert(Direction::Editable, &request).await
    }

    /// 按方向执行一次转换
    pub async fn convert(
        &self,
        direction: Direction,
        request: &ConversionRequest,
    ) -> ConversionResult<PathBuf> {
        let backend = self.backend(direction);
        info!("[Converter] {} ({}): {}", direction, backend.name(), request);

        match AssertUnwindSafe(backend.convert(request)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = format!("{} 发生 panic: {}", backend.name(), panic_message(&*panic));
                warn!("[Converter] {}", message);
                Err(ConversionError::Unknown { message })
            }
        }
    }

    /// 执行转换，`cancel` 先完成时中止
    ///
    /// 中止时进行中的 future 被 drop：子进程由 `kill_on_drop` 终止，
    /// 渲染会话由其 `Drop` 终止。
    pub async fn convert_until<F>(
        &self,
        direction: Direction,
        request: &ConversionRequest,
        cancel: F,
    ) -> ConversionResult<PathBuf>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            result = self.convert(direction, request) => result,
            _ = cancel => {
                warn!("[Converter] 转换已取消: {}", request);
                Err(ConversionError::Cancelled)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知 panic".to_string()
    }
}
