//! 编排层测试用的假后端

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::backends::ConversionBackend;
use crate::error::{ConversionError, ConversionResult};
use crate::models::{BatchJob, ConversionRequest};
use crate::orchestrator::ConversionOrchestrator;

/// 假后端的行为
#[derive(Debug, Clone)]
pub enum Behavior {
    /// 校验源文件后把源文件复制到目标
    Copy,
    /// 源文件名包含 "slow" 时先等待
    CopyWithDelay(Duration),
    /// 源文件名包含 "boom" 时 panic，其余复制
    PanicOn,
    /// 永远挂起
    Hang,
}

pub struct FakeBackend {
    name: &'static str,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn file_name_contains(request: &ConversionRequest, needle: &str) -> bool {
    request
        .source
        .file_name()
        .map(|n| n.to_string_lossy().contains(needle))
        .unwrap_or(false)
}

#[async_trait]
impl ConversionBackend for FakeBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn convert(&self, request: &ConversionRequest) -> ConversionResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        request.ensure_source_readable().await?;

        match &self.behavior {
            Behavior::Copy => {}
            Behavior::CopyWithDelay(delay) => {
                if file_name_contains(request, "slow") {
                    tokio::time::sleep(*delay).await;
                }
            }
            Behavior::PanicOn => {
                if file_name_contains(request, "boom") {
                    panic!("后端内部错误");
                }
            }
            Behavior::Hang => {
                futures::future::pending::<()>().await;
            }
        }

        tokio::fs::copy(&request.source, &request.destination)
            .await
            .map_err(ConversionError::from)?;
        Ok(request.destination.clone())
    }
}

/// 两个方向都使用同一种行为的编排器
pub fn orchestrator_with(
    behavior: Behavior,
) -> (Arc<ConversionOrchestrator>, Arc<FakeBackend>, Arc<FakeBackend>) {
    let fixed = FakeBackend::new("fake-fixed", behavior.clone());
    let editable = FakeBackend::new("fake-editable", behavior);
    let orchestrator = ConversionOrchestrator::with_backends(fixed.clone(), editable.clone());
    (Arc::new(orchestrator), fixed, editable)
}

/// 在目录下写入一个源文件
pub fn write_source(dir: &std::path::Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, name.as_bytes()).expect("写入测试文件失败");
    path
}

/// 源文件存在的批量任务
pub fn existing_job(dir: &std::path::Path, source: &str, destination: &str) -> BatchJob {
    BatchJob::new(write_source(dir, source), dir.join(destination))
}

/// 源文件不存在的批量任务
pub fn missing_job(dir: &std::path::Path, source: &str, destination: &str) -> BatchJob {
    BatchJob::new(dir.join(source), dir.join(destination))
}
