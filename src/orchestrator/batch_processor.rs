//! 批量转换处理器 - 编排层
//!
//! ## 职责
//!
//! 对一组任务逐个调用转换门面，每个任务一个结果，顺序与输入一致。
//!
//! ## 设计特点
//!
//! - **失败隔离**：单个任务的错误（包括 panic）只记录在它自己的结果中
//! - **统一方向**：整批任务使用同一个转换方向
//! - **并发可选**：并发数为 1 时严格顺序执行；大于 1 时用 Semaphore 限流，
//!   结果按任务下标归位，输出顺序不受完成顺序影响
//! - **随调用方取消**：批量 future 被 drop 时，进行中和排队中的任务一并中止

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::error::{ConversionError, ConversionResult};
use crate::models::{BatchItemResult, BatchJob, Direction};
use crate::orchestrator::ConversionOrchestrator;
use crate::utils::logging::{log_batch_complete, log_batch_start};

/// 批量转换处理器
#[derive(Clone)]
pub struct BatchProcessor {
    orchestrator: Arc<ConversionOrchestrator>,
    max_concurrent_jobs: usize,
}

impl BatchProcessor {
    pub fn new(orchestrator: Arc<ConversionOrchestrator>, max_concurrent_jobs: usize) -> Self {
        Self {
            orchestrator,
            max_concurrent_jobs: max_concurrent_jobs.max(1),
        }
    }

    pub fn max_concurrent_jobs(&self) -> usize {
        self.max_concurrent_jobs
    }

    /// 处理整批任务
    ///
    /// # 返回
    /// 与 `jobs` 一一对应、顺序一致的结果列表。本方法本身不会失败。
    pub async fn run(&self, jobs: Vec<BatchJob>, direction: Direction) -> Vec<BatchItemResult> {
        let total = jobs.len();
        log_batch_start(total, direction, self.max_concurrent_jobs);

        let results = if self.max_concurrent_jobs == 1 {
            self.run_sequential(jobs, direction).await
        } else {
            self.run_concurrent(jobs, direction).await
        };

        let success = results.iter().filter(|r| r.is_success()).count();
        log_batch_complete(success, total);

        results
    }

    async fn run_sequential(
        &self,
        jobs: Vec<BatchJob>,
        direction: Direction,
    ) -> Vec<BatchItemResult> {
        let total = jobs.len();
        let mut results = Vec::with_capacity(total);

        for (index, job) in jobs.into_iter().enumerate() {
            let outcome = self
                .orchestrator
                .convert(direction, &job.to_request())
                .await;
            let result = BatchItemResult::from_outcome(index, job, outcome);
            log_item(&result, total);
            results.push(result);
        }

        results
    }

    async fn run_concurrent(
        &self,
        jobs: Vec<BatchJob>,
        direction: Direction,
    ) -> Vec<BatchItemResult> {
        let total = jobs.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_jobs));
        // JoinSet 被 drop 时中止所有任务，调用方放弃等待后不再有转换在后台运行
        let mut tasks = JoinSet::new();

        for (index, job) in jobs.iter().enumerate() {
            let semaphore = semaphore.clone();
            let orchestrator = self.orchestrator.clone();
            let request = job.to_request();

            tasks.spawn(async move {
                // Semaphore 不会被关闭，acquire 只会成功
                let _permit = semaphore.acquire_owned().await.ok();
                (index, orchestrator.convert(direction, &request).await)
            });
        }

        // 按完成顺序收集，再按输入顺序输出
        let mut outcomes: Vec<Option<ConversionResult<PathBuf>>> =
            jobs.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => error!("批量任务执行失败: {}", e),
            }
        }

        jobs.into_iter()
            .zip(outcomes)
            .enumerate()
            .map(|(index, (job, outcome))| {
                let outcome = outcome.unwrap_or_else(|| {
                    Err(ConversionError::unknown("批量任务", "任务未返回结果"))
                });
                let result = BatchItemResult::from_outcome(index, job, outcome);
                log_item(&result, total);
                result
            })
            .collect()
    }
}

fn log_item(result: &BatchItemResult, total: usize) {
    match &result.error {
        None => info!(
            "[任务 {}/{}] ✓ {}",
            result.index + 1,
            total,
            result.job.destination.display()
        ),
        Some(e) => error!(
            "[任务 {}/{}] ❌ {}: {}",
            result.index + 1,
            total,
            result.job.source.display(),
            e
        ),
    }
}
