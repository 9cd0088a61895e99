//! 授权门控编排器
//!
//! 授权在构造时校验一次；校验不通过则构造失败，不存在"半授权"的实例。
//! 批量能力以组合方式提供，调用前仍会检查功能开关。

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ConversionError, ConversionResult};
use crate::models::{BatchItemResult, BatchJob, ConversionRequest, Direction};
use crate::orchestrator::{BatchProcessor, ConversionOrchestrator};

/// 授权校验器
pub trait LicenseValidator: Send + Sync {
    fn validate(&self, token: &str) -> bool;
}

/// 前缀校验：token 以指定前缀开头即视为有效
#[derive(Debug, Clone)]
pub struct PrefixLicenseValidator {
    prefix: String,
}

impl PrefixLicenseValidator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.license_prefix.clone())
    }
}

impl LicenseValidator for PrefixLicenseValidator {
    fn validate(&self, token: &str) -> bool {
        token.starts_with(&self.prefix)
    }
}

/// 功能开关，构造后只读
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureGate {
    enabled: bool,
}

impl FeatureGate {
    /// 调用一次校验器得到开关状态
    pub fn evaluate(token: &str, validator: &dyn LicenseValidator) -> Self {
        Self {
            enabled: validator.validate(token),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 开关关闭时返回 PermissionDenied
    pub fn ensure_enabled(&self, feature: &str) -> ConversionResult<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(ConversionError::permission_denied(format!(
                "{} 需要有效的授权",
                feature
            )))
        }
    }
}

/// 授权门控编排器
pub struct GatedOrchestrator {
    orchestrator: Arc<ConversionOrchestrator>,
    gate: FeatureGate,
    batch: BatchProcessor,
}

impl GatedOrchestrator {
    /// 校验授权并创建
    ///
    /// 授权无效时返回 `PermissionDenied`，不会得到实例。
    pub fn new(
        token: &str,
        validator: &dyn LicenseValidator,
        orchestrator: Arc<ConversionOrchestrator>,
        max_concurrent_jobs: usize,
    ) -> ConversionResult<Self> {
        let gate = FeatureGate::evaluate(token, validator);
        if let Err(e) = gate.ensure_enabled("高级功能") {
            warn!("[GatedOrchestrator] 授权无效");
            return Err(e);
        }

        info!("[GatedOrchestrator] 高级功能已启用");
        let batch = BatchProcessor::new(orchestrator.clone(), max_concurrent_jobs);
        Ok(Self {
            orchestrator,
            gate,
            batch,
        })
    }

    /// 使用配置中的前缀校验与真实后端创建
    pub fn from_config(config: &Config, token: &str) -> ConversionResult<Self> {
        Self::new(
            token,
            &PrefixLicenseValidator::from_config(config),
            Arc::new(ConversionOrchestrator::new(config)),
            config.max_concurrent_jobs,
        )
    }

    pub fn gate(&self) -> FeatureGate {
        self.gate
    }

    pub async fn convert_to_fixed_layout(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
    ) -> ConversionResult<PathBuf> {
        self.orchestrator
            .convert_to_fixed_layout(source, destination)
            .await
    }

    pub async fn convert_to_editable(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
    ) -> ConversionResult<PathBuf> {
        self.orchestrator
            .convert_to_editable(source, destination)
            .await
    }

    pub async fn convert(
        &self,
        direction: Direction,
        request: &ConversionRequest,
    ) -> ConversionResult<PathBuf> {
        self.orchestrator.convert(direction, request).await
    }

    pub async fn convert_until<F>(
        &self,
        direction: Direction,
        request: &ConversionRequest,
        cancel: F,
    ) -> ConversionResult<PathBuf>
    where
        F: Future<Output = ()>,
    {
        self.orchestrator
            .convert_until(direction, request, cancel)
            .await
    }

    /// 批量转换（需授权）
    ///
    /// 未授权时在处理任何任务之前返回 `PermissionDenied`；
    /// 授权通过后，单个任务的失败只体现在对应的结果中。
    pub async fn batch_convert(
        &self,
        jobs: Vec<BatchJob>,
        direction: Direction,
    ) -> ConversionResult<Vec<BatchItemResult>> {
        self.gate.ensure_enabled("批量转换")?;
        Ok(self.batch.run(jobs, direction).await)
    }
}
