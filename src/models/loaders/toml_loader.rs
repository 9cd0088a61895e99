use crate::models::job::{BatchJob, Direction};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 批量任务清单
#[derive(Debug, Clone, Deserialize)]
pub struct JobManifest {
    /// 整批统一的转换方向
    pub direction: Direction,
    #[serde(default)]
    pub jobs: Vec<BatchJob>,
}

/// 从 TOML 文件加载任务清单
///
/// 相对路径以清单文件所在目录为基准解析。
pub async fn load_job_manifest(manifest_path: &Path) -> Result<JobManifest> {
    let content = fs::read_to_string(manifest_path)
        .await
        .with_context(|| format!("无法读取任务清单: {}", manifest_path.display()))?;

    let manifest: JobManifest = toml::from_str(&content)
        .with_context(|| format!("无法解析任务清单: {}", manifest_path.display()))?;

    let base = manifest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let jobs: Vec<BatchJob> = manifest
        .jobs
        .into_iter()
        .map(|job| job.resolve_against(base))
        .collect();

    tracing::info!(
        "已加载任务清单 {}: {} 个任务 ({})",
        manifest_path.display(),
        jobs.len(),
        manifest.direction
    );

    Ok(JobManifest {
        direction: manifest.direction,
        jobs,
    })
}
