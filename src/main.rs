use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use tracing::warn;

use docbridge::models::{load_job_manifest, BatchItemResult, BatchJob, Direction, JobManifest};
use docbridge::utils::logging;
use docbridge::{BatchReport, Config, ConversionError, ConversionOrchestrator, GatedOrchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);

    // 用法: docbridge [任务清单] [fixed-layout|editable]
    let mut args = std::env::args().skip(1);
    let manifest_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&config.job_manifest));
    let mut manifest = load_job_manifest(&manifest_path).await?;
    if let Some(direction) = args.next() {
        manifest.direction = direction.parse::<Direction>().map_err(|e| anyhow!(e))?;
    }
    let direction = manifest.direction;
    warn_on_extension_mismatch(&manifest.jobs, direction);

    let results = match config.license_token.as_deref() {
        Some(token) => {
            let gated = GatedOrchestrator::from_config(&config, token)
                .context("授权校验失败")?;
            logging::log_startup(&config, gated.gate().is_enabled());
            gated.batch_convert(manifest.jobs, direction).await?
        }
        None => {
            logging::log_startup(&config, false);
            convert_single(&config, manifest).await?
        }
    };

    let report = BatchReport::from_results(direction, &results);
    let json = serde_json::to_string_pretty(&report)?;
    tokio::fs::write(&config.report_file, json)
        .await
        .with_context(|| format!("无法写入报告: {}", config.report_file))?;
    logging::print_final_stats(&report, &config.report_file);

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

/// 目标文件扩展名与转换方向不一致时提示
fn warn_on_extension_mismatch(jobs: &[BatchJob], direction: Direction) {
    for job in jobs.iter().filter(|job| !job.matches_direction(direction)) {
        warn!(
            "⚠️ 目标文件 {} 的扩展名与转换方向 ({}) 不一致，应为 .{}",
            job.destination.display(),
            direction,
            direction.target_extension()
        );
    }
}

/// 未授权时只允许单个任务
async fn convert_single(config: &Config, manifest: JobManifest) -> Result<Vec<BatchItemResult>> {
    if manifest.jobs.len() > 1 {
        bail!(ConversionError::permission_denied(format!(
            "任务清单包含 {} 个任务，批量转换需要配置 LICENSE_KEY",
            manifest.jobs.len()
        )));
    }

    let orchestrator = ConversionOrchestrator::new(config);
    let mut results = Vec::with_capacity(1);
    for (index, job) in manifest.jobs.into_iter().enumerate() {
        let outcome = orchestrator
            .convert(manifest.direction, &job.to_request())
            .await;
        if let Err(e) = &outcome {
            warn!("[任务 {}] 转换失败: {}", index + 1, e);
        }
        results.push(BatchItemResult::from_outcome(index, job, outcome));
    }

    Ok(results)
}
