//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{BatchReport, Direction};

/// 初始化 tracing 日志
///
/// `RUST_LOG` 优先；未设置时默认 info，`verbose` 为 true 时为 debug。
/// 重复调用不会报错（测试中可多次调用）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config, batch_enabled: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 文档转换启动");
    info!("📊 最大并发任务数: {}", config.max_concurrent_jobs);
    info!(
        "🔐 批量转换: {}",
        if batch_enabled { "已授权" } else { "未授权" }
    );
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `total`: 任务总数
/// - `direction`: 转换方向
/// - `max_concurrent`: 最大并发数
pub fn log_batch_start(total: usize, direction: Direction, max_concurrent: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始批量转换: {} 个任务 ({})", total, direction);
    info!("📋 并发数: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
///
/// # 参数
/// - `success`: 成功数量
/// - `total`: 任务总数
pub fn log_batch_complete(success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 批量转换完成: 成功 {}/{}", success, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `report`: 批量报告
/// - `report_file`: 报告文件路径
pub fn print_final_stats(report: &BatchReport, report_file: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        report.finished_at.format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", report.succeeded, report.total);
    info!("❌ 失败: {}", report.failed);
    info!("{}", "=".repeat(60));
    info!("\n报告已保存至: {}", report_file);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("短文本", 10), "短文本");
        assert_eq!(truncate_text("数据流损坏", 2), "数据...");
        assert_eq!(truncate_text("", 0), "");
    }

    #[test]
    fn test_init_is_idempotent() {
        init(false);
        init(true);
    }
}
