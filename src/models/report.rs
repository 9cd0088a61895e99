//! 批量转换报告

use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;

use super::job::{BatchItemResult, BatchStatus, Direction};

/// 批量报告中的单项
#[derive(Debug, Clone, Serialize)]
pub struct ReportItem {
    pub index: usize,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub status: BatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 批量转换报告
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub direction: Direction,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub finished_at: DateTime<Local>,
    pub items: Vec<ReportItem>,
}

impl BatchReport {
    pub fn from_results(direction: Direction, results: &[BatchItemResult]) -> Self {
        let items: Vec<ReportItem> = results
            .iter()
            .map(|r| ReportItem {
                index: r.index,
                source: r.job.source.clone(),
                destination: r.job.destination.clone(),
                status: r.status,
                error_kind: r.error.as_ref().map(|e| e.kind()),
                error: r.error.as_ref().map(|e| e.to_string()),
            })
            .collect();

        let succeeded = items
            .iter()
            .filter(|i| i.status == BatchStatus::Success)
            .count();

        Self {
            direction,
            total: items.len(),
            succeeded,
            failed: items.len() - succeeded,
            finished_at: Local::now(),
            items,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
