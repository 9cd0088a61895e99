//! 转换请求与批量任务模型

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConversionError, ConversionResult};

/// 转换方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// 可编辑格式 → 固定版式（DOCX → PDF）
    FixedLayout,
    /// 固定版式 → 可编辑格式（PDF → DOCX）
    Editable,
}

impl Direction {
    /// 目标格式的文件扩展名
    pub fn target_extension(&self) -> &'static str {
        match self {
            Direction::FixedLayout => "pdf",
            Direction::Editable => "docx",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::FixedLayout => write!(f, "DOCX → PDF"),
            Direction::Editable => write!(f, "PDF → DOCX"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed-layout" | "pdf" => Ok(Direction::FixedLayout),
            "editable" | "docx" => Ok(Direction::Editable),
            other => Err(format!("未知的转换方向: {}", other)),
        }
    }
}

/// 单次转换请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl ConversionRequest {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// 校验源文件存在且可读
    ///
    /// 两个后端共用的前置条件，失败时不会启动任何外部资源。
    pub async fn ensure_source_readable(&self) -> ConversionResult<()> {
        let not_found = || ConversionError::InputNotFound {
            path: self.source.clone(),
        };

        let metadata = tokio::fs::metadata(&self.source)
            .await
            .map_err(|_| not_found())?;
        if !metadata.is_file() {
            return Err(not_found());
        }

        // 打开一次以确认有读权限
        tokio::fs::File::open(&self.source)
            .await
            .map_err(|_| not_found())?;

        Ok(())
    }
}

impl Display for ConversionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.source.display(),
            self.destination.display()
        )
    }
}

/// 批量任务中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJob {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl BatchJob {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// 将相对路径解析到指定目录下
    pub fn resolve_against(self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        Self {
            source: resolve(self.source),
            destination: resolve(self.destination),
        }
    }

    pub fn to_request(&self) -> ConversionRequest {
        ConversionRequest::new(self.source.clone(), self.destination.clone())
    }

    /// 目标文件扩展名是否与转换方向一致（不区分大小写）
    pub fn matches_direction(&self, direction: Direction) -> bool {
        self.destination
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(direction.target_extension()))
            .unwrap_or(false)
    }
}

/// 批量任务单项状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
    Failure,
}

/// 批量任务单项结果
#[derive(Debug)]
pub struct BatchItemResult {
    /// 在输入列表中的位置（从 0 开始）
    pub index: usize,
    pub job: BatchJob,
    pub status: BatchStatus,
    pub output: Option<PathBuf>,
    pub error: Option<ConversionError>,
}

impl BatchItemResult {
    pub fn success(index: usize, job: BatchJob, output: PathBuf) -> Self {
        Self {
            index,
            job,
            status: BatchStatus::Success,
            output: Some(output),
            error: None,
        }
    }

    pub fn failure(index: usize, job: BatchJob, error: ConversionError) -> Self {
        Self {
            index,
            job,
            status: BatchStatus::Failure,
            output: None,
            error: Some(error),
        }
    }

    pub fn from_outcome(index: usize, job: BatchJob, outcome: ConversionResult<PathBuf>) -> Self {
        match outcome {
            Ok(output) => Self::success(index, job, output),
            Err(e) => Self::failure(index, job, e),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == BatchStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parse_aliases() {
        assert_eq!("pdf".parse::<Direction>().unwrap(), Direction::FixedLayout);
        assert_eq!(
            "Fixed-Layout".parse::<Direction>().unwrap(),
            Direction::FixedLayout
        );
        assert_eq!("docx".parse::<Direction>().unwrap(), Direction::Editable);
        assert!("odt".parse::<Direction>().is_err());
    }

    #[test]
    fn test_destination_extension_matches_direction() {
        let job_to = |destination: &str| BatchJob::new("source", destination);
        let (pdf, docx) = (Direction::FixedLayout, Direction::Editable);

        assert!(job_to("out/a.pdf").matches_direction(pdf));
        assert!(job_to("out/A.PDF").matches_direction(pdf));
        assert!(job_to("a.docx").matches_direction(docx));
        assert!(!job_to("out/a.pdf").matches_direction(docx));
        assert!(!job_to("out/a").matches_direction(docx));
    }

    #[test]
    fn test_resolve_against_keeps_absolute_paths() {
        let job = BatchJob::new("/abs/a.docx", "out/a.pdf")
            .resolve_against(Path::new("/base"));
        assert_eq!(job.source, PathBuf::from("/abs/a.docx"));
        assert_eq!(job.destination, PathBuf::from("/base/out/a.pdf"));
    }

    #[tokio::test]
    async fn test_missing_source_is_input_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let request = ConversionRequest::new(
            dir.path().join("missing.docx"),
            dir.path().join("out.pdf"),
        );

        let err = request.ensure_source_readable().await.unwrap_err();
        assert!(matches!(err, ConversionError::InputNotFound { .. }));
    }

    #[tokio::test]
    async fn test_directory_source_is_input_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let request = ConversionRequest::new(dir.path(), dir.path().join("out.pdf"));

        let err = request.ensure_source_readable().await.unwrap_err();
        assert!(matches!(err, ConversionError::InputNotFound { .. }));
    }

    #[tokio::test]
    async fn test_existing_source_passes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("report.docx");
        std::fs::write(&source, b"PK\x03\x04").unwrap();

        let request = ConversionRequest::new(&source, dir.path().join("report.pdf"));
        tokio_test::assert_ok!(request.ensure_source_readable().await);
    }

    #[test]
    fn test_item_result_from_outcome() {
        let job = BatchJob::new("a.pdf", "a.docx");
        let ok = BatchItemResult::from_outcome(0, job.clone(), Ok(PathBuf::from("a.docx")));
        assert!(ok.is_success());
        assert!(ok.error.is_none());

        let failed = BatchItemResult::from_outcome(1, job, Err(ConversionError::Cancelled));
        assert_eq!(failed.status, BatchStatus::Failure);
        assert!(failed.output.is_none());
    }
}
