//! 外部进程后端（PDF → DOCX）
//!
//! 调用约定：`<program> [固定参数...] <源路径> <目标路径>`，
//! 退出码 0 表示成功，其余表示失败，诊断信息写在标准错误中。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::backends::ConversionBackend;
use crate::config::Config;
use crate::error::{ConversionError, ConversionResult};
use crate::infrastructure::{ProcessError, ProcessRunner};
use crate::models::ConversionRequest;
use crate::utils::logging::truncate_text;

const BACKEND_NAME: &str = "外部转换进程";

/// 外部进程后端
pub struct ExternalProcessBackend {
    runner: ProcessRunner,
    verify_output: bool,
}

impl ExternalProcessBackend {
    /// 根据配置创建
    pub fn new(config: &Config) -> Self {
        Self {
            runner: ProcessRunner::new(
                config.editable_converter_program.clone(),
                config.editable_converter_args.clone(),
                config.process_timeout(),
            ),
            verify_output: config.verify_output,
        }
    }

    /// 使用自定义执行器创建
    pub fn with_runner(runner: ProcessRunner, verify_output: bool) -> Self {
        Self {
            runner,
            verify_output,
        }
    }

    fn normalize(&self, err: ProcessError) -> ConversionError {
        match err {
            ProcessError::Spawn { source, .. } => ConversionError::BackendLaunchFailed {
                backend: BACKEND_NAME,
                message: format!("{} ({})", source, self.runner.program()),
            },
            ProcessError::TimedOut(after) => ConversionError::BackendTimedOut {
                backend: BACKEND_NAME,
                after,
            },
            ProcessError::Io(e) => ConversionError::unknown(BACKEND_NAME, e),
        }
    }
}

#[async_trait]
impl ConversionBackend for ExternalProcessBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn convert(&self, request: &ConversionRequest) -> ConversionResult<PathBuf> {
        request.ensure_source_readable().await?;

        debug!("运行 {}: {}", self.runner.program(), request);
        let output = self
            .runner
            .run([&request.source, &request.destination])
            .await
            .map_err(|e| self.normalize(e))?;

        if !output.status.success() {
            error!(
                "❌ 转换进程退出码 {:?}: {}",
                output.status.code(),
                truncate_text(output.stderr.trim(), 200)
            );
            return Err(ConversionError::BackendExitedWithError {
                code: output.status.code(),
                stderr: output.stderr,
                stdout: output.stdout,
            });
        }

        if self.verify_output {
            ensure_output_written(&request.destination).await?;
        }

        info!("✓ 转换进程完成: {}", request.destination.display());
        Ok(request.destination.clone())
    }
}

/// 进程报告成功后，确认目标文件存在且非空
async fn ensure_output_written(destination: &Path) -> ConversionResult<()> {
    match tokio::fs::metadata(destination).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(ConversionError::OutputMissingDespiteSuccess {
            path: destination.to_path_buf(),
        }),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn backend(script: &str, verify_output: bool) -> ExternalProcessBackend {
        let runner = ProcessRunner::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "converter".to_string()],
            Duration::from_secs(10),
        );
        ExternalProcessBackend::with_runner(runner, verify_output)
    }

    fn source_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"%PDF-1.7\n").unwrap();
        path
    }

    #[tokio::test]
    async fn test_success_returns_destination() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file(dir.path(), "report.pdf");
        let destination = dir.path().join("report.docx");

        let result = backend("cp \"$1\" \"$2\"", true)
            .convert(&ConversionRequest::new(&source, &destination))
            .await
            .unwrap();

        assert_eq!(result, destination);
        assert!(destination.exists());
    }

    #[tokio::test]
    async fn test_missing_source_never_spawns() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("spawned");
        let script = format!("touch '{}'", marker.display());

        let err = backend(&script, true)
            .convert(&ConversionRequest::new(
                dir.path().join("missing.pdf"),
                dir.path().join("missing.docx"),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, ConversionError::InputNotFound { .. }));
        assert!(!marker.exists(), "不应启动进程");
        assert!(!dir.path().join("missing.docx").exists());
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_code_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file(dir.path(), "broken.pdf");

        let err = backend("echo 'parsing page 1'; echo 'corrupt stream' >&2; exit 2", true)
            .convert(&ConversionRequest::new(
                &source,
                dir.path().join("broken.docx"),
            ))
            .await
            .unwrap_err();

        match err {
            ConversionError::BackendExitedWithError {
                code,
                stderr,
                stdout,
            } => {
                assert_eq!(code, Some(2));
                assert!(stderr.contains("corrupt stream"));
                assert!(stdout.contains("parsing page 1"));
            }
            other => panic!("意外的错误类型: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_executable_is_launch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file(dir.path(), "a.pdf");
        let runner = ProcessRunner::new("/nonexistent/python", vec![], Duration::from_secs(1));

        let err = ExternalProcessBackend::with_runner(runner, true)
            .convert(&ConversionRequest::new(&source, dir.path().join("a.docx")))
            .await
            .unwrap_err();

        match err {
            ConversionError::BackendLaunchFailed { message, .. } => {
                assert!(message.contains("/nonexistent/python"));
            }
            other => panic!("意外的错误类型: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_without_output_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file(dir.path(), "a.pdf");
        let destination = dir.path().join("a.docx");

        let err = backend("exit 0", true)
            .convert(&ConversionRequest::new(&source, &destination))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConversionError::OutputMissingDespiteSuccess { .. }
        ));

        // 关闭校验时信任退出码
        let result = backend("exit 0", false)
            .convert(&ConversionRequest::new(&source, &destination))
            .await
            .unwrap();
        assert_eq!(result, destination);
    }

    #[tokio::test]
    async fn test_empty_output_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file(dir.path(), "a.pdf");

        let err = backend(": > \"$2\"", true)
            .convert(&ConversionRequest::new(&source, dir.path().join("a.docx")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "output_missing_despite_success");
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file(dir.path(), "slow.pdf");
        let runner = ProcessRunner::new(
            "sh",
            vec!["-c".to_string(), "sleep 30".to_string()],
            Duration::from_millis(200),
        );

        let err = ExternalProcessBackend::with_runner(runner, true)
            .convert(&ConversionRequest::new(
                &source,
                dir.path().join("slow.docx"),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::BackendTimedOut { .. }));
    }
}
