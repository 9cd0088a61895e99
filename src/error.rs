use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// 转换错误类型
///
/// 所有后端内部错误在后端边界处归一化为本类型，编排层之上不会出现其他错误类型。
#[derive(Debug, Error)]
pub enum ConversionError {
    /// 输入文件不存在或不可读（未启动任何外部资源）
    #[error("输入文件不存在或不可读: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// 外部资源（浏览器会话 / 子进程）无法启动
    #[error("{backend} 启动失败: {message}")]
    BackendLaunchFailed {
        backend: &'static str,
        message: String,
    },

    /// 外部资源超时，已被终止并回收
    #[error("{backend} 超时: {}秒内未完成", after.as_secs())]
    BackendTimedOut {
        backend: &'static str,
        after: Duration,
    },

    /// 外部进程运行结束但报告失败
    #[error("转换进程失败 (退出码: {}): {}", display_code(*code), stderr.trim())]
    BackendExitedWithError {
        /// 被信号终止时为 None
        code: Option<i32>,
        stderr: String,
        stdout: String,
    },

    /// 严格模式下未观察到渲染完成标记
    #[error("未观察到渲染完成标记 '{selector}' (已等待 {}ms)", waited.as_millis())]
    RenderSignalNotObserved { selector: String, waited: Duration },

    /// 进程报告成功，但目标文件缺失或为空
    #[error("转换进程报告成功，但输出文件缺失或为空: {}", path.display())]
    OutputMissingDespiteSuccess { path: PathBuf },

    /// 功能未授权
    #[error("权限不足: {message}")]
    PermissionDenied { message: String },

    /// 调用方取消了本次转换
    #[error("转换已被取消")]
    Cancelled,

    /// 未分类的后端错误
    #[error("转换失败: {message}")]
    Unknown { message: String },
}

fn display_code(code: Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "信号终止".to_string(),
    }
}

impl ConversionError {
    /// 稳定的错误种类标签，用于日志和批量报告
    pub fn kind(&self) -> &'static str {
        match self {
            ConversionError::InputNotFound { .. } => "input_not_found",
            ConversionError::BackendLaunchFailed { .. } => "backend_launch_failed",
            ConversionError::BackendTimedOut { .. } => "backend_timed_out",
            ConversionError::BackendExitedWithError { .. } => "backend_exited_with_error",
            ConversionError::RenderSignalNotObserved { .. } => "render_signal_not_observed",
            ConversionError::OutputMissingDespiteSuccess { .. } => "output_missing_despite_success",
            ConversionError::PermissionDenied { .. } => "permission_denied",
            ConversionError::Cancelled => "cancelled",
            ConversionError::Unknown { .. } => "unknown",
        }
    }

    // ========== 便捷构造函数 ==========

    /// 创建启动失败错误
    pub fn launch_failed(backend: &'static str, source: impl std::fmt::Display) -> Self {
        ConversionError::BackendLaunchFailed {
            backend,
            message: source.to_string(),
        }
    }

    /// 创建未分类错误，附带出错阶段
    pub fn unknown(stage: impl std::fmt::Display, source: impl std::fmt::Display) -> Self {
        ConversionError::Unknown {
            message: format!("{}: {}", stage, source),
        }
    }

    /// 创建权限错误
    pub fn permission_denied(message: impl Into<String>) -> Self {
        ConversionError::PermissionDenied {
            message: message.into(),
        }
    }
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for ConversionError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        ConversionError::Unknown {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ConversionError {
    fn from(err: std::io::Error) -> Self {
        ConversionError::Unknown {
            message: err.to_string(),
        }
    }
}

/// 转换结果类型
pub type ConversionResult<T> = Result<T, ConversionError>;
