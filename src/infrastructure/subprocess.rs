//! 子进程执行器 - 基础设施层
//!
//! 持有"运行一个外部程序"的能力：捕获标准输出 / 标准错误、等待退出、超时终止。
//! 不认识文档格式，也不解释退出码的业务含义。

use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// 子进程运行结果
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// 子进程执行失败
#[derive(Debug, Error)]
pub enum ProcessError {
    /// 进程无法启动（可执行文件不存在、无权限等）
    #[error("无法启动进程 {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// 超时，进程已被终止
    #[error("进程运行超过 {}秒", .0.as_secs())]
    TimedOut(Duration),
    /// 读取输出或等待退出时出错
    #[error("等待进程结束失败: {0}")]
    Io(#[from] std::io::Error),
}

/// 子进程执行器
///
/// 每次 `run` 都启动一个全新的进程，不复用。
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessRunner {
    /// 创建执行器
    ///
    /// # 参数
    /// - `program`: 可执行文件
    /// - `args`: 每次调用都放在最前面的固定参数
    /// - `timeout`: 单次运行的时间上限
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// 运行进程直到退出
    ///
    /// stdout / stderr 与 `wait()` 并发读取，避免管道写满导致子进程阻塞。
    /// 超时后进程会被 kill 并回收；调用被取消（future 被 drop）时由 `kill_on_drop` 终止进程。
    pub async fn run<I, S>(&self, extra_args: I) -> Result<ProcessOutput, ProcessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .args(extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        debug!("已启动进程 {} (pid: {:?})", self.program, child.id());

        let waited = tokio::time::timeout(self.timeout, collect_output(&mut child)).await;

        match waited {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "⏱️ 进程 {} (pid: {:?}) 超时，正在终止",
                    self.program,
                    child.id()
                );
                // kill() 会等待进程退出，确保被回收
                if let Err(e) = child.kill().await {
                    warn!("终止进程 {} 失败: {}", self.program, e);
                }
                Err(ProcessError::TimedOut(self.timeout))
            }
        }
    }
}

async fn collect_output(child: &mut Child) -> Result<ProcessOutput, ProcessError> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (stdout, stderr, status) =
        tokio::join!(read_stream(stdout), read_stream(stderr), child.wait());

    Ok(ProcessOutput {
        status: status?,
        stdout: stdout?,
        stderr: stderr?,
    })
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> std::io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
