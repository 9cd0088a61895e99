//! 渲染会话后端（DOCX → PDF）
//!
//! ## 单次调用的阶段
//!
//! ```text
//! Init → SessionLaunched → PageLoaded → LibrariesInjected → ContentRendered
//!      → RenderSignalObserved → Snapshotted → Done
//! ```
//!
//! 任一阶段出错即进入 Failed。无论在哪个阶段结束，渲染会话都会在返回前关闭。

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::js_protocol::runtime::{EventConsoleApiCalled, EventExceptionThrown};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::backends::ConversionBackend;
use crate::config::Config;
use crate::error::{ConversionError, ConversionResult};
use crate::infrastructure::{JsExecutor, RenderSession};
use crate::models::ConversionRequest;

const BACKEND_NAME: &str = "渲染会话";

/// 内置宿主页面，提供 `window.renderDocx(arrayBuffer)`
const BUILTIN_TEMPLATE: &str = include_str!("../../assets/render-template.html");

/// 等待注入的库就绪的上限
const LIBRARY_READY_TIMEOUT: Duration = Duration::from_secs(5);

/// 渲染阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Init,
    SessionLaunched,
    PageLoaded,
    LibrariesInjected,
    ContentRendered,
    RenderSignalObserved,
    Snapshotted,
    Done,
}

impl Display for RenderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RenderStage::Init => "Init",
            RenderStage::SessionLaunched => "SessionLaunched",
            RenderStage::PageLoaded => "PageLoaded",
            RenderStage::LibrariesInjected => "LibrariesInjected",
            RenderStage::ContentRendered => "ContentRendered",
            RenderStage::RenderSignalObserved => "RenderSignalObserved",
            RenderStage::Snapshotted => "Snapshotted",
            RenderStage::Done => "Done",
        };
        f.write_str(name)
    }
}

/// 未观察到渲染完成标记时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderSignalPolicy {
    /// 记录警告后继续输出（可能得到空白页）
    BestEffort,
    /// 直接失败
    Strict,
}

impl RenderSignalPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            RenderSignalPolicy::Strict
        } else {
            RenderSignalPolicy::BestEffort
        }
    }
}

/// 纸张尺寸与页边距（英寸）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width_in: f64,
    pub height_in: f64,
    pub margin_in: f64,
}

/// 渲染会话后端
pub struct RenderSessionBackend {
    chrome_executable: Option<PathBuf>,
    template_path: Option<PathBuf>,
    archive_reader_script: PathBuf,
    markup_renderer_script: PathBuf,
    signal_selector: String,
    signal_timeout: Duration,
    settle_delay: Duration,
    poll_interval: Duration,
    policy: RenderSignalPolicy,
    layout: PageLayout,
}

impl RenderSessionBackend {
    /// 根据配置创建
    pub fn new(config: &Config) -> Self {
        Self {
            chrome_executable: config.chrome_executable.clone(),
            template_path: config.render_template_path.clone(),
            archive_reader_script: config.archive_reader_script.clone(),
            markup_renderer_script: config.markup_renderer_script.clone(),
            signal_selector: config.render_signal_selector.clone(),
            signal_timeout: config.render_signal_timeout(),
            settle_delay: config.render_settle_delay(),
            poll_interval: config.render_poll_interval(),
            policy: RenderSignalPolicy::from_strict(config.strict_render_signal),
            layout: PageLayout {
                width_in: config.page_width_in,
                height_in: config.page_height_in,
                margin_in: config.page_margin_in,
            },
        }
    }

    pub fn policy(&self) -> RenderSignalPolicy {
        self.policy
    }

    /// 在已启动的会话内完成 PageLoaded → Snapshotted
    async fn render_in_session(
        &self,
        session: &RenderSession,
        document: &[u8],
        destination: &Path,
    ) -> ConversionResult<()> {
        let sid = session.id();

        // ========== PageLoaded ==========
        let page = session
            .new_page()
            .await
            .map_err(at_stage(RenderStage::PageLoaded))?;
        let _page_logs = forward_page_logs(&page, sid).await;
        let template = self.load_template().await?;
        page.set_content(template)
            .await
            .map_err(at_stage(RenderStage::PageLoaded))?;
        log_stage(sid, RenderStage::PageLoaded);

        let executor = JsExecutor::new(page);

        // ========== LibrariesInjected ==========
        self.inject_libraries(&executor).await?;
        log_stage(sid, RenderStage::LibrariesInjected);

        // ========== ContentRendered ==========
        let decoded_len: usize = executor
            .eval_as(build_render_script(document))
            .await
            .map_err(at_stage(RenderStage::ContentRendered))?;
        if decoded_len != document.len() {
            return Err(ConversionError::unknown(
                RenderStage::ContentRendered,
                format!(
                    "会话内解码得到 {} 字节，源文件为 {} 字节",
                    decoded_len,
                    document.len()
                ),
            ));
        }
        log_stage(sid, RenderStage::ContentRendered);

        // ========== RenderSignalObserved ==========
        self.await_render_signal(&executor, sid).await?;

        // ========== Snapshotted ==========
        executor
            .page()
            .save_pdf(self.print_params(), destination)
            .await
            .map_err(at_stage(RenderStage::Snapshotted))?;
        log_stage(sid, RenderStage::Snapshotted);

        Ok(())
    }

    async fn load_template(&self) -> ConversionResult<String> {
        match &self.template_path {
            Some(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                ConversionError::unknown(
                    RenderStage::PageLoaded,
                    format!("无法读取宿主页面 {}: {}", path.display(), e),
                )
            }),
            None => Ok(BUILTIN_TEMPLATE.to_string()),
        }
    }

    /// 按依赖顺序注入：先压缩包读取库，再文档渲染库
    async fn inject_libraries(&self, executor: &JsExecutor) -> ConversionResult<()> {
        let libraries = [
            (
                &self.archive_reader_script,
                "typeof window.JSZip !== 'undefined'",
            ),
            (
                &self.markup_renderer_script,
                "typeof window.docx !== 'undefined'",
            ),
        ];

        for (path, ready_check) in libraries {
            let source = tokio::fs::read_to_string(path).await.map_err(|e| {
                ConversionError::unknown(
                    RenderStage::LibrariesInjected,
                    format!("无法读取脚本 {}: {}", path.display(), e),
                )
            })?;
            executor.run_script(source).await.map_err(|e| {
                ConversionError::unknown(
                    RenderStage::LibrariesInjected,
                    format!("执行脚本 {} 失败: {}", path.display(), e),
                )
            })?;

            let ready = executor
                .wait_until(ready_check, LIBRARY_READY_TIMEOUT, self.poll_interval)
                .await;
            if !ready {
                return Err(ConversionError::unknown(
                    RenderStage::LibrariesInjected,
                    format!("脚本 {} 注入后未就绪", path.display()),
                ));
            }
            debug!("已注入脚本: {}", path.display());
        }

        Ok(())
    }

    async fn await_render_signal(&self, executor: &JsExecutor, sid: u64) -> ConversionResult<()> {
        let condition = build_signal_check(&self.signal_selector);
        let observed = executor
            .wait_until(&condition, self.signal_timeout, self.poll_interval)
            .await;

        if observed {
            log_stage(sid, RenderStage::RenderSignalObserved);
            // 等待字体、图片等异步布局稳定
            sleep(self.settle_delay).await;
            return Ok(());
        }

        match self.policy {
            RenderSignalPolicy::Strict => Err(ConversionError::RenderSignalNotObserved {
                selector: self.signal_selector.clone(),
                waited: self.signal_timeout,
            }),
            RenderSignalPolicy::BestEffort => {
                warn!(
                    "⚠️ [会话 {}] {}ms 内未出现 '{}'，继续输出，PDF 可能为空白",
                    sid,
                    self.signal_timeout.as_millis(),
                    self.signal_selector
                );
                Ok(())
            }
        }
    }

    /// 固定纸张、打印背景、四边等宽页边距
    pub fn print_params(&self) -> PrintToPdfParams {
        let margin = self.layout.margin_in;
        PrintToPdfParams::builder()
            .print_background(true)
            .paper_width(self.layout.width_in)
            .paper_height(self.layout.height_in)
            .margin_top(margin)
            .margin_bottom(margin)
            .margin_left(margin)
            .margin_right(margin)
            .prefer_css_page_size(false)
            .build()
    }
}

#[async_trait]
impl ConversionBackend for RenderSessionBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn convert(&self, request: &ConversionRequest) -> ConversionResult<PathBuf> {
        // ========== Init ==========
        request.ensure_source_readable().await?;
        let document = tokio::fs::read(&request.source).await.map_err(|_| {
            ConversionError::InputNotFound {
                path: request.source.clone(),
            }
        })?;
        debug!(
            "[{}] 已读取源文件 {} ({} 字节)",
            RenderStage::Init,
            request.source.display(),
            document.len()
        );

        // ========== SessionLaunched ==========
        let session = RenderSession::launch(self.chrome_executable.as_ref())
            .await
            .map_err(|e| ConversionError::launch_failed(BACKEND_NAME, e))?;
        let sid = session.id();
        log_stage(sid, RenderStage::SessionLaunched);

        let outcome = self
            .render_in_session(&session, &document, &request.destination)
            .await;

        // 所有路径都在返回前关闭会话
        session.close().await;

        match outcome {
            Ok(()) => {
                log_stage(sid, RenderStage::Done);
                info!("✓ [会话 {}] PDF 已生成: {}", sid, request.destination.display());
                Ok(request.destination.clone())
            }
            Err(e) => {
                error!("❌ [会话 {}] 渲染失败: {}", sid, e);
                Err(e)
            }
        }
    }
}

/// 把任意错误归入指定阶段的 `Unknown`
fn at_stage<E: Display>(stage: RenderStage) -> impl FnOnce(E) -> ConversionError {
    move |e| ConversionError::unknown(stage, e)
}

fn log_stage(sid: u64, stage: RenderStage) {
    debug!("[会话 {}] → {}", sid, stage);
}

/// 生成会话内执行的渲染脚本
///
/// 文档以 base64 传入并附带原始字节长度；会话内解码后校验长度，
/// 交给宿主页面的 `renderDocx`，返回实际解码的字节数。
fn build_render_script(document: &[u8]) -> String {
    format!(
        r#"
        (async () => {{
            const expected = {len};
            const binary = window.atob("{data}");
            if (binary.length !== expected) {{
                throw new Error("decoded " + binary.length + " bytes, expected " + expected);
            }}
            const bytes = new Uint8Array(expected);
            for (let i = 0; i < expected; i++) {{
                bytes[i] = binary.charCodeAt(i);
            }}
            await window.renderDocx(bytes.buffer);
            return bytes.length;
        }})()
        "#,
        len = document.len(),
        data = BASE64.encode(document)
    )
}

fn build_signal_check(selector: &str) -> String {
    // 通过 JSON 转义选择器，避免引号破坏脚本
    let quoted = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!("document.querySelector({}) !== null", quoted)
}

/// drop 时中止的后台任务
struct TaskGuard(JoinHandle<()>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// 将页面的 console 输出与未捕获异常转发到 tracing
async fn forward_page_logs(page: &Page, sid: u64) -> Option<TaskGuard> {
    let mut console = page.event_listener::<EventConsoleApiCalled>().await.ok()?;
    let mut exceptions = page.event_listener::<EventExceptionThrown>().await.ok()?;

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = console.next() => {
                    let text = event
                        .args
                        .iter()
                        .filter_map(|arg| {
                            arg.value
                                .as_ref()
                                .map(|v| v.to_string())
                                .or_else(|| arg.description.clone())
                        })
                        .collect::<Vec<_>>()
                        .join(" ");
                    debug!("[会话 {}] 页面日志: {}", sid, text);
                }
                Some(event) = exceptions.next() => {
                    warn!("[会话 {}] 页面异常: {}", sid, event.exception_details.text);
                }
                else => break,
            }
        }
    });

    Some(TaskGuard(task))
}
