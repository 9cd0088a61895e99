//! 渲染会话 - 基础设施层
//!
//! 一次转换独占一个无头浏览器进程。会话是有作用域的资源：
//! 正常路径和错误路径都调用 `close()`；若调用被取消或发生 panic，
//! `Drop` 负责终止浏览器进程并停止事件循环。

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 等待浏览器进程退出的上限，超过后强制 kill
const CLOSE_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// 无头浏览器会话
pub struct RenderSession {
    id: u64,
    browser: Option<Browser>,
    handler_task: Option<JoinHandle<()>>,
    user_data_dir: PathBuf,
}

impl RenderSession {
    /// 启动无头浏览器
    ///
    /// 使用新版 headless 模式并关闭沙盒，适用于容器等无特权环境。
    /// 每个会话使用独立的用户数据目录，多个会话可以并存。
    pub async fn launch(chrome_executable: Option<&PathBuf>) -> Result<Self> {
        let id = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
        let user_data_dir = std::env::temp_dir().join(format!(
            "docbridge-render-{}-{}",
            std::process::id(),
            id
        ));
        info!("🚀 [会话 {}] 启动无头浏览器...", id);

        let mut builder = BrowserConfig::builder()
            .new_headless_mode()
            .no_sandbox()
            .user_data_dir(&user_data_dir)
            .args(vec![
                "--disable-gpu",           // 无头模式禁用 GPU
                "--disable-dev-shm-usage", // 防止共享内存不足
            ]);
        if let Some(executable) = chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("配置无头浏览器失败: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| anyhow!("启动无头浏览器失败: {}", e))?;

        // 在后台处理浏览器事件
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });
        debug!("[会话 {}] 无头浏览器启动成功", id);

        Ok(Self {
            id,
            browser: Some(browser),
            handler_task: Some(handler_task),
            user_data_dir,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// 创建空白页面
    pub async fn new_page(&self) -> Result<Page> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| anyhow!("渲染会话已关闭"))?;
        let page = browser.new_page("about:blank").await?;
        Ok(page)
    }

    /// 关闭会话并回收浏览器进程
    pub async fn close(mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("[会话 {}] 正常关闭浏览器失败: {}，改为强制终止", self.id, e);
            }
            match tokio::time::timeout(CLOSE_GRACE_PERIOD, browser.wait()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("[会话 {}] 等待浏览器退出失败: {}", self.id, e),
                Err(_) => {
                    warn!("[会话 {}] 浏览器未在限定时间内退出，强制终止", self.id);
                    if let Some(Err(e)) = browser.kill().await {
                        warn!("[会话 {}] 强制终止浏览器失败: {}", self.id, e);
                    }
                }
            }
        }

        if let Some(task) = self.handler_task.take() {
            task.abort();
        }

        if let Err(e) = tokio::fs::remove_dir_all(&self.user_data_dir).await {
            debug!("[会话 {}] 清理用户数据目录失败: {}", self.id, e);
        }
        debug!("[会话 {}] 渲染会话已关闭", self.id);
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        // Browser 以 kill_on_drop 启动子进程，drop 即终止
        if self.browser.take().is_some() {
            warn!("[会话 {}] 渲染会话未正常关闭，已强制终止", self.id);
            // 浏览器可能仍在退出，目录清理只能尽力而为
            remove_user_data_dir(self.id, &self.user_data_dir);
        }
    }
}

/// 同步删除用户数据目录，失败时记录 debug 日志并返回 false
fn remove_user_data_dir(id: u64, dir: &Path) -> bool {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => true,
        Err(e) => {
            debug!("[会话 {}] 清理用户数据目录失败: {} ({})", id, e, dir.display());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_user_data_dir() {
        let parent = tempfile::tempdir().unwrap();
        let dir = parent.path().join("docbridge-render-test");
        std::fs::create_dir_all(dir.join("Default")).unwrap();
        std::fs::write(dir.join("Default").join("Preferences"), b"{}").unwrap();

        assert!(remove_user_data_dir(7, &dir));
        assert!(!dir.exists());
        // 目录已不存在时只记录日志
        assert!(!remove_user_data_dir(7, &dir));
    }
}
