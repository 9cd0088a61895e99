//! JS 执行器 - 基础设施层
//!
//! 持有渲染会话中的 page，只暴露"执行 JS"的能力

use std::time::Duration;

use anyhow::{anyhow, Result};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::{sleep, Instant};

/// JS 执行器
///
/// 职责：
/// - 持有 Page 资源
/// - 暴露 eval() / 脚本注入 / 条件轮询能力
/// - 不认识文档格式
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    ///
    /// 表达式若返回 Promise，会等待其完成。
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 在全局作用域执行一段脚本源码（用于注入第三方库）
    ///
    /// 不关心返回值，脚本抛出的异常会作为错误返回。
    pub async fn run_script(&self, source: impl Into<String>) -> Result<()> {
        let params = EvaluateParams::builder()
            .expression(source.into())
            .return_by_value(false)
            .await_promise(false)
            .build()
            .map_err(|e| anyhow!("构造脚本参数失败: {}", e))?;
        self.page.evaluate_expression(params).await?;
        Ok(())
    }

    /// 轮询布尔表达式，直到为 true 或超时
    ///
    /// 单次求值失败视为 false，继续轮询。
    pub async fn wait_until(&self, condition: &str, timeout: Duration, interval: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval_as::<bool>(condition).await.unwrap_or(false) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(interval).await;
        }
    }
}
