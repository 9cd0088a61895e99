//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `converter` - 转换门面
//! - 按方向路由到后端，单次尝试
//! - 保证门面之外只出现 `ConversionError`
//! - 支持调用方取消
//!
//! ### `gated` - 授权门控
//! - 构造时校验一次授权
//! - 授权通过才持有批量处理能力
//!
//! ### `batch_processor` - 批量处理器
//! - 每个任务一个结果，顺序与输入一致
//! - 单个任务失败不影响其他任务
//!
//! ## 层次关系
//!
//! ```text
//! gated (GatedOrchestrator)
//!     ↓
//! batch_processor (处理 Vec<BatchJob>)
//!     ↓
//! converter (处理单个 ConversionRequest)
//!     ↓
//! backends (渲染会话 / 外部进程)
//!     ↓
//! infrastructure (RenderSession / JsExecutor / ProcessRunner)
//! ```

pub mod batch_processor;
pub mod converter;
pub mod gated;

#[cfg(test)]
pub(crate) mod test_support;

// 重新导出主要类型
pub use batch_processor::BatchProcessor;
pub use converter::ConversionOrchestrator;
pub use gated::{FeatureGate, GatedOrchestrator, LicenseValidator, PrefixLicenseValidator};
