//! # docbridge
//!
//! DOCX ⇄ PDF 文档转换编排
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（浏览器会话、子进程），只暴露能力
//! - `RenderSession` - 单次转换独占的无头浏览器，保证关闭
//! - `JsExecutor` - 持有 page，提供 eval / 脚本注入 / 轮询能力
//! - `ProcessRunner` - 运行外部程序，并发读取输出，超时终止
//!
//! ### ② 后端层（Backends）
//! - `backends/` - 每个转换方向一个后端，满足相同的 `ConversionBackend` 契约
//! - `RenderSessionBackend` - DOCX → PDF
//! - `ExternalProcessBackend` - PDF → DOCX
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/converter` - 转换门面，按方向路由，归一化错误
//! - `orchestrator/gated` - 授权门控，授权通过才提供批量能力
//! - `orchestrator/batch_processor` - 批量处理，失败隔离，结果有序
//!
//! ## 模块结构

pub mod backends;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod utils;

// 重新导出常用类型
pub use backends::{ConversionBackend, ExternalProcessBackend, RenderSessionBackend};
pub use config::Config;
pub use error::{ConversionError, ConversionResult};
pub use models::{BatchItemResult, BatchJob, BatchReport, BatchStatus, ConversionRequest, Direction};
pub use orchestrator::{
    BatchProcessor, ConversionOrchestrator, FeatureGate, GatedOrchestrator, LicenseValidator,
    PrefixLicenseValidator,
};
