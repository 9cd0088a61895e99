//! 基础设施层：持有稀缺的外部资源（浏览器会话、子进程），只暴露能力

pub mod js_executor;
pub mod render_session;
pub mod subprocess;

pub use js_executor::JsExecutor;
pub use render_session::RenderSession;
pub use subprocess::{ProcessError, ProcessOutput, ProcessRunner};
