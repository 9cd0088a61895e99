use std::path::PathBuf;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 批量转换时同时处理的任务数量（1 表示严格顺序执行）
    pub max_concurrent_jobs: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,

    // --- 渲染会话（DOCX → PDF）---
    /// 浏览器可执行文件路径，None 时自动查找
    pub chrome_executable: Option<PathBuf>,
    /// 宿主页面模板路径，None 时使用内置模板
    pub render_template_path: Option<PathBuf>,
    /// 压缩包读取库（JSZip）
    pub archive_reader_script: PathBuf,
    /// 文档渲染库（docx-preview）
    pub markup_renderer_script: PathBuf,
    /// 渲染完成标记的 CSS 选择器
    pub render_signal_selector: String,
    pub render_signal_timeout_ms: u64,
    /// 观察到完成标记后等待字体/图片稳定的时间
    pub render_settle_delay_ms: u64,
    pub render_poll_interval_ms: u64,
    /// 严格模式：超时未见完成标记则直接失败
    pub strict_render_signal: bool,
    /// 纸张尺寸与页边距（英寸）
    pub page_width_in: f64,
    pub page_height_in: f64,
    pub page_margin_in: f64,

    // --- 外部转换进程（PDF → DOCX）---
    pub editable_converter_program: String,
    /// 放在源路径和目标路径之前的固定参数（通常是脚本路径）
    pub editable_converter_args: Vec<String>,
    pub process_timeout_secs: u64,
    /// 进程退出码为 0 时是否校验输出文件
    pub verify_output: bool,

    // --- 授权 ---
    pub license_token: Option<String>,
    pub license_prefix: String,

    // --- 批量任务 ---
    /// 任务清单（TOML）
    pub job_manifest: String,
    /// 批量报告输出文件
    pub report_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 1,
            verbose_logging: false,
            chrome_executable: None,
            render_template_path: None,
            archive_reader_script: PathBuf::from("assets/vendor/jszip.min.js"),
            markup_renderer_script: PathBuf::from("assets/vendor/docx-preview.min.js"),
            render_signal_selector: ".docx-wrapper".to_string(),
            render_signal_timeout_ms: 10_000,
            render_settle_delay_ms: 2_000,
            render_poll_interval_ms: 100,
            strict_render_signal: false,
            page_width_in: 8.27,
            page_height_in: 11.69,
            page_margin_in: 20.0 / 96.0,
            editable_converter_program: "python3".to_string(),
            editable_converter_args: vec!["scripts/convert_pdf_to_docx.py".to_string()],
            process_timeout_secs: 600,
            verify_output: true,
            license_token: None,
            license_prefix: "PREMIUM-".to_string(),
            job_manifest: "jobs.toml".to_string(),
            report_file: "batch_report.json".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_jobs: parse_env("MAX_CONCURRENT_JOBS")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(default.max_concurrent_jobs),
            verbose_logging: parse_env("VERBOSE_LOGGING")
                .unwrap_or(default.verbose_logging),
            chrome_executable: env_path("CHROME_EXECUTABLE").or(default.chrome_executable),
            render_template_path: env_path("RENDER_TEMPLATE_PATH")
                .or(default.render_template_path),
            archive_reader_script: env_path("ARCHIVE_READER_SCRIPT")
                .unwrap_or(default.archive_reader_script),
            markup_renderer_script: env_path("MARKUP_RENDERER_SCRIPT")
                .unwrap_or(default.markup_renderer_script),
            render_signal_selector: env_string("RENDER_SIGNAL_SELECTOR")
                .unwrap_or(default.render_signal_selector),
            render_signal_timeout_ms: parse_env("RENDER_SIGNAL_TIMEOUT_MS")
                .unwrap_or(default.render_signal_timeout_ms),
            render_settle_delay_ms: parse_env("RENDER_SETTLE_DELAY_MS")
                .unwrap_or(default.render_settle_delay_ms),
            render_poll_interval_ms: parse_env("RENDER_POLL_INTERVAL_MS")
                .unwrap_or(default.render_poll_interval_ms),
            strict_render_signal: parse_env("STRICT_RENDER_SIGNAL")
                .unwrap_or(default.strict_render_signal),
            page_width_in: parse_env("PAGE_WIDTH_IN").unwrap_or(default.page_width_in),
            page_height_in: parse_env("PAGE_HEIGHT_IN")
                .unwrap_or(default.page_height_in),
            page_margin_in: parse_env("PAGE_MARGIN_IN")
                .unwrap_or(default.page_margin_in),
            editable_converter_program: env_string("EDITABLE_CONVERTER_PROGRAM")
                .unwrap_or(default.editable_converter_program),
            editable_converter_args: env_string("EDITABLE_CONVERTER_ARGS")
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or(default.editable_converter_args),
            process_timeout_secs: parse_env("PROCESS_TIMEOUT_SECS")
                .unwrap_or(default.process_timeout_secs),
            verify_output: parse_env("VERIFY_OUTPUT").unwrap_or(default.verify_output),
            license_token: env_string("LICENSE_KEY").or(default.license_token),
            license_prefix: env_string("LICENSE_PREFIX")
                .unwrap_or(default.license_prefix),
            job_manifest: env_string("JOB_MANIFEST").unwrap_or(default.job_manifest),
            report_file: env_string("REPORT_FILE").unwrap_or(default.report_file),
        }
    }

    pub fn render_signal_timeout(&self) -> Duration {
        Duration::from_millis(self.render_signal_timeout_ms)
    }

    pub fn render_settle_delay(&self) -> Duration {
        Duration::from_millis(self.render_settle_delay_ms)
    }

    pub fn render_poll_interval(&self) -> Duration {
        Duration::from_millis(self.render_poll_interval_ms.max(1))
    }

    pub fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.process_timeout_secs)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|v| v.trim().parse().ok())
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn env_path(name: &str) -> Option<PathBuf> {
    env_string(name).map(PathBuf::from)
}
