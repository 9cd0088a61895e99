pub mod job;
pub mod loaders;
pub mod report;

pub use job::{BatchItemResult, BatchJob, BatchStatus, ConversionRequest, Direction};
pub use loaders::{load_job_manifest, JobManifest};
pub use report::{BatchReport, ReportItem};
