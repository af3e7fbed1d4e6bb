pub mod config;
pub mod event;
pub mod job;
pub mod snapshot;

pub use config::{MaskConfig, ResolvedSettings};
pub use event::{JobState, StatusEvent};
pub use job::{ErrorCode, Job, JobError, JobOutcome, MaskingLanguage, MaskingOptions, MaskingStyle};
pub use snapshot::{CacheState, Snapshot};
