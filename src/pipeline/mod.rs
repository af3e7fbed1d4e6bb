pub mod classify;
pub mod queue;
pub mod service;

pub use classify::classify_error;
pub use queue::{JobProcessor, JobQueue, JobTicket, StatusSubscription};
pub use service::{Clock, EnqueueReceipt, IdGenerator, MaskingService, MaskingServiceBuilder};
