pub mod extraction;
pub mod file_signature;
pub mod invoice_name;
pub mod metrics;
pub mod pdf;
pub mod pipeline;
pub mod providers;
pub mod totals;

pub use extraction::ExtractionService;
pub use pipeline::{NotificationPipeline, SessionState};
