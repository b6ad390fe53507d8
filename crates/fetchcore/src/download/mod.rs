//! URL planning and retrieval through the external tools

pub mod args;
pub mod cookies;
pub mod error;
pub mod executor;
pub mod planner;
pub mod platform;
pub mod quality;

// Re-exports for convenience
pub use error::{DownloadError, ToolFailureKind};
pub use executor::{Executor, RetrievedFile};
pub use planner::{DownloadMode, DownloadPlan, Planner};
pub use platform::{classify, ClassifiedUrl, Platform};
pub use quality::{QualityChoice, QualityMenu};
