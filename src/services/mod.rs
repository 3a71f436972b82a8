//! Service layer for codereel
//!
//! The import and export pipelines, the registries and histories around
//! them, and [`ProjectManager`], the context object that ties them to one
//! key-value store and one current project.

pub mod batch;
pub mod export;
pub mod history;
pub mod import;
pub mod manager;
pub mod operations;
pub mod progress;
pub mod templates;

pub use batch::{process_in_chunks, retry_with_backoff, RetryConfig};
pub use export::{ExportOptions, ExportService};
pub use history::{OperationHistory, MAX_HISTORY};
pub use import::{ImportFile, ImportOptions, ImportService, PreviewResult};
pub use manager::ProjectManager;
pub use operations::{OperationHandle, OperationRegistry};
pub use progress::{ExportStage, ImportStage, ProgressEvent, ProgressObserver, Stage};
pub use templates::{ExportTemplate, TemplateStore};
