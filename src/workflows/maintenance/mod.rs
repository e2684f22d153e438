pub mod domain;
pub mod load;
mod parser;
pub mod render;
pub mod report;
mod status;
pub mod storage;

pub use domain::{MonitoredItem, Property, ReportModel, StatusCategory};
pub use load::{CompletionHandle, LoadCoordinator, LoadOutcome, LoadSignal, DEFAULT_LOAD_TIMEOUT};
pub use parser::{parse_timestamp, DataFormat};
pub use report::{AssemblySummary, ReportAssembler, DEFAULT_DATE_FORMAT};
pub use status::classify;
pub use storage::{
    CompletionListener, FileStore, InMemoryPropertyStore, LoadBehavior, PropertyStore,
    StorageError,
};
