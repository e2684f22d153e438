use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tokio::runtime::Runtime;
use tracing::{debug, error, info};

use super::domain::ReportModel;
use super::parser::{parse_model, DataFormat};

/// Callback fired once when a load finishes, whatever its result.
pub type CompletionListener = Box<dyn FnOnce() + Send + 'static>;

/// Storage collaborator that loads the property snapshot in the background.
pub trait PropertyStore: Send + Sync {
    fn add_completion_listener(&self, listener: CompletionListener);
    /// Starts an asynchronous load and returns without waiting for it.
    fn start_load(&self) -> Result<(), StorageError>;
    /// Most recently published snapshot.
    fn loaded_model(&self) -> Result<Arc<ReportModel>, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to read property data from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid property CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid property JSON data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("row {row}: '{value}' is not a valid {column} timestamp")]
    InvalidTimestamp {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("row {row}: property label is empty")]
    MissingProperty { row: usize },
    #[error("unsupported property data format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("storage runtime unavailable: {0}")]
    Runtime(String),
    #[error("property data has not been loaded")]
    NotLoaded,
    #[error("property data failed to load: {0}")]
    LoadFailed(String),
}

#[derive(Debug, Default)]
enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded(Arc<ReportModel>),
    Failed(String),
}

/// Publishes a load result once and then notifies the registered listeners.
#[derive(Default)]
struct LoadBroadcast {
    state: Mutex<LoadState>,
    listeners: Mutex<Vec<CompletionListener>>,
}

impl LoadBroadcast {
    fn register(&self, listener: CompletionListener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    fn begin(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = LoadState::Loading;
    }

    fn publish(&self, result: Result<ReportModel, StorageError>) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            *state = match result {
                Ok(model) => {
                    info!(
                        properties = model.properties().len(),
                        items = model.item_count(),
                        "property data loaded"
                    );
                    LoadState::Loaded(Arc::new(model))
                }
                Err(err) => {
                    error!(error = %err, "property data load failed");
                    match err {
                        StorageError::LoadFailed(reason) => LoadState::Failed(reason),
                        other => LoadState::Failed(other.to_string()),
                    }
                }
            };
        }

        let listeners: Vec<CompletionListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        debug!(listeners = listeners.len(), "notifying load listeners");
        for listener in listeners {
            listener();
        }
    }

    fn snapshot(&self) -> Result<Arc<ReportModel>, StorageError> {
        match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            LoadState::Loaded(model) => Ok(Arc::clone(model)),
            LoadState::Failed(reason) => Err(StorageError::LoadFailed(reason.clone())),
            LoadState::Idle | LoadState::Loading => Err(StorageError::NotLoaded),
        }
    }
}

/// Store reading a CSV or JSON data file on its own tokio runtime so the
/// report caller stays synchronous.
pub struct FileStore {
    path: PathBuf,
    format: DataFormat,
    runtime: Runtime,
    broadcast: Arc<LoadBroadcast>,
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let format = path
            .extension()
            .and_then(|extension| extension.to_str())
            .and_then(DataFormat::from_extension)
            .ok_or_else(|| StorageError::UnsupportedFormat(path.clone()))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("property-store")
            .build()
            .map_err(|err| StorageError::Runtime(err.to_string()))?;

        Ok(Self {
            path,
            format,
            runtime,
            broadcast: Arc::new(LoadBroadcast::default()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stops the background runtime, abandoning any load still in flight.
    pub fn shutdown(self) {
        self.runtime.shutdown_timeout(Duration::from_millis(250));
    }
}

impl PropertyStore for FileStore {
    fn add_completion_listener(&self, listener: CompletionListener) {
        self.broadcast.register(listener);
    }

    fn start_load(&self) -> Result<(), StorageError> {
        self.broadcast.begin();
        info!(path = %self.path.display(), "loading property data");

        let broadcast = Arc::clone(&self.broadcast);
        let path = self.path.clone();
        let format = self.format;
        self.runtime.spawn(async move {
            let result = read_model(path, format).await;
            broadcast.publish(result);
        });
        Ok(())
    }

    fn loaded_model(&self) -> Result<Arc<ReportModel>, StorageError> {
        self.broadcast.snapshot()
    }
}

async fn read_model(path: PathBuf, format: DataFormat) -> Result<ReportModel, StorageError> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| StorageError::Io { path, source })?;
    parse_model(bytes.as_slice(), format)
}

/// How an [`InMemoryPropertyStore`] completes its load.
#[derive(Debug, Clone)]
pub enum LoadBehavior {
    /// Publishes before `start_load` returns.
    Immediate,
    /// Publishes from a worker thread after the delay.
    Delayed(Duration),
    /// Never publishes.
    Never,
    /// Publishes a failure with the given reason.
    Fails(String),
}

/// Store serving a pre-built snapshot, used for demos and tests.
pub struct InMemoryPropertyStore {
    model: ReportModel,
    behavior: LoadBehavior,
    broadcast: Arc<LoadBroadcast>,
}

impl InMemoryPropertyStore {
    pub fn new(model: ReportModel, behavior: LoadBehavior) -> Self {
        Self {
            model,
            behavior,
            broadcast: Arc::new(LoadBroadcast::default()),
        }
    }

    pub fn immediate(model: ReportModel) -> Self {
        Self::new(model, LoadBehavior::Immediate)
    }
}

impl PropertyStore for InMemoryPropertyStore {
    fn add_completion_listener(&self, listener: CompletionListener) {
        self.broadcast.register(listener);
    }

    fn start_load(&self) -> Result<(), StorageError> {
        self.broadcast.begin();
        match &self.behavior {
            LoadBehavior::Immediate => self.broadcast.publish(Ok(self.model.clone())),
            LoadBehavior::Delayed(delay) => {
                let delay = *delay;
                let model = self.model.clone();
                let broadcast = Arc::clone(&self.broadcast);
                thread::Builder::new()
                    .name("in-memory-load".to_string())
                    .spawn(move || {
                        thread::sleep(delay);
                        broadcast.publish(Ok(model));
                    })
                    .map_err(|err| StorageError::Runtime(err.to_string()))?;
            }
            LoadBehavior::Never => {}
            LoadBehavior::Fails(reason) => self
                .broadcast
                .publish(Err(StorageError::LoadFailed(reason.clone()))),
        }
        Ok(())
    }

    fn loaded_model(&self) -> Result<Arc<ReportModel>, StorageError> {
        self.broadcast.snapshot()
    }
}
