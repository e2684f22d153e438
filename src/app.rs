use chrono::NaiveDateTime;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::ReportConfig;
use crate::workflows::maintenance::render::{DocumentSink, RenderError};
use crate::workflows::maintenance::{
    AssemblySummary, LoadCoordinator, LoadOutcome, PropertyStore, ReportAssembler, StorageError,
    DEFAULT_DATE_FORMAT, DEFAULT_LOAD_TIMEOUT,
};

/// Per-run settings for [`ReportApplication`].
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub load_timeout: Duration,
    pub date_format: String,
    /// Evaluation instant; the local clock at assembly start when unset.
    pub as_of: Option<NaiveDateTime>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            as_of: None,
        }
    }
}

impl From<&ReportConfig> for ReportSettings {
    fn from(config: &ReportConfig) -> Self {
        Self {
            load_timeout: config.load_timeout,
            date_format: config.date_format.clone(),
            as_of: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("property data did not finish loading within {} ms", .timeout.as_millis())]
    LoadTimeout { timeout: Duration },
    #[error("unable to prepare report output: {0}")]
    ResourceInitialization(#[source] RenderError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("unable to assemble report: {0}")]
    Assembly(#[source] RenderError),
    #[error("unable to finalize report: {0}")]
    Finalization(#[source] RenderError),
}

/// Result of a successful run: the finalized document and what went into it.
#[derive(Debug)]
pub struct ReportRun<D> {
    pub summary: AssemblySummary,
    pub document: D,
}

/// Sequences load, assembly and finalization for one report.
pub struct ReportApplication<S: ?Sized> {
    store: Arc<S>,
    settings: ReportSettings,
}

impl<S> ReportApplication<S>
where
    S: PropertyStore + ?Sized,
{
    pub fn new(store: Arc<S>, settings: ReportSettings) -> Self {
        Self { store, settings }
    }

    pub fn into_store(self) -> Arc<S> {
        self.store
    }

    /// Produces the report into the sink returned by `open_document`.
    ///
    /// The document is either finalized in full or discarded; a load timeout
    /// leaves no output.
    pub fn generate<D, F>(&self, open_document: F) -> Result<ReportRun<D>, ReportError>
    where
        D: DocumentSink,
        F: FnOnce() -> Result<D, RenderError>,
    {
        info!("report generation is starting");
        let result = self.run(open_document);
        match &result {
            Ok(run) => info!(
                properties = run.summary.properties,
                items = run.summary.items,
                overdue = run.summary.overdue,
                notice_due = run.summary.notice_due,
                "report generation has ended"
            ),
            Err(err) => error!(error = %err, "report generation failed"),
        }
        result
    }

    fn run<D, F>(&self, open_document: F) -> Result<ReportRun<D>, ReportError>
    where
        D: DocumentSink,
        F: FnOnce() -> Result<D, RenderError>,
    {
        let mut document = open_document().map_err(ReportError::ResourceInitialization)?;

        match self.produce(&mut document) {
            Ok(summary) => Ok(ReportRun { summary, document }),
            Err(err) => {
                warn!("discarding report output");
                document.discard();
                Err(err)
            }
        }
    }

    fn produce<D>(&self, document: &mut D) -> Result<AssemblySummary, ReportError>
    where
        D: DocumentSink,
    {
        let coordinator = LoadCoordinator::new(self.settings.load_timeout);
        match coordinator.await_load(self.store.as_ref())? {
            LoadOutcome::Completed => info!("property data load complete"),
            LoadOutcome::TimedOut => {
                return Err(ReportError::LoadTimeout {
                    timeout: coordinator.timeout(),
                })
            }
        }

        let model = self.store.loaded_model()?;
        if model.is_empty() {
            warn!("property data holds no properties, report will be empty");
        }

        let assembler = match self.settings.as_of {
            Some(now) => ReportAssembler::new(self.settings.date_format.clone(), now),
            None => ReportAssembler::starting_now(self.settings.date_format.clone()),
        };
        info!(now = %assembler.now(), "writing report");

        let summary = assembler
            .assemble(&model, document)
            .map_err(ReportError::Assembly)?;
        document
            .finalize_document()
            .map_err(ReportError::Finalization)?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::maintenance::render::{Highlight, OutlineDocument, TextStyle};
    use crate::workflows::maintenance::{
        InMemoryPropertyStore, LoadBehavior, MonitoredItem, Property, ReportModel,
    };
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .expect("valid date")
            .and_hms_opt(0, 0, 0)
            .expect("valid time")
    }

    fn model() -> ReportModel {
        ReportModel::new(vec![Property::with_items(
            "123 Main St",
            vec![MonitoredItem::new(
                "Boiler service",
                at(2024, 1, 1),
                at(2024, 6, 1),
                at(2024, 7, 1),
            )],
        )])
    }

    fn settings(as_of: NaiveDateTime) -> ReportSettings {
        ReportSettings {
            load_timeout: Duration::from_millis(200),
            as_of: Some(as_of),
            ..ReportSettings::default()
        }
    }

    /// Sink that accepts a fixed number of cells before failing.
    #[derive(Debug, Default)]
    struct FailingSink {
        inner: OutlineDocument,
        cells_left: usize,
        discarded: Arc<AtomicBool>,
    }

    impl DocumentSink for FailingSink {
        fn add_section_break(&mut self) -> Result<(), RenderError> {
            self.inner.add_section_break()
        }
        fn add_heading(&mut self, text: &str, style: TextStyle) -> Result<(), RenderError> {
            self.inner.add_heading(text, style)
        }
        fn begin_table(&mut self, column_weights: &[f32]) -> Result<(), RenderError> {
            self.inner.begin_table(column_weights)
        }
        fn add_header_cell(&mut self, text: &str, style: TextStyle) -> Result<(), RenderError> {
            self.inner.add_header_cell(text, style)
        }
        fn add_data_cell(
            &mut self,
            text: &str,
            style: TextStyle,
            highlight: Option<Highlight>,
        ) -> Result<(), RenderError> {
            if self.cells_left == 0 {
                return Err(RenderError::Format(std::fmt::Error));
            }
            self.cells_left -= 1;
            self.inner.add_data_cell(text, style, highlight)
        }
        fn end_table(&mut self) -> Result<(), RenderError> {
            self.inner.end_table()
        }
        fn finalize_document(&mut self) -> Result<(), RenderError> {
            self.inner.finalize_document()
        }
        fn discard(&mut self) {
            self.discarded.store(true, Ordering::SeqCst);
            self.inner.discard();
        }
    }

    #[test]
    fn completed_load_produces_finalized_document() {
        let store = Arc::new(InMemoryPropertyStore::immediate(model()));
        let app = ReportApplication::new(store, settings(at(2024, 8, 1)));

        let run = app
            .generate(|| Ok(OutlineDocument::new()))
            .expect("report generated");

        assert!(run.document.is_finalized());
        assert_eq!(run.summary.overdue, 1);
        assert_eq!(run.document.tables().len(), 1);
    }

    #[test]
    fn empty_model_still_finalizes() {
        let store = Arc::new(InMemoryPropertyStore::immediate(ReportModel::default()));
        let app = ReportApplication::new(store, settings(at(2024, 8, 1)));

        let run = app
            .generate(|| Ok(OutlineDocument::new()))
            .expect("empty report generated");

        assert!(run.document.is_finalized());
        assert!(run.document.blocks().is_empty());
        assert_eq!(run.summary.properties, 0);
    }

    #[test]
    fn timeout_is_reported_and_document_discarded() {
        let store = Arc::new(InMemoryPropertyStore::new(model(), LoadBehavior::Never));
        let app = ReportApplication::new(store, settings(at(2024, 8, 1)));

        let err = app
            .generate(|| Ok(OutlineDocument::new()))
            .expect_err("timeout surfaces");

        match err {
            ReportError::LoadTimeout { timeout } => {
                assert_eq!(timeout, Duration::from_millis(200))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn resource_failure_stops_before_loading() {
        let store = Arc::new(InMemoryPropertyStore::immediate(model()));
        let app = ReportApplication::new(Arc::clone(&store), settings(at(2024, 8, 1)));

        let err = app
            .generate::<OutlineDocument, _>(|| {
                Err(RenderError::Typography("font family is empty".to_string()))
            })
            .expect_err("resource failure surfaces");

        assert!(matches!(err, ReportError::ResourceInitialization(_)));
        assert!(matches!(store.loaded_model(), Err(StorageError::NotLoaded)));
    }

    #[test]
    fn assembly_failure_discards_partial_output() {
        let store = Arc::new(InMemoryPropertyStore::immediate(model()));
        let app = ReportApplication::new(store, settings(at(2024, 8, 1)));
        let discarded = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&discarded);

        let err = app
            .generate(move || {
                Ok(FailingSink {
                    cells_left: 2,
                    discarded: flag,
                    ..FailingSink::default()
                })
            })
            .expect_err("assembly failure surfaces");

        assert!(matches!(err, ReportError::Assembly(_)));
        assert!(discarded.load(Ordering::SeqCst));
    }

    #[test]
    fn storage_failure_is_typed() {
        let store = Arc::new(InMemoryPropertyStore::new(
            model(),
            LoadBehavior::Fails("corrupt snapshot".to_string()),
        ));
        let app = ReportApplication::new(store, settings(at(2024, 8, 1)));

        let err = app
            .generate(|| Ok(OutlineDocument::new()))
            .expect_err("storage failure surfaces");

        assert!(matches!(
            err,
            ReportError::Storage(StorageError::LoadFailed(_))
        ));
        assert_eq!(
            err.to_string(),
            "property data failed to load: corrupt snapshot"
        );
    }
}
