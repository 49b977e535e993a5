//! One generation run: record, template, renderer, file on disk, history entry.
//!
//! The history entry is only appended once the exported file has been written, so a failed
//! export never shows up in the list.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{info, warn};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::export::naming;
use crate::export::{ExportFormat, Renderer};
use crate::history::{self, DocumentType, HistoryEntry, HistoryStore, KeyValueStore, StoredRecord};
use crate::model::{Document, Orientation};
use crate::records::{ContractRecord, InvoiceRecord, MetricsRecord};
use crate::templates::{self, contract, invoice, report, RenderContext};

/// What a successful run produced.
#[derive(Clone, Debug, PartialEq)]
pub struct Generated {
    /// Path of the written file.
    pub path: PathBuf,
    pub format: ExportFormat,
    pub pages: usize,
    /// The stored history entry, when history is enabled and the append succeeded.
    pub entry: Option<HistoryEntry>,
}

/// Renders records and records the results.
pub struct Session<S> {
    renderer: Box<dyn Renderer>,
    history: Option<HistoryStore<S>>,
    output_dir: PathBuf,
    context: RenderContext,
}

impl<S: KeyValueStore> Session<S> {
    /// Creates a session writing into `output_dir` without history.
    pub fn new(renderer: Box<dyn Renderer>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            renderer,
            history: None,
            output_dir: output_dir.into(),
            context: RenderContext::today(),
        }
    }

    /// Appends an entry to `history` after every saved file.
    pub fn with_history(mut self, history: HistoryStore<S>) -> Self {
        self.history = Some(history);
        self
    }

    /// Uses `context` for every template instead of today's default one.
    pub fn with_context(mut self, context: RenderContext) -> Self {
        self.context = context;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn history(&self) -> Option<&HistoryStore<S>> {
        self.history.as_ref()
    }

    /// Exports the campaign report.
    pub fn report(
        &self,
        record: &MetricsRecord,
        orientation: Orientation,
        format: ExportFormat,
    ) -> Result<Generated> {
        let document = report::render(record, orientation, &self.context);
        let file_name = naming::report_file_name(record, orientation, format);
        self.export(
            &document,
            format,
            file_name,
            DocumentType::Report,
            Some(orientation.as_str().to_owned()),
            record,
        )
    }

    /// Exports an invoice; only the portrait layout exists.
    pub fn invoice(
        &self,
        record: &InvoiceRecord,
        orientation: Orientation,
        format: ExportFormat,
    ) -> Result<Generated> {
        templates::require_portrait(orientation, "invoice")?;
        let document = invoice::render(record, &self.context);
        let file_name = naming::invoice_file_name(record, format);
        self.export(
            &document,
            format,
            file_name,
            DocumentType::Invoice,
            Some(record.kind.as_str().to_owned()),
            record,
        )
    }

    /// Exports a contract; only the portrait layout exists.
    pub fn contract(
        &self,
        record: &ContractRecord,
        orientation: Orientation,
        format: ExportFormat,
    ) -> Result<Generated> {
        templates::require_portrait(orientation, "contract")?;
        let document = contract::render(record, &self.context);
        let file_name = naming::contract_file_name(record, format);
        self.export(
            &document,
            format,
            file_name,
            DocumentType::Contract,
            None,
            record,
        )
    }

    /// Renders a history entry again from its record snapshot.
    ///
    /// Reports keep the orientation stored as their subtype.
    pub fn regenerate(&self, entry: &HistoryEntry, format: ExportFormat) -> Result<Generated> {
        match history::regenerate(entry)? {
            StoredRecord::Report(record) => {
                let orientation = entry
                    .subtype
                    .as_deref()
                    .and_then(Orientation::from_name)
                    .unwrap_or_default();
                self.report(&record, orientation, format)
            }
            StoredRecord::Invoice(record) => self.invoice(&record, Orientation::Portrait, format),
            StoredRecord::Contract(record) => {
                self.contract(&record, Orientation::Portrait, format)
            }
        }
    }

    fn export<R: Serialize>(
        &self,
        document: &Document,
        format: ExportFormat,
        file_name: String,
        document_type: DocumentType,
        subtype: Option<String>,
        record: &R,
    ) -> Result<Generated> {
        let rendered = self.renderer.render(document, format)?;
        let path = self.output_dir.join(&file_name);
        write_file(&path, &rendered.bytes)?;
        info!(
            "Saved {} ({} page(s), {} bytes)",
            path.display(),
            rendered.pages,
            rendered.bytes.len()
        );

        let entry = match &self.history {
            Some(store) => {
                let entry =
                    HistoryEntry::new(document_type, subtype, record, file_name, Utc::now())?;
                match store.append(entry) {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        warn!("{} was saved but not added to the history: {}", path.display(), err);
                        None
                    }
                }
            }
            None => None,
        };

        Ok(Generated {
            path,
            format: rendered.format,
            pages: rendered.pages,
            entry,
        })
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes).map_err(|err| {
        Error::Io(std::io::Error::new(
            err.kind(),
            format!("cannot write {}: {}", path.display(), err),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::RenderedFile;
    use crate::history::MemoryStore;
    use crate::records::InvoiceKind;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    struct StubRenderer {
        fail: bool,
    }

    impl Renderer for StubRenderer {
        fn render(&self, document: &Document, format: ExportFormat) -> Result<RenderedFile> {
            if self.fail {
                return Err(Error::Capture("stub failure".into()));
            }
            Ok(RenderedFile {
                bytes: document.title().as_bytes().to_vec(),
                format,
                pages: 1,
            })
        }
    }

    fn session(dir: &Path, fail: bool) -> Session<MemoryStore> {
        Session::new(Box::new(StubRenderer { fail }), dir)
            .with_history(HistoryStore::new(MemoryStore::new()))
            .with_context(RenderContext::new(
                NaiveDate::from_ymd_opt(2025, 3, 10).expect("date"),
            ))
    }

    fn invoice() -> InvoiceRecord {
        InvoiceRecord {
            client_name: "Salon Bella".into(),
            client_address: None,
            invoice_number: "FV/1".into(),
            issue_date: NaiveDate::from_ymd_opt(2025, 3, 10).expect("date"),
            service_description: "Kampania Facebook Ads".into(),
            amount: Decimal::from(3000),
            kind: InvoiceKind::Full,
        }
    }

    fn history_len(session: &Session<MemoryStore>) -> usize {
        session
            .history()
            .expect("history")
            .list()
            .expect("list")
            .len()
    }

    #[test]
    fn saved_files_are_recorded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session(dir.path(), false);
        let generated = session
            .invoice(&invoice(), Orientation::Portrait, ExportFormat::Pdf)
            .expect("invoice");

        assert_eq!(
            generated.path,
            dir.path().join("faktura-full-fv1-salon-bella.pdf")
        );
        assert!(generated.path.exists());
        let entry = generated.entry.expect("entry");
        assert_eq!(entry.document_type, DocumentType::Invoice);
        assert_eq!(entry.subtype.as_deref(), Some("full"));
        assert_eq!(history_len(&session), 1);
    }

    #[test]
    fn failed_exports_leave_no_history() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session(dir.path(), true);
        let err = session
            .invoice(&invoice(), Orientation::Portrait, ExportFormat::Pdf)
            .expect_err("renderer fails");
        assert!(matches!(err, Error::Capture(_)));
        assert_eq!(history_len(&session), 0);
    }

    #[test]
    fn landscape_invoices_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session(dir.path(), false);
        let err = session
            .invoice(&invoice(), Orientation::Landscape, ExportFormat::Pdf)
            .expect_err("portrait only");
        assert!(matches!(err, Error::Unsupported(_)));
        assert_eq!(history_len(&session), 0);
    }

    #[test]
    fn history_entries_regenerate_the_same_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session(dir.path(), false);
        let first = session
            .invoice(&invoice(), Orientation::Portrait, ExportFormat::Pdf)
            .expect("invoice");
        let entry = first.entry.clone().expect("entry");

        let again = session
            .regenerate(&entry, ExportFormat::Pdf)
            .expect("regenerate");
        assert_eq!(again.path, first.path);
        assert_eq!(history_len(&session), 2);
    }
}
