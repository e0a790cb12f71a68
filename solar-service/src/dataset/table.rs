use std::{
    collections::HashSet,
    fs,
    path::Path,
    sync::{Arc, RwLock},
};

use solar_client::domain::Installation;
use time::OffsetDateTime;

use super::{coerce_record, CsvColumns, LoadError, LoadPolicy, RowError};

/// Outcome counts of one dataset load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub errors: usize,
}

/// Immutable, fully parsed dataset. Rows keep their CSV order.
#[derive(Debug, Clone)]
pub struct InstallationTable {
    rows: Vec<Installation>,
    loaded_at: OffsetDateTime,
    fingerprint: Option<String>,
}

/// Hex blake3 digest of the raw CSV bytes.
pub fn fingerprint(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

impl InstallationTable {
    /// Wrap already-typed rows, e.g. a test fixture.
    pub fn from_rows(rows: Vec<Installation>) -> Self {
        Self {
            rows,
            loaded_at: OffsetDateTime::now_utc(),
            fingerprint: None,
        }
    }

    pub fn load(
        path: &Path,
        policy: LoadPolicy,
        max_logged_errors: usize,
    ) -> Result<(Self, LoadReport), LoadError> {
        let bytes = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let (table, report) = Self::from_csv_bytes(&bytes, policy, max_logged_errors)?;

        tracing::info!(
            path = %path.display(),
            loaded = report.loaded,
            errors = report.errors,
            ?policy,
            "loaded solar installations"
        );
        Ok((table, report))
    }

    /// Parse CSV bytes under `policy`, fingerprinting the input. Only the
    /// first `max_logged_errors` bad rows are logged individually.
    pub fn from_csv_bytes(
        bytes: &[u8],
        policy: LoadPolicy,
        max_logged_errors: usize,
    ) -> Result<(Self, LoadReport), LoadError> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
        let headers = rdr.headers().map_err(LoadError::Headers)?.clone();
        let columns = CsvColumns::from_headers(&headers).ok_or(LoadError::MissingIdentifierColumn)?;

        let mut rows = Vec::new();
        let mut seen = HashSet::new();
        let mut report = LoadReport::default();

        for (index, result) in rdr.records().enumerate() {
            let coerced = match result {
                Ok(record) => coerce_record(&record, &columns, policy),
                Err(e) if e.is_io_error() => return Err(LoadError::Record(e)),
                Err(e) => Err(RowError::Malformed(e.to_string())),
            };

            let outcome = coerced.and_then(|inst| {
                if seen.insert(inst.case_id) {
                    Ok(inst)
                } else {
                    Err(RowError::DuplicateIdentifier(inst.case_id))
                }
            });

            match outcome {
                Ok(inst) => rows.push(inst),
                Err(e) => {
                    report.errors += 1;
                    metrics::counter!("solar_row_errors_total").increment(1);
                    if report.errors <= max_logged_errors {
                        tracing::warn!(row = index, error = %e, "skipping installation row");
                    }
                }
            }
        }

        report.loaded = rows.len();
        metrics::counter!("solar_rows_loaded_total").increment(report.loaded as u64);

        let table = Self {
            rows,
            loaded_at: OffsetDateTime::now_utc(),
            fingerprint: Some(fingerprint(bytes)),
        };
        Ok((table, report))
    }

    pub fn rows(&self) -> &[Installation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn loaded_at(&self) -> OffsetDateTime {
        self.loaded_at
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }
}

/// Shared pointer to the current table.
///
/// Readers take a snapshot `Arc` and never see a half-built table; a reload
/// publishes a complete replacement in one swap.
#[derive(Debug)]
pub struct TableHandle {
    current: RwLock<Arc<InstallationTable>>,
}

impl TableHandle {
    pub fn new(table: InstallationTable) -> Self {
        Self {
            current: RwLock::new(Arc::new(table)),
        }
    }

    pub fn snapshot(&self) -> Arc<InstallationTable> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn publish(&self, table: InstallationTable) {
        let next = Arc::new(table);
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = next;
    }
}
