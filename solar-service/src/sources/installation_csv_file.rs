use std::{collections::HashSet, path::PathBuf};

use solar_client::domain::Installation;

use crate::{
    dataset::{coerce_record, CsvColumns, LoadPolicy, RowError},
    pipeline::{Envelope, EnvelopeStream, PipelineError, Source},
};

/// Bulk-import source: every CSV row becomes one envelope or one row-level
/// error. Imports always skip invalid rows rather than storing nulls in
/// required columns.
pub struct InstallationCsvSource {
    path: PathBuf,
}

impl InstallationCsvSource {
    pub const POLICY: LoadPolicy = LoadPolicy::SkipInvalid;

    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Source<Installation> for InstallationCsvSource {
    async fn stream(&self) -> EnvelopeStream<Installation> {
        let path = self.path.clone();
        let s = async_stream::stream! {
            let bytes = match tokio::fs::read(&path).await {
                Ok(b) => b,
                Err(e) => {
                    yield Err(PipelineError::Source(format!(
                        "failed to open CSV file {}: {e}", path.display()
                    )));
                    return;
                }
            };

            // Parsing is synchronous over the in-memory buffer.
            let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(bytes.as_slice());
            let columns = match rdr.headers() {
                Ok(headers) => match CsvColumns::from_headers(headers) {
                    Some(c) => c,
                    None => {
                        yield Err(PipelineError::Source("CSV header has no case_id column".to_string()));
                        return;
                    }
                },
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to read CSV headers: {e}")));
                    return;
                }
            };

            let mut seen = HashSet::new();
            for (row, result) in rdr.records().enumerate() {
                let coerced = match result {
                    Ok(record) => coerce_record(&record, &columns, InstallationCsvSource::POLICY),
                    Err(e) => Err(RowError::Malformed(e.to_string())),
                };
                let coerced = coerced.and_then(|inst| {
                    if seen.insert(inst.case_id) {
                        Ok(inst)
                    } else {
                        Err(RowError::DuplicateIdentifier(inst.case_id))
                    }
                });

                match coerced {
                    Ok(payload) => yield Ok(Envelope { payload, row }),
                    Err(error) => {
                        metrics::counter!("solar_row_errors_total").increment(1);
                        yield Err(PipelineError::Row { row, error });
                    }
                }
            }
        };

        Box::pin(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn rows_and_row_errors_are_streamed_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solar.csv");
        std::fs::write(
            &path,
            "case_id,p_state,ylat,xlong,p_year,p_cap_ac,p_cap_dc\n\
             1,CA,35.1,-118.4,2019,10,12\n\
             2,CA,35.2,-118.5,N/A,5,6\n\
             1,CA,35.1,-118.4,2019,10,12\n",
        )
        .unwrap();

        let items: Vec<_> = InstallationCsvSource::new(&path).stream().await.collect().await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap().payload.case_id, 1);
        assert!(matches!(
            items[1],
            Err(PipelineError::Row { row: 1, error: RowError::InvalidField { column: "p_year", .. } })
        ));
        assert!(matches!(
            items[2],
            Err(PipelineError::Row { row: 2, error: RowError::DuplicateIdentifier(1) })
        ));
    }

    #[tokio::test]
    async fn missing_file_is_a_source_error() {
        let items: Vec<_> = InstallationCsvSource::new("/nonexistent/solar.csv")
            .stream()
            .await
            .collect()
            .await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(PipelineError::Source(_))));
    }
}
