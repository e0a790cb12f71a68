use std::time::{Duration, Instant};

use futures::StreamExt;
use solar_client::domain::Installation;
use sqlx::{postgres::PgPool, Acquire, Postgres, QueryBuilder, Transaction};

use crate::pipeline::{Envelope, PipelineError, Sink, SinkReport};

/// Batched multi-row INSERT into `solar_installations`.
///
/// The whole run is one transaction: a fatal error leaves the table as it
/// was before the import, including when it was asked to replace the
/// existing rows.
pub struct PgInstallationSink {
    pool: PgPool,
    batch_size: usize,
    max_retries: u32,
    retry_backoff: Duration,
    max_logged_errors: u64,
    replace_existing: bool,
}

fn sink_error(e: sqlx::Error) -> PipelineError {
    PipelineError::Sink(e.to_string())
}

/// The INSERT for one batch. Empty batches are never built.
pub fn insert_query(batch: &[Envelope<Installation>]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO solar_installations (case_id, name, state, county, latitude, longitude, \
         capacity_ac, capacity_dc, year, tech_primary, axis_type, has_battery, area) ",
    );

    builder.push_values(batch, |mut b, env| {
        let i = &env.payload;
        b.push_bind(i.case_id)
            .push_bind(&i.name)
            .push_bind(&i.state)
            .push_bind(&i.county)
            .push_bind(i.latitude)
            .push_bind(i.longitude)
            .push_bind(i.capacity_ac)
            .push_bind(i.capacity_dc)
            .push_bind(i.year)
            .push_bind(&i.tech_primary)
            .push_bind(&i.axis_type)
            .push_bind(i.has_battery)
            .push_bind(i.area);
    });

    builder
}

impl PgInstallationSink {
    pub fn new(
        pool: PgPool,
        batch_size: usize,
        max_retries: u32,
        retry_backoff: Duration,
        max_logged_errors: usize,
    ) -> Self {
        Self {
            pool,
            batch_size: batch_size.max(1),
            max_retries,
            retry_backoff,
            max_logged_errors: max_logged_errors as u64,
            replace_existing: false,
        }
    }

    /// Clear `solar_installations` inside the import transaction first.
    pub fn replace_existing(mut self, replace: bool) -> Self {
        self.replace_existing = replace;
        self
    }

    /// Each attempt runs under a savepoint so a failed INSERT does not abort
    /// the surrounding transaction.
    async fn flush_batch(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        batch: &[Envelope<Installation>],
    ) -> Result<(), PipelineError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut attempt: u32 = 0;
        loop {
            let started = Instant::now();
            let mut savepoint = Acquire::begin(&mut **tx).await.map_err(sink_error)?;
            match insert_query(batch).build().execute(&mut *savepoint).await {
                Ok(_) => {
                    savepoint.commit().await.map_err(sink_error)?;
                    metrics::histogram!("solar_import_batch_seconds")
                        .record(started.elapsed().as_secs_f64());
                    return Ok(());
                }
                Err(e) if attempt < self.max_retries => {
                    savepoint.rollback().await.map_err(sink_error)?;
                    attempt += 1;
                    let sleep_for = self.retry_backoff * attempt;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        "installation batch insert failed, retrying with backoff"
                    );
                    tokio::time::sleep(sleep_for).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "installation batch insert failed, giving up");
                    metrics::counter!("solar_import_sink_errors_total").increment(1);
                    return Err(PipelineError::Sink(e.to_string()));
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Sink<Installation> for PgInstallationSink {
    async fn run<S>(&self, mut input: S) -> Result<SinkReport, PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<Installation>, PipelineError>>
            + Send
            + Unpin
            + 'static,
    {
        let mut report = SinkReport::default();
        let mut buffer: Vec<Envelope<Installation>> = Vec::with_capacity(self.batch_size);

        let mut tx = self.pool.begin().await.map_err(sink_error)?;
        if self.replace_existing {
            sqlx::query("TRUNCATE TABLE solar_installations")
                .execute(&mut *tx)
                .await
                .map_err(sink_error)?;
        }

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) if e.is_row_level() => {
                    report.errors += 1;
                    if report.errors <= self.max_logged_errors {
                        tracing::warn!(error = %e, "skipping installation row");
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };

            buffer.push(env);
            if buffer.len() >= self.batch_size {
                self.flush_batch(&mut tx, &buffer).await?;
                report.written += buffer.len() as u64;
                tracing::info!(written = report.written, "imported installation batch");
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            self.flush_batch(&mut tx, &buffer).await?;
            report.written += buffer.len() as u64;
        }

        tx.commit().await.map_err(sink_error)?;
        metrics::counter!("solar_import_written_total").increment(report.written);
        Ok(report)
    }
}
