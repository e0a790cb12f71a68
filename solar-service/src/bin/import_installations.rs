use anyhow::{bail, Result};
use solar_client::domain::Installation;
use solar_service::{
    config::AppConfig,
    observability,
    pipeline::Pipeline,
    sinks::PgInstallationSink,
    sources::InstallationCsvSource,
    transform,
};
use sqlx::postgres::PgPoolOptions;
use std::{env, path::PathBuf, sync::Arc, time::Duration};

const USAGE: &str = "usage: import_installations [--append] [csv_path]";

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let mut append = false;
    let mut csv_path: Option<PathBuf> = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--append" => append = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(());
            }
            flag if flag.starts_with('-') => bail!("unknown flag '{flag}'\n{USAGE}"),
            path if csv_path.is_none() => csv_path = Some(PathBuf::from(path)),
            _ => bail!(USAGE),
        }
    }

    let cfg = AppConfig::load()?;
    let csv_path = csv_path.unwrap_or_else(|| cfg.dataset.csv_path.clone());
    let pg = cfg.postgres()?;

    let pool = PgPoolOptions::new()
        .max_connections(pg.max_connections)
        .connect(&pg.uri)
        .await?;

    let import = &cfg.import;
    let sink = PgInstallationSink::new(
        pool,
        import.batch_size,
        import.max_retries,
        Duration::from_millis(import.retry_backoff_ms),
        import.max_logged_errors,
    )
    // Schema is applied out-of-band via `sql/schema/*.sql`. Without
    // `--append` the old rows are cleared in the same transaction.
    .replace_existing(!append);

    tracing::info!(path = %csv_path.display(), append, "importing installations");
    let pipeline: Pipeline<_, Installation, _> = Pipeline {
        source: InstallationCsvSource::new(csv_path),
        transforms: vec![Arc::new(transform::InstallationValidation)],
        sink,
    };

    let report = pipeline.run().await?;
    tracing::info!(
        written = report.written,
        errors = report.errors,
        "import finished"
    );

    Ok(())
}
