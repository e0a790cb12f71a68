use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "solar_service=info,import_installations=info";

/// Install the global fmt subscriber. `RUST_LOG` replaces the built-in
/// filter when set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
